use crate::runtime::{self, ServiceRequest, Services};
use anyhow::{Context, Result};
use fitts_core::{Position, StudyPhase};
use fitts_experiment::calibration::{DEFAULT_SCALE, MAX_SCALE, MIN_SCALE, clamp_scale};
use fitts_experiment::{
    CalibrationSlider, CalibrationStore, ClickOutcome, StudyConfig, StudyEvent, StudyNotice,
    StudySession,
};
use fitts_export::{ResultTables, UploadPayload};
use fitts_remote::{
    Canvas, ClientMessage, CursorController, FrameSnapshot, RemoteCommand, StudyDataTracker,
    StudyEventKind, TaskInfo,
};
use fitts_render::{Scene, SkiaRenderer, TaskHeader};
use fitts_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

/// Cursor samples kept for the movement trail.
const TRAIL_LEN: usize = 48;

/// Pointer the remote bridge drives. While enabled it replaces the native
/// cursor for hit testing and telemetry.
#[derive(Debug, Clone, Default)]
struct ProxyCursor {
    position: Position,
    enabled: bool,
    task_running: bool,
    /// Where each requested click happened, in order.
    pending_clicks: Vec<Position>,
}

impl ProxyCursor {
    fn take_clicks(&mut self) -> Vec<Position> {
        std::mem::take(&mut self.pending_clicks)
    }
}

impl CursorController for ProxyCursor {
    fn move_absolute(&mut self, pos: Position) {
        self.position = pos;
    }

    fn move_relative(&mut self, dx: f64, dy: f64) {
        self.position = self.position.offset(dx, dy);
    }

    fn trigger_click(&mut self) {
        if self.task_running {
            self.pending_clicks.push(self.position);
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        log::info!("Remote cursor control {}", if enabled { "enabled" } else { "disabled" });
        self.enabled = enabled;
        self.pending_clicks.clear();
    }
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    session: StudySession<HighPrecisionTimer, ThreadRng>,
    frame_timer: HighPrecisionTimer,
    config: StudyConfig,
    store: Box<dyn CalibrationStore>,
    scale: f64,
    slider: Option<CalibrationSlider>,
    current_size: Option<PhysicalSize<u32>>,

    native_cursor: Position,
    proxy: ProxyCursor,
    trail: VecDeque<Position>,
    show_trail: bool,
    tracker: StudyDataTracker,
    services: Option<Services>,

    should_exit: bool,
}

impl App {
    pub fn new(config: StudyConfig, store: Box<dyn CalibrationStore>) -> Result<Self> {
        let stored = match store.load() {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Ignoring stored calibration: {}", e);
                None
            }
        };
        let scale = stored.map_or(DEFAULT_SCALE, clamp_scale);

        let mut session = StudySession::new(HighPrecisionTimer::new(), rand::rng(), (0.0, 0.0));
        let mut slider = None;
        if stored.is_none() {
            log::info!("No stored calibration, starting with the calibration screen");
            session.handle_event(StudyEvent::BeginCalibration);
            slider = Some(CalibrationSlider::new(scale));
        }

        let services = runtime::start_background_services(config.remote.clone());

        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            session,
            frame_timer: HighPrecisionTimer::new(),
            config,
            store,
            scale,
            slider,
            current_size: None,
            native_cursor: Position::default(),
            proxy: ProxyCursor::default(),
            trail: VecDeque::with_capacity(TRAIL_LEN),
            show_trail: false,
            tracker: StudyDataTracker::new(),
            services: Some(services),
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        log::info!("Platform: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
        log::info!("SPACE starts a study, C calibrates, T toggles the trail, ESC exits");

        let result = event_loop.run_app(&mut self);

        if let Some(services) = self.services.take() {
            services.shutdown();
        }
        result.map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;

        let window_attributes = Window::default_attributes()
            .with_title("WebFitts")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        self.current_size = Some(size);
        log::info!(
            "Display: {}x{} at scale factor {:.2}",
            size.width,
            size.height,
            window.scale_factor()
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.renderer = Some(SkiaRenderer::new(size.width, size.height)?);
        self.session
            .set_viewport(f64::from(size.width), f64::from(size.height));

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn viewport(&self) -> (f64, f64) {
        self.current_size
            .map_or((0.0, 0.0), |s| (f64::from(s.width), f64::from(s.height)))
    }

    /// Cursor used for hit testing: the proxy while remote control is on.
    fn pointer(&self) -> Position {
        if self.proxy.enabled {
            self.proxy.position
        } else {
            self.native_cursor
        }
    }

    fn render(&mut self) -> Result<()> {
        let header = self.task_header();
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let frame = self.session.frame();
        let results = self.session.results();
        let trail: Vec<Position> = if self.show_trail {
            self.trail.iter().copied().collect()
        } else {
            Vec::new()
        };

        let scene = match (self.session.phase(), &frame, &self.slider) {
            (StudyPhase::Calibration, _, Some(slider)) => Scene::Calibration {
                scale: slider.value(),
                card: slider.card_size(),
                range: (MIN_SCALE, MAX_SCALE),
            },
            (StudyPhase::Running, Some(frame), _) => Scene::Targets {
                frame,
                trail: &trail,
                header,
            },
            (StudyPhase::Finished, _, _) => Scene::Finished {
                tasks: self.session.schedule().len(),
                overall: results.map(|r| &r.overall),
            },
            _ => Scene::Idle,
        };

        let stats = renderer.render_frame(&scene, pixels.frame_mut(), &mut self.frame_timer)?;
        let start = self.frame_timer.now();
        pixels.render()?;
        let present = self.frame_timer.elapsed(start);
        self.frame_timer.record_frame(stats.total + present);

        log::trace!(
            "present {:.3}ms, clear {:.3}ms, draw {:.3}ms, copy {:.3}ms, dirty {}",
            present.as_secs_f64() * 1e3,
            stats.clear.as_secs_f64() * 1e3,
            stats.draw.as_secs_f64() * 1e3,
            stats.copy.as_secs_f64() * 1e3,
            stats.dirty_count,
        );
        Ok(())
    }

    /// Progress and the configured condition of the running task.
    fn task_header(&self) -> Option<TaskHeader> {
        let (task, total) = self.session.progress()?;
        let (_, raw) = self.session.schedule().get(task - 1)?;
        Some(TaskHeader {
            task,
            total,
            amplitude: raw.amplitude,
            width: raw.width,
        })
    }

    /// Per-frame step: remote input, session progress, telemetry.
    fn update(&mut self) {
        let commands = self
            .services
            .as_ref()
            .map(Services::drain_commands)
            .unwrap_or_default();
        self.apply_remote_commands(commands);


        self.sample_trail();
        for notice in self.session.update() {
            self.handle_notice(notice);
        }

        self.broadcast_study_data();
    }

    /// Runs bridge commands in arrival order; each click lands where the
    /// proxy was when it was requested.
    fn apply_remote_commands(&mut self, commands: Vec<RemoteCommand>) {
        let viewport = self.viewport();
        for command in commands {
            self.proxy.task_running = self.session.phase().is_running();
            fitts_remote::dispatch(command, viewport, &mut self.proxy);
            for pos in self.proxy.take_clicks() {
                self.click(pos);
            }
        }
    }

    fn click(&mut self, pos: Position) {
        let click_number = self.session.trial().map(|t| t.click_count);
        let task_index = self.session.trial().map(|t| t.task_index);
        let outcome = self.session.handle_click(pos);

        let result = match outcome {
            ClickOutcome::Ignored => return,
            ClickOutcome::Armed => "armed",
            ClickOutcome::Recorded { missed: true } => "miss",
            ClickOutcome::Recorded { missed: false } => "hit",
        };
        self.broadcast(StudyEventKind::Click, json!({
            "taskIndex": task_index,
            "clickNumber": click_number,
            "x": pos.x,
            "y": pos.y,
            "result": result,
        }));
    }

    fn handle_notice(&mut self, notice: StudyNotice) {
        match notice {
            StudyNotice::StudyStarted { tasks } => {
                self.broadcast(StudyEventKind::StudyStart, json!({ "tasks": tasks }));
            }
            StudyNotice::TaskStarted { index, condition } => {
                self.trail.clear();
                self.tracker.reset();
                self.broadcast(StudyEventKind::TaskStart, json!({
                    "index": index,
                    "amplitude": condition.amplitude,
                    "width": condition.width,
                    "numTargets": condition.target_count,
                }));
            }
            StudyNotice::TaskCompleted { index } => {
                self.broadcast(StudyEventKind::TaskEnd, json!({ "index": index }));
            }
            StudyNotice::StudyFinished => self.finish_study(),
            StudyNotice::AggregationFailed { reason } => {
                log::error!("Results were not saved: {}", reason);
                self.broadcast(StudyEventKind::StudyEnd, json!({ "error": reason }));
            }
        }
    }

    fn finish_study(&mut self) {
        self.trail.clear();
        let Some(results) = self.session.results() else {
            return;
        };

        self.broadcast(StudyEventKind::StudyEnd, json!({
            "meanTime": results.overall.mean_time_ms,
            "errorPct": results.overall.error_pct,
            "throughput": results.overall.throughput,
        }));

        if let Err(e) = fitts_export::export_results(results, &self.config.results_dir) {
            log::error!("Failed to export results: {}", e);
        }

        if !self.config.server.upload {
            return;
        }
        match ResultTables::from_results(results) {
            Ok(tables) => {
                let payload = UploadPayload::new(results.session.file_stem(), &tables);
                if let Some(services) = &self.services {
                    services.request(ServiceRequest::Upload {
                        server: self.config.server.url.clone(),
                        payload,
                    });
                }
            }
            Err(e) => log::error!("Failed to prepare upload: {}", e),
        }
    }

    fn broadcast(&self, kind: StudyEventKind, data: serde_json::Value) {
        if let Some(services) = &self.services {
            services.broadcast(ClientMessage::event(kind, data));
        }
    }

    fn broadcast_study_data(&mut self) {
        let Some(services) = &self.services else {
            return;
        };
        if !services.bridge_connected() {
            return;
        }
        let (Some(trial), Some(target)) = (self.session.trial(), self.session.expected_target()) else {
            return;
        };
        let Some((_, raw)) = self.session.schedule().get(trial.task_index) else {
            return;
        };

        let (width, height) = self.viewport();
        let snapshot = FrameSnapshot {
            cursor: self.pointer(),
            target,
            task: TaskInfo {
                index: trial.task_index,
                click_number: trial.click_count,
                amplitude: raw.amplitude,
                width: raw.width,
                num_targets: raw.target_count,
            },
            canvas: Canvas { width, height },
        };
        let data = self
            .tracker
            .sample(&snapshot, fitts_remote::protocol::timestamp());
        services.broadcast(ClientMessage::StudyData(data));
    }

    fn start_study(&mut self) {
        let plan = match self.config.validate(self.scale) {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("Cannot start study: {}", e);
                return;
            }
        };
        if let Err(e) = self.session.begin(self.config.participant.clone(), &plan) {
            log::error!("Cannot start study: {}", e);
        }
    }

    fn begin_calibration(&mut self) {
        if self.session.handle_event(StudyEvent::BeginCalibration) {
            self.slider = Some(CalibrationSlider::new(self.scale));
        }
    }

    fn end_calibration(&mut self, confirm: bool) {
        let Some(mut slider) = self.slider.take() else {
            return;
        };
        if confirm {
            self.scale = slider.confirm();
            match self.store.save(self.scale) {
                Ok(()) => log::info!("Calibration scale set to {:.2}", self.scale),
                Err(e) => log::error!("Failed to store calibration: {}", e),
            }
        } else {
            self.scale = slider.cancel();
        }
        self.session.handle_event(StudyEvent::EndCalibration);
    }

    fn handle_input(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(k) = key else {
            return;
        };
        let calibrating = self.session.phase().is_calibrating();

        match k {
            KeyCode::ArrowUp | KeyCode::ArrowRight if calibrating => {
                if let Some(slider) = &mut self.slider {
                    slider.nudge(1);
                }
            }
            KeyCode::ArrowDown | KeyCode::ArrowLeft if calibrating => {
                if let Some(slider) = &mut self.slider {
                    slider.nudge(-1);
                }
            }
            KeyCode::Enter | KeyCode::NumpadEnter if calibrating => self.end_calibration(true),
            KeyCode::Escape if calibrating => self.end_calibration(false),
            KeyCode::KeyC => self.begin_calibration(),
            KeyCode::KeyT => {
                self.show_trail = !self.show_trail;
                log::info!("Trail {}", if self.show_trail { "on" } else { "off" });
            }
            KeyCode::Space if self.session.phase().can_begin() => self.start_study(),
            KeyCode::Escape => self.cleanup_and_exit(event_loop),
            _ => {}
        }
    }

    /// Appends the pointer to the trail once the task is armed.
    fn sample_trail(&mut self) {
        if !self.session.frame().is_some_and(|f| f.armed) {
            return;
        }
        let pointer = self.pointer();
        if self.trail.back() == Some(&pointer) {
            return;
        }
        if self.trail.len() == TRAIL_LEN {
            self.trail.pop_front();
        }
        self.trail.push_back(pointer);
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        self.current_size = Some(new_size);
        if let Some(pixels) = &mut self.pixels {
            pixels
                .resize_surface(new_size.width, new_size.height)
                .context("failed to resize surface")?;
            pixels
                .resize_buffer(new_size.width, new_size.height)
                .context("failed to resize buffer")?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height)?;
        }
        self.session
            .set_viewport(f64::from(new_size.width), f64::from(new_size.height));
        log::info!("Display resized to {}x{}", new_size.width, new_size.height);
        Ok(())
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        let stats = self.frame_timer.frame_stats();
        if stats.frames > 0 {
            log::info!(
                "{} frames, {:.2} ms average, {:.2} ms jitter, {:.1} fps",
                stats.frames,
                stats.average_frame_time_ns / 1e6,
                stats.jitter_ns / 1e6,
                stats.effective_fps
            );
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                log::error!("Failed to create window and surface: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = self.render() {
                    log::error!("Render failed: {}", e);
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                self.handle_input(event.physical_key, event_loop);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                // held arrows keep moving the slider
                if matches!(
                    event.physical_key,
                    PhysicalKey::Code(KeyCode::ArrowUp | KeyCode::ArrowDown | KeyCode::ArrowLeft | KeyCode::ArrowRight)
                ) {
                    self.handle_input(event.physical_key, event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.native_cursor = Position::new(position.x, position.y);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if !self.proxy.enabled {
                    self.click(self.native_cursor);
                }
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = self.handle_resize(size) {
                    log::error!("{:#}", e);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    if let Err(e) = self.handle_resize(size) {
                        log::error!("{:#}", e);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
