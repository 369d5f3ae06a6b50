use crate::text::{TextCache, load_font};
use anyhow::{Context, Result, bail};
use fitts_core::{OverallAggregate, Position, TargetFrame, target_position};
use fitts_timing::{FrameStats as TimingStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};

pub const BACKGROUND: [u8; 4] = [255, 255, 255, 255];
pub const HIGHLIGHT: [u8; 3] = [0x3D, 0x99, 0x70];
pub const OUTLINE: [u8; 3] = [0x18, 0x18, 0x18];
pub const TRAIL: [u8; 3] = [0xAA, 0xAA, 0xAA];
pub const TRACK: [u8; 3] = [0xDD, 0xDD, 0xDD];

pub const OUTLINE_WIDTH: f32 = 3.0;
pub const TRAIL_WIDTH: f32 = 2.0;

const PROGRESS_HEIGHT: f32 = 6.0;
const PROGRESS_MARGIN: f32 = 40.0;
const SLIDER_WIDTH: f32 = 200.0;
const SLIDER_GAP: f32 = 60.0;

const TITLE_SIZE: f32 = 48.0;
const LABEL_SIZE: f32 = 24.0;
const LINE_GAP: f32 = 35.0;
/// Task labels sit this far left of the right edge.
const HEADER_INSET: f32 = 350.0;
const SUMMARY_INSET: f32 = 400.0;

const IDLE_PROMPT: &str = "Press Space to begin, C to calibrate";
const CALIBRATION_HINT: &str = "Match a bank card: arrows resize, Enter saves";

/// Task number and the condition as configured, before calibration scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskHeader {
    /// One-based.
    pub task: usize,
    pub total: usize,
    pub amplitude: f64,
    pub width: f64,
}

/// What to put on screen for one frame.
#[derive(Debug, Clone, Copy)]
pub enum Scene<'a> {
    /// Start prompt between studies.
    Idle,
    /// Card outline sized by the pending calibration scale, with the slider
    /// position under it.
    Calibration {
        scale: f64,
        card: (f64, f64),
        range: (f64, f64),
    },
    Targets {
        frame: &'a TargetFrame,
        /// Recent cursor positions, oldest first. Drawn once the task is armed.
        trail: &'a [Position],
        header: Option<TaskHeader>,
    },
    /// Completion banner and, when the study produced results, the overall
    /// figures.
    Finished {
        tasks: usize,
        overall: Option<&'a OverallAggregate>,
    },
}

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

pub trait Renderer {
    fn clear_dirty(&mut self, dirty: &[Rect]);
    fn draw_scene(&mut self, scene: &Scene<'_>) -> Result<()>;
}

/// Software renderer drawing into an offscreen pixmap and presenting only the
/// regions touched since the previous frame.
pub struct SkiaRenderer {
    width: u32,
    height: u32,

    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,

    component_timers: HashMap<&'static str, HighPrecisionTimer>,
    clear_buffer: Vec<u8>,

    titles: TextCache,
    labels: TextCache,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height).context("invalid canvas size")?;
        canvas.fill(background());
        let font = load_font()?;

        Ok(SkiaRenderer {
            width,
            height,
            canvas,
            dirty_regions: Vec::with_capacity(16),
            first_frame: true,
            component_timers: ["draw", "clear", "copy"]
                .iter()
                .map(|&k| (k, HighPrecisionTimer::new()))
                .collect(),
            clear_buffer: clear_buffer(width, height),
            titles: TextCache::new(font.clone(), TITLE_SIZE, OUTLINE),
            labels: TextCache::new(font, LABEL_SIZE, OUTLINE),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width, new_height).context("invalid canvas size")?;
        self.canvas.fill(background());
        self.width = new_width;
        self.height = new_height;
        self.clear_buffer = clear_buffer(new_width, new_height);
        self.dirty_regions.clear();
        self.first_frame = true;
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The offscreen canvas, premultiplied RGBA.
    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn component_stats(&self, component: &str) -> Option<TimingStats> {
        self.component_timers.get(component).map(|t| t.frame_stats())
    }

    /// Draws `scene` and copies every changed region into `frame_buffer`, an
    /// RGBA8 buffer of the renderer's size.
    pub fn render_frame<T>(
        &mut self,
        scene: &Scene<'_>,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats>
    where
        T: Timer<Timestamp = u64>,
    {
        let expected = self.width as usize * self.height as usize * 4;
        if frame_buffer.len() != expected {
            bail!(
                "frame buffer holds {} bytes, renderer needs {}",
                frame_buffer.len(),
                expected
            );
        }

        if self.first_frame {
            self.first_frame = false;
            self.canvas.fill(background());
            frame_buffer.copy_from_slice(&self.clear_buffer);
            self.dirty_regions.clear();
        }

        // 1) wipe what the previous frame drew
        let old_dirty = std::mem::take(&mut self.dirty_regions);
        let t_clear = {
            let t = timer.now();
            self.clear_dirty(&old_dirty);
            timer.elapsed(t)
        };

        // 2) draw the new scene, collecting its bounds
        let t_draw = {
            let t = timer.now();
            self.draw_scene(scene)?;
            timer.elapsed(t)
        };

        // 3) present old and new regions
        let mut present = old_dirty;
        present.extend_from_slice(&self.dirty_regions);
        coalesce_dirty(&mut present);

        let t_copy = {
            let t = timer.now();
            for rect in &present {
                self.copy_dirty_region(*rect, frame_buffer);
            }
            timer.elapsed(t)
        };

        let total = t_clear + t_draw + t_copy;
        for (name, d) in [("draw", t_draw), ("clear", t_clear), ("copy", t_copy)] {
            if let Some(t) = self.component_timers.get_mut(name) {
                t.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total,
            dirty_count: self.dirty_regions.len(),
        })
    }

    fn pixel_bounds(&self, rect: Rect) -> Option<(usize, usize, usize, usize)> {
        let x0 = rect.x().floor().max(0.0).min(self.width as f32) as usize;
        let y0 = rect.y().floor().max(0.0).min(self.height as f32) as usize;
        let x1 = rect.right().ceil().max(0.0).min(self.width as f32) as usize;
        let y1 = rect.bottom().ceil().max(0.0).min(self.height as f32) as usize;
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }

    fn copy_dirty_region(&self, dirty: Rect, frame_buffer: &mut [u8]) {
        let Some((x0, y0, x1, y1)) = self.pixel_bounds(dirty) else {
            return;
        };
        let stride = self.width as usize * 4;
        let canvas_data = self.canvas.data();
        for row in y0..y1 {
            let start = row * stride + x0 * 4;
            let end = row * stride + x1 * 4;
            frame_buffer[start..end].copy_from_slice(&canvas_data[start..end]);
        }
    }

    fn mark_dirty(&mut self, rect: Option<Rect>, pad: f32) {
        let Some(rect) = rect else { return };
        let padded = Rect::from_ltrb(
            (rect.left() - pad).max(0.0),
            (rect.top() - pad).max(0.0),
            (rect.right() + pad).min(self.width as f32),
            (rect.bottom() + pad).min(self.height as f32),
        );
        if let Some(r) = padded {
            self.dirty_regions.push(r);
        }
    }

    fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    fn draw_targets(&mut self, frame: &TargetFrame, trail: &[Position]) {
        if frame.armed && trail.len() >= 2 {
            let mut pb = PathBuilder::new();
            pb.move_to(trail[0].x as f32, trail[0].y as f32);
            for p in &trail[1..] {
                pb.line_to(p.x as f32, p.y as f32);
            }
            if let Some(path) = pb.finish() {
                self.stroke(&path, TRAIL, TRAIL_WIDTH);
                self.mark_dirty(Some(path.bounds()), TRAIL_WIDTH + 1.0);
            }
        }

        let radius = (frame.width / 2.0) as f32;
        for i in 0..frame.target_count {
            let pos = target_position(frame.center, frame.amplitude, frame.target_count, i);
            let Some(circle) = PathBuilder::from_circle(pos.x as f32, pos.y as f32, radius) else {
                continue;
            };
            if i == frame.highlighted {
                let paint = solid(HIGHLIGHT);
                self.canvas
                    .fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
            }
            self.stroke(&circle, OUTLINE, OUTLINE_WIDTH);
        }

        let reach = (frame.amplitude / 2.0 + frame.width / 2.0) as f32;
        self.mark_dirty(
            Rect::from_ltrb(
                frame.center.x as f32 - reach,
                frame.center.y as f32 - reach,
                frame.center.x as f32 + reach,
                frame.center.y as f32 + reach,
            ),
            OUTLINE_WIDTH + 1.0,
        );
    }

    fn draw_header(&mut self, header: TaskHeader) {
        let TaskHeader {
            task,
            total,
            amplitude,
            width,
        } = header;
        if total == 0 {
            return;
        }
        let track_width = self.width as f32 - 2.0 * PROGRESS_MARGIN;
        let Some(track) = Rect::from_xywh(PROGRESS_MARGIN, 20.0, track_width, PROGRESS_HEIGHT) else {
            return;
        };
        self.canvas
            .fill_rect(track, &solid(TRACK), Transform::identity(), None);

        let done = track_width * (task.min(total) as f32 / total as f32);
        if let Some(bar) = Rect::from_xywh(PROGRESS_MARGIN, 20.0, done, PROGRESS_HEIGHT) {
            self.canvas
                .fill_rect(bar, &solid(OUTLINE), Transform::identity(), None);
        }
        self.mark_dirty(Some(track), 1.0);

        let x = (self.width as f32 - HEADER_INSET).max(PROGRESS_MARGIN);
        let lines = [
            format!("Task {task} of {total}"),
            format!("Amplitude {amplitude} | Width {width}"),
        ];
        for (line, y) in lines.iter().zip([50.0, 85.0]) {
            if let Some(pm) = self.labels.get_or_render(line) {
                self.blit(&pm, x, y);
            }
        }
    }

    fn draw_summary(&mut self, tasks: usize, overall: Option<&OverallAggregate>) {
        let (_, cy) = self.center();
        let title = if tasks == 1 {
            "Task Complete!"
        } else {
            "Tasks Complete!"
        };
        if let Some(pm) = self.titles.get_or_render(title) {
            self.blit_centered(&pm, cy - pm.height() as f32 / 2.0);
        }

        let lines = match overall {
            Some(o) => vec![
                "Overall Mean Result".to_string(),
                format!("Mean Time (ms): {:.2}", o.mean_time_ms),
                format!("Mean Error (%): {:.2}", o.error_pct),
                format!("Mean Throughput (bps): {:.2}", o.throughput),
            ],
            None => vec!["Results could not be computed".to_string()],
        };
        let x = (self.width as f32 - SUMMARY_INSET).max(PROGRESS_MARGIN);
        for (i, line) in lines.iter().enumerate() {
            if let Some(pm) = self.labels.get_or_render(line) {
                self.blit(&pm, x, 50.0 + i as f32 * LINE_GAP);
            }
        }
    }

    fn draw_prompt(&mut self, text: &str, y: f32) {
        if let Some(pm) = self.labels.get_or_render(text) {
            self.blit_centered(&pm, y);
        }
    }

    fn blit_centered(&mut self, pm: &Pixmap, y: f32) {
        let x = (self.width as f32 - pm.width() as f32) / 2.0;
        self.blit(pm, x, y);
    }

    /// Draws a text pixmap with its top-left corner at `(x, y)`.
    fn blit(&mut self, pm: &Pixmap, x: f32, y: f32) {
        let (x, y) = (x.round(), y.round());
        self.canvas.draw_pixmap(
            x as i32,
            y as i32,
            pm.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        self.mark_dirty(
            Rect::from_xywh(x, y, pm.width() as f32, pm.height() as f32),
            1.0,
        );
    }

    fn draw_calibration(&mut self, scale: f64, card: (f64, f64), range: (f64, f64)) {
        let (cx, cy) = self.center();
        let (w, h) = (card.0 as f32, card.1 as f32);
        self.draw_prompt(CALIBRATION_HINT, (cy - h / 2.0 - 2.0 * LINE_GAP).max(PROGRESS_MARGIN));

        let Some(outline) = Rect::from_xywh(cx - w / 2.0, cy - h / 2.0, w, h) else {
            return;
        };
        self.stroke(&PathBuilder::from_rect(outline), OUTLINE, OUTLINE_WIDTH);
        self.mark_dirty(Some(outline), OUTLINE_WIDTH + 1.0);

        // slider under the card
        let track_y = cy + h / 2.0 + SLIDER_GAP;
        let left = cx - SLIDER_WIDTH / 2.0;
        if let Some(track) = Rect::from_xywh(left, track_y - 2.0, SLIDER_WIDTH, 4.0) {
            self.canvas
                .fill_rect(track, &solid(TRACK), Transform::identity(), None);
        }
        let span = (range.1 - range.0).max(f64::EPSILON);
        let t = ((scale - range.0) / span).clamp(0.0, 1.0) as f32;
        if let Some(knob) = PathBuilder::from_circle(left + t * SLIDER_WIDTH, track_y, 8.0) {
            let paint = solid(HIGHLIGHT);
            self.canvas
                .fill_path(&knob, &paint, FillRule::Winding, Transform::identity(), None);
        }
        self.mark_dirty(
            Rect::from_xywh(left, track_y - 8.0, SLIDER_WIDTH, 16.0),
            9.0,
        );
    }

    fn stroke(&mut self, path: &Path, rgb: [u8; 3], width: f32) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.canvas
            .stroke_path(path, &solid(rgb), &stroke, Transform::identity(), None);
    }
}

impl Renderer for SkiaRenderer {
    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let stride = self.width as usize * 4;
        for rect in dirty {
            let Some((x0, y0, x1, y1)) = self.pixel_bounds(*rect) else {
                continue;
            };
            let canvas_data = self.canvas.data_mut();
            for y in y0..y1 {
                let start = y * stride + x0 * 4;
                let end = y * stride + x1 * 4;
                canvas_data[start..end].copy_from_slice(&self.clear_buffer[start..end]);
            }
        }
    }

    fn draw_scene(&mut self, scene: &Scene<'_>) -> Result<()> {
        match *scene {
            Scene::Idle => {
                let (_, cy) = self.center();
                self.draw_prompt(IDLE_PROMPT, cy - LABEL_SIZE / 2.0);
            }
            Scene::Calibration { scale, card, range } => self.draw_calibration(scale, card, range),
            Scene::Targets {
                frame,
                trail,
                header,
            } => {
                self.draw_targets(frame, trail);
                if let Some(h) = header {
                    self.draw_header(h);
                }
            }
            Scene::Finished { tasks, overall } => self.draw_summary(tasks, overall),
        }
        Ok(())
    }
}

/// Merges rects on the same row band that touch or overlap.
fn coalesce_dirty(rects: &mut Vec<Rect>) {
    rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
    let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
    for r in rects.drain(..) {
        if let Some(last) = out.last_mut() {
            let same_row =
                (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
            let touching = r.x() <= last.right() + 1.0;
            if same_row && touching {
                if let Some(merged) = Rect::from_ltrb(
                    last.left().min(r.left()),
                    last.top(),
                    last.right().max(r.right()),
                    last.bottom(),
                ) {
                    *last = merged;
                    continue;
                }
            }
        }
        out.push(r);
    }
    *rects = out;
}

fn background() -> Color {
    Color::from_rgba8(BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], BACKGROUND[3])
}

fn clear_buffer(width: u32, height: u32) -> Vec<u8> {
    BACKGROUND
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 4)
        .collect()
}

fn solid(rgb: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint.anti_alias = true;
    paint
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitts_timing::ManualTimer;

    const W: u32 = 400;
    const H: u32 = 300;

    fn pixel(fb: &[u8], x: f64, y: f64) -> [u8; 4] {
        let off = (y.round() as usize * W as usize + x.round() as usize) * 4;
        [fb[off], fb[off + 1], fb[off + 2], fb[off + 3]]
    }

    fn frame() -> TargetFrame {
        TargetFrame {
            center: Position::new(200.0, 150.0),
            amplitude: 200.0,
            width: 40.0,
            target_count: 4,
            highlighted: 1,
            armed: false,
        }
    }

    fn render(r: &mut SkiaRenderer, scene: &Scene<'_>, fb: &mut [u8]) -> FrameStats {
        r.render_frame(scene, fb, &mut ManualTimer::new()).unwrap()
    }

    fn inked(fb: &[u8], xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| pixel(fb, x as f64, y as f64)[0] < 0x80)
    }

    #[test]
    fn test_idle_shows_prompt() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        render(&mut r, &Scene::Idle, &mut fb);
        assert!(inked(&fb, 0..W as usize, 130..170));
        assert_eq!(pixel(&fb, 0.0, 0.0), BACKGROUND);
        assert!(fb.chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_highlighted_target_is_filled() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        let f = frame();
        let stats = render(
            &mut r,
            &Scene::Targets {
                frame: &f,
                trail: &[],
                header: None,
            },
            &mut fb,
        );
        assert!(stats.dirty_count >= 1);

        // target 1 sits straight below the center on a ring of four
        let highlighted = target_position(f.center, f.amplitude, 4, 1);
        assert_eq!(pixel(&fb, highlighted.x, highlighted.y), [0x3D, 0x99, 0x70, 255]);

        // others are outlined only
        let plain = target_position(f.center, f.amplitude, 4, 0);
        assert_eq!(pixel(&fb, plain.x, plain.y), BACKGROUND);
        assert_eq!(pixel(&fb, plain.x + 20.0, plain.y), [0x18, 0x18, 0x18, 255]);
    }

    #[test]
    fn test_previous_frame_is_erased() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        let f = frame();
        render(
            &mut r,
            &Scene::Targets {
                frame: &f,
                trail: &[],
                header: None,
            },
            &mut fb,
        );
        // top edge of the upper target
        assert_eq!(pixel(&fb, 200.0, 30.0), [0x18, 0x18, 0x18, 255]);

        render(
            &mut r,
            &Scene::Finished {
                tasks: 4,
                overall: None,
            },
            &mut fb,
        );
        assert_eq!(pixel(&fb, 200.0, 30.0), BACKGROUND);
        let highlighted = target_position(f.center, f.amplitude, 4, 1);
        assert_eq!(pixel(&fb, highlighted.x, highlighted.y), BACKGROUND);
    }

    #[test]
    fn test_task_header_is_drawn() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        let f = frame();
        render(
            &mut r,
            &Scene::Targets {
                frame: &f,
                trail: &[],
                header: None,
            },
            &mut fb,
        );
        assert!(!inked(&fb, 50..170, 50..75));

        render(
            &mut r,
            &Scene::Targets {
                frame: &f,
                trail: &[],
                header: Some(TaskHeader {
                    task: 1,
                    total: 4,
                    amplitude: 256.0,
                    width: 32.0,
                }),
            },
            &mut fb,
        );
        // labels start at the left margin on a narrow canvas
        assert!(inked(&fb, 50..170, 50..75));
        // progress bar, one of four tasks done
        assert_eq!(pixel(&fb, 60.0, 23.0), [0x18, 0x18, 0x18, 255]);
        assert_eq!(pixel(&fb, 300.0, 23.0), [0xDD, 0xDD, 0xDD, 255]);
    }

    #[test]
    fn test_finished_scene_shows_results() {
        let overall = OverallAggregate {
            session: fitts_core::SessionInfo::default(),
            mean_time_ms: 612.0,
            error_pct: 4.5,
            throughput: 4.21,
        };
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        render(
            &mut r,
            &Scene::Finished {
                tasks: 4,
                overall: Some(&overall),
            },
            &mut fb,
        );
        // figures from the top, banner across the center
        assert!(inked(&fb, 0..W as usize, 85..110));
        assert!(inked(&fb, 0..W as usize, 135..165));

        let mut without = vec![0u8; (W * H * 4) as usize];
        let mut r = SkiaRenderer::new(W, H).unwrap();
        render(
            &mut r,
            &Scene::Finished {
                tasks: 4,
                overall: None,
            },
            &mut without,
        );
        assert!(inked(&without, 0..W as usize, 50..75));
        assert!(!inked(&without, 0..W as usize, 85..110));
        assert!(inked(&without, 0..W as usize, 135..165));
    }

    #[test]
    fn test_trail_only_after_arming() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        let trail = [Position::new(150.0, 100.0), Position::new(250.0, 100.0)];
        let mut f = frame();

        render(
            &mut r,
            &Scene::Targets {
                frame: &f,
                trail: &trail,
                header: None,
            },
            &mut fb,
        );
        assert_eq!(pixel(&fb, 200.0, 100.0), BACKGROUND);

        f.armed = true;
        render(
            &mut r,
            &Scene::Targets {
                frame: &f,
                trail: &trail,
                header: None,
            },
            &mut fb,
        );
        assert_eq!(pixel(&fb, 200.0, 100.0), [0xAA, 0xAA, 0xAA, 255]);
    }

    #[test]
    fn test_calibration_card_outline() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        render(
            &mut r,
            &Scene::Calibration {
                scale: 1.0,
                card: (200.0, 100.0),
                range: (0.5, 2.0),
            },
            &mut fb,
        );
        // left edge of a 200 x 100 card centered at (200, 150)
        assert_eq!(pixel(&fb, 100.0, 150.0), [0x18, 0x18, 0x18, 255]);
        assert_eq!(pixel(&fb, 200.0, 150.0), BACKGROUND);
    }

    #[test]
    fn test_wrong_buffer_size_is_an_error() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; 16];
        assert!(r.render_frame(&Scene::Idle, &mut fb, &mut ManualTimer::new()).is_err());
    }

    #[test]
    fn test_resize_restarts_presentation() {
        let mut r = SkiaRenderer::new(W, H).unwrap();
        r.resize(64, 32).unwrap();
        assert_eq!(r.size(), (64, 32));
        let mut fb = vec![0u8; 64 * 32 * 4];
        render(&mut r, &Scene::Idle, &mut fb);
        assert_eq!(&fb[..4], BACKGROUND);
        assert!(fb.chunks(4).all(|p| p[3] == 255));
        assert!(r.component_stats("draw").is_some());
    }

    #[test]
    fn test_coalesce_merges_touching_rects() {
        let mut rects = vec![
            Rect::from_xywh(10.0, 0.0, 10.0, 5.0).unwrap(),
            Rect::from_xywh(0.0, 0.0, 10.0, 5.0).unwrap(),
            Rect::from_xywh(0.0, 50.0, 10.0, 5.0).unwrap(),
        ];
        coalesce_dirty(&mut rects);
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].width(), 20.0);
    }
}
