use crate::protocol::RemoteCommand;
use fitts_core::Position;

/// Host-side capability the bridge drives: a proxy cursor the remote peer can
/// move and click with.
pub trait CursorController {
    fn move_absolute(&mut self, pos: Position);
    fn move_relative(&mut self, dx: f64, dy: f64);
    /// Clicks at the proxy cursor. Implementations ignore the request while no
    /// task is running.
    fn trigger_click(&mut self);
    fn set_enabled(&mut self, enabled: bool);
}

/// Used when nothing on the host side can act on remote commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCursorController;

impl CursorController for NoopCursorController {
    fn move_absolute(&mut self, _pos: Position) {}
    fn move_relative(&mut self, _dx: f64, _dy: f64) {}
    fn trigger_click(&mut self) {}
    fn set_enabled(&mut self, _enabled: bool) {}
}

/// Applies one command, resolving normalized coordinates against `viewport`.
pub fn dispatch<C>(command: RemoteCommand, viewport: (f64, f64), controller: &mut C)
where
    C: CursorController + ?Sized,
{
    match command {
        RemoteCommand::SetCursorAbsolute(coords) => {
            let (x, y) = coords.to_pixels(viewport);
            controller.move_absolute(Position::new(x, y));
        }
        RemoteCommand::SetCursorRelative(coords) => {
            let (dx, dy) = coords.to_pixels(viewport);
            controller.move_relative(dx, dy);
        }
        RemoteCommand::TriggerClick => controller.trigger_click(),
        RemoteCommand::EnableControl => controller.set_enabled(true),
        RemoteCommand::DisableControl => controller.set_enabled(false),
    }
}
