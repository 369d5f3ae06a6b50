pub mod client;
pub mod cursor;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tracker;

pub use client::{BridgeChannels, CONNECT_TIMEOUT, run_bridge, websocket_url};
pub use cursor::{CursorController, NoopCursorController, dispatch};
pub use error::TransportError;
pub use protocol::{
    Canvas, ClientMessage, Coords, RemoteCommand, ServerMessage, StudyData, StudyEventKind,
    TaskInfo,
};
pub use server::{DEFAULT_LISTEN_ADDR, listen};
pub use tracker::{FrameSnapshot, StudyDataTracker};
