//! JSON messages exchanged over the bridge socket.
//!
//! Every message is an object with a `type` discriminator. The study client
//! sends [`ClientMessage`]s; the controlling peer answers with
//! [`ServerMessage`]s.

use fitts_core::Position;
use serde::{Deserialize, Serialize};

pub const CLIENT_NAME: &str = "WebFitts";
pub const PROTOCOL_VERSION: &str = "1.0";

/// Milliseconds since the Unix epoch.
pub fn timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Handshake {
        client: String,
        version: String,
        timestamp: i64,
    },
    Pong {
        timestamp: i64,
    },
    StudyData(StudyData),
    StudyEvent {
        event: StudyEventKind,
        timestamp: i64,
        #[serde(default)]
        data: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn handshake() -> Self {
        Self::Handshake {
            client: CLIENT_NAME.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            timestamp: timestamp(),
        }
    }

    pub fn pong() -> Self {
        Self::Pong {
            timestamp: timestamp(),
        }
    }

    pub fn event(event: StudyEventKind, data: serde_json::Value) -> Self {
        Self::StudyEvent {
            event,
            timestamp: timestamp(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Command {
        command: String,
        #[serde(default)]
        data: Option<CommandData>,
    },
    Ping,
    HandshakeAck {
        #[serde(default)]
        status: String,
        #[serde(default)]
        server: String,
    },
    #[serde(other)]
    Unknown,
}

/// Loose command arguments; which fields matter depends on the command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandData {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub nx: Option<f64>,
    pub ny: Option<f64>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub ndx: Option<f64>,
    pub ndy: Option<f64>,
}

/// A pair either in pixels or as a fraction of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coords {
    Pixels(f64, f64),
    Normalized(f64, f64),
}

impl Coords {
    /// Normalized values take precedence when both forms are present.
    fn pick(pixels: (Option<f64>, Option<f64>), normalized: (Option<f64>, Option<f64>)) -> Option<Self> {
        match (normalized, pixels) {
            ((Some(x), Some(y)), _) => Some(Self::Normalized(x, y)),
            (_, (Some(x), Some(y))) => Some(Self::Pixels(x, y)),
            _ => None,
        }
    }

    pub fn to_pixels(self, viewport: (f64, f64)) -> (f64, f64) {
        match self {
            Self::Pixels(x, y) => (x, y),
            Self::Normalized(x, y) => (x * viewport.0, y * viewport.1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    SetCursorAbsolute(Coords),
    SetCursorRelative(Coords),
    TriggerClick,
    EnableControl,
    DisableControl,
}

impl RemoteCommand {
    /// Interprets a `command` message. Unknown names and cursor commands
    /// without a usable coordinate pair yield `None`.
    pub fn parse(command: &str, data: Option<&CommandData>) -> Option<Self> {
        let empty = CommandData::default();
        let d = data.unwrap_or(&empty);
        match command {
            "set_cursor_absolute" => {
                Coords::pick((d.x, d.y), (d.nx, d.ny)).map(Self::SetCursorAbsolute)
            }
            "set_cursor_relative" => {
                Coords::pick((d.dx, d.dy), (d.ndx, d.ndy)).map(Self::SetCursorRelative)
            }
            "trigger_click" => Some(Self::TriggerClick),
            "enable_control" => Some(Self::EnableControl),
            "disable_control" => Some(Self::DisableControl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyEventKind {
    StudyStart,
    TaskStart,
    Click,
    TaskEnd,
    StudyEnd,
}

/// Per-frame telemetry while a task is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyData {
    pub timestamp: i64,
    pub cursor: Position,
    pub target: Position,
    pub movement: Movement,
    pub required: Required,
    pub task: TaskInfo,
    pub canvas: Canvas,
}

/// Cursor displacement since the previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub vector: Position,
    pub normalized: Position,
    pub speed: f64,
}

/// Displacement still needed to reach the target center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Required {
    pub vector: Position,
    pub normalized: Position,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub index: usize,
    pub click_number: usize,
    pub amplitude: f64,
    pub width: f64,
    pub num_targets: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}
