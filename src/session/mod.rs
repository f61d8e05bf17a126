//! Fishing session protocol.
//!
//! One session is one WebSocket connection running the timed minigame end
//! to end:
//!
//! `Connecting → Handshaking → AwaitingInit → Running → Ended`, with any
//! transport failure short-circuiting to `Aborted`.
//!
//! - `messages`: tagged-union codec for the JSON frames on the wire
//! - `state`: per-connection mutable record (params + frame sequence)
//! - `physics`: the trajectory/energy simulator
//! - `race`: run two futures, keep the winner, cancel the loser
//! - `transport`: WebSocket connector (with HTTP CONNECT proxying)
//! - `engine`: the state machine tying the above together

pub mod engine;
pub mod messages;
pub mod physics;
pub mod race;
pub mod state;
pub mod transport;

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

pub use engine::{ConnectorLauncher, SessionEngine};
pub use transport::{SessionConnector, SessionTransport, WsConnector};

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Connecting,
    Handshaking,
    AwaitingInit,
    Running,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStage::Connecting => "connecting",
            SessionStage::Handshaking => "handshaking",
            SessionStage::AwaitingInit => "awaiting-init",
            SessionStage::Running => "running",
        };
        f.write_str(s)
    }
}

/// Which side of the running race finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceBranch {
    Simulator,
    Receiver,
}

/// The service's verdict, when it sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOver {
    pub success: bool,
    pub message: Option<String>,
}

/// Terminal state of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    Ended {
        /// `None` when the service closed the game before it started.
        winner: Option<RaceBranch>,
        game_over: Option<GameOver>,
    },
    Aborted {
        stage: SessionStage,
        error: String,
    },
}

/// What happened during one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub end: SessionEnd,
    /// Frames recorded by the simulator.
    pub frames: usize,
    /// Energy the simulator reached, if it ran.
    pub energy: Option<f64>,
}

impl SessionReport {
    pub fn aborted(session_id: Uuid, stage: SessionStage, error: impl fmt::Display) -> Self {
        Self {
            session_id,
            end: SessionEnd::Aborted {
                stage,
                error: error.to_string(),
            },
            frames: 0,
            energy: None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.end, SessionEnd::Aborted { .. })
    }

    /// The service's success flag, if a `gameOver` arrived.
    pub fn game_won(&self) -> Option<bool> {
        match &self.end {
            SessionEnd::Ended { game_over: Some(g), .. } => Some(g.success),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Transport and protocol failures inside a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Invalid session URL: {0}")]
    InvalidUrl(String),

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Simulator start signal dropped")]
    NotReady,
}
