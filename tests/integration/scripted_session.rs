//! Scripted game server on an in-memory transport.
//!
//! Answers `prepare` with `initGame` and then behaves according to a
//! [`Script`]. Every command is recorded on the session's side of the
//! channel as it is sent, so the log is complete once the session returns.

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use angler::session::transport::{memory_pair, MemoryPeer};
use angler::session::{SessionConnector, SessionTransport};
use angler::session::SessionError;

pub const INIT_GAME: &str = r#"{"type":"initGame","data":{"transactionId":"tx-e2e","randomFish":{"fishName":"Golden Carp","fillRate":0.2,"drainRate":0.05,"difficultyRate":11}}}"#;

#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Never reports; the simulator finishes the game.
    Quiet,
    /// Stream a few `gameState` updates, then `gameOver` after `after`.
    GameOver { after: Duration, success: bool },
    /// Hang up right after `prepare`.
    HangUpBeforeInit,
}

pub struct ScriptedConnector {
    script: Script,
    /// Connection attempts that are refused before one succeeds.
    refuse_first: usize,
    connects: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<Value>>>,
}

impl ScriptedConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            refuse_first: 0,
            connects: Arc::new(AtomicUsize::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Share connection counting and command log with other connectors.
    pub fn shared(script: Script, connects: Arc<AtomicUsize>, commands: Arc<Mutex<Vec<Value>>>) -> Self {
        Self {
            script,
            refuse_first: 0,
            connects,
            commands,
        }
    }

    pub fn refusing_first(mut self, n: usize) -> Self {
        self.refuse_first = n;
        self
    }

    /// Command names sent so far, in order.
    pub fn command_names(&self) -> Vec<String> {
        command_names(&self.commands)
    }
}

pub fn command_names(commands: &Mutex<Vec<Value>>) -> Vec<String> {
    commands
        .lock()
        .unwrap()
        .iter()
        .map(|c| c["cmd"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[async_trait]
impl SessionConnector for ScriptedConnector {
    async fn connect(&self) -> Result<SessionTransport, SessionError> {
        let attempt = self.connects.fetch_add(1, Ordering::SeqCst);
        if attempt < self.refuse_first {
            return Err(SessionError::Closed("connection refused".into()));
        }
        let (SessionTransport { outbound, inbound }, peer) = memory_pair();
        let commands = Arc::clone(&self.commands);
        let outbound = outbound.with(move |text: String| {
            let command: Value = serde_json::from_str(&text).unwrap_or_default();
            commands.lock().unwrap().push(command);
            future::ready(Ok::<_, SessionError>(text))
        });
        tokio::spawn(serve(self.script, peer));
        Ok(SessionTransport::new(outbound, inbound))
    }
}

async fn serve(script: Script, mut peer: MemoryPeer) {
    while let Some(text) = peer.sent.next().await {
        let command: Value = serde_json::from_str(&text).unwrap_or_default();
        let name = command["cmd"].as_str().unwrap_or_default().to_string();

        match (name.as_str(), script) {
            ("prepare", Script::HangUpBeforeInit) => return,
            ("prepare", _) => peer.push(INIT_GAME),
            ("start", Script::GameOver { after, success }) => {
                for frame in 1..=3 {
                    tokio::time::sleep(after / 4).await;
                    peer.push(format!(r#"{{"type":"gameState","frame":{frame},"dir":1}}"#));
                }
                tokio::time::sleep(after / 4).await;
                peer.push(format!(r#"{{"type":"gameOver","success":{success}}}"#));
            }
            _ => {}
        }
    }
}
