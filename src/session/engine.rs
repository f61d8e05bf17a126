//! Session state machine.
//!
//! Drives one connection through handshake and init, then races the
//! physics simulator against the receive loop. Whatever happens, the
//! caller gets a [`SessionReport`]; transport failures never escape as
//! errors.

use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::messages::{self, ClientCommand, InitData, ServerMessage};
use super::physics::{lock, run_simulator, SimulatorResult};
use super::race::{race, RaceWinner};
use super::state::SessionState;
use super::transport::{Inbound, Outbound, SessionConnector, SessionTransport};
use super::{GameOver, RaceBranch, SessionEnd, SessionError, SessionReport, SessionStage};
use crate::api::SessionLauncher;
use crate::types::Intensity;

/// Pause between receiving `initGame` and sending `start`.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionEngine {
    theme_id: String,
}

/// How the receive loop stopped.
enum ReceiverEnd {
    GameOver(GameOver),
    Closed,
    Failed(SessionError),
}

impl SessionEngine {
    pub fn new(theme_id: impl Into<String>) -> Self {
        Self {
            theme_id: theme_id.into(),
        }
    }

    /// Connect and run one session end to end.
    pub async fn run(&self, connector: &dyn SessionConnector, intensity: Intensity) -> SessionReport {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("session", id = %session_id, range = %intensity);

        async {
            match connector.connect().await {
                Ok(transport) => self.drive(session_id, transport, intensity).await,
                Err(e) => {
                    warn!(error = %e, "Session connection failed");
                    SessionReport::aborted(session_id, SessionStage::Connecting, e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run a session over an already-open transport, then close it.
    pub async fn drive(
        &self,
        session_id: Uuid,
        transport: SessionTransport,
        intensity: Intensity,
    ) -> SessionReport {
        let SessionTransport {
            mut outbound,
            mut inbound,
        } = transport;

        let report = self
            .exchange(session_id, &mut outbound, &mut inbound, intensity)
            .await;

        if let Err(e) = outbound.close().await {
            debug!(error = %e, "Close after session failed");
        }

        match &report.end {
            SessionEnd::Aborted { stage, error } => {
                warn!(stage = %stage, error = %error, "Session aborted");
            }
            SessionEnd::Ended { winner, game_over } => {
                info!(
                    winner = ?winner,
                    success = ?game_over.as_ref().map(|g| g.success),
                    frames = report.frames,
                    "Session ended"
                );
            }
        }
        report
    }

    async fn exchange(
        &self,
        session_id: Uuid,
        outbound: &mut Outbound,
        inbound: &mut Inbound,
        intensity: Intensity,
    ) -> SessionReport {
        // -- Handshaking -------------------------------------------------
        let fingerprint = messages::fingerprint(&mut StdRng::from_entropy());
        let prepare = ClientCommand::prepare(intensity.range(), &self.theme_id, fingerprint);
        if let Err(e) = send(outbound, &prepare).await {
            return SessionReport::aborted(session_id, SessionStage::Handshaking, e);
        }

        // -- Awaiting init -----------------------------------------------
        let init = match await_init(inbound).await {
            Ok(Ok(init)) => init,
            Ok(Err(game_over)) => {
                info!(success = game_over.success, message = ?game_over.message, "Game closed before start");
                return SessionReport {
                    session_id,
                    end: SessionEnd::Ended { winner: None, game_over: Some(game_over) },
                    frames: 0,
                    energy: None,
                };
            }
            Err(e) => return SessionReport::aborted(session_id, SessionStage::AwaitingInit, e),
        };

        let state = SessionState::from_init(&init);
        debug!(
            fish = ?state.params.fish_name,
            fill = state.params.fill_rate,
            drain = state.params.drain_rate,
            difficulty = state.params.difficulty_rate,
            "Game initialised"
        );
        let state = Mutex::new(state);

        tokio::time::sleep(SETTLE_DELAY).await;
        if let Err(e) = send(outbound, &ClientCommand::Start).await {
            return SessionReport::aborted(session_id, SessionStage::AwaitingInit, e);
        }
        info!("Casting line");

        let (ready_tx, ready_rx) = oneshot::channel();
        // The receiver half is alive until the race below drops it.
        let _ = ready_tx.send(());

        // -- Running -----------------------------------------------------
        let outcome = race(
            run_simulator(&state, outbound, ready_rx),
            receive_loop(&state, inbound),
        )
        .await;

        let frames = lock(&state).frames().len();
        let mut energy = None;
        let end = match outcome {
            RaceWinner::First(Ok(SimulatorResult { energy: reached, .. })) => {
                energy = Some(reached);
                SessionEnd::Ended { winner: Some(RaceBranch::Simulator), game_over: None }
            }
            RaceWinner::First(Err(e)) => SessionEnd::Aborted {
                stage: SessionStage::Running,
                error: e.to_string(),
            },
            RaceWinner::Second(ReceiverEnd::GameOver(game_over)) => SessionEnd::Ended {
                winner: Some(RaceBranch::Receiver),
                game_over: Some(game_over),
            },
            RaceWinner::Second(ReceiverEnd::Closed) => {
                info!("Service closed the connection during the game");
                SessionEnd::Ended { winner: Some(RaceBranch::Receiver), game_over: None }
            }
            RaceWinner::Second(ReceiverEnd::Failed(e)) => SessionEnd::Aborted {
                stage: SessionStage::Running,
                error: e.to_string(),
            },
        };

        SessionReport {
            session_id,
            end,
            frames,
            energy,
        }
    }
}

async fn send(outbound: &mut Outbound, command: &ClientCommand) -> Result<(), SessionError> {
    outbound.send(command.encode()?).await
}

/// Wait for `initGame`. A `gameOver` first means the service refused the
/// game; anything else is skipped.
async fn await_init<R>(inbound: &mut R) -> Result<Result<InitData, GameOver>, SessionError>
where
    R: Stream<Item = Result<String, SessionError>> + Unpin + ?Sized,
{
    while let Some(text) = inbound.next().await {
        match messages::decode(&text?) {
            Ok(ServerMessage::InitGame { data }) => return Ok(Ok(data)),
            Ok(ServerMessage::GameOver { success, message }) => {
                return Ok(Err(GameOver { success, message }))
            }
            Ok(other) => debug!(message = ?other, "Skipping message before init"),
            Err(e) => warn!(error = %e, "Malformed session message"),
        }
    }
    Err(SessionError::Closed("connection closed before init".into()))
}

/// Apply inbound updates to the session until the game ends or the
/// connection does.
async fn receive_loop<R>(state: &Mutex<SessionState>, inbound: &mut R) -> ReceiverEnd
where
    R: Stream<Item = Result<String, SessionError>> + Unpin + ?Sized,
{
    while let Some(next) = inbound.next().await {
        let text = match next {
            Ok(text) => text,
            Err(e) => return ReceiverEnd::Failed(e),
        };
        match messages::decode(&text) {
            Ok(ServerMessage::GameState { frame, dir }) => {
                if lock(state).attach_report(frame, dir) {
                    debug!(frame = ?frame, dir, "Attached frame report");
                }
            }
            Ok(ServerMessage::GameOver { success, message }) => {
                if success {
                    info!(message = ?message, "Game over: success");
                } else {
                    warn!(message = ?message, "Game over: failed");
                }
                return ReceiverEnd::GameOver(GameOver { success, message });
            }
            Ok(ServerMessage::InitGame { .. }) => debug!("Duplicate initGame ignored"),
            Ok(ServerMessage::Ignored) => debug!("Unrecognised message ignored"),
            Err(e) => warn!(error = %e, "Malformed session message"),
        }
    }
    ReceiverEnd::Closed
}

// ---------------------------------------------------------------------------
// Launcher
// ---------------------------------------------------------------------------

/// [`SessionLauncher`] that opens sessions through a connector.
pub struct ConnectorLauncher<C> {
    engine: SessionEngine,
    connector: C,
}

impl<C: SessionConnector> ConnectorLauncher<C> {
    pub fn new(engine: SessionEngine, connector: C) -> Self {
        Self { engine, connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

#[async_trait]
impl<C: SessionConnector> SessionLauncher for ConnectorLauncher<C> {
    async fn launch(&self, intensity: Intensity) -> SessionReport {
        self.engine.run(&self.connector, intensity).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
