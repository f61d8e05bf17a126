//! Fishing minigame simulator.
//!
//! Produces a bounded random target trajectory, a tracker that eases toward
//! it, and an energy meter that fills while the tracker holds the target.
//! It only has to satisfy the shape the service accepts, not model a fish.

use futures::{Sink, SinkExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::messages::{ClientCommand, Frame, Replay};
use super::state::{SessionState, SimulationParams};
use super::SessionError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TRACK_MIN: f64 = 200.0;
pub const TRACK_MAX: f64 = 700.0;
const START_POSITION: f64 = 450.0;
/// Fraction of the tracker→target gap closed each tick.
const EASE_FACTOR: f64 = 0.3;
/// Energy rates are per second; one tick is scaled by this.
const ENERGY_STEP: f64 = 0.05;

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
/// Frames recorded per tick, independent of the real tick rate.
pub const FRAMES_PER_TICK: usize = 4;
/// Frame rate claimed in the replay.
pub const REPORTED_FPS: u32 = 20;

const BASE_DURATION_MS: u64 = 4000;
const DURATION_JITTER_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FishingPhysics {
    fill_rate: f64,
    drain_rate: f64,
    difficulty_rate: f64,
    net_size: f64,
    target: f64,
    tracker: f64,
    energy: f64,
}

impl FishingPhysics {
    pub fn new(params: &SimulationParams) -> Self {
        Self {
            fill_rate: params.fill_rate,
            drain_rate: params.drain_rate,
            difficulty_rate: params.difficulty_rate,
            net_size: f64::from(params.net_size),
            target: START_POSITION,
            tracker: START_POSITION,
            energy: 0.0,
        }
    }

    /// Advance one tick and return the rounded `(tracker, target)` frame.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Frame {
        let jolt = (rng.gen::<f64>() - 0.5) * self.difficulty_rate;
        self.target = (self.target + jolt).clamp(TRACK_MIN, TRACK_MAX);
        self.tracker += (self.target - self.tracker) * EASE_FACTOR;

        if (self.tracker - self.target).abs() < self.net_size / 2.0 {
            self.energy += self.fill_rate * ENERGY_STEP;
        } else {
            self.energy -= self.drain_rate * ENERGY_STEP;
        }
        self.energy = self.energy.clamp(0.0, 1.0);

        Frame::new(self.tracker.round() as i64, self.target.round() as i64)
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn tracker(&self) -> f64 {
        self.tracker
    }

    pub fn is_full(&self) -> bool {
        self.energy >= 1.0
    }
}

/// Randomized wall-clock budget for one game (4–5 s).
pub fn game_duration<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    Duration::from_millis(BASE_DURATION_MS + rng.gen_range(0..=DURATION_JITTER_MS))
}

// ---------------------------------------------------------------------------
// Simulator task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorResult {
    pub ticks: u64,
    pub energy: f64,
    /// Energy reached 1 before the time budget ran out.
    pub filled: bool,
}

/// Tick the physics until the meter fills or time runs out, then send the
/// `end` command with the full replay.
///
/// Does nothing until `ready` fires; a dropped sender means the session
/// never started.
pub async fn run_simulator<W>(
    state: &Mutex<SessionState>,
    outbound: &mut W,
    ready: oneshot::Receiver<()>,
) -> Result<SimulatorResult, SessionError>
where
    W: Sink<String, Error = SessionError> + Unpin + ?Sized,
{
    ready.await.map_err(|_| SessionError::NotReady)?;

    let mut rng = StdRng::from_entropy();
    let mut physics = FishingPhysics::new(&lock(state).params);
    let budget = game_duration(&mut rng);
    let started = tokio::time::Instant::now();
    let mut ticks = 0u64;

    loop {
        let frame = physics.step(&mut rng);
        lock(state).push_tick(frame);
        ticks += 1;

        if physics.is_full() || started.elapsed() >= budget {
            break;
        }
        tokio::time::sleep(TICK_INTERVAL).await;
    }

    let end = {
        let s = lock(state);
        ClientCommand::End {
            transaction_id: s.transaction_id.clone(),
            rep: Replay {
                fs: s.params.fish_size,
                ns: s.params.net_size,
                fps: REPORTED_FPS,
                frs: s.frames().to_vec(),
            },
            en: 1,
        }
    };

    if physics.is_full() {
        info!(ticks, "Energy full, sending end payload");
    } else {
        debug!(ticks, energy = physics.energy(), "Time budget spent, sending end payload");
    }
    outbound.send(end.encode()?).await?;

    Ok(SimulatorResult {
        ticks,
        energy: physics.energy(),
        filled: physics.is_full(),
    })
}

/// Lock the session state; a poisoned lock still holds usable data.
pub(crate) fn lock(state: &Mutex<SessionState>) -> std::sync::MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
