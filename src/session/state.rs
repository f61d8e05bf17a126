//! Per-connection session state.

use serde_json::Value;

use super::messages::{FishData, Frame, FrameReport, InitData};
use super::physics::FRAMES_PER_TICK;

const DEFAULT_FILL_RATE: f64 = 0.2;
const DEFAULT_DRAIN_RATE: f64 = 0.05;
const DEFAULT_DIFFICULTY_RATE: f64 = 11.0;
/// Fish sprite height reported in the replay.
const FISH_SIZE: u32 = 100;
/// Net height; the tracker "holds" the fish within half of it.
const NET_SIZE: u32 = 200;

/// Fish simulation parameters from `initGame`, with service defaults for
/// anything missing.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub fish_name: Option<String>,
    pub fill_rate: f64,
    pub drain_rate: f64,
    pub difficulty_rate: f64,
    pub fish_size: u32,
    pub net_size: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self::from_fish(&FishData::default())
    }
}

impl SimulationParams {
    pub fn from_fish(fish: &FishData) -> Self {
        Self {
            fish_name: fish.fish_name.clone(),
            fill_rate: fish.fill_rate.unwrap_or(DEFAULT_FILL_RATE),
            drain_rate: fish.drain_rate.unwrap_or(DEFAULT_DRAIN_RATE),
            difficulty_rate: fish.difficulty_rate.unwrap_or(DEFAULT_DIFFICULTY_RATE),
            fish_size: FISH_SIZE,
            net_size: NET_SIZE,
        }
    }
}

/// Mutable record owned by exactly one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub transaction_id: Value,
    pub params: SimulationParams,
    frames: Vec<Frame>,
}

impl SessionState {
    pub fn from_init(init: &InitData) -> Self {
        Self {
            transaction_id: init.transaction_id.clone(),
            params: SimulationParams::from_fish(&init.random_fish),
            frames: Vec::new(),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Record one simulator tick, oversampled to the service's frame density.
    pub fn push_tick(&mut self, frame: Frame) {
        self.frames
            .extend(std::iter::repeat(frame).take(FRAMES_PER_TICK));
    }

    /// Attach a service-reported `(frame, dir)` pair to the latest frame.
    ///
    /// Only a non-zero direction counts, and only a latest frame that still
    /// has two fields is eligible. Returns whether anything was attached.
    pub fn attach_report(&mut self, frame: Option<i64>, dir: i64) -> bool {
        if dir == 0 {
            return false;
        }
        match self.frames.last_mut() {
            Some(last) if last.report.is_none() => {
                last.report = Some(FrameReport { frame, dir });
                true
            }
            _ => false,
        }
    }
}
