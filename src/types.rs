//! Shared types for the ANGLER runner.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that api, session, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One game account, identified by its bearer token.
///
/// The token is kept behind `secrecy` so it never leaks through `Debug`.
#[derive(Clone)]
pub struct Account {
    token: SecretString,
}

impl Account {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Log-safe identifier: the last four characters of the token.
    pub fn short_id(&self) -> String {
        tail(self.token.expose_secret(), 4)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account(…{})", self.short_id())
    }
}

/// Last `n` characters of `s` (the whole string if shorter).
pub fn tail(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

// ---------------------------------------------------------------------------
// Profile & catalog responses
// ---------------------------------------------------------------------------

/// Snapshot of `/users/me`. Refreshed every decision cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub exp: f64,
    #[serde(default)]
    pub gold: f64,
    #[serde(default)]
    pub energy: f64,
    #[serde(default, rename = "isCompleteTutorial")]
    pub completed_tutorial: bool,
    #[serde(default, rename = "isClaimedDailyReward")]
    pub claimed_daily_reward: bool,
}

impl Profile {
    /// Log-safe identifier: the last six characters of the user id.
    pub fn short_id(&self) -> String {
        tail(&self.id, 6)
    }
}

/// Status string the service uses for quests that can still be verified.
pub const QUEST_UNCLAIMED: &str = "UnClaimed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialQuest {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

impl SocialQuest {
    pub fn is_unclaimed(&self) -> bool {
        self.status == QUEST_UNCLAIMED
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Inventory {
    #[serde(default)]
    pub list_item_info: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Intensity
// ---------------------------------------------------------------------------

/// Configured fishing range. Selects the session range and its energy cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Intensity {
    Short,
    Mid,
    Long,
}

impl Intensity {
    /// Energy a session at this range consumes.
    pub fn energy_cost(self) -> f64 {
        match self {
            Intensity::Short => 1.0,
            Intensity::Mid => 2.0,
            Intensity::Long => 3.0,
        }
    }

    /// Range selector sent in the `prepare` message.
    pub fn range(self) -> &'static str {
        match self {
            Intensity::Short => "short_range",
            Intensity::Mid => "mid_range",
            Intensity::Long => "long_range",
        }
    }
}

impl TryFrom<u8> for Intensity {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Intensity::Short),
            2 => Ok(Intensity::Mid),
            3 => Ok(Intensity::Long),
            other => Err(format!("intensity must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Intensity> for u8 {
    fn from(i: Intensity) -> u8 {
        match i {
            Intensity::Short => 1,
            Intensity::Mid => 2,
            Intensity::Long => 3,
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.range())
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// The branch the decision policy selected for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CompleteTutorial,
    ClaimDailyReward,
    BuyExpScroll,
    Fish,
    RestoreEnergy,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::CompleteTutorial => "complete-tutorial",
            Action::ClaimDailyReward => "claim-daily-reward",
            Action::BuyExpScroll => "buy-exp-scroll",
            Action::Fish => "fish",
            Action::RestoreEnergy => "restore-energy",
        };
        f.write_str(s)
    }
}

/// What executing the selected action actually did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    TutorialCompleted,
    RewardClaimed { quests_verified: usize },
    ScrollUsed,
    Fished { game_won: Option<bool>, frames: usize },
    RecoveryItemUsed { name: String },
    /// Energy too low and nothing in the inventory to restore it.
    NoRecoveryItem,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::TutorialCompleted => write!(f, "tutorial completed"),
            ActionOutcome::RewardClaimed { quests_verified } => {
                write!(f, "daily reward claimed, {quests_verified} quests verified")
            }
            ActionOutcome::ScrollUsed => write!(f, "exp scroll bought and used"),
            ActionOutcome::Fished { game_won, frames } => match game_won {
                Some(true) => write!(f, "fished ({frames} frames, won)"),
                Some(false) => write!(f, "fished ({frames} frames, lost)"),
                None => write!(f, "fished ({frames} frames)"),
            },
            ActionOutcome::RecoveryItemUsed { name } => write!(f, "used recovery item '{name}'"),
            ActionOutcome::NoRecoveryItem => write!(f, "no energy and empty inventory"),
        }
    }
}

// ---------------------------------------------------------------------------
// Task & round reporting
// ---------------------------------------------------------------------------

/// Result of one account's task within a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutcome {
    pub account: String,
    pub attempts: u32,
    pub succeeded: bool,
    /// Outcome description on success, last error on failure.
    pub detail: String,
}

/// Summary of one full pass over all accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<TaskOutcome>,
}

impl RoundReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Wall-clock length of the round in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for ANGLER.
#[derive(Debug, thiserror::Error)]
pub enum FrenzyError {
    #[error("API error ({endpoint}): {message}")]
    Api { endpoint: String, message: String },

    #[error("Session aborted during {stage}: {message}")]
    SessionAborted { stage: String, message: String },

    #[error("Invalid proxy '{0}'")]
    InvalidProxy(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
