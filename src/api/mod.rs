//! Remote service integration.
//!
//! Defines the `GameApi` trait (profile, reward, quest, shop and inventory
//! calls) and the `SessionLauncher` seam the decision policy uses to run a
//! fishing session. Every call is fallible; the policy propagates errors so
//! the orchestrator's retry applies.
//!
//! - `frenzy`: reqwest-backed HTTP implementation, one client per
//!   (account, proxy) pairing.

pub mod frenzy;

use anyhow::Result;
use async_trait::async_trait;

use crate::session::SessionReport;
use crate::types::{Intensity, Inventory, Profile, SocialQuest};

/// Abstraction over the game's REST endpoints for a single account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Fetch the current profile snapshot.
    async fn fetch_profile(&self) -> Result<Profile>;

    async fn complete_tutorial(&self, user_id: &str) -> Result<()>;

    async fn claim_daily_reward(&self) -> Result<()>;

    /// List social quests and their claim status.
    async fn social_quests(&self) -> Result<Vec<SocialQuest>>;

    async fn verify_quest(&self, quest_id: &str) -> Result<()>;

    /// Buy one unit of a shop item.
    async fn buy_item(&self, item_id: &str, user_id: &str) -> Result<()>;

    /// Consume one unit of an owned item.
    async fn use_item(&self, item_id: &str, user_id: &str) -> Result<()>;

    async fn inventory(&self) -> Result<Inventory>;
}

/// Opens and runs one fishing session to completion.
///
/// Never fails outright: transport problems come back as an aborted
/// [`SessionReport`] which the caller decides how to treat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, intensity: Intensity) -> SessionReport;
}
