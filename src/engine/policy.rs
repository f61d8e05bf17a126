//! Per-account decision policy.
//!
//! Picks exactly one action per cycle from the freshly fetched profile, in
//! strict priority order:
//!
//! 1. tutorial incomplete → complete it
//! 2. daily reward unclaimed → claim it, then verify claimable social quests
//! 3. gold above threshold → buy and use an EXP scroll
//! 4. otherwise fish if energy covers the range, else burn a recovery item
//!
//! Stateless between cycles. Remote failures propagate to the caller's
//! retry; an aborted session counts as a failure too.

use anyhow::Result;
use tracing::{info, warn};

use crate::api::{GameApi, SessionLauncher};
use crate::config::CatalogConfig;
use crate::session::SessionEnd;
use crate::types::{Action, ActionOutcome, FrenzyError, Intensity, Profile};

#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    intensity: Intensity,
    catalog: CatalogConfig,
}

impl DecisionPolicy {
    pub fn new(intensity: Intensity, catalog: CatalogConfig) -> Self {
        Self { intensity, catalog }
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    /// Select the branch for this profile. First match wins.
    pub fn select(&self, profile: &Profile) -> Action {
        if !profile.completed_tutorial {
            Action::CompleteTutorial
        } else if !profile.claimed_daily_reward {
            Action::ClaimDailyReward
        } else if profile.gold > self.catalog.gold_threshold {
            Action::BuyExpScroll
        } else if profile.energy >= self.intensity.energy_cost() {
            Action::Fish
        } else {
            Action::RestoreEnergy
        }
    }

    /// Fetch the profile, then select and execute one action.
    pub async fn run_cycle(
        &self,
        api: &dyn GameApi,
        sessions: &dyn SessionLauncher,
    ) -> Result<ActionOutcome> {
        let profile = api.fetch_profile().await?;
        info!(
            user = %profile.short_id(),
            level = profile.level,
            exp = profile.exp,
            gold = profile.gold,
            energy = profile.energy,
            "Profile fetched"
        );
        self.execute(&profile, api, sessions).await
    }

    /// Execute the selected action against the remote service.
    pub async fn execute(
        &self,
        profile: &Profile,
        api: &dyn GameApi,
        sessions: &dyn SessionLauncher,
    ) -> Result<ActionOutcome> {
        let user = profile.short_id();
        let action = self.select(profile);
        info!(user = %user, action = %action, "Action selected");

        match action {
            Action::CompleteTutorial => {
                api.complete_tutorial(&profile.id).await?;
                Ok(ActionOutcome::TutorialCompleted)
            }
            Action::ClaimDailyReward => {
                api.claim_daily_reward().await?;
                let quests = api.social_quests().await?;
                let mut verified = 0;
                for quest in quests.iter().filter(|q| q.is_unclaimed()) {
                    if self.catalog.is_excluded_quest(&quest.id) {
                        continue;
                    }
                    info!(user = %user, quest = %quest.id, "Verifying social quest");
                    api.verify_quest(&quest.id).await?;
                    verified += 1;
                }
                Ok(ActionOutcome::RewardClaimed { quests_verified: verified })
            }
            Action::BuyExpScroll => {
                let item = &self.catalog.exp_scroll_item_id;
                api.buy_item(item, &profile.id).await?;
                info!(user = %user, item = %item, "Purchase succeeded, using item");
                api.use_item(item, &profile.id).await?;
                Ok(ActionOutcome::ScrollUsed)
            }
            Action::Fish => {
                let report = sessions.launch(self.intensity).await;
                match report.end {
                    SessionEnd::Aborted { stage, error } => Err(FrenzyError::SessionAborted {
                        stage: stage.to_string(),
                        message: error,
                    }
                    .into()),
                    SessionEnd::Ended { game_over, .. } => Ok(ActionOutcome::Fished {
                        game_won: game_over.map(|g| g.success),
                        frames: report.frames,
                    }),
                }
            }
            Action::RestoreEnergy => {
                let inventory = api.inventory().await?;
                match inventory.list_item_info.first() {
                    Some(item) => {
                        info!(user = %user, item = %item.name, "Energy low, using inventory item");
                        api.use_item(&item.id, &profile.id).await?;
                        Ok(ActionOutcome::RecoveryItemUsed { name: item.name.clone() })
                    }
                    None => {
                        warn!(user = %user, energy = profile.energy, "Energy low and inventory empty");
                        Ok(ActionOutcome::NoRecoveryItem)
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
