//! Mock game service for integration testing.
//!
//! Provides a deterministic `GameApi` implementation that keeps one
//! account's profile in memory and mutates it the way the real service
//! does, so consecutive rounds walk the decision tree.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use angler::api::GameApi;
use angler::types::*;

/// Gold an EXP scroll costs.
pub const SCROLL_PRICE: f64 = 1000.0;

/// A mock game account. Clones share state.
#[derive(Clone)]
pub struct MockGame {
    profile: Arc<Mutex<Profile>>,
    quests: Arc<Mutex<Vec<SocialQuest>>>,
    inventory: Arc<Mutex<Vec<InventoryItem>>>,
    /// Every call, in order.
    calls: Arc<Mutex<Vec<String>>>,
    /// Remaining `fetch_profile` calls that fail.
    profile_failures: Arc<Mutex<usize>>,
    /// If set, all operations will return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockGame {
    /// A brand-new account: tutorial pending, reward unclaimed.
    pub fn fresh(id: &str) -> Self {
        Self::with_profile(Profile {
            id: id.to_string(),
            level: 1,
            exp: 0.0,
            gold: 2500.0,
            energy: 5.0,
            completed_tutorial: false,
            claimed_daily_reward: false,
        })
    }

    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile: Arc::new(Mutex::new(profile)),
            quests: Arc::new(Mutex::new(vec![
                SocialQuest { id: "q-follow".into(), status: QUEST_UNCLAIMED.into() },
                SocialQuest { id: "q-retweet".into(), status: "Claimed".into() },
                SocialQuest { id: "670f3c40193d51c460247623".into(), status: QUEST_UNCLAIMED.into() },
            ])),
            inventory: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            profile_failures: Arc::new(Mutex::new(0)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Make the next `n` profile fetches fail.
    pub fn fail_profile(&self, n: usize) {
        *self.profile_failures.lock().unwrap() = n;
    }

    /// Force all subsequent operations to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn add_item(&self, id: &str, name: &str) {
        self.inventory.lock().unwrap().push(InventoryItem {
            id: id.into(),
            name: name.into(),
        });
    }

    pub fn profile(&self) -> Profile {
        self.profile.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(call)).count()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.force_error.lock().unwrap().as_ref() {
            Some(msg) => Err(anyhow!(FrenzyError::Api {
                endpoint: "mock".into(),
                message: msg.clone(),
            })),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GameApi for MockGame {
    async fn fetch_profile(&self) -> Result<Profile> {
        self.record("fetch_profile".into())?;
        let mut failures = self.profile_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(anyhow!("HTTP 503: upstream unavailable"));
        }
        Ok(self.profile())
    }

    async fn complete_tutorial(&self, user_id: &str) -> Result<()> {
        self.record(format!("complete_tutorial:{user_id}"))?;
        self.profile.lock().unwrap().completed_tutorial = true;
        Ok(())
    }

    async fn claim_daily_reward(&self) -> Result<()> {
        self.record("claim_daily_reward".into())?;
        self.profile.lock().unwrap().claimed_daily_reward = true;
        Ok(())
    }

    async fn social_quests(&self) -> Result<Vec<SocialQuest>> {
        self.record("social_quests".into())?;
        Ok(self.quests.lock().unwrap().clone())
    }

    async fn verify_quest(&self, quest_id: &str) -> Result<()> {
        self.record(format!("verify_quest:{quest_id}"))?;
        for quest in self.quests.lock().unwrap().iter_mut() {
            if quest.id == quest_id {
                quest.status = "Claimed".into();
            }
        }
        Ok(())
    }

    async fn buy_item(&self, item_id: &str, _user_id: &str) -> Result<()> {
        self.record(format!("buy_item:{item_id}"))?;
        let mut profile = self.profile.lock().unwrap();
        if profile.gold < SCROLL_PRICE {
            return Err(anyhow!("not enough gold"));
        }
        profile.gold -= SCROLL_PRICE;
        Ok(())
    }

    async fn use_item(&self, item_id: &str, _user_id: &str) -> Result<()> {
        self.record(format!("use_item:{item_id}"))?;
        let mut inventory = self.inventory.lock().unwrap();
        if let Some(pos) = inventory.iter().position(|i| i.id == item_id) {
            inventory.remove(pos);
            self.profile.lock().unwrap().energy += 5.0;
        }
        Ok(())
    }

    async fn inventory(&self) -> Result<Inventory> {
        self.record("inventory".into())?;
        Ok(Inventory {
            list_item_info: self.inventory.lock().unwrap().clone(),
        })
    }
}
