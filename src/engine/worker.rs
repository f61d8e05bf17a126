//! Production per-account worker.
//!
//! Each attempt builds a fresh HTTP client and session connector for the
//! (account, proxy) pairing, then runs one decision cycle.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::orchestrator::AccountWorker;
use super::policy::DecisionPolicy;
use crate::api::frenzy::FrenzyClient;
use crate::config::{AppConfig, EndpointsConfig};
use crate::session::{ConnectorLauncher, SessionEngine, WsConnector};
use crate::types::{Account, ActionOutcome};

pub struct FrenzyWorker {
    endpoints: EndpointsConfig,
    policy: DecisionPolicy,
    sessions: SessionEngine,
}

impl FrenzyWorker {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            endpoints: cfg.endpoints.clone(),
            policy: DecisionPolicy::new(cfg.agent.intensity, cfg.catalog.clone()),
            sessions: SessionEngine::new(cfg.catalog.theme_id.clone()),
        }
    }
}

#[async_trait]
impl AccountWorker for FrenzyWorker {
    async fn work(&self, account: &Account, proxy: Option<&str>) -> Result<ActionOutcome> {
        let api = FrenzyClient::new(&self.endpoints, account, proxy)?;
        let launcher = ConnectorLauncher::new(
            self.sessions.clone(),
            WsConnector::new(&self.endpoints.ws_base, account, proxy),
        );
        self.policy
            .run_cycle(&api, &launcher)
            .await
            .with_context(|| format!("decision cycle for account …{}", account.short_id()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
