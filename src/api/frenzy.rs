//! Fishing Frenzy REST integration.
//!
//! Base URL: https://api.fishingfrenzy.co/v1 (configurable)
//! Auth: `Authorization: Bearer {token}` on every call.
//! Proxy: optional, applied to the whole client, so one client is built
//! per (account, proxy) pairing for the lifetime of a task attempt.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::GameApi;
use crate::config::EndpointsConfig;
use crate::types::{Account, FrenzyError, Inventory, Profile, SocialQuest};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client bound to one account and (optionally) one proxy.
pub struct FrenzyClient {
    http: Client,
    base: String,
    origin: String,
    token: SecretString,
}

impl FrenzyClient {
    pub fn new(endpoints: &EndpointsConfig, account: &Account, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|_| FrenzyError::InvalidProxy(proxy.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .context("Failed to build HTTP client for Fishing Frenzy")?;

        Ok(Self {
            http,
            base: endpoints.api_base.trim_end_matches('/').to_string(),
            origin: endpoints.origin.clone(),
            token: SecretString::new(account.token().to_string()),
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .bearer_auth(self.token.expose_secret())
    }

    /// POST with an empty JSON object, as the web client does.
    fn post_empty(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .header("origin", &self.origin)
            .json(&serde_json::json!({}))
    }

    /// Send a request and turn transport failures and non-2xx statuses
    /// into `FrenzyError::Api`.
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        let endpoint = endpoint_label(path);
        debug!(endpoint = %endpoint, "Calling Fishing Frenzy API");

        let resp = request.send().await.map_err(|e| FrenzyError::Api {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FrenzyError::Api {
                endpoint,
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.send(self.get(path), path).await?;
        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", endpoint_label(path)))
    }
}

/// Path without its query string, for logs and errors.
fn endpoint_label(path: &str) -> String {
    path.split('?').next().unwrap_or(path).to_string()
}

// ---------------------------------------------------------------------------
// GameApi trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl GameApi for FrenzyClient {
    async fn fetch_profile(&self) -> Result<Profile> {
        self.get_json("users/me").await
    }

    async fn complete_tutorial(&self, user_id: &str) -> Result<()> {
        let path = format!("users/{user_id}/complete-tutorial");
        self.send(self.post_empty(&path), &path).await?;
        Ok(())
    }

    async fn claim_daily_reward(&self) -> Result<()> {
        let path = "daily-rewards/claim";
        self.send(self.get(path), path).await?;
        Ok(())
    }

    async fn social_quests(&self) -> Result<Vec<SocialQuest>> {
        self.get_json("social-quests/").await
    }

    async fn verify_quest(&self, quest_id: &str) -> Result<()> {
        let path = format!("social-quests/{quest_id}/verify");
        self.send(self.post_empty(&path), &path).await?;
        Ok(())
    }

    async fn buy_item(&self, item_id: &str, user_id: &str) -> Result<()> {
        let path = format!(
            "items/{item_id}/buy?userId={}&quantity=1",
            urlencoding::encode(user_id)
        );
        self.send(self.get(&path), &path).await?;
        Ok(())
    }

    async fn use_item(&self, item_id: &str, user_id: &str) -> Result<()> {
        let path = format!("items/{item_id}/use?userId={}", urlencoding::encode(user_id));
        self.send(self.get(&path), &path).await?;
        Ok(())
    }

    async fn inventory(&self) -> Result<Inventory> {
        self.get_json("inventory").await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
