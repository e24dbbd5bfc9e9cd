//! Moderation executor boundary: the interface the resolution path calls,
//! plus the Twitch Helix implementation.
//!
//! The trait keeps the core testable with a mock; the Helix client is the
//! only place that knows Twitch wire details. Failures are real errors
//! here — the caller decides what a failed ban means for local state.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::store::SettingsStore;

const HELIX_BASE: &str = "https://api.twitch.tv/helix";

#[async_trait]
pub trait ChatModerator: Send + Sync {
    async fn ban_user(&self, username: &str, reason: &str) -> Result<()>;
    async fn timeout_user(&self, username: &str, duration_secs: u64, reason: &str) -> Result<()>;
    async fn unban_user(&self, username: &str) -> Result<()>;
}

pub struct HelixClient {
    http: reqwest::Client,
    settings: Arc<SettingsStore>,
    broadcaster_id: Mutex<Option<String>>,
}

#[derive(Deserialize)]
struct UsersResp {
    data: Vec<HelixUser>,
}

#[derive(Deserialize)]
struct HelixUser {
    id: String,
}

impl HelixClient {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            settings,
            broadcaster_id: Mutex::new(None),
        }
    }

    fn credentials(&self) -> Result<(String, String)> {
        let twitch = self.settings.get().twitch;
        if twitch.oauth_token.is_empty() {
            return Err(anyhow!("no Twitch token configured"));
        }
        if twitch.client_id.is_empty() {
            return Err(anyhow!("no Twitch client id configured"));
        }
        Ok((twitch.client_id, twitch.oauth_token))
    }

    async fn lookup_user_id(&self, login: &str) -> Result<String> {
        let (client_id, token) = self.credentials()?;
        let resp: UsersResp = self
            .http
            .get(format!("{HELIX_BASE}/users"))
            .query(&[("login", login)])
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .send()
            .await
            .context("helix user lookup failed")?
            .error_for_status()
            .context("helix user lookup rejected")?
            .json()
            .await
            .context("helix user lookup returned invalid JSON")?;
        resp.data
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| anyhow!("twitch user {login} not found"))
    }

    /// The account executing moderation actions; resolved once and cached.
    async fn broadcaster_id(&self) -> Result<String> {
        if let Some(id) = self
            .broadcaster_id
            .lock()
            .expect("broadcaster mutex poisoned")
            .clone()
        {
            return Ok(id);
        }
        let login = self.settings.get().twitch.username;
        if login.is_empty() {
            return Err(anyhow!("no Twitch username configured"));
        }
        let id = self.lookup_user_id(&login).await?;
        *self
            .broadcaster_id
            .lock()
            .expect("broadcaster mutex poisoned") = Some(id.clone());
        Ok(id)
    }

    async fn post_ban(&self, username: &str, duration: Option<u64>, reason: &str) -> Result<()> {
        let broadcaster = self.broadcaster_id().await?;
        let target = self.lookup_user_id(username).await?;
        let (client_id, token) = self.credentials()?;

        let mut data = serde_json::json!({
            "user_id": target,
            "reason": reason,
        });
        if let Some(secs) = duration {
            data["duration"] = serde_json::json!(secs);
        }

        self.http
            .post(format!("{HELIX_BASE}/moderation/bans"))
            .query(&[
                ("broadcaster_id", broadcaster.as_str()),
                ("moderator_id", broadcaster.as_str()),
            ])
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await
            .context("helix ban request failed")?
            .error_for_status()
            .context("helix ban request rejected")?;
        Ok(())
    }
}

#[async_trait]
impl ChatModerator for HelixClient {
    async fn ban_user(&self, username: &str, reason: &str) -> Result<()> {
        self.post_ban(username, None, reason).await?;
        info!(user = %username, %reason, "banned user");
        Ok(())
    }

    async fn timeout_user(&self, username: &str, duration_secs: u64, reason: &str) -> Result<()> {
        self.post_ban(username, Some(duration_secs), reason).await?;
        info!(user = %username, duration_secs, %reason, "timed out user");
        Ok(())
    }

    async fn unban_user(&self, username: &str) -> Result<()> {
        let broadcaster = self.broadcaster_id().await?;
        let target = self.lookup_user_id(username).await?;
        let (client_id, token) = self.credentials()?;

        self.http
            .delete(format!("{HELIX_BASE}/moderation/bans"))
            .query(&[
                ("broadcaster_id", broadcaster.as_str()),
                ("moderator_id", broadcaster.as_str()),
                ("user_id", target.as_str()),
            ])
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .send()
            .await
            .context("helix unban request failed")?
            .error_for_status()
            .context("helix unban request rejected")?;
        info!(user = %username, "unbanned user");
        Ok(())
    }
}
