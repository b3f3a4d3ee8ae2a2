//! REST client envelope.
//!
//! Walks raw REST documents page by page through one octocrab client
//! holding one pooled token. Before every page step the remaining
//! request budget is checked and the token rotated at the low-water
//! mark; rate-limit errors rotate and retry the single failed step.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde_json::Value;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::github::MIN_REMAINING_BUDGET;
use crate::github::error::ApiRetryableError;
use crate::github::token_pool::TokenPool;
use crate::types::{GithubApiKind, RepositoryId};

/// REST page size used by every enumeration.
pub const PAGE_SIZE: usize = 100;

pub struct RestWrapper {
    token_pool: Arc<TokenPool>,
    repository_id: RepositoryId,
    client: Option<Octocrab>,
    token: String,
    /// Reset instant reported by the last budget check, used as the
    /// quarantine deadline when the token is rotated out.
    last_known_reset: Option<DateTime<Utc>>,
}

impl RestWrapper {
    pub fn new(token_pool: Arc<TokenPool>, repository_id: RepositoryId) -> Self {
        Self {
            token_pool,
            repository_id,
            client: None,
            token: String::new(),
            last_known_reset: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.client.is_some()
    }

    pub fn repository_id(&self) -> &RepositoryId {
        &self.repository_id
    }

    pub async fn start(&mut self) -> Result<()> {
        self.token = self.token_pool.acquire(GithubApiKind::Rest).await;
        let client = Octocrab::builder()
            .personal_token(self.token.clone())
            .set_connect_timeout(Some(Duration::from_secs(30)))
            .set_read_timeout(Some(Duration::from_secs(30)))
            .set_write_timeout(Some(Duration::from_secs(30)))
            .build()
            .context("Failed to build REST client")?;
        self.client = Some(client);
        Ok(())
    }

    pub async fn destroy(&mut self, rate_limit_exceeded: bool) -> Result<()> {
        if self.client.is_none() {
            bail!(
                "{} Destroying REST client failed, client is not running",
                self.repository_id
            );
        }
        self.client = None;
        let reuse = if rate_limit_exceeded {
            self.last_known_reset
        } else {
            None
        };
        self.token_pool
            .release(GithubApiKind::Rest, &self.token, reuse)
            .await?;
        info!(
            "{} REST client destroyed | reuse {:?}",
            self.repository_id, reuse
        );
        Ok(())
    }

    async fn rotate(&mut self) -> Result<()> {
        info!("{} REST rate limit reached, changing token", self.repository_id);
        self.destroy(true).await?;
        self.start().await
    }

    /// Query `/rate_limit` for the core budget. The check itself does not
    /// count against the budget.
    async fn remaining_budget(&mut self) -> Result<i64> {
        let document = self.dispatch("/rate_limit").await?;
        let remaining = document
            .pointer("/resources/core/remaining")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        self.last_known_reset = document
            .pointer("/resources/core/reset")
            .and_then(Value::as_i64)
            .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0));
        Ok(remaining)
    }

    /// Rotate the token when the remaining budget is at or below the
    /// low-water mark.
    pub async fn ensure_budget(&mut self) -> Result<()> {
        if self.remaining_budget().await? <= MIN_REMAINING_BUDGET {
            self.rotate().await?;
        }
        Ok(())
    }

    async fn dispatch(&self, path: &str) -> Result<Value> {
        let client = self
            .client
            .as_ref()
            .context("REST client is not running")?;
        match client.get::<Value, _, ()>(path, None).await {
            Ok(document) => Ok(document),
            Err(error) => Err(ApiRetryableError::from_octocrab_error(error).into()),
        }
    }

    /// Fetch one raw JSON document, rotating and retrying the single
    /// failed step on rate-limit errors, and restarting once on
    /// transient transport errors.
    pub async fn get_json(&mut self, path: &str) -> Result<Value> {
        loop {
            match self.dispatch(path).await {
                Ok(document) => return Ok(document),
                Err(error) => match error.downcast_ref::<ApiRetryableError>() {
                    Some(ApiRetryableError::RateLimit) => {
                        self.rotate().await?;
                    }
                    Some(ApiRetryableError::Retryable(message)) => {
                        warn!(
                            "{} REST call failed, restarting client: {message}",
                            self.repository_id
                        );
                        self.destroy(false).await?;
                        self.start().await?;
                        return self.dispatch(path).await.with_context(|| {
                            format!("{} REST call failed after restart", self.repository_id)
                        });
                    }
                    _ => return Err(error),
                },
            }
        }
    }

    /// Fetch one page of an array endpoint, checking the budget first.
    /// `path` must already carry its query string separator needs.
    pub async fn get_array_page(&mut self, path: &str, page: usize) -> Result<Vec<Value>> {
        self.ensure_budget().await?;
        let separator = if path.contains('?') { '&' } else { '?' };
        let paged = format!("{path}{separator}per_page={PAGE_SIZE}&page={page}");
        let document = self.get_json(&paged).await?;
        Ok(document.as_array().cloned().unwrap_or_default())
    }

    /// Fetch every page of an array endpoint.
    pub async fn get_array_all(&mut self, path: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.get_array_page(path, page).await?;
            let done = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if done {
                return Ok(items);
            }
            page += 1;
        }
    }

    /// Repository-scoped path helper: `/repos/{owner}/{name}{suffix}`.
    pub fn repo_path(&self, suffix: &str) -> String {
        format!(
            "/repos/{}/{}{suffix}",
            self.repository_id.owner, self.repository_id.repository_name
        )
    }

    /// Raw request against an endpoint outside the enumeration surface
    /// (used for the SBOM dependency listing).
    pub async fn send_custom(&mut self, endpoint: &str) -> Result<Value> {
        self.ensure_budget().await?;
        let url = format!(
            "https://api.github.com/repos/{}/{}{endpoint}",
            self.repository_id.owner, self.repository_id.repository_name
        );
        let response = reqwest::Client::new()
            .get(&url)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "github-graph-miner")
            .send()
            .await
            .with_context(|| format!("Custom REST request to {url} failed"))?;
        response
            .json::<Value>()
            .await
            .with_context(|| format!("Custom REST response from {url} is not JSON"))
    }
}
