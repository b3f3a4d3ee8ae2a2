//! GraphQL client envelope.
//!
//! Wraps one octocrab client holding one pooled token. Every
//! [`GraphQlWrapper::execute`] call is wrapped in the repository template
//! plus a `rateLimit` block; after each call the remaining point budget
//! is inspected and the token rotated once it falls to the low-water
//! mark. Transport failures are answered with one transparent
//! restart-and-retry cycle.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use octocrab::Octocrab;
use serde_json::Value;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use super::{GraphQlPayload, GraphQlResponse};
use crate::github::error::ApiRetryableError;
use crate::github::token_pool::TokenPool;
use crate::github::MIN_REMAINING_BUDGET;
use crate::graph::data_type::DATETIME_FORMAT;
use crate::types::{GithubApiKind, RepositoryId};

/// Courtesy delay after every GraphQL call.
const COURTESY_DELAY_MS: u64 = 500;

/// Fallback quarantine when a rate-limit error carries no reset instant;
/// the GraphQL point budget replenishes hourly.
const RATE_LIMIT_FALLBACK_SECS: i64 = 3600;

pub struct GraphQlWrapper {
    token_pool: Arc<TokenPool>,
    repository_id: RepositoryId,
    client: Option<Octocrab>,
    token: String,
    reuse_time: Option<DateTime<Utc>>,
    rate_limit_exceeded: bool,
    remaining_budget: i64,
}

impl GraphQlWrapper {
    pub fn new(token_pool: Arc<TokenPool>, repository_id: RepositoryId) -> Self {
        Self {
            token_pool,
            repository_id,
            client: None,
            token: String::new(),
            reuse_time: None,
            rate_limit_exceeded: false,
            remaining_budget: 5000,
        }
    }

    pub fn is_running(&self) -> bool {
        self.client.is_some()
    }

    /// Acquire a token and build the transport.
    pub async fn start(&mut self) -> Result<()> {
        self.reuse_time = None;
        self.rate_limit_exceeded = false;
        self.token = self.token_pool.acquire(GithubApiKind::GraphQl).await;
        let client = Octocrab::builder()
            .personal_token(self.token.clone())
            .set_connect_timeout(Some(Duration::from_secs(30)))
            .set_read_timeout(Some(Duration::from_secs(30)))
            .set_write_timeout(Some(Duration::from_secs(30)))
            .build()
            .context("Failed to build GraphQL client")?;
        self.client = Some(client);
        Ok(())
    }

    /// Tear down the transport and return the token, deferring its reuse
    /// when the budget was exhausted.
    pub async fn destroy(&mut self) -> Result<()> {
        if self.client.is_none() {
            bail!(
                "{} Destroying GraphQL client failed, client is not running",
                self.repository_id
            );
        }
        self.client = None;
        let reuse = if self.rate_limit_exceeded {
            self.reuse_time
        } else {
            None
        };
        self.token_pool
            .release(GithubApiKind::GraphQl, &self.token, reuse)
            .await?;
        info!(
            "{} GraphQL client destroyed | reuse {:?}",
            self.repository_id, reuse
        );
        self.rate_limit_exceeded = false;
        self.reuse_time = None;
        Ok(())
    }

    /// Execute an inner selection set against the repository template.
    /// Returns the full `data` object, `repository` and `rateLimit`
    /// included.
    pub async fn execute(&mut self, inner_query: &str) -> Result<Value> {
        let query = format!(
            r#"
        {{
            repository(owner: "{owner}", name: "{name}") {{
                {inner_query}
            }}
            rateLimit {{
                remaining
                cost
                resetAt
            }}
        }}
        "#,
            owner = self.repository_id.owner,
            name = self.repository_id.repository_name,
        );
        self.execute_raw(&query).await
    }

    /// Execute a query verbatim. The query must select a `rateLimit`
    /// block so budget accounting keeps working.
    pub async fn execute_raw(&mut self, query: &str) -> Result<Value> {
        match self.dispatch(query).await {
            Ok(data) => {
                self.process_rate_limit(&data).await?;
                Ok(data)
            }
            Err(error) => {
                // One transparent restart-and-retry cycle; a rate-limited
                // token goes back quarantined so the restart rotates it.
                warn!(
                    "{} GraphQL query failed, restarting client: {error}",
                    self.repository_id
                );
                if error.is_rate_limit() {
                    self.rate_limit_exceeded = true;
                    self.reuse_time.get_or_insert_with(|| {
                        Utc::now() + chrono::Duration::seconds(RATE_LIMIT_FALLBACK_SECS)
                    });
                }
                self.destroy().await?;
                self.start().await?;
                let data = self.dispatch(query).await.with_context(|| {
                    format!("{} GraphQL query failed after restart", self.repository_id)
                })?;
                self.process_rate_limit(&data).await?;
                Ok(data)
            }
        }
    }

    async fn dispatch(&self, query: &str) -> std::result::Result<Value, ApiRetryableError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ApiRetryableError::NonRetryable("client is not running".to_string()))?;
        let payload = GraphQlPayload {
            query: query.to_string(),
        };
        let response: GraphQlResponse = client
            .graphql(&payload)
            .await
            .map_err(ApiRetryableError::from_octocrab_error)?;
        sleep(Duration::from_millis(COURTESY_DELAY_MS)).await;
        if let Some(errors) = &response.errors {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .map(|entry| entry.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(ApiRetryableError::from_graphql_message(&message));
            }
        }
        response
            .data
            .ok_or_else(|| ApiRetryableError::Retryable("no data in GraphQL response".to_string()))
    }

    /// Inspect the `rateLimit` block and rotate the token once the
    /// remaining budget reaches the low-water mark.
    async fn process_rate_limit(&mut self, data: &Value) -> Result<()> {
        let Some(rate_limit) = data.get("rateLimit") else {
            return Ok(());
        };
        self.remaining_budget = rate_limit
            .get("remaining")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if self.remaining_budget <= MIN_REMAINING_BUDGET {
            info!(
                "{} GraphQL budget below {MIN_REMAINING_BUDGET}, rotating token",
                self.repository_id
            );
            self.rate_limit_exceeded = true;
            if let Some(reset_at) = rate_limit.get("resetAt").and_then(Value::as_str) {
                self.reuse_time = NaiveDateTime::parse_from_str(reset_at, DATETIME_FORMAT)
                    .ok()
                    .map(|naive| naive.and_utc());
            }
            self.destroy().await?;
            self.start().await?;
        }
        Ok(())
    }

    pub fn remaining_budget(&self) -> i64 {
        self.remaining_budget
    }
}
