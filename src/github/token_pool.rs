//! Thread-safe GitHub token pool shared by every repository worker.
//!
//! Tokens are tracked per API kind in two multisets: `available`, whose
//! entries carry the instant they become usable again, and `in_use`. A
//! token exhausted against one API surface stays usable against the
//! other. Acquisition blocks with a bounded retry sleep until some
//! token's reuse instant has passed.

use std::collections::HashMap;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::info;

use crate::types::GithubApiKind;

/// Seconds slept between acquisition attempts when every token is either
/// in use or deferred.
const ACQUIRE_RETRY_SECS: u64 = 10;

struct KindState {
    available: Vec<(String, DateTime<Utc>)>,
    in_use: Vec<String>,
}

impl KindState {
    fn new(tokens: &[String]) -> Self {
        Self {
            available: tokens
                .iter()
                .map(|token| (token.clone(), DateTime::<Utc>::MIN_UTC))
                .collect(),
            in_use: Vec::new(),
        }
    }
}

pub struct TokenPool {
    states: Mutex<HashMap<GithubApiKind, KindState>>,
    /// Serializes waiters per kind so concurrent acquires line up instead
    /// of racing the available list.
    acquire_locks: HashMap<GithubApiKind, Mutex<()>>,
}

impl TokenPool {
    pub fn new(tokens: Vec<String>) -> Result<Self> {
        if tokens.is_empty() {
            bail!("Token pool requires at least one GitHub token");
        }
        let mut states = HashMap::new();
        let mut acquire_locks = HashMap::new();
        for kind in [GithubApiKind::GraphQl, GithubApiKind::Rest] {
            states.insert(kind, KindState::new(&tokens));
            acquire_locks.insert(kind, Mutex::new(()));
        }
        Ok(Self {
            states: Mutex::new(states),
            acquire_locks,
        })
    }

    /// Acquire a token for the given API kind, sleeping until one whose
    /// reuse instant has passed becomes available.
    pub async fn acquire(&self, kind: GithubApiKind) -> String {
        info!("Trying to acquire token for api {kind}");
        let _guard = self.acquire_locks[&kind].lock().await;
        loop {
            if let Some(token) = self.try_acquire(kind).await {
                info!("Successfully acquired token of type {kind}");
                return token;
            }
            info!("Waiting {ACQUIRE_RETRY_SECS} seconds before retrying token acquire of type {kind}");
            sleep(Duration::from_secs(ACQUIRE_RETRY_SECS)).await;
        }
    }

    async fn try_acquire(&self, kind: GithubApiKind) -> Option<String> {
        let mut states = self.states.lock().await;
        let state = states.get_mut(&kind)?;
        let now = Utc::now();
        let index = state
            .available
            .iter()
            .position(|(_, not_before)| *not_before < now)?;
        let (token, _) = state.available.remove(index);
        state.in_use.push(token.clone());
        Some(token)
    }

    /// Return a token, optionally deferring its reuse to `reuse_time`
    /// (the server-reported rate-limit reset). Returning a token that is
    /// not in use is an error.
    pub async fn release(
        &self,
        kind: GithubApiKind,
        token: &str,
        reuse_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut states = self.states.lock().await;
        let Some(state) = states.get_mut(&kind) else {
            bail!("Token pool holds no state for api {kind}");
        };
        let Some(index) = state.in_use.iter().position(|in_use| in_use == token) else {
            bail!("Invalid token return, token is not in use for api {kind}");
        };
        state.in_use.remove(index);
        let not_before = reuse_time.unwrap_or_else(Utc::now);
        state.available.push((token.to_string(), not_before));
        match reuse_time {
            Some(reset) => info!("Returned token with deferred reuse time {reset}"),
            None => info!("Returned token with immediate reuse"),
        }
        Ok(())
    }

    #[cfg(test)]
    async fn counts(&self, kind: GithubApiKind) -> (usize, usize) {
        let states = self.states.lock().await;
        let state = &states[&kind];
        (state.available.len(), state.in_use.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn acquire_moves_token_between_sets() {
        let pool = TokenPool::new(vec!["t1".to_string(), "t2".to_string()]).unwrap();
        let token = pool.acquire(GithubApiKind::Rest).await;
        assert!(token == "t1" || token == "t2");
        assert_eq!(pool.counts(GithubApiKind::Rest).await, (1, 1));
        // the other API surface is untouched
        assert_eq!(pool.counts(GithubApiKind::GraphQl).await, (2, 0));

        pool.release(GithubApiKind::Rest, &token, None).await.unwrap();
        assert_eq!(pool.counts(GithubApiKind::Rest).await, (2, 0));
    }

    #[tokio::test]
    async fn releasing_unknown_token_is_an_error() {
        let pool = TokenPool::new(vec!["t1".to_string()]).unwrap();
        assert!(
            pool.release(GithubApiKind::Rest, "t1", None)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn deferred_token_is_not_reissued_before_reset() {
        let pool = Arc::new(TokenPool::new(vec!["t1".to_string(), "t2".to_string()]).unwrap());
        let first = pool.acquire(GithubApiKind::GraphQl).await;
        // quarantine the first token for an hour
        pool.release(
            GithubApiKind::GraphQl,
            &first,
            Some(Utc::now() + chrono::Duration::hours(1)),
        )
        .await
        .unwrap();
        // the only immediately usable token is the other one
        let second = pool.acquire(GithubApiKind::GraphQl).await;
        assert_ne!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquire_release_keeps_sets_disjoint() {
        let pool = Arc::new(
            TokenPool::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]).unwrap(),
        );
        let mut handles = Vec::new();
        for _ in 0..12 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                let token = pool.acquire(GithubApiKind::Rest).await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                pool.release(GithubApiKind::Rest, &token, None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(pool.counts(GithubApiKind::Rest).await, (3, 0));
    }

    #[test]
    fn empty_token_list_is_rejected() {
        assert!(TokenPool::new(Vec::new()).is_err());
    }
}
