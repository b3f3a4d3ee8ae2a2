//! Worker pool: at most `threads` repositories mined at once.
//!
//! The pool loop launches workers while capacity remains, then sleeps
//! and reaps finished tasks every 15 seconds until the queue and the
//! in-flight set drain. The token pool is the only state shared between
//! workers.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use super::worker::RepositoryWorker;
use crate::config::Config;
use crate::github::TokenPool;
use crate::types::RepositoryId;

/// Seconds between reaper ticks.
const REAPER_TICK_SECS: u64 = 15;

pub struct WorkerPool {
    config: Config,
    token_pool: Arc<TokenPool>,
    queue: VecDeque<RepositoryId>,
}

impl WorkerPool {
    pub fn new(config: Config, token_pool: Arc<TokenPool>, repositories: Vec<RepositoryId>) -> Self {
        Self {
            config,
            token_pool,
            queue: repositories.into_iter().collect(),
        }
    }

    /// Run until every queued repository has been mined.
    pub async fn start(mut self) {
        let mut in_flight: Vec<(RepositoryId, JoinHandle<()>)> = Vec::new();
        loop {
            while in_flight.len() < self.config.threads {
                let Some(repository_id) = self.queue.pop_front() else {
                    break;
                };
                info!("Initializing new worker for repository {repository_id}");
                let worker = RepositoryWorker::new(
                    self.config.clone(),
                    repository_id.clone(),
                    Arc::clone(&self.token_pool),
                );
                in_flight.push((repository_id, tokio::spawn(worker.run())));
            }

            if in_flight.is_empty() && self.queue.is_empty() {
                info!("Worker pool drained, all repositories processed");
                return;
            }

            sleep(Duration::from_secs(REAPER_TICK_SECS)).await;

            let mut still_running = Vec::new();
            for (repository_id, handle) in in_flight {
                if handle.is_finished() {
                    if let Err(error) = handle.await {
                        warn!("Worker for {repository_id} panicked: {error}");
                    }
                } else {
                    still_running.push((repository_id, handle));
                }
            }
            in_flight = still_running;
        }
    }
}
