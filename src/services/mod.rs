//! Per-repository orchestration and the global worker pool.

pub mod pool;
pub mod worker;

pub use pool::WorkerPool;
pub use worker::RepositoryWorker;
