//! Shared blocking HTTP plumbing for delivery providers

use std::time::Duration;

use ureq::Agent;

use crate::errors::{KeywardError, Result};

/// Builds an agent whose every call is bounded by `timeout_secs`.
pub(super) fn build_agent(timeout_secs: u64) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
        .build()
        .into()
}

/// Runs a blocking HTTP call on the blocking pool.
pub(super) async fn run_blocking<T, F>(what: &'static str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KeywardError::delivery(format!("{} task failed: {}", what, e)))?
}
