//! Long-running service capability shared by workers and the send queue.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::TargetConfig;

/// Errors raised while stopping a service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{identity}: shutdown did not finish before the deadline")]
    DeadlineExceeded { identity: String },

    #[error("service task failed: {0}")]
    Task(String),
}

/// A supervised unit of work: one metric worker, one metadata worker or the
/// send queue. The supervisor keeps these in one homogeneous collection.
#[async_trait]
pub trait Service: Send + Sync {
    /// Runs until shut down.
    async fn serve(&self);

    /// Stops the service, waiting for it to exit until `deadline`.
    ///
    /// Idempotent: only the first call runs the shutdown sequence, later calls
    /// return immediately.
    async fn shutdown(&self, deadline: Instant) -> Result<(), ServiceError>;

    /// Identity of the target the service polls. Empty for the send queue.
    fn identity(&self) -> String;

    /// Applies a new configuration for the same target in place.
    async fn reload(&self, target: Arc<TargetConfig>);

    /// False once shutdown has started.
    fn alive(&self) -> bool;
}
