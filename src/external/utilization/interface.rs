use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A failure to read the utilization of a resource.
///
/// Always transient from the monitor's point of view, the next tick simply
/// tries again.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SampleError {
    #[error("utilization readings aren't supported on this platform")]
    Unsupported,

    #[error("utilization couldn't be read: {0}")]
    Unavailable(String),

    #[error("utilization reading {0} is outside of the 0-100% range")]
    OutOfRange(f64),
}

/// Source of host utilization readings, in percent.
#[async_trait]
pub trait UtilizationReader: Send + 'static {
    /// Average usage of all processors over the given observation window.
    async fn processor_usage(&mut self, window: Duration) -> Result<f64, SampleError>;

    /// Share of physical memory currently in use.
    fn memory_usage(&mut self) -> Result<f64, SampleError>;
}
