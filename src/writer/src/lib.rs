//! Backend writers for ingested samples.
//!
//! Every backend satisfies the same contract: announce a [`WritePlan`] (how
//! to batch and pace submissions) and persist one batch per [`write`] call.
//! The pipeline in [`batch`] is the only caller and contains no
//! backend-specific branching; the variant is chosen once at startup via
//! [`for_backend`] and shared by all request workers as an
//! `Arc<dyn MetricsWriter>`.
//!
//! [`write`]: MetricsWriter::write

pub mod batch;
mod cassandra;
mod cloudwatch;

pub use batch::{WriteOutcome, WritePipeline};
pub use cassandra::CassandraWriter;
pub use cloudwatch::CloudWatchWriter;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::config::{BackendKind, Configuration};
use common::model::MetricPoint;

/// Batching and pacing contract supplied by a backend.
///
/// `max_batch: None` means samples are never split; the backend accepts a
/// whole series in one call (per-row upsert semantics). A bounded plan caps
/// each submission and pauses `flush_pause` after every full batch to stay
/// under the backend's request-rate ceiling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WritePlan {
    pub max_batch: Option<usize>,
    pub flush_pause: Duration,
    /// Drop NaN samples before submission (for protocols that cannot
    /// represent non-numeric readings)
    pub skip_nan: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum WriterError {
    #[error("failed to connect to backend: {0}")]
    Connect(String),
    #[error("failed to write batch: {0}")]
    WriteBatch(String),
}

/// A storage backend for identified samples.
#[async_trait]
pub trait MetricsWriter: Send + Sync {
    /// How this backend wants its submissions shaped and paced
    fn plan(&self) -> WritePlan;

    /// Persist one batch. An error covers the whole batch; callers treat it
    /// as non-fatal and continue with subsequent batches.
    async fn write(&self, batch: &[MetricPoint]) -> Result<(), WriterError>;
}

/// Construct the writer selected by configuration.
///
/// Called once at startup; the returned handle owns the backend connection
/// and is safe to share across concurrent request workers.
pub async fn for_backend(config: &Configuration) -> Result<Arc<dyn MetricsWriter>, WriterError> {
    match config.backend {
        BackendKind::Cloudwatch => {
            let writer = CloudWatchWriter::connect(&config.cloudwatch).await;
            Ok(Arc::new(writer))
        }
        BackendKind::Cassandra => {
            let writer = CassandraWriter::connect(&config.cassandra).await?;
            Ok(Arc::new(writer))
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Backend stand-in that records every batch it is handed.
    ///
    /// `failing_first(n)` makes the first `n` write calls fail, which is how
    /// tests exercise the continue-on-error pipeline policy. Failed batches
    /// are recorded too, so assertions can see what would have been sent.
    pub struct RecordingWriter {
        plan: WritePlan,
        batches: tokio::sync::Mutex<Vec<Vec<MetricPoint>>>,
        failures_left: AtomicUsize,
    }

    impl RecordingWriter {
        pub fn new(plan: WritePlan) -> Self {
            Self::failing_first(plan, 0)
        }

        pub fn failing_first(plan: WritePlan, failures: usize) -> Self {
            Self {
                plan,
                batches: tokio::sync::Mutex::new(Vec::new()),
                failures_left: AtomicUsize::new(failures),
            }
        }

        /// Plan matching the CloudWatch defaults (20 per batch, paced)
        pub fn metering_plan() -> WritePlan {
            WritePlan {
                max_batch: Some(20),
                flush_pause: Duration::from_millis(1000),
                skip_nan: true,
            }
        }

        /// Plan matching the Cassandra defaults (unbounded, unpaced)
        pub fn columnar_plan() -> WritePlan {
            WritePlan {
                max_batch: None,
                flush_pause: Duration::ZERO,
                skip_nan: false,
            }
        }

        pub async fn recorded(&self) -> Vec<Vec<MetricPoint>> {
            self.batches.lock().await.clone()
        }
    }

    #[async_trait]
    impl MetricsWriter for RecordingWriter {
        fn plan(&self) -> WritePlan {
            self.plan
        }

        async fn write(&self, batch: &[MetricPoint]) -> Result<(), WriterError> {
            self.batches.lock().await.push(batch.to_vec());

            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(WriterError::WriteBatch("injected failure".to_string()));
            }
            Ok(())
        }
    }
}
