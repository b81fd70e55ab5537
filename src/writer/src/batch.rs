//! Batching and pacing of sample submissions.
//!
//! Samples are accumulated per series. A bounded plan flushes whenever the
//! buffer hits the cap and then suspends the worker for the plan's fixed
//! pause; the pause is a deliberate blocking delay on the request path, not
//! a backoff. The remainder of a series is flushed without a trailing pause.
//! A failed flush drops that batch, records the error, and processing
//! continues with the next samples and series.

use common::model::{MetricIdentity, MetricPoint, Sample};

use crate::{MetricsWriter, WritePlan, WriterError};

/// Aggregate result of processing one request
#[derive(Debug, Default)]
pub struct WriteOutcome {
    /// Samples acknowledged by the backend
    pub written: usize,
    /// NaN samples dropped before submission
    pub skipped: usize,
    /// Every flush failure, in the order it occurred
    pub errors: Vec<WriterError>,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Drives series through a writer according to the writer's own plan.
pub struct WritePipeline<'a> {
    writer: &'a dyn MetricsWriter,
    plan: WritePlan,
}

impl<'a> WritePipeline<'a> {
    pub fn new(writer: &'a dyn MetricsWriter) -> Self {
        Self {
            plan: writer.plan(),
            writer,
        }
    }

    /// Submit one series' samples, accumulating into `outcome`.
    pub async fn submit_series(
        &self,
        identity: &MetricIdentity,
        samples: &[Sample],
        outcome: &mut WriteOutcome,
    ) {
        let mut buffer: Vec<MetricPoint> = Vec::new();

        for sample in samples {
            if self.plan.skip_nan && sample.value.is_nan() {
                outcome.skipped += 1;
                continue;
            }

            buffer.push(MetricPoint {
                identity: identity.clone(),
                sample: *sample,
            });

            if self.plan.max_batch.is_some_and(|cap| buffer.len() >= cap) {
                self.flush(&mut buffer, outcome).await;
                tokio::time::sleep(self.plan.flush_pause).await;
            }
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer, outcome).await;
        }
    }

    async fn flush(&self, buffer: &mut Vec<MetricPoint>, outcome: &mut WriteOutcome) {
        match self.writer.write(buffer).await {
            Ok(()) => outcome.written += buffer.len(),
            Err(e) => {
                log::error!("failed to write batch of {} samples: {e}", buffer.len());
                outcome.errors.push(e);
            }
        }
        buffer.clear();
    }
}
