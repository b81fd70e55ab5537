//! Prometheus remote_write ingestion handler.
//!
//! Accepts the push payload, re-derives a metric identity per series, and
//! fans the samples out to the configured storage backend.
//!
//! ## Protocol details
//!
//! - Content-Type: `application/x-protobuf`
//! - Content-Encoding: `snappy` (block format, not framed)
//! - Endpoint: `POST /api/v1/write`
//!
//! A payload that cannot be decoded ends the request with a 4xx before any
//! backend is contacted. A backend write failure does not: remaining batches
//! and series are still processed, every failure is logged and aggregated,
//! and the request reports a 5xx afterwards.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use common::model::MetricIdentity;
use common::remote_write::{DecodeError, decode_write_request};
use writer::{MetricsWriter, WriteOutcome, WritePipeline};

/// Content type for remote_write requests
pub const REMOTE_WRITE_CONTENT_TYPE: &str = "application/x-protobuf";

/// Shared state for the remote-write endpoint
#[derive(Clone)]
pub struct RemoteWriteState {
    /// Backend writer constructed once at startup and shared by all workers
    pub writer: Arc<dyn MetricsWriter>,
}

/// Axum handler for `POST /api/v1/write`.
///
/// Prometheus expects an empty 2xx on success; 204 is returned here.
pub async fn handle_remote_write(
    State(state): State<RemoteWriteState>,
    body: Bytes,
) -> Result<StatusCode, RemoteWriteError> {
    tracing::debug!(body_size = body.len(), "handling remote-write request");

    let request = decode_write_request(&body).map_err(|e| {
        tracing::error!(error = %e, "failed to decode remote-write payload");
        RemoteWriteError::from(e)
    })?;

    if request.timeseries.is_empty() {
        tracing::debug!("empty write request, skipping");
        return Ok(StatusCode::NO_CONTENT);
    }

    let pipeline = WritePipeline::new(state.writer.as_ref());
    let mut outcome = WriteOutcome::default();

    for series in &request.timeseries {
        let identity = MetricIdentity::from_labels(&series.labels);
        pipeline
            .submit_series(&identity, &series.samples, &mut outcome)
            .await;
    }

    tracing::info!(
        series = request.timeseries.len(),
        written = outcome.written,
        skipped = outcome.skipped,
        failed_batches = outcome.errors.len(),
        "processed remote-write request"
    );

    match outcome.errors.last() {
        None => Ok(StatusCode::NO_CONTENT),
        Some(last) => Err(RemoteWriteError::Backend {
            failed: outcome.errors.len(),
            last: last.to_string(),
        }),
    }
}

/// Errors surfaced as the HTTP outcome of a remote-write request
#[derive(Debug)]
pub enum RemoteWriteError {
    Decompress(String),
    Malformed(String),
    Backend { failed: usize, last: String },
}

impl From<DecodeError> for RemoteWriteError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Decompress(e) => Self::Decompress(e.to_string()),
            DecodeError::Malformed(e) => Self::Malformed(e.to_string()),
        }
    }
}

impl std::fmt::Display for RemoteWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decompress(msg) => write!(f, "Decompression error: {msg}"),
            Self::Malformed(msg) => write!(f, "Malformed message: {msg}"),
            Self::Backend { failed, last } => {
                write!(f, "Backend error ({failed} failed batches, last: {last})")
            }
        }
    }
}

impl std::error::Error for RemoteWriteError {}

impl IntoResponse for RemoteWriteError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::Decompress(_) | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{Label, Sample, TimeSeries};
    use common::remote_write::{WriteRequest, encode_write_request};
    use writer::testing::RecordingWriter;

    fn cpu_series(samples: Vec<Sample>) -> TimeSeries {
        TimeSeries {
            labels: vec![
                Label {
                    name: "__name__".to_string(),
                    value: "cpu".to_string(),
                },
                Label {
                    name: "instance".to_string(),
                    value: "host1".to_string(),
                },
            ],
            samples,
        }
    }

    fn body_with(series: Vec<TimeSeries>) -> Bytes {
        Bytes::from(encode_write_request(&WriteRequest { timeseries: series }))
    }

    fn state(writer: Arc<RecordingWriter>) -> RemoteWriteState {
        RemoteWriteState { writer }
    }

    #[tokio::test(start_paused = true)]
    async fn test_metering_scenario_batches_and_dimensions() {
        let writer = Arc::new(RecordingWriter::new(RecordingWriter::metering_plan()));
        let samples = (0..45)
            .map(|i| Sample {
                value: i as f64,
                timestamp: 1_700_000_000_000 + i * 1000,
            })
            .collect();

        let status = handle_remote_write(
            State(state(writer.clone())),
            body_with(vec![cpu_series(samples)]),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);

        let batches = writer.recorded().await;
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
        for point in batches.iter().flatten() {
            assert_eq!(point.identity.name, "cpu");
            assert_eq!(point.identity.instance(), "host1");
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_yields_decompress_error_and_no_writes() {
        let writer = Arc::new(RecordingWriter::new(RecordingWriter::metering_plan()));

        let result = handle_remote_write(
            State(state(writer.clone())),
            Bytes::from_static(b"definitely not snappy"),
        )
        .await;

        match result {
            Err(RemoteWriteError::Decompress(_)) => {}
            other => panic!("expected decompression error, got {other:?}"),
        }
        assert!(writer.recorded().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_nan_series_yields_no_backend_calls() {
        let writer = Arc::new(RecordingWriter::new(RecordingWriter::metering_plan()));
        let nans = vec![
            Sample {
                value: f64::NAN,
                timestamp: 0,
            };
            5
        ];

        let status = handle_remote_write(
            State(state(writer.clone())),
            body_with(vec![cpu_series(nans)]),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(writer.recorded().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failure_reports_error_but_processes_remaining_series() {
        let writer = Arc::new(RecordingWriter::failing_first(
            RecordingWriter::metering_plan(),
            1,
        ));

        let one_sample = |ts| {
            vec![Sample {
                value: 1.0,
                timestamp: ts,
            }]
        };
        let body = body_with(vec![
            cpu_series(one_sample(1_700_000_000_000)),
            cpu_series(one_sample(1_700_000_001_000)),
        ]);

        let result = handle_remote_write(State(state(writer.clone())), body).await;

        match result {
            Err(RemoteWriteError::Backend { failed, .. }) => assert_eq!(failed, 1),
            other => panic!("expected backend error, got {other:?}"),
        }
        // The second series was still submitted after the first failed
        assert_eq!(writer.recorded().await.len(), 2);
    }

    #[tokio::test]
    async fn test_error_display() {
        let err = RemoteWriteError::Malformed("invalid protobuf".to_string());
        assert!(err.to_string().contains("invalid protobuf"));
    }
}
