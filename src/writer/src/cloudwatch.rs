//! CloudWatch metering backend.
//!
//! Submits batches of up to the configured cap via `PutMetricData` under a
//! fixed namespace. CloudWatch cannot represent NaN readings and publishes
//! at second resolution, so the plan drops NaN and the datum timestamp
//! truncates the wire's milliseconds.

use async_trait::async_trait;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum};
use common::config::CloudWatchConfig;
use common::model::{INSTANCE_LABEL, MetricPoint};

use crate::{MetricsWriter, WritePlan, WriterError};

pub struct CloudWatchWriter {
    client: Client,
    namespace: String,
    plan: WritePlan,
}

impl CloudWatchWriter {
    /// Build the SDK client from the ambient AWS environment, with an
    /// optional region override from configuration.
    pub async fn connect(config: &CloudWatchConfig) -> Self {
        let sdk_config = match &config.region {
            Some(region) => {
                aws_config::from_env()
                    .region(aws_config::Region::new(region.clone()))
                    .load()
                    .await
            }
            None => aws_config::load_from_env().await,
        };

        Self {
            client: Client::new(&sdk_config),
            namespace: config.namespace.clone(),
            plan: WritePlan {
                max_batch: Some(config.max_batch_size),
                flush_pause: config.flush_pause,
                skip_nan: true,
            },
        }
    }

    /// Map one point to a datum. The identity is narrowed to the single
    /// `instance` dimension, attached even when empty; CloudWatch decides
    /// whether to accept it.
    fn datum(point: &MetricPoint) -> MetricDatum {
        MetricDatum::builder()
            .metric_name(point.identity.name.clone())
            .value(point.sample.value)
            .timestamp(DateTime::from_secs(point.sample.timestamp / 1000))
            .dimensions(
                Dimension::builder()
                    .name(INSTANCE_LABEL)
                    .value(point.identity.instance())
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl MetricsWriter for CloudWatchWriter {
    fn plan(&self) -> WritePlan {
        self.plan
    }

    async fn write(&self, batch: &[MetricPoint]) -> Result<(), WriterError> {
        let data: Vec<MetricDatum> = batch.iter().map(Self::datum).collect();

        self.client
            .put_metric_data()
            .namespace(&self.namespace)
            .set_metric_data(Some(data))
            .send()
            .await
            .map_err(|e| WriterError::WriteBatch(e.to_string()))?;

        log::debug!("published {} datapoints to CloudWatch", batch.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{Label, MetricIdentity, Sample};

    fn point(value: f64, timestamp: i64) -> MetricPoint {
        MetricPoint {
            identity: MetricIdentity::from_labels(&[
                Label {
                    name: "__name__".to_string(),
                    value: "cpu".to_string(),
                },
                Label {
                    name: "instance".to_string(),
                    value: "host1".to_string(),
                },
                Label {
                    name: "mode".to_string(),
                    value: "idle".to_string(),
                },
            ]),
            sample: Sample { value, timestamp },
        }
    }

    #[test]
    fn test_datum_truncates_timestamp_to_seconds() {
        let datum = CloudWatchWriter::datum(&point(0.5, 1_700_000_000_999));
        assert_eq!(datum.timestamp(), Some(&DateTime::from_secs(1_700_000_000)));
    }

    #[test]
    fn test_datum_carries_name_value_and_instance_dimension() {
        let datum = CloudWatchWriter::datum(&point(0.5, 1_700_000_000_000));

        assert_eq!(datum.metric_name(), Some("cpu"));
        assert_eq!(datum.value(), Some(0.5));

        let dimensions = datum.dimensions();
        assert_eq!(dimensions.len(), 1);
        assert_eq!(dimensions[0].name(), Some("instance"));
        assert_eq!(dimensions[0].value(), Some("host1"));
    }

    #[test]
    fn test_datum_instance_dimension_present_when_label_missing() {
        let bare = MetricPoint {
            identity: MetricIdentity::from_labels(&[Label {
                name: "__name__".to_string(),
                value: "cpu".to_string(),
            }]),
            sample: Sample {
                value: 1.0,
                timestamp: 0,
            },
        };

        let datum = CloudWatchWriter::datum(&bare);
        let dimensions = datum.dimensions();
        assert_eq!(dimensions.len(), 1);
        assert_eq!(dimensions[0].value(), Some(""));
    }
}
