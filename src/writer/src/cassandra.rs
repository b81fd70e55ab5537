//! Cassandra columnar backend.
//!
//! One row per sample, keyed by the identity fingerprint. The table carries
//! the sample as-is: no batching cap, no pacing, and no NaN filtering, since
//! a row-level upsert has no published rate limit and the store does not
//! validate numeric well-formedness.
//!
//! Expected schema:
//!
//! ```cql
//! CREATE TABLE <keyspace>.<table> (
//!     name text,
//!     labels_hash bigint,
//!     labels map<text, text>,
//!     timestamp timestamp,
//!     value double,
//!     PRIMARY KEY ((name, labels_hash), timestamp)
//! );
//! ```

use std::time::Duration;

use async_trait::async_trait;
use common::config::CassandraConfig;
use common::model::MetricPoint;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::prepared::PreparedStatement;
use scylla::value::CqlTimestamp;

use crate::{MetricsWriter, WritePlan, WriterError};

pub struct CassandraWriter {
    session: Session,
    insert: PreparedStatement,
}

impl CassandraWriter {
    pub async fn connect(config: &CassandraConfig) -> Result<Self, WriterError> {
        let session = SessionBuilder::new()
            .known_nodes(&config.nodes)
            .build()
            .await
            .map_err(|e| WriterError::Connect(e.to_string()))?;

        let insert = session
            .prepare(insert_statement(config))
            .await
            .map_err(|e| WriterError::Connect(e.to_string()))?;

        log::info!(
            "connected to Cassandra, writing to {}.{}",
            config.keyspace,
            config.table
        );

        Ok(Self { session, insert })
    }
}

fn insert_statement(config: &CassandraConfig) -> String {
    format!(
        "INSERT INTO {}.{} (name, labels_hash, labels, timestamp, value) VALUES (?, ?, ?, ?, ?)",
        config.keyspace, config.table
    )
}

#[async_trait]
impl MetricsWriter for CassandraWriter {
    fn plan(&self) -> WritePlan {
        WritePlan {
            max_batch: None,
            flush_pause: Duration::ZERO,
            skip_nan: false,
        }
    }

    async fn write(&self, batch: &[MetricPoint]) -> Result<(), WriterError> {
        for point in batch {
            self.session
                .execute_unpaged(
                    &self.insert,
                    (
                        point.identity.name.as_str(),
                        point.identity.fingerprint() as i64,
                        &point.identity.dimensions,
                        CqlTimestamp(point.sample.timestamp),
                        point.sample.value,
                    ),
                )
                .await
                .map_err(|e| WriterError::WriteBatch(e.to_string()))?;
        }

        log::debug!("inserted {} rows", batch.len());
        Ok(())
    }
}
