//! Backend-agnostic representation of ingested time series.
//!
//! The wire decoder produces these types; the writers consume them. Nothing
//! here is mutated after construction: a request is decoded once, each series
//! is reduced to a [`MetricIdentity`], and the identity/sample pairs flow
//! downstream as [`MetricPoint`]s.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use hash32::FnvHasher;
use serde::{Deserialize, Serialize};

/// Reserved label carrying the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Reserved label identifying the scraped host, promoted to a first-class
/// dimension by the metering backend
pub const INSTANCE_LABEL: &str = "instance";

/// A single name/value pair attached to a time series
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// One timestamped reading. Timestamps are milliseconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub timestamp: i64,
}

/// A decoded series: a label set plus its samples in wire order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub labels: Vec<Label>,
    pub samples: Vec<Sample>,
}

/// The storage identity derived from a series' label set.
///
/// `__name__` is consumed into `name` and never appears as a dimension. Every
/// other label becomes a dimension; how much of the mapping a backend keeps
/// is up to its writer (CloudWatch narrows to `instance`, Cassandra stores
/// the full mapping).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricIdentity {
    pub name: String,
    pub dimensions: BTreeMap<String, String>,
}

impl MetricIdentity {
    /// Derive the identity from a label set in a single scan.
    ///
    /// A missing `__name__` yields an empty name; that is a degenerate but
    /// decodable series and is passed through for the backend to judge.
    pub fn from_labels(labels: &[Label]) -> Self {
        let mut name = String::new();
        let mut dimensions = BTreeMap::new();

        for label in labels {
            if label.name == METRIC_NAME_LABEL {
                name = label.value.clone();
            } else {
                dimensions.insert(label.name.clone(), label.value.clone());
            }
        }

        Self { name, dimensions }
    }

    /// Value of the promoted `instance` dimension, empty when absent
    pub fn instance(&self) -> &str {
        self.dimensions
            .get(INSTANCE_LABEL)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Stable FNV hash of the dimension mapping, used as the columnar row
    /// identity. Deterministic across processes; independent of wire label
    /// order because the mapping is ordered.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        self.dimensions.hash(&mut hasher);
        hasher.finish()
    }
}

/// The unit of submission to a backend writer
#[derive(Clone, Debug, PartialEq)]
pub struct MetricPoint {
    pub identity: MetricIdentity,
    pub sample: Sample,
}
