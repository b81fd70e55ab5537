//! Protobuf wire types for the Prometheus remote_write protocol.
//!
//! Hand-maintained prost derives matching the prompb tag numbers; only the
//! v1 sample path is modeled. Exemplars, native histograms and metric
//! metadata use higher tags and are skipped by prost's unknown-field
//! handling, so v2-flavored payloads still decode their samples.
//!
//! Reference: https://github.com/prometheus/prometheus/blob/main/prompb/types.proto

use prost::Message;

/// Top-level remote_write message
#[derive(Clone, PartialEq, Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
    // Field 2 is reserved, field 3 carries metadata we do not forward
}

#[derive(Clone, PartialEq, Message)]
pub struct TimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Label {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Sample {
    #[prost(double, tag = "1")]
    pub value: f64,
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}
