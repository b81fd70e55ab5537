//! Prometheus remote_write payload decoding.
//!
//! The agent pushes a snappy-compressed (block format, not framed) protobuf
//! `WriteRequest`. Decoding is all-or-nothing: a payload either yields a
//! complete request or a terminal [`DecodeError`], and has no side effects.

pub mod proto;

use prost::Message;
use thiserror::Error;

use crate::model::{Label, Sample, TimeSeries};

/// Errors that end a request before any backend is contacted
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("snappy decompression failed: {0}")]
    Decompress(#[from] snap::Error),
    #[error("protobuf decode failed: {0}")]
    Malformed(#[from] prost::DecodeError),
}

/// A decoded push request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteRequest {
    pub timeseries: Vec<TimeSeries>,
}

/// Decode a raw request body: snappy block decompression, then protobuf.
pub fn decode_write_request(data: &[u8]) -> Result<WriteRequest, DecodeError> {
    let decompressed = snap::raw::Decoder::new().decompress_vec(data)?;
    let request = proto::WriteRequest::decode(decompressed.as_slice())?;
    Ok(proto_to_internal(request))
}

fn proto_to_internal(request: proto::WriteRequest) -> WriteRequest {
    WriteRequest {
        timeseries: request
            .timeseries
            .into_iter()
            .map(|ts| TimeSeries {
                labels: ts
                    .labels
                    .into_iter()
                    .map(|l| Label {
                        name: l.name,
                        value: l.value,
                    })
                    .collect(),
                samples: ts
                    .samples
                    .into_iter()
                    .map(|s| Sample {
                        value: s.value,
                        timestamp: s.timestamp,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Encode a request into the wire format the decoder accepts.
///
/// Test support for round-trip and handler tests; the adapter itself never
/// re-encodes.
#[cfg(any(test, feature = "testing"))]
pub fn encode_write_request(request: &WriteRequest) -> Vec<u8> {
    let proto = proto::WriteRequest {
        timeseries: request
            .timeseries
            .iter()
            .map(|ts| proto::TimeSeries {
                labels: ts
                    .labels
                    .iter()
                    .map(|l| proto::Label {
                        name: l.name.clone(),
                        value: l.value.clone(),
                    })
                    .collect(),
                samples: ts
                    .samples
                    .iter()
                    .map(|s| proto::Sample {
                        value: s.value,
                        timestamp: s.timestamp,
                    })
                    .collect(),
            })
            .collect(),
    };

    snap::raw::Encoder::new()
        .compress_vec(&proto.encode_to_vec())
        .expect("snappy block compression of an in-memory buffer")
}
