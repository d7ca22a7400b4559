//! Encodings of a document's topic distribution for storage in the index.
//!
//! The exact form keeps every topic weight and is what reranking scores with.
//! The sparse form only exists so the index can match candidate documents on
//! their prominent topics before exact scoring.

use crate::{Error, Result};

/// Topics at or below this weight are left out of the sparse form.
pub const PAYLOAD_THRESHOLD: f32 = 0.05;

const SEPARATOR: char = ',';
const PAYLOAD_DELIMITER: char = '$';

/// Serialize all topic weights in order. Every value is preceded by the
/// separator, so the encoding starts with an empty placeholder field.
pub fn encode_exact(topics: &[f32]) -> String {
    let mut out = String::with_capacity(topics.len() * 12);
    for value in topics {
        out.push(SEPARATOR);
        out.push_str(&value.to_string());
    }
    out
}

/// Inverse of [`encode_exact`]: skips the leading placeholder and requires
/// exactly `k` values after it.
pub fn decode_exact(encoded: &str, k: usize) -> Result<Vec<f32>> {
    let mut parts = encoded.split(SEPARATOR);
    let placeholder = parts.next().unwrap_or_default();
    let values: Vec<&str> = parts.collect();
    if !placeholder.trim().is_empty() || values.len() != k {
        let found = if placeholder.trim().is_empty() { values.len() } else { values.len() + 1 };
        return Err(Error::MalformedEncoding { expected: k, found: found.to_string() });
    }
    values
        .into_iter()
        .map(|v| {
            match v.trim().parse::<f32>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(Error::MalformedEncoding {
                    expected: k,
                    found: format!("unparsable value {v:?}"),
                }),
            }
        })
        .collect()
}

/// `(topic, weight)` for every topic whose weight is strictly above `threshold`.
pub fn encode_sparse_payload(topics: &[f32], threshold: f32) -> Vec<(usize, f32)> {
    topics
        .iter()
        .enumerate()
        .filter(|(_, w)| **w > threshold)
        .map(|(i, w)| (i, *w))
        .collect()
}

/// Index token standing for topic `topic` in the payload field.
pub fn payload_token(topic: usize) -> String {
    format!("p{topic}")
}

/// Human-readable stored form of the sparse encoding, e.g. `" p3$0.45 p7$0.2"`.
pub fn format_payload_field(sparse: &[(usize, f32)]) -> String {
    let mut out = String::new();
    for (topic, weight) in sparse {
        out.push(' ');
        out.push_str(&payload_token(*topic));
        out.push(PAYLOAD_DELIMITER);
        out.push_str(&weight.to_string());
    }
    out
}

/// Parse the stored payload text back into `(token, weight)` pairs.
pub fn parse_payload_field(text: &str) -> Result<Vec<(String, f32)>> {
    text.split_whitespace()
        .map(|tok| {
            let (term, weight) =
                tok.split_once(PAYLOAD_DELIMITER).ok_or_else(|| Error::MalformedEncoding {
                    expected: 1,
                    found: format!("payload token without weight {tok:?}"),
                })?;
            let weight = weight.parse::<f32>().map_err(|_| Error::MalformedEncoding {
                expected: 1,
                found: format!("unparsable payload {weight:?}"),
            })?;
            Ok((term.to_string(), weight))
        })
        .collect()
}
