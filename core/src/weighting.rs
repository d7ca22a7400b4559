//! Term weighting and score normalization for vector-space ranking.
//!
//! The index scores a query against a document as
//!
//! ```text
//! coord(overlap, max_overlap) * query_norm(sum_sq)
//!     * sum over matched clauses of tf(freq) * idf(df, N)^2 * field_norm(len) * boost
//! ```
//!
//! where `sum_sq` is the sum over all clauses of `(idf * boost)^2`. A
//! [`WeightingStrategy`] picks the five functions through [`ScoringTable`].
//! See Manning et al., "An Introduction to Information Retrieval" (2009), ch. 6.

use crate::Error;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weighting {
    /// Raw term frequency.
    #[default]
    Basic,
    /// `1 + ln(freq)`.
    Sublinear,
    /// Presence only.
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    Cosine,
    Overlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeightingStrategy {
    pub weighting: Weighting,
    pub normalization: Normalization,
}

/// The scoring callbacks the index calls while ranking.
#[derive(Clone, Copy)]
pub struct ScoringTable {
    pub tf: fn(f32) -> f32,
    pub idf: fn(u32, u32) -> f32,
    pub query_norm: fn(f32) -> f32,
    pub coord: fn(u32, u32) -> f32,
    pub field_norm: fn(u32) -> f32,
}

impl fmt::Debug for ScoringTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringTable").finish_non_exhaustive()
    }
}

fn tf_raw(freq: f32) -> f32 {

    freq

}

fn tf_sublinear(freq: f32) -> f32 {
    if freq > 0.0 { 1.0 + freq.ln() } else { 0.0 }
}

fn one_u32(_: u32) -> f32 {

    1.0

}
fn one_pair(_: u32, _: u32) -> f32 {
    1.0
}
fn one_f32(_: f32) -> f32 {
    1.0
}

/// `1 + ln(N / (df + 1))`.
fn idf_standard(doc_freq: u32, num_docs: u32) -> f32 {
    1.0 + (num_docs as f32 / (doc_freq as f32 + 1.0)).ln()
}

fn query_norm_cosine(sum_sq: f32) -> f32 {
    if sum_sq > 0.0 { 1.0 / sum_sq.sqrt() } else { 1.0 }
}

fn field_norm_length(num_terms: u32) -> f32 {
    if num_terms > 0 { 1.0 / (num_terms as f32).sqrt() } else { 1.0 }
}

impl ScoringTable {
    /// Every callback is 1: clause scores come from payloads alone.
    pub fn payload_only() -> Self {
        Self {
            tf: one_f32,
            idf: one_pair,
            query_norm: one_f32,
            coord: one_pair,
            field_norm: one_u32,
        }
    }
}

impl WeightingStrategy {
    pub fn new(weighting: Weighting, normalization: Normalization) -> Self {
        Self { weighting, normalization }
    }

    pub fn table(&self) -> ScoringTable {
        let tf = match self.weighting {
            Weighting::Basic => tf_raw as fn(f32) -> f32,
            Weighting::Sublinear => tf_sublinear,
            Weighting::Boolean => one_f32,
        };
        match (self.weighting, self.normalization) {
            (_, Normalization::Overlap) => ScoringTable {
                tf,
                idf: one_pair,
                query_norm: one_f32,
                coord: one_pair,
                field_norm: one_u32,
            },
            (Weighting::Boolean, Normalization::Cosine) => ScoringTable {
                tf,
                idf: one_pair,
                query_norm: query_norm_cosine,
                coord: one_pair,
                field_norm: field_norm_length,
            },
            (_, Normalization::Cosine) => ScoringTable {
                tf,
                idf: idf_standard,
                query_norm: query_norm_cosine,
                coord: one_pair,
                field_norm: field_norm_length,
            },
        }
    }
}

impl FromStr for Weighting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "basic" | "linear" => Ok(Weighting::Basic),
            "2" | "sublinear" => Ok(Weighting::Sublinear),
            "3" | "boolean" => Ok(Weighting::Boolean),
            _ => Err(Error::InvalidOption { option: "weighting", value: s.to_string() }),
        }
    }
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "cosine" => Ok(Normalization::Cosine),
            "2" | "overlap" => Ok(Normalization::Overlap),
            _ => Err(Error::InvalidOption { option: "normalization", value: s.to_string() }),
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Weighting::Basic => "basic",
            Weighting::Sublinear => "sublinear",
            Weighting::Boolean => "boolean",
        })
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Normalization::Cosine => "cosine",
            Normalization::Overlap => "overlap",
        })
    }
}
