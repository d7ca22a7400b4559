//! Topic-model reranking.
//!
//! A query is turned into a per-topic relevance vector using the topic-term
//! matrix. Documents sharing at least one prominent topic with the query are
//! fetched from the index through their payload field, then each candidate is
//! rescored by the conditional probability of the query given the document:
//! the dot product of the document's exact topic distribution and the query
//! vector.

use crate::codec::{decode_exact, payload_token};
use crate::query::normalize_query;
use crate::schema::{topics_field, topics_payload_field, FILE_FIELD};
use crate::search::{BooleanQuery, Clause, Engine, TopDocs};
use crate::topic_model::TopicModel;
use crate::weighting::ScoringTable;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Query topics scoring at or below this are ignored.
pub const QUERY_TOPIC_THRESHOLD: f32 = 0.01;
pub const DEFAULT_MAX_HITS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub document: String,
    pub score: f32,
}

impl RankedResult {
    /// `"{document},{score}"` with three decimals, as written to result files.
    pub fn to_line(&self) -> String {
        format!("{},{:.3}", self.document, self.score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryTopicVector {
    scores: Vec<f32>,
}

impl QueryTopicVector {
    /// Sum, per topic, the relevance of every query term the model knows.
    pub fn build<'t>(model: &TopicModel, terms: impl IntoIterator<Item = &'t str>) -> Self {
        let term_ids: Vec<usize> = terms.into_iter().filter_map(|t| model.term_id(t)).collect();
        let scores: Vec<f32> = (0..model.k())
            .map(|topic| term_ids.iter().map(|&w| model.phi(topic, w)).sum::<f32>())
            .collect();
        Self { scores }
    }

    /// Raw per-topic sums.
    pub fn raw(&self) -> &[f32] {
        &self.scores
    }

    pub fn active_topics(&self) -> Vec<usize> {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > QUERY_TOPIC_THRESHOLD)
            .map(|(k, _)| k)
            .collect()
    }

    /// The vector used for similarity: inactive topics are zero.
    pub fn scoring_vector(&self) -> Vec<f32> {
        self.scores
            .iter()
            .map(|&s| if s > QUERY_TOPIC_THRESHOLD { s } else { 0.0 })
            .collect()
    }
}

/// Conditional-probability similarity between a document's topic
/// distribution and a query vector.
pub fn similarity(doc_topics: &[f32], query: &[f32]) -> f32 {
    doc_topics.iter().zip(query).map(|(d, q)| d * q).sum()
}

pub struct Reranker<'a, E: Engine + ?Sized> {
    engine: &'a E,
    model: &'a TopicModel,
    max_hits: usize,
}

impl<'a, E: Engine + ?Sized> Reranker<'a, E> {
    pub fn new(engine: &'a E, model: &'a TopicModel, max_hits: usize) -> Self {
        Self { engine, model, max_hits }
    }

    pub fn model(&self) -> &TopicModel {

        self.model

    }

    /// Rank the indexed documents against a raw query. `None` means the query
    /// produced nothing to search for: it is blank once normalized, or none of
    /// its topics passes the threshold.
    pub fn rank(&self, raw_query: &str) -> Result<Option<Vec<RankedResult>>> {
        let Some(text) = normalize_query(raw_query) else {
            tracing::debug!("query is blank after normalization");
            return Ok(None);
        };
        let vector = QueryTopicVector::build(self.model, text.split_whitespace());
        let query = self.filter_query(&vector);
        if query.is_empty() {
            tracing::debug!(k = self.model.k(), "query matches no topic");
            return Ok(None);
        }
        let top = self.engine.search(&query, &ScoringTable::payload_only(), self.max_hits)?;
        tracing::info!(total_hits = top.total_hits, topics = query.len(), "topic candidates");
        Ok(Some(self.score(&top, &vector)))
    }

    /// One payload clause per active topic.
    pub fn filter_query(&self, vector: &QueryTopicVector) -> BooleanQuery {
        let field = topics_payload_field(self.model.k());
        let mut query = BooleanQuery::new();
        for topic in vector.active_topics() {
            query.add(Clause::payload_term(field.clone(), payload_token(topic)));
        }
        query
    }

    /// Rescore candidates with their exact topic vectors, best first. Ties keep
    /// the candidates' retrieval order.
    pub fn score(&self, top: &TopDocs, vector: &QueryTopicVector) -> Vec<RankedResult> {
        let k = self.model.k();
        let field = topics_field(k);
        let query = vector.scoring_vector();

        let mut results = Vec::with_capacity(top.hits.len());
        for hit in &top.hits {
            let Some(document) = self.engine.stored_field(hit.doc, FILE_FIELD) else {
                tracing::warn!(doc = hit.doc, "candidate has no stored file id, skipping");
                continue;
            };
            let Some(encoded) = self.engine.stored_field(hit.doc, &field) else {
                tracing::warn!(
                    doc = hit.doc,
                    document,
                    field = %field,
                    "candidate has no stored topics, skipping"
                );
                continue;
            };
            match decode_exact(encoded, k) {
                Ok(topics) => results.push(RankedResult {
                    document: document.to_string(),
                    score: similarity(&topics, &query),
                }),
                Err(err) => tracing::warn!(
                    doc = hit.doc,
                    document,
                    error = %err,
                    "cannot decode candidate topics, skipping"
                ),
            }
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(self.max_hits);
        results
    }
}
