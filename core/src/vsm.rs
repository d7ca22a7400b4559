//! Vector-space ranking with a configurable [`WeightingStrategy`].

use crate::query::normalize_query;
use crate::rerank::RankedResult;
use crate::schema::{DATA_FIELD, FILE_FIELD};
use crate::search::{BooleanQuery, Clause, Engine};
use crate::weighting::WeightingStrategy;
use crate::Result;

pub struct VsmRanker<'a, E: Engine + ?Sized> {
    engine: &'a E,
    strategy: WeightingStrategy,
    max_hits: usize,
}

impl<'a, E: Engine + ?Sized> VsmRanker<'a, E> {
    pub fn new(engine: &'a E, strategy: WeightingStrategy, max_hits: usize) -> Self {
        Self { engine, strategy, max_hits }
    }

    /// One clause per analyzed query token over the content field. Repeated
    /// tokens repeat the clause.
    pub fn build_query(&self, text: &str) -> BooleanQuery {
        let mut query = BooleanQuery::new();
        for (term, _pos) in self.engine.analyzer().tokenize(text) {
            query.add(Clause::term(DATA_FIELD, term));
        }
        query
    }

    /// `None` when the query is blank after normalization; otherwise the
    /// engine's ranking, possibly empty.
    pub fn rank(&self, raw_query: &str) -> Result<Option<Vec<RankedResult>>> {
        let Some(text) = normalize_query(raw_query) else {
            tracing::debug!("query is blank after normalization");
            return Ok(None);
        };
        let query = self.build_query(&text);
        let top = self.engine.search(&query, &self.strategy.table(), self.max_hits)?;
        tracing::info!(
            total_hits = top.total_hits,
            weighting = %self.strategy.weighting,
            normalization = %self.strategy.normalization,
            "vsm hits"
        );
        let results = top
            .hits
            .iter()
            .filter_map(|hit| match self.engine.stored_field(hit.doc, FILE_FIELD) {
                Some(document) => Some(RankedResult {
                    document: document.to_string(),
                    score: hit.score,
                }),
                None => {
                    tracing::warn!(doc = hit.doc, "hit has no stored file id, skipping");
                    None
                }
            })
            .collect();
        Ok(Some(results))
    }
}
