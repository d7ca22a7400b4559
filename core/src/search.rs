//! Disjunctive query evaluation over a committed index.

use crate::index::{Dictionary, DocId, DocMeta, Posting, TermId};
use crate::persist::{load_index_header, load_postings_for_term, IndexPaths, MetaFile};
use crate::tokenizer::Analyzer;
use crate::weighting::ScoringTable;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

pub const MAX_CLAUSE_COUNT: usize = 8192;

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Scored with the tf/idf/norm callbacks of the [`ScoringTable`].
    Term { field: String, term: String, boost: f32 },
    /// Scored as the average payload of the term's occurrences in the document
    /// (1.0 when the occurrences carry no payload).
    PayloadTerm { field: String, term: String },
}

impl Clause {
    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        Clause::Term { field: field.into(), term: term.into(), boost: 1.0 }
    }

    pub fn payload_term(field: impl Into<String>, term: impl Into<String>) -> Self {
        Clause::PayloadTerm { field: field.into(), term: term.into() }
    }

    fn field_term(&self) -> (&str, &str) {
        match self {
            Clause::Term { field, term, .. } | Clause::PayloadTerm { field, term } => {
                (field.as_str(), term.as_str())
            }
        }
    }

    fn boost(&self) -> f32 {
        match self {
            Clause::Term { boost, .. } => *boost,
            Clause::PayloadTerm { .. } => 1.0,
        }
    }
}

/// A query whose clauses are all optional: a document matches if any clause does.
#[derive(Debug, Clone, Default)]
pub struct BooleanQuery {
    clauses: Vec<Clause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
    pub fn len(&self) -> usize {
        self.clauses.len()
    }
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub doc: DocId,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TopDocs {
    /// Number of matching documents before truncation to `max_hits`.
    pub total_hits: usize,
    pub hits: Vec<Hit>,
}

/// What the rankers need from a full-text index.
pub trait Engine {
    /// Top `max_hits` documents for `query`, best first.
    fn search(&self, query: &BooleanQuery, scoring: &ScoringTable, max_hits: usize)
        -> Result<TopDocs>;

    fn stored_field(&self, doc: DocId, field: &str) -> Option<&str>;

    /// Analyzer the `Text` fields were indexed with.
    fn analyzer(&self) -> Analyzer;
}

/// Read-only handle on a committed index. Postings are read from disk per query term.
pub struct IndexSearcher {
    paths: IndexPaths,
    dictionary: Dictionary,
    docs: HashMap<DocId, DocMeta>,
    meta: MetaFile,
}

impl IndexSearcher {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let (dictionary, docs, meta) = load_index_header(&paths)?;
        tracing::info!(
            num_docs = meta.num_docs,
            num_terms = dictionary.num_terms(),
            dir = %paths.root.display(),
            "opened index"
        );
        Ok(Self { paths, dictionary, docs, meta })
    }

    pub fn num_docs(&self) -> u32 {

        self.meta.num_docs

    }

    pub fn doc(&self, doc: DocId) -> Option<&DocMeta> {

        self.docs.get(&doc)

    }

    fn field_length(&self, doc: DocId, field: &str) -> u32 {
        self.docs.get(&doc).and_then(|m| m.field_lengths.get(field)).copied().unwrap_or(0)
    }
}

impl Engine for IndexSearcher {
    fn search(
        &self,
        query: &BooleanQuery,
        scoring: &ScoringTable,
        max_hits: usize,
    ) -> Result<TopDocs> {
        if query.len() > MAX_CLAUSE_COUNT {
            return Err(Error::TooManyClauses { count: query.len(), max: MAX_CLAUSE_COUNT });
        }
        let n = self.meta.num_docs;

        // Per-clause idf and the query normalization input
        let mut weights: Vec<(Option<TermId>, f32)> = Vec::with_capacity(query.len());
        let mut sum_sq = 0.0f32;
        for clause in query.clauses() {
            let (field, term) = clause.field_term();
            let tid = self.dictionary.term_id(field, term);
            let df = tid.map(|t| self.dictionary.doc_freq(t)).unwrap_or(0);
            let idf = (scoring.idf)(df, n);
            sum_sq += (idf * clause.boost()).powi(2);
            weights.push((tid, idf));
        }
        let query_norm = (scoring.query_norm)(sum_sq);

        let mut loaded: HashMap<TermId, Vec<Posting>> = HashMap::new();
        let mut acc: HashMap<DocId, (f32, u32)> = HashMap::new();
        for (clause, (tid, idf)) in query.clauses().iter().zip(weights) {
            let Some(tid) = tid else { continue };
            if !loaded.contains_key(&tid) {
                loaded.insert(tid, load_postings_for_term(&self.paths, tid)?);
            }
            for p in &loaded[&tid] {
                let contrib = match clause {
                    Clause::Term { field, boost, .. } => {
                        let norm = (scoring.field_norm)(self.field_length(p.doc_id, field));
                        (scoring.tf)(p.freq as f32) * idf * idf * boost * norm
                    }
                    Clause::PayloadTerm { .. } => average(&p.payloads).unwrap_or(1.0),
                };
                let entry = acc.entry(p.doc_id).or_insert((0.0, 0));
                entry.0 += contrib;
                entry.1 += 1;
            }
        }

        let max_overlap = query.len() as u32;
        let mut hits: Vec<Hit> = acc
            .into_iter()
            .map(|(doc, (sum, overlap))| Hit {
                doc,
                score: (scoring.coord)(overlap, max_overlap) * query_norm * sum,
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc.cmp(&b.doc)));
        let total_hits = hits.len();
        hits.truncate(max_hits);
        Ok(TopDocs { total_hits, hits })
    }

    fn stored_field(&self, doc: DocId, field: &str) -> Option<&str> {
        self.docs.get(&doc)?.stored.get(field).map(String::as_str)
    }

    fn analyzer(&self) -> Analyzer {

        self.meta.analyzer

    }
}

fn average(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}
