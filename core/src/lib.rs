//! Bug localization by ranking source files against bug reports.
//!
//! Two rankers share one index:
//! - [`vsm::VsmRanker`]: vector-space scoring with a selectable
//!   [`weighting::WeightingStrategy`].
//! - [`rerank::Reranker`]: topic-model reranking over pretrained LDA matrices
//!   ([`topic_model::TopicModels`]), using topic payloads stored in the index
//!   ([`codec`]) to gather candidates.

pub mod codec;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod rerank;
pub mod schema;
pub mod search;
pub mod tokenizer;
pub mod topic_model;
pub mod vsm;
pub mod weighting;

pub use error::{Error, Result};
pub use index::{DocId, DocMeta, Document, Field, FieldKind, IndexWriter, Posting, TermId};
pub use rerank::{RankedResult, Reranker, DEFAULT_MAX_HITS};
pub use search::{BooleanQuery, Clause, Engine, Hit, IndexSearcher, TopDocs};
pub use topic_model::{TopicModel, TopicModels};
pub use vsm::VsmRanker;
pub use weighting::{Normalization, ScoringTable, Weighting, WeightingStrategy};
