use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{} does not exist", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("{artifact}: expected {expected}, found {found}")]
    DimensionMismatch { artifact: String, expected: usize, found: usize },

    #[error("{}:{line}: {reason}", path.display())]
    MalformedMatrix { path: PathBuf, line: usize, reason: String },

    #[error("{}:{line}: expected at least two fields", path.display())]
    MalformedDocumentList { path: PathBuf, line: usize },

    #[error("malformed topic encoding: expected {expected} values, found {found}")]
    MalformedEncoding { expected: usize, found: String },

    /// The serialized topic-model bundle could not be opened or decoded.
    #[error("cannot load topic models from {}: {reason}", path.display())]
    ModelLoadFailure { path: PathBuf, reason: String },

    #[error("invalid {option}: {value}")]
    InvalidOption { option: &'static str, value: String },

    /// `IndexWriter::create` only replaces directories that hold an index.
    #[error("refusing to replace {}: not an index directory", path.display())]
    NotAnIndex { path: PathBuf },

    #[error("index format version {found} is not supported, expected {expected}")]
    IndexVersion { found: u32, expected: u32 },

    #[error("query has {count} clauses, maximum is {max}")]
    TooManyClauses { count: usize, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
