//! Pretrained topic models, one per topic count K.
//!
//! A model directory holds four artifacts produced by an offline LDA run:
//!
//! - `vocab.dat`: one vocabulary term per line; the line number is the term id.
//! - `files.dat`: one whitespace-delimited record per document; the second field
//!   is the document identifier and the record number is its row.
//! - `theta.dat`: document-topic matrix, D rows of K floats.
//! - `words.dat`: topic-term matrix, K rows of W floats.
//!
//! Rows are not checked to be probability distributions.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const VOCAB_FILE: &str = "vocab.dat";
pub const FILES_FILE: &str = "files.dat";
pub const THETA_FILE: &str = "theta.dat";
pub const PHI_FILE: &str = "words.dat";

/// Token that marks a row MALLET could not estimate.
const NAN_MARKER: &str = "nan";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicModel {
    k: usize,
    term_index: HashMap<String, usize>,
    document_index: HashMap<String, usize>,
    /// K rows x W columns.
    phi: Vec<Vec<f32>>,
    /// D rows x K columns.
    theta: Vec<Vec<f32>>,
}

impl TopicModel {
    /// Build a model from in-memory parts, checking the same dimensions
    /// as [`TopicModel::load`].
    pub fn new(
        k: usize,
        term_index: HashMap<String, usize>,
        document_index: HashMap<String, usize>,
        phi: Vec<Vec<f32>>,
        theta: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let w = term_index.len();
        let d = document_index.len();
        check_shape("theta", &theta, d, k)?;
        check_shape("phi", &phi, k, w)?;
        Ok(Self { k, term_index, document_index, phi, theta })
    }

    pub fn load<P: AsRef<Path>>(k: usize, dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let vocab = dir.join(VOCAB_FILE);
        let files = dir.join(FILES_FILE);
        let theta = dir.join(THETA_FILE);
        let phi = dir.join(PHI_FILE);
        for path in [&vocab, &files, &theta, &phi] {
            if !path.is_file() {
                return Err(Error::MissingArtifact { path: path.clone() });
            }
        }

        let term_index = read_vocabulary(&vocab)?;
        let document_index = read_document_list(&files)?;
        let d = document_index.len();
        let w = term_index.len();
        tracing::debug!(k, d, w, dir = %dir.display(), "reading topic matrices");

        let theta = read_matrix(&theta, d, k)?;
        let phi = read_matrix(&phi, k, w)?;
        Ok(Self { k, term_index, document_index, phi, theta })
    }

    pub fn k(&self) -> usize {

        self.k

    }
    pub fn num_terms(&self) -> usize {
        self.term_index.len()
    }
    pub fn num_documents(&self) -> usize {
        self.document_index.len()
    }

    pub fn term_id(&self, term: &str) -> Option<usize> {
        self.term_index.get(term).copied()
    }

    pub fn document_row(&self, document: &str) -> Option<usize> {
        self.document_index.get(document).copied()
    }

    /// Topic distribution of the document at `row`.
    pub fn theta_row(&self, row: usize) -> Option<&[f32]> {
        self.theta.get(row).map(Vec::as_slice)
    }

    /// Relevance of term `term_id` to `topic`.
    pub fn phi(&self, topic: usize, term_id: usize) -> f32 {
        self.phi[topic][term_id]
    }
}

impl TopicModel {
    /// Re-check the dimension and index invariants, for models that did not
    /// come through [`TopicModel::new`] or [`TopicModel::load`].
    fn validate(&self) -> Result<()> {
        check_shape("theta", &self.theta, self.num_documents(), self.k)?;
        check_shape("phi", &self.phi, self.k, self.num_terms())?;
        check_ids("term index", &self.term_index)?;
        check_ids("document index", &self.document_index)
    }
}

fn check_shape(artifact: &str, matrix: &[Vec<f32>], rows: usize, cols: usize) -> Result<()> {
    if matrix.len() != rows {
        return Err(Error::DimensionMismatch {
            artifact: format!("{artifact} rows"),
            expected: rows,
            found: matrix.len(),
        });
    }
    if let Some(bad) = matrix.iter().find(|r| r.len() != cols) {
        return Err(Error::DimensionMismatch {
            artifact: format!("{artifact} columns"),
            expected: cols,
            found: bad.len(),
        });
    }
    Ok(())
}

/// Every id must address a row or column of the matrices.
fn check_ids(artifact: &str, index: &HashMap<String, usize>) -> Result<()> {
    match index.values().copied().find(|&id| id >= index.len()) {
        Some(id) => Err(Error::DimensionMismatch {
            artifact: format!("{artifact} id"),
            expected: index.len(),
            found: id,
        }),
        None => Ok(()),
    }
}

fn read_vocabulary(path: &Path) -> Result<HashMap<String, usize>> {
    let reader = BufReader::new(File::open(path)?);
    let mut terms = HashMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        terms.insert(line.trim_end_matches('\r').to_string(), idx);
    }
    Ok(terms)
}

fn read_document_list(path: &Path) -> Result<HashMap<String, usize>> {
    let reader = BufReader::new(File::open(path)?);
    let mut docs = HashMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let name = line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| Error::MalformedDocumentList {
                path: path.to_path_buf(),
                line: idx + 1,
            })?;
        docs.insert(name.to_string(), idx);
    }
    Ok(docs)
}

/// Read a whitespace-delimited float matrix of exactly `rows` x `cols`.
pub fn read_matrix(path: &Path, rows: usize, cols: usize) -> Result<Vec<Vec<f32>>> {
    let reader = BufReader::new(File::open(path)?);
    let mut matrix = Vec::with_capacity(rows);
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_row(&line, cols).map_err(|reason| Error::MalformedMatrix {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
        if row.len() != cols {
            return Err(Error::DimensionMismatch {
                artifact: format!("{} line {} columns", path.display(), idx + 1),
                expected: cols,
                found: row.len(),
            });
        }
        matrix.push(row);
    }
    if matrix.len() != rows {
        return Err(Error::DimensionMismatch {
            artifact: format!("{} rows", path.display()),
            expected: rows,
            found: matrix.len(),
        });
    }
    Ok(matrix)
}

fn is_nan_marker(token: &str) -> bool {
    token.trim_start_matches(&['+', '-'][..]).eq_ignore_ascii_case(NAN_MARKER)
}

/// Parse one matrix row. Any NaN token, in any case or sign, zeroes the whole
/// row. Infinite values are rejected.
fn parse_row(line: &str, cols: usize) -> std::result::Result<Vec<f32>, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.iter().any(|t| is_nan_marker(t)) {
        return Ok(vec![0.0; cols]);
    }
    tokens
        .iter()
        .map(|t| match t.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(v),
            Ok(_) => Err(format!("not a finite number: {t:?}")),
            Err(_) => Err(format!("not a number: {t:?}")),
        })
        .collect()
}

/// All loaded topic models, keyed by K.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TopicModels {
    models: BTreeMap<usize, TopicModel>,
}

impl TopicModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: TopicModel) {
        self.models.insert(model.k(), model);
    }

    pub fn add_scenario<P: AsRef<Path>>(&mut self, k: usize, dir: P) -> Result<()> {
        tracing::info!(k, dir = %dir.as_ref().display(), "adding topic model");
        let model = TopicModel::load(k, dir)?;
        self.insert(model);
        Ok(())
    }

    /// Load every `(K, dir)` configuration. A configuration that fails is
    /// returned with its error and left out; the others still load.
    pub fn load_all(configs: &[(usize, PathBuf)]) -> (Self, Vec<(usize, Error)>) {
        let mut models = Self::new();
        let mut failures = Vec::new();
        for (k, dir) in configs {
            if let Err(err) = models.add_scenario(*k, dir) {
                tracing::error!(k, dir = %dir.display(), error = %err, "skipping topic model");
                failures.push((*k, err));
            }
        }
        (models, failures)
    }

    pub fn is_empty(&self) -> bool {

        self.models.is_empty()

    }
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn ks(&self) -> impl Iterator<Item = usize> + '_ {
        self.models.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicModel> {
        self.models.values()
    }

    pub fn get(&self, k: usize) -> Option<&TopicModel> {
        self.models.get(&k)
    }

    /// Model for `k`, falling back to the lowest K when `k` is absent or not loaded.
    pub fn resolve(&self, k: Option<usize>) -> Option<&TopicModel> {
        if let Some(model) = k.and_then(|k| self.models.get(&k)) {
            return Some(model);
        }
        let fallback = self.models.values().next();
        if let (Some(requested), Some(model)) = (k, fallback) {
            tracing::info!(requested, using = model.k(), "unknown topic count, using lowest K");
        }
        fallback
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Open a bundle written by [`TopicModels::save`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let failure = |reason: String| Error::ModelLoadFailure { path: path.to_path_buf(), reason };
        let file = File::open(path).map_err(|e| failure(e.to_string()))?;
        let models: Self =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| failure(e.to_string()))?;
        for (&k, model) in &models.models {
            if k != model.k {
                return Err(failure(format!("model stored under K={k} has {} topics", model.k)));
            }
            model.validate().map_err(|e| failure(format!("K={k}: {e}")))?;
        }
        Ok(models)
    }
}

/// Parse a `K,dir` topic configuration argument.
pub fn parse_lda_config(value: &str) -> Result<(usize, PathBuf)> {
    let invalid = || Error::InvalidOption {
        option: "topic configuration",
        value: value.to_string(),
    };
    let (k, dir) = value.split_once(',').ok_or_else(invalid)?;
    let k: usize = k.trim().parse().map_err(|_| invalid())?;
    let dir = dir.trim();
    if k == 0 || dir.is_empty() {
        return Err(invalid());
    }
    Ok((k, PathBuf::from(dir)))
}
