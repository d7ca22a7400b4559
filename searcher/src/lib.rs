//! Batch execution of query files against a committed index.
//!
//! Every file of a query directory is one bug report. Its ranking is written
//! to a file of the same name in the results directory, one
//! `document,score` line per ranked document.

use anyhow::{Context, Result};
use bugloc_core::{
    Error, IndexSearcher, RankedResult, Reranker, TopicModels, VsmRanker, WeightingStrategy,
    DEFAULT_MAX_HITS,
};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub max_hits: usize,
    /// Topic count to rank with; `None` picks the lowest loaded K.
    pub k: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_hits: DEFAULT_MAX_HITS, k: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Queries that produced a result file.
    pub executed: usize,
    /// Queries with nothing to search for.
    pub skipped: usize,
    pub failed: usize,
}

/// Run `rank` over every regular, non-hidden file of `query_dir` in name
/// order. A query the ranker answers with `None` gets no result file.
pub fn run_directory<F>(query_dir: &Path, results_dir: &Path, mut rank: F) -> Result<BatchSummary>
where
    F: FnMut(&str) -> bugloc_core::Result<Option<Vec<RankedResult>>>,
{
    fs::create_dir_all(results_dir).with_context(|| format!("creating {}", results_dir.display()))?;
    let mut summary = BatchSummary::default();

    for path in query_files(query_dir)? {
        let Some(name) = path.file_name() else { continue };
        let out = results_dir.join(name);
        let outcome = fs::read(&path)
            .map_err(Error::from)
            .and_then(|bytes| rank(&*String::from_utf8_lossy(&bytes)));
        match outcome {
            Ok(Some(results)) => match write_results(&out, &results) {
                Ok(()) => {
                    tracing::info!(
                        query = %path.display(),
                        results = results.len(),
                        "query executed"
                    );
                    summary.executed += 1;
                }
                Err(err) => {
                    tracing::error!(query = %path.display(), error = %err, "cannot write results");
                    summary.failed += 1;
                }
            },
            Ok(None) => {
                tracing::info!(query = %path.display(), "nothing to search for, no output");
                summary.skipped += 1;
            }
            Err(err) => {
                tracing::error!(query = %path.display(), error = %err, "query failed");
                summary.failed += 1;
            }
        }
    }
    tracing::info!(
        executed = summary.executed,
        skipped = summary.skipped,
        failed = summary.failed,
        "batch complete"
    );
    Ok(summary)
}

fn query_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("reading query directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let hidden = entry.file_name().to_str().map(|n| n.starts_with('.')).unwrap_or(false);
        if !hidden && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn write_results(path: &Path, results: &[RankedResult]) -> std::io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for r in results {
        writeln!(out, "{}", r.to_line())?;
    }
    out.flush()
}

/// Rank every query with the vector-space model.
pub fn run_vsm(
    index_dir: &Path,
    query_dir: &Path,
    results_dir: &Path,
    strategy: WeightingStrategy,
    max_hits: usize,
) -> Result<BatchSummary> {
    let searcher = IndexSearcher::open(index_dir)
        .with_context(|| format!("opening index {}", index_dir.display()))?;
    tracing::info!(
        weighting = %strategy.weighting,
        normalization = %strategy.normalization,
        "vsm batch"
    );
    let ranker = VsmRanker::new(&searcher, strategy, max_hits);
    run_directory(query_dir, results_dir, |query| ranker.rank(query))
}

/// Rerank every query with the topic model for `config.k`.
pub fn run_lda(
    index_dir: &Path,
    lda_index: &Path,
    query_dir: &Path,
    results_dir: &Path,
    config: SearchConfig,
) -> Result<BatchSummary> {
    let models = TopicModels::open(lda_index)?;
    let Some(model) = models.resolve(config.k) else {
        return Err(Error::ModelLoadFailure {
            path: lda_index.to_path_buf(),
            reason: "bundle holds no topic model".into(),
        }
        .into());
    };
    let searcher = IndexSearcher::open(index_dir)
        .with_context(|| format!("opening index {}", index_dir.display()))?;
    tracing::info!(k = model.k(), max_hits = config.max_hits, "lda batch");
    let reranker = Reranker::new(&searcher, model, config.max_hits);
    run_directory(query_dir, results_dir, |query| reranker.rank(query))
}
