use anyhow::{bail, Context, Result};
use bugloc_core::schema::source_document;
use bugloc_core::tokenizer::Analyzer;
use bugloc_core::topic_model::parse_lda_config;
use bugloc_core::{IndexWriter, TopicModels};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::{DirEntry, WalkDir};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index a source tree with its topic-model distributions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and the topic-model bundle from a source directory
    Build {
        /// Source directory, walked recursively
        #[arg(long)]
        input: PathBuf,
        /// Output index directory (replaced if it exists)
        #[arg(long)]
        output: PathBuf,
        /// Where to write the serialized topic models
        #[arg(long)]
        lda_index: PathBuf,
        /// CSV of `code, file name` pairs; the code becomes the stored file id
        #[arg(long)]
        file_codes: Option<PathBuf>,
        /// Topic model configuration `K,dir`; repeatable
        #[arg(long = "lda-config", value_parser = parse_lda_config)]
        lda_configs: Vec<(usize, PathBuf)>,
        /// Analyzer for the content field
        #[arg(long, default_value_t = Analyzer::Whitespace)]
        analyzer: Analyzer,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, lda_index, file_codes, lda_configs, analyzer } => {
            let codes = match file_codes {
                Some(path) => read_file_codes(&path)?,
                None => HashMap::new(),
            };
            build_index(&input, &output, &lda_index, &codes, &lda_configs, analyzer)
        }
    }
}

fn build_index(
    input: &Path,
    output: &Path,
    lda_index: &Path,
    codes: &HashMap<String, String>,
    lda_configs: &[(usize, PathBuf)],
    analyzer: Analyzer,
) -> Result<()> {
    if !input.is_dir() {
        bail!("input {} is not a directory", input.display());
    }
    check_disjoint(input, output)?;

    let (models, failures) = TopicModels::load_all(lda_configs);
    for (k, err) in &failures {
        eprintln!("skipping topic model K={k}: {err}");
    }
    tracing::info!(loaded = models.len(), failed = failures.len(), "topic models ready");
    models
        .save(lda_index)
        .with_context(|| format!("writing topic models to {}", lda_index.display()))?;

    let mut writer = IndexWriter::create(output, analyzer)?;
    for path in source_files(input) {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(path = %path.display(), "file name is not valid UTF-8, skipping");
            continue;
        };
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read file, skipping");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        let file_id = match codes.get(file_name) {
            Some(code) => code.as_str(),
            None => {
                if !codes.is_empty() {
                    tracing::info!(file = file_name, "no file code, using file name");
                }
                file_name
            }
        };
        let doc = source_document(file_id, file_name, &content, &models);
        let doc_id = writer.add_document(doc)?;
        tracing::debug!(doc_id, file = file_name, "indexed");
    }

    let meta = writer.commit()?;
    tracing::info!(num_docs = meta.num_docs, output = %output.display(), "index build complete");
    Ok(())
}

/// Absolute form of a path that may not exist yet: its nearest existing
/// ancestor is canonicalized and the rest appended.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    while !existing.exists() {
        let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else { break };
        rest.push(name.to_os_string());
        existing = parent;
    }
    let mut resolved = existing.canonicalize()?;
    resolved.extend(rest.iter().rev());
    Ok(resolved)
}

/// The index is rebuilt from scratch, so it must not overlap the source tree.
fn check_disjoint(input: &Path, output: &Path) -> Result<()> {
    let input = resolve(input)?;
    let output = resolve(output)?;
    if output.starts_with(&input) || input.starts_with(&output) {
        bail!("output {} overlaps input {}", output.display(), input.display());
    }
    Ok(())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Regular, non-hidden files under `root`, in a stable order.
fn source_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// `code, file name` per line. Blank lines are ignored.
fn read_file_codes(path: &Path) -> Result<HashMap<String, String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading file codes {}", path.display()))?;
    parse_file_codes(&text).with_context(|| format!("parsing file codes {}", path.display()))
}

fn parse_file_codes(text: &str) -> Result<HashMap<String, String>> {
    let mut codes = HashMap::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((code, name)) = line.split_once(',') else {
            bail!("line {}: expected `code, file name`", n + 1);
        };
        codes.insert(name.trim().to_string(), code.trim().to_string());
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugloc_core::{Engine, IndexSearcher};

    #[test]
    fn file_codes_map_name_to_code() {
        let codes = parse_file_codes("1, Foo.java\n\n2,bar.c\n").unwrap();
        assert_eq!(codes.get("Foo.java").map(String::as_str), Some("1"));
        assert_eq!(codes.get("bar.c").map(String::as_str), Some("2"));
        assert!(parse_file_codes("nocomma\n").is_err());
    }

    #[test]
    fn walk_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/.git")).unwrap();
        fs::write(dir.path().join("src/a.c"), "x").unwrap();
        fs::write(dir.path().join("src/.git/config"), "x").unwrap();
        fs::write(dir.path().join(".hidden"), "x").unwrap();
        fs::write(dir.path().join("b.c"), "x").unwrap();
        let names: Vec<String> = source_files(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.c", "a.c"]);
    }

    #[test]
    fn output_overlapping_input_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "int x;").unwrap();
        let bundle = dir.path().join("lda.bin");
        let codes = HashMap::new();

        for output in [src.clone(), src.join("index"), dir.path().to_path_buf(), src.join(".")] {
            let result = build_index(&src, &output, &bundle, &codes, &[], Analyzer::Whitespace);
            assert!(result.is_err(), "{}", output.display());
            assert!(src.join("a.c").is_file());
        }
        let output = dir.path().join("index");
        build_index(&src, &output, &bundle, &codes, &[], Analyzer::Whitespace).unwrap();
        assert!(src.join("a.c").is_file());
    }

    #[test]
    fn build_indexes_files_with_codes_and_topics() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("doc0"), "foo foo\nbar").unwrap();
        fs::write(src.join("doc1"), "bar").unwrap();
        let model = dir.path().join("k2");
        fs::create_dir_all(&model).unwrap();
        fs::write(model.join("vocab.dat"), "foo\nbar\n").unwrap();
        fs::write(model.join("files.dat"), "0 doc0 x\n").unwrap();
        fs::write(model.join("theta.dat"), "0.9 0.1\n").unwrap();
        fs::write(model.join("words.dat"), "1.0 0.0\n0.0 1.0\n").unwrap();

        let codes: HashMap<String, String> =
            [("doc0".to_string(), "7".to_string())].into_iter().collect();
        let configs = vec![(2, model), (3, dir.path().join("missing"))];
        let bundle = dir.path().join("lda.bin");
        let out = dir.path().join("index");
        build_index(&src, &out, &bundle, &codes, &configs, Analyzer::Whitespace).unwrap();

        let models = TopicModels::open(&bundle).unwrap();
        assert_eq!(models.ks().collect::<Vec<_>>(), vec![2]);
        let searcher = IndexSearcher::open(&out).unwrap();
        assert_eq!(searcher.num_docs(), 2);
        assert_eq!(searcher.stored_field(0, "file"), Some("7"));
        assert_eq!(searcher.stored_field(0, "data"), Some("foo foo bar"));
        assert_eq!(searcher.stored_field(0, "topics2"), Some(",0.9,0.1"));
        assert_eq!(searcher.stored_field(1, "file"), Some("doc1"));
        assert_eq!(searcher.stored_field(1, "topics2"), None);
    }
}
