//! On-disk layout of a committed index.
//!
//! ```text
//! <root>/meta.json                     MetaFile (json)
//! <root>/dictionary.bin                Dictionary
//! <root>/docs.bin                      stored fields and field lengths per doc
//! <root>/postings/{tid:08}.postings.bin  postings of one term, by doc id
//! ```

use crate::index::{Dictionary, DocId, DocMeta, Posting, TermId};
use crate::tokenizer::Analyzer;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const INDEX_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    /// RFC 3339.
    pub created_at: String,
    pub version: u32,
    #[serde(default)]
    pub analyzer: Analyzer,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn dictionary(&self) -> PathBuf {
        self.root.join("dictionary.bin")
    }
    fn docs(&self) -> PathBuf {
        self.root.join("docs.bin")
    }
    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
    /// Whether `root` looks like a committed index.
    pub fn is_index(&self) -> bool {
        self.meta().is_file()
    }
    fn postings(&self, term_id: TermId) -> PathBuf {
        self.root.join("postings").join(format!("{term_id:08}.postings.bin"))
    }
}

fn write_bincode<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut out, value)?;
    out.flush()?;
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

pub fn save_dictionary(paths: &IndexPaths, dict: &Dictionary) -> Result<()> {
    write_bincode(&paths.dictionary(), dict)
}

pub fn load_dictionary(paths: &IndexPaths) -> Result<Dictionary> {
    read_bincode(&paths.dictionary())
}

pub fn save_docs(paths: &IndexPaths, docs: &HashMap<DocId, DocMeta>) -> Result<()> {
    write_bincode(&paths.docs(), docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<HashMap<DocId, DocMeta>> {
    read_bincode(&paths.docs())
}

pub fn save_postings_for_term(
    paths: &IndexPaths,
    term_id: TermId,
    postings: &[Posting],
) -> Result<()> {
    write_bincode(&paths.postings(term_id), postings)
}

pub fn load_postings_for_term(paths: &IndexPaths, term_id: TermId) -> Result<Vec<Posting>> {
    read_bincode(&paths.postings(term_id))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    fs::create_dir_all(&paths.root)?;
    fs::write(paths.meta(), serde_json::to_string_pretty(meta)?)?;
    Ok(())
}

/// Fails with [`Error::IndexVersion`] for an index written by another format version.
pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let meta: MetaFile = serde_json::from_str(&fs::read_to_string(paths.meta())?)?;
    if meta.version != INDEX_VERSION {
        return Err(Error::IndexVersion { found: meta.version, expected: INDEX_VERSION });
    }
    Ok(meta)
}

/// Everything needed to search except the postings, which are read per term.
pub fn load_index_header(
    paths: &IndexPaths,
) -> Result<(Dictionary, HashMap<DocId, DocMeta>, MetaFile)> {
    let meta = load_meta(paths)?;
    let dict = load_dictionary(paths)?;
    let docs = load_docs(paths)?;
    Ok((dict, docs, meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postings_round_trip_under_term_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let postings = vec![Posting { doc_id: 3, freq: 2, payloads: vec![0.5, 0.25] }];
        save_postings_for_term(&paths, 7, &postings).unwrap();
        assert!(dir.path().join("postings/00000007.postings.bin").is_file());

        let loaded = load_postings_for_term(&paths, 7).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].doc_id, 3);
        assert_eq!(loaded[0].payloads, vec![0.5, 0.25]);
    }

    #[test]
    fn meta_without_analyzer_defaults_to_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"num_docs":1,"created_at":"","version":2}"#;
        fs::write(dir.path().join("meta.json"), json).unwrap();
        let meta = load_meta(&IndexPaths::new(dir.path())).unwrap();
        assert_eq!(meta.analyzer, Analyzer::Whitespace);
    }

    #[test]
    fn other_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"num_docs":1,"created_at":"","version":1}"#;
        fs::write(dir.path().join("meta.json"), json).unwrap();
        let err = load_meta(&IndexPaths::new(dir.path())).unwrap_err();
        assert!(matches!(err, Error::IndexVersion { found: 1, expected: 2 }));
    }
}
