use crate::codec::parse_payload_field;
use crate::persist::{
    save_dictionary, save_docs, save_meta, save_postings_for_term, IndexPaths, MetaFile,
    INDEX_VERSION,
};
use crate::tokenizer::Analyzer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub type TermId = u32;
pub type DocId = u32;

/// How a field's value is indexed. Every field value is also stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The whole value is a single term.
    Keyword,
    /// Split into terms by the index analyzer.
    Text,
    /// Not searchable.
    StoredOnly,
    /// Whitespace-separated `term$weight` tokens; the weight becomes the
    /// occurrence's payload.
    Payload,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), value: value.into(), kind }
    }
    pub fn keyword(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, FieldKind::Keyword)
    }
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, FieldKind::Text)
    }
    pub fn stored(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, FieldKind::StoredOnly)
    }
    pub fn payload(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, FieldKind::Payload)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocMeta {
    pub stored: HashMap<String, String>,
    /// Number of indexed tokens per field, for length normalization.
    pub field_lengths: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub freq: u32,
    pub payloads: Vec<f32>, // one per occurrence, empty for unweighted fields
}

/// Per-field term dictionary plus document frequencies indexed by term id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dictionary {
    pub fields: HashMap<String, HashMap<String, TermId>>,
    pub df: Vec<u32>,
}

impl Dictionary {
    pub fn term_id(&self, field: &str, term: &str) -> Option<TermId> {
        self.fields.get(field)?.get(term).copied()
    }

    pub fn doc_freq(&self, term_id: TermId) -> u32 {
        self.df.get(term_id as usize).copied().unwrap_or(0)
    }

    pub fn num_terms(&self) -> usize {

        self.df.len()

    }

    fn intern(&mut self, field: &str, term: &str) -> TermId {
        let next = self.df.len() as TermId;
        let terms = self.fields.entry(field.to_string()).or_default();
        if let Some(&tid) = terms.get(term) {
            return tid;
        }
        terms.insert(term.to_string(), next);
        self.df.push(0);
        next
    }
}

/// Accumulates documents in memory and writes the index on [`IndexWriter::commit`].
pub struct IndexWriter {
    paths: IndexPaths,
    analyzer: Analyzer,
    dictionary: Dictionary,
    postings: HashMap<TermId, Vec<Posting>>,
    docs: HashMap<DocId, DocMeta>,
    next_doc_id: DocId,
}

impl IndexWriter {
    /// Start a fresh index at `root`, deleting whatever index was there.
    ///
    /// `root` must be absent, empty, or a previous index (it holds a
    /// `meta.json`); anything else fails with [`Error::NotAnIndex`].
    pub fn create<P: AsRef<Path>>(root: P, analyzer: Analyzer) -> Result<Self> {
        let paths = IndexPaths::new(root);
        if paths.root.exists() {
            let empty = paths.root.is_dir() && fs::read_dir(&paths.root)?.next().is_none();
            if !empty && !paths.is_index() {
                return Err(Error::NotAnIndex { path: paths.root });
            }
            tracing::info!(dir = %paths.root.display(), "deleting existing index directory");
            fs::remove_dir_all(&paths.root)?;
        }
        fs::create_dir_all(&paths.root)?;
        Ok(Self {
            paths,
            analyzer,
            dictionary: Dictionary::default(),
            postings: HashMap::new(),
            docs: HashMap::new(),
            next_doc_id: 0,
        })
    }

    pub fn num_docs(&self) -> u32 {

        self.next_doc_id

    }

    pub fn add_document(&mut self, doc: Document) -> Result<DocId> {
        let doc_id = self.next_doc_id;
        let mut meta = DocMeta::default();
        // (field, term) -> payloads of each occurrence; weightless occurrences record nothing
        let mut occurrences: HashMap<(String, String), (u32, Vec<f32>)> = HashMap::new();

        for field in doc.fields {
            let tokens: Vec<(String, Option<f32>)> = match field.kind {
                FieldKind::StoredOnly => Vec::new(),
                FieldKind::Keyword => vec![(field.value.clone(), None)],
                FieldKind::Text => self
                    .analyzer
                    .tokenize(&field.value)
                    .into_iter()
                    .map(|(t, _)| (t, None))
                    .collect(),
                FieldKind::Payload => parse_payload_field(&field.value)?
                    .into_iter()
                    .map(|(t, w)| (t, Some(w)))
                    .collect(),
            };
            if field.kind != FieldKind::StoredOnly {
                *meta.field_lengths.entry(field.name.clone()).or_insert(0) += tokens.len() as u32;
            }
            for (term, payload) in tokens {
                let entry = occurrences
                    .entry((field.name.clone(), term))
                    .or_insert((0, Vec::new()));
                entry.0 += 1;
                entry.1.extend(payload);
            }
            meta.stored.insert(field.name, field.value);
        }

        for ((field, term), (freq, payloads)) in occurrences {
            let tid = self.dictionary.intern(&field, &term);
            self.dictionary.df[tid as usize] += 1;
            self.postings.entry(tid).or_default().push(Posting { doc_id, freq, payloads });
        }
        self.docs.insert(doc_id, meta);
        self.next_doc_id += 1;
        Ok(doc_id)
    }

    /// Persist postings, dictionary, stored documents and meta.
    pub fn commit(self) -> Result<MetaFile> {
        for (term_id, mut plist) in self.postings {
            plist.sort_by_key(|p| p.doc_id);
            save_postings_for_term(&self.paths, term_id, &plist)?;
        }
        save_dictionary(&self.paths, &self.dictionary)?;
        save_docs(&self.paths, &self.docs)?;
        let meta = MetaFile {
            num_docs: self.next_doc_id,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            version: INDEX_VERSION,
            analyzer: self.analyzer,
        };
        save_meta(&self.paths, &meta)?;
        tracing::info!(
            num_docs = meta.num_docs,
            num_terms = self.dictionary.num_terms(),
            dir = %self.paths.root.display(),
            "index committed"
        );
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_per_field() {
        let mut dict = Dictionary::default();
        let a = dict.intern("data", "foo");
        let b = dict.intern("file", "foo");
        assert_ne!(a, b);
        assert_eq!(dict.intern("data", "foo"), a);
        assert_eq!(dict.term_id("file", "foo"), Some(b));
        assert_eq!(dict.term_id("data", "bar"), None);
        assert_eq!(dict.num_terms(), 2);
    }

    #[test]
    fn add_document_counts_lengths_and_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IndexWriter::create(dir.path().join("idx"), Analyzer::Whitespace).unwrap();
        let mut doc = Document::new();
        doc.add(Field::keyword("file", "a.c"))
            .add(Field::text("data", "x y x"))
            .add(Field::payload("topicspayload2", " p0$0.75 p1$0.25"));
        assert_eq!(writer.add_document(doc).unwrap(), 0);

        let meta = &writer.docs[&0];
        assert_eq!(meta.field_lengths["data"], 3);
        assert_eq!(meta.field_lengths["topicspayload2"], 2);
        assert_eq!(meta.stored["file"], "a.c");

        let x = writer.dictionary.term_id("data", "x").unwrap();
        assert_eq!(writer.postings[&x][0].freq, 2);
        assert!(writer.postings[&x][0].payloads.is_empty());
        let p0 = writer.dictionary.term_id("topicspayload2", "p0").unwrap();
        assert_eq!(writer.postings[&p0][0].payloads, vec![0.75]);
    }

    #[test]
    fn create_replaces_only_previous_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "int main;").unwrap();
        let err = IndexWriter::create(&src, Analyzer::Whitespace).err().unwrap();
        assert!(matches!(err, Error::NotAnIndex { .. }));
        assert!(src.join("a.c").is_file());

        let idx = dir.path().join("idx");
        IndexWriter::create(&idx, Analyzer::Whitespace).unwrap().commit().unwrap();
        fs::write(idx.join("stale.bin"), "x").unwrap();
        IndexWriter::create(&idx, Analyzer::Whitespace).unwrap();
        assert!(!idx.join("stale.bin").exists());
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IndexWriter::create(dir.path(), Analyzer::Whitespace).unwrap();
        let mut doc = Document::new();
        doc.add(Field::payload("topicspayload2", "p0"));
        assert!(writer.add_document(doc).is_err());
        assert_eq!(writer.num_docs(), 0);
    }
}
