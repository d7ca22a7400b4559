use bugloc_core::schema::source_document;
use bugloc_core::tokenizer::Analyzer;
use bugloc_core::{
    BooleanQuery, DocId, Engine, Hit, IndexSearcher, IndexWriter, Normalization, Reranker, Result,
    ScoringTable, TopDocs, TopicModel, TopicModels, VsmRanker, Weighting, WeightingStrategy,
    DEFAULT_MAX_HITS,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_model(dir: &Path, theta: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("vocab.dat"), "foo\nbar\n").unwrap();
    fs::write(dir.join("files.dat"), "0 doc0 a\n1 doc1 b\n").unwrap();
    fs::write(dir.join("theta.dat"), theta).unwrap();
    fs::write(dir.join("words.dat"), "1.0 0.0\n0.0 1.0\n").unwrap();
}

fn build_index(root: &Path, theta: &str) -> (IndexSearcher, TopicModels) {
    write_model(&root.join("k2"), theta);
    let mut models = TopicModels::new();
    models.add_scenario(2, root.join("k2")).unwrap();

    let mut writer = IndexWriter::create(root.join("index"), Analyzer::Whitespace).unwrap();
    writer.add_document(source_document("doc0", "doc0", "foo foo\nbar", &models)).unwrap();
    writer.add_document(source_document("doc1", "doc1", "bar baz", &models)).unwrap();
    writer.commit().unwrap();
    (IndexSearcher::open(root.join("index")).unwrap(), models)
}

fn lines(results: &[bugloc_core::RankedResult]) -> Vec<String> {
    results.iter().map(|r| r.to_line()).collect()
}

#[test]
fn reranks_candidates_by_conditional_probability() {
    let root = tempdir().unwrap();
    let (searcher, models) = build_index(root.path(), "0.9 0.1\n0.2 0.8\n");
    let model = models.resolve(Some(2)).unwrap();
    let reranker = Reranker::new(&searcher, model, DEFAULT_MAX_HITS);

    let results = reranker.rank("foo").unwrap().unwrap();
    assert_eq!(lines(&results), vec!["doc0,0.900", "doc1,0.200"]);

    let results = reranker.rank("bar").unwrap().unwrap();
    assert_eq!(lines(&results), vec!["doc1,0.800", "doc0,0.100"]);
}

#[test]
fn nan_theta_values_never_reach_the_ranking() {
    let root = tempdir().unwrap();
    let (searcher, models) = build_index(root.path(), "0.5 NaN\n0.2 0.8\n");
    let reranker = Reranker::new(&searcher, models.resolve(Some(2)).unwrap(), DEFAULT_MAX_HITS);

    let results = reranker.rank("foo bar").unwrap().unwrap();
    assert!(results.iter().all(|r| r.score.is_finite()));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    // doc0's row was zeroed, so it has no topic payload and is not a candidate
    assert_eq!(lines(&results), vec!["doc1,1.000"]);
}

#[test]
fn tied_documents_are_all_kept() {
    let root = tempdir().unwrap();
    let (searcher, models) = build_index(root.path(), "0.5 0.5\n0.5 0.5\n");
    let reranker = Reranker::new(&searcher, models.resolve(None).unwrap(), DEFAULT_MAX_HITS);

    let results = reranker.rank("foo").unwrap().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| (r.score - 0.5).abs() < 1e-6));
    let mut ids: Vec<&str> = results.iter().map(|r| r.document.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["doc0", "doc1"]);
}

#[test]
fn out_of_vocabulary_terms_do_not_change_scores() {
    let root = tempdir().unwrap();
    let (searcher, models) = build_index(root.path(), "0.9 0.1\n0.2 0.8\n");
    let reranker = Reranker::new(&searcher, models.resolve(Some(2)).unwrap(), DEFAULT_MAX_HITS);
    let plain = reranker.rank("foo").unwrap();
    let noisy = reranker.rank("foo quux zork").unwrap();
    assert_eq!(plain, noisy);
}

#[test]
fn queries_without_topics_produce_nothing() {
    let root = tempdir().unwrap();
    let (searcher, models) = build_index(root.path(), "0.9 0.1\n0.2 0.8\n");
    let reranker = Reranker::new(&searcher, models.resolve(Some(2)).unwrap(), DEFAULT_MAX_HITS);
    assert_eq!(reranker.rank("1234!!!").unwrap(), None);
    assert_eq!(reranker.rank("").unwrap(), None);
    assert_eq!(reranker.rank("zzz").unwrap(), None);
}

#[test]
fn max_hits_bounds_the_ranking() {
    let root = tempdir().unwrap();
    let (searcher, models) = build_index(root.path(), "0.9 0.1\n0.2 0.8\n");
    let reranker = Reranker::new(&searcher, models.resolve(Some(2)).unwrap(), 1);
    let results = reranker.rank("foo").unwrap().unwrap();
    assert_eq!(lines(&results), vec!["doc0,0.900"]);
}

/// Serves a fixed candidate list regardless of the query.
struct FixedEngine {
    stored: HashMap<DocId, HashMap<String, String>>,
}

impl FixedEngine {
    fn new(docs: &[(&str, &str)]) -> Self {
        let stored = docs
            .iter()
            .enumerate()
            .map(|(i, (file, topics))| {
                let fields = [
                    ("file".to_string(), file.to_string()),
                    ("topics2".to_string(), topics.to_string()),
                ];
                (i as DocId, fields.into_iter().collect())
            })
            .collect();
        Self { stored }
    }
}

impl Engine for FixedEngine {
    fn search(
        &self,
        _query: &BooleanQuery,
        _scoring: &ScoringTable,
        max_hits: usize,
    ) -> Result<TopDocs> {
        let mut hits: Vec<Hit> = self.stored.keys().map(|&doc| Hit { doc, score: 1.0 }).collect();
        hits.sort_by_key(|h| h.doc);
        let total_hits = hits.len();
        hits.truncate(max_hits);
        Ok(TopDocs { total_hits, hits })
    }

    fn stored_field(&self, doc: DocId, field: &str) -> Option<&str> {
        self.stored.get(&doc)?.get(field).map(String::as_str)
    }

    fn analyzer(&self) -> Analyzer {

        Analyzer::Whitespace

    }
}

fn two_topic_model() -> TopicModel {
    let terms: HashMap<String, usize> =
        [("foo".to_string(), 0), ("bar".to_string(), 1)].into_iter().collect();
    let docs: HashMap<String, usize> = HashMap::new();
    TopicModel::new(2, terms, docs, vec![vec![1.0, 0.0], vec![0.0, 1.0]], Vec::new()).unwrap()
}

#[test]
fn malformed_candidate_encoding_is_skipped() {
    let engine = FixedEngine::new(&[("a", ",0.3,0.7"), ("b", ",0.1"), ("c", ",0.6,0.4")]);
    let model = two_topic_model();
    let reranker = Reranker::new(&engine, &model, DEFAULT_MAX_HITS);
    let results = reranker.rank("foo").unwrap().unwrap();
    assert_eq!(lines(&results), vec!["c,0.600", "a,0.300"]);
}

#[test]
fn equal_scores_keep_retrieval_order() {
    let engine = FixedEngine::new(&[("x", ",0.5,0.5"), ("y", ",0.5,0.1"), ("z", ",0.5,0.9")]);
    let model = two_topic_model();
    let reranker = Reranker::new(&engine, &model, DEFAULT_MAX_HITS);
    let results = reranker.rank("foo").unwrap().unwrap();
    assert_eq!(lines(&results), vec!["x,0.500", "y,0.500", "z,0.500"]);
}

#[test]
fn vsm_ranks_content_matches() {
    let root = tempdir().unwrap();
    let (searcher, _models) = build_index(root.path(), "0.9 0.1\n0.2 0.8\n");
    let strategy = WeightingStrategy::new(Weighting::Basic, Normalization::Overlap);
    let ranker = VsmRanker::new(&searcher, strategy, DEFAULT_MAX_HITS);

    let results = ranker.rank("foo, bar!").unwrap().unwrap();
    // doc0: foo x2 + bar x1; doc1: bar x1
    assert_eq!(lines(&results), vec!["doc0,3.000", "doc1,1.000"]);
    assert_eq!(ranker.build_query("foo foo").len(), 2);
}

#[test]
fn vsm_blank_and_unmatched_queries() {
    let root = tempdir().unwrap();
    let (searcher, _models) = build_index(root.path(), "0.9 0.1\n0.2 0.8\n");
    let ranker = VsmRanker::new(&searcher, WeightingStrategy::default(), DEFAULT_MAX_HITS);
    assert_eq!(ranker.rank("42 ...").unwrap(), None);
    assert_eq!(ranker.rank("nothing").unwrap(), Some(Vec::new()));
}
