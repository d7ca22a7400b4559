use bugloc_core::tokenizer::{tokenize, Analyzer};

#[test]
fn it_normalizes_and_stems() {
    let toks = tokenize("Running Runners RUN! The \u{FB01}le menu.");
    let words: Vec<String> = toks.into_iter().map(|(w, _)| w).collect();
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // NFKC folds the "fi" ligature
    assert!(words.contains(&"file".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let toks = Analyzer::Stemmed.tokenize("The quick brown fox and the lazy dog");
    let words: Vec<String> = toks.into_iter().map(|(w, _)| w).collect();
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn whitespace_analyzer_is_verbatim() {
    let toks = Analyzer::Whitespace.tokenize("The quick\nbrown the");
    let words: Vec<String> = toks.into_iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["The", "quick", "brown", "the"]);
}

#[test]
fn analyzer_names_parse() {
    assert_eq!("stemmed".parse::<Analyzer>().unwrap(), Analyzer::Stemmed);
    assert_eq!("Whitespace".parse::<Analyzer>().unwrap(), Analyzer::Whitespace);
    assert!("porter".parse::<Analyzer>().is_err());
    assert_eq!(Analyzer::default(), Analyzer::Whitespace);
}
