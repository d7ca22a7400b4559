use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // a caret escapes the character after it; both are dropped
    static ref ESCAPED: Regex = Regex::new(r"\^.").expect("valid regex");
    static ref NOISE: Regex = Regex::new(r"[0-9\n[:punct:]]").expect("valid regex");
}

/// Strip caret escapes, digits, ASCII punctuation and newlines from a raw
/// query. Returns `None` when nothing but whitespace is left.
pub fn normalize_query(raw: &str) -> Option<String> {
    let text = ESCAPED.replace_all(raw, " ");
    let text = NOISE.replace_all(&text, " ");
    if text.trim().is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}
