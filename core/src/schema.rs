//! Field layout of an indexed source file.

use crate::codec::{encode_exact, encode_sparse_payload, format_payload_field, PAYLOAD_THRESHOLD};
use crate::index::{Document, Field};
use crate::topic_model::TopicModels;

/// Identifier printed in result lines (a file code or the file name).
pub const FILE_FIELD: &str = "file";
/// File content, analyzed for vector-space ranking.
pub const DATA_FIELD: &str = "data";

/// Stored exact topic vector for the model with `k` topics.
pub fn topics_field(k: usize) -> String {
    format!("topics{k}")
}

/// Payload field holding the prominent topics for the model with `k` topics.
pub fn topics_payload_field(k: usize) -> String {
    format!("topicspayload{k}")
}

/// Build the index document for one source file.
///
/// `file_name` is looked up in every model's document list; a model that
/// does not know the file contributes no topic fields.
pub fn source_document(
    file_id: &str,
    file_name: &str,
    content: &str,
    models: &TopicModels,
) -> Document {
    let mut doc = Document::new();
    doc.add(Field::keyword(FILE_FIELD, file_id));
    doc.add(Field::text(DATA_FIELD, content.replace('\n', " ")));

    for model in models.iter() {
        let Some(row) = model.document_row(file_name).and_then(|r| model.theta_row(r)) else {
            tracing::warn!(
                file = file_name,
                k = model.k(),
                "file not in topic model document list"
            );
            continue;
        };
        let sparse = encode_sparse_payload(row, PAYLOAD_THRESHOLD);
        doc.add(Field::stored(topics_field(model.k()), encode_exact(row)));
        doc.add(Field::payload(topics_payload_field(model.k()), format_payload_field(&sparse)));
    }
    doc
}
