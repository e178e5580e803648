use super::decode::FIELD_SEPARATOR;
use super::record::CanonicalRecord;
use crate::analysis::AnalysisResult;

/// Applies the suggested title, bullets and description to a copy of
/// `original`. Every other field, pass-through columns included, is kept as is.
pub fn merge(original: &CanonicalRecord, result: &AnalysisResult) -> CanonicalRecord {
    let edits = &result.top_edits;
    CanonicalRecord {
        title: edits.title.clone(),
        bullet_text: edits.bullets.clone(),
        description_text: edits.description.clone(),
        ..original.clone()
    }
}

/// Header line plus one data line; values are always quoted with embedded
/// quotes doubled.
pub fn export_row(record: &CanonicalRecord) -> String {
    let separator = FIELD_SEPARATOR.to_string();

    let header = record
        .entries()
        .map(|(key, _)| export_header_cell(key))
        .collect::<Vec<String>>()
        .join(&separator);
    let values = record
        .entries()
        .map(|(_, value)| quote_cell(value))
        .collect::<Vec<String>>()
        .join(&separator);

    format!("{header}\n{values}\n")
}

fn export_header_cell(key: &str) -> String {
    if key.contains(FIELD_SEPARATOR) || key.contains('"') {
        quote_cell(key)
    } else {
        key.to_string()
    }
}

fn quote_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
