use crate::error::{PipelineError, Result};

pub const FIELD_SEPARATOR: char = ',';
const QUOTE: char = '"';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn decode(raw: &str) -> Result<DecodedTable> {
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next().map(split_line).ok_or(PipelineError::EmptyInput)?;
    let rows = lines.map(split_line).collect::<Vec<Vec<String>>>();

    Ok(DecodedTable { header, rows })
}

/// Splits one line on unquoted separators. Quotes toggle quoted mode and are
/// not kept, except a doubled quote inside a quoted field, which yields one
/// literal quote.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(character) = chars.next() {
        match character {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                chars.next();
                current.push(QUOTE);
            }
            QUOTE => in_quotes = !in_quotes,
            FIELD_SEPARATOR if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(character),
        }
    }

    fields.push(current.trim().to_string());
    fields
}
