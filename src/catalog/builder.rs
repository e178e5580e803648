use std::collections::HashSet;

use super::header::{HeaderTarget, normalize_header};
use super::record::{CanonicalField, CanonicalRecord};

/// Column index to target field, computed once per header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub labels: Vec<String>,
    pub targets: Vec<HeaderTarget>,
}

impl ColumnPlan {
    /// Pass-through slugs are made unique (`_2`, `_3`, ...) so columns whose
    /// labels collapse to the same slug keep separate values.
    pub fn from_header(header: &[String]) -> Self {
        let mut taken = CanonicalField::ALL
            .into_iter()
            .map(|field| field.key().to_string())
            .collect::<HashSet<String>>();

        let targets = header
            .iter()
            .map(|label| match normalize_header(label) {
                HeaderTarget::PassThrough(slug) => {
                    let unique = unique_slug(&slug, &taken);
                    taken.insert(unique.clone());
                    HeaderTarget::PassThrough(unique)
                }
                canonical => canonical,
            })
            .collect();

        Self {
            labels: header.to_vec(),
            targets,
        }
    }

    pub fn build_records(&self, rows: &[Vec<String>]) -> Vec<CanonicalRecord> {
        rows.iter().map(|row| self.build_record(row)).collect()
    }

    pub fn pass_through_columns(&self) -> Vec<&str> {
        self.targets
            .iter()
            .filter_map(|target| match target {
                HeaderTarget::PassThrough(slug) => Some(slug.as_str()),
                HeaderTarget::Canonical(_) => None,
            })
            .collect()
    }

    pub fn build_record(&self, row: &[String]) -> CanonicalRecord {
        let mut record = CanonicalRecord::default();

        for (index, target) in self.targets.iter().enumerate() {
            let value = row.get(index).map(String::as_str).unwrap_or_default();
            record.set(target.key(), normalize_value(value));
        }

        if record.brand_name.is_empty() {
            if let Some(first_word) = record.title.split_whitespace().next() {
                record.brand_name = first_word.to_string();
            }
        }

        record
    }
}

pub fn build_records(header: &[String], rows: &[Vec<String>]) -> Vec<CanonicalRecord> {
    ColumnPlan::from_header(header).build_records(rows)
}

fn unique_slug(slug: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(slug) {
        return slug.to_string();
    }

    (2..)
        .map(|suffix| format!("{slug}_{suffix}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| slug.to_string())
}

/// Lower-cases descriptive text; URL-like values keep their casing.
pub fn normalize_value(value: &str) -> String {
    if is_url_like(value) {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}

fn is_url_like(value: &str) -> bool {
    let starts_with_http = value
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"));
    starts_with_http || value.starts_with("[\"http")
}
