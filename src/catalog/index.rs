use std::collections::HashSet;

use super::builder::ColumnPlan;
use super::decode::decode;
use super::record::CanonicalRecord;
use crate::error::{PipelineError, Result};

/// Immutable, ingestion-ordered collection of catalog records.
#[derive(Debug, Clone)]
pub struct Catalog {
    plan: ColumnPlan,
    records: Vec<CanonicalRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub text: String,
    pub brand: String,
    pub category: String,
}

impl Catalog {
    /// Decodes and builds a catalog. A source without data rows is rejected as
    /// a whole rather than installed empty.
    pub fn ingest(raw: &str) -> Result<Self> {
        let table = decode(raw)?;
        if table.rows.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let plan = ColumnPlan::from_header(&table.header);
        let records = plan.build_records(&table.rows);

        Ok(Self { plan, records })
    }

    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&CanonicalRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn distinct_brands(&self) -> Vec<&str> {
        distinct_non_empty(self.records.iter().map(|record| record.brand_name.as_str()))
    }

    pub fn distinct_categories(&self) -> Vec<&str> {
        distinct_non_empty(self.records.iter().map(|record| record.category.as_str()))
    }

    pub fn search(&self, filter: &SearchFilter) -> Vec<&CanonicalRecord> {
        let needle = filter.text.to_lowercase();

        self.records
            .iter()
            .filter(|record| {
                let matches_text = record.id.to_lowercase().contains(&needle)
                    || record.title.to_lowercase().contains(&needle);
                let matches_brand = filter.brand.is_empty() || record.brand_name == filter.brand;
                let matches_category =
                    filter.category.is_empty() || record.category == filter.category;
                matches_text && matches_brand && matches_category
            })
            .collect()
    }
}

fn distinct_non_empty<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(*value))
        .collect()
}
