use super::index::Catalog;
use super::record::CanonicalRecord;

pub const DEFAULT_COMPETITOR_LIMIT: usize = 3;

/// Rank assigned when `avg_rank_category` is missing or not numeric. Real
/// ranks above this value would sort after unranked records.
pub const UNRANKED_SENTINEL: f64 = 999.0;

pub fn rank_metric(record: &CanonicalRecord) -> f64 {
    record
        .category_rank_avg
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(UNRANKED_SENTINEL)
}

/// Same-category peers of `target`, best (lowest) rank first. Ties keep
/// ingestion order.
pub fn select_top<'a>(
    target: &CanonicalRecord,
    catalog: &'a Catalog,
    limit: usize,
) -> Vec<&'a CanonicalRecord> {
    let mut candidates = catalog
        .records()
        .iter()
        .filter(|record| record.category == target.category && record.id != target.id)
        .map(|record| (rank_metric(record), record))
        .collect::<Vec<(f64, &CanonicalRecord)>>();

    candidates.sort_by(|left, right| left.0.total_cmp(&right.0));

    candidates
        .into_iter()
        .take(limit)
        .map(|(_, record)| record)
        .collect()
}
