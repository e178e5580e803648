use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderMappingEntry {
    pub position: usize,
    pub raw_label: String,
    pub field: String,
    pub canonical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub record_count: usize,
    pub brand_count: usize,
    pub category_count: usize,
    pub records_missing_id: usize,
    pub records_missing_brand: usize,
    pub duplicate_id_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_path: String,
    pub source_sha256: String,
    pub counts: CatalogCounts,
    pub header_mapping: Vec<HeaderMappingEntry>,
    pub pass_through_columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPaths {
    pub catalog_path: String,
    pub guideline_path: String,
    pub ledger_path: String,
    pub export_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub ledger_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub target_id: String,
    pub retailer: String,
    pub model: String,
    pub generation: u64,
    pub guideline_kind: String,
    pub catalog_sha256: String,
    pub competitor_ids: Vec<String>,
    pub score: Option<f64>,
    pub failure_kind: Option<String>,
    pub failure_reason: Option<String>,
    pub paths: AnalysisPaths,
}
