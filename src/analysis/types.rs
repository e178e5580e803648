use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::CanonicalRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub score: f64,
    pub comparison: Vec<MetricComparison>,
    pub top_edits: TopEdits,
    pub compliance_check: Vec<ComplianceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricComparison {
    pub metric: String,
    pub sku_value: f64,
    pub competitor_avg: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEdits {
    pub title: String,
    pub bullets: String,
    pub description: String,
    pub rules_link: String,
    pub competitor_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub status: ComplianceStatus,
    pub issue: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Pass,
    Fail,
    Warning,
}

impl ComplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Guideline material sent with a request: either extracted text or binary
/// documents, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidelinePayload {
    Text(String),
    Attachments(Vec<Attachment>),
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub retailer: String,
    pub target: CanonicalRecord,
    pub competitors: Vec<CanonicalRecord>,
    pub guideline: GuidelinePayload,
}
