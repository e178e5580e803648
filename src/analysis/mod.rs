mod oracle;
mod prompt;
mod session;
mod types;
mod validate;

pub use oracle::{DEFAULT_MODEL, DEFAULT_ORACLE_URL, GeminiOracle, Oracle, OracleConfig};
pub use prompt::{SYSTEM_INSTRUCTION, render_prompt, response_schema};
pub use session::{
    AnalysisOutcome, AnalysisSession, AnalysisSettings, CompletedAnalysis, analyze,
};
pub use types::{
    AnalysisRequest, AnalysisResult, Attachment, ComplianceItem, ComplianceStatus,
    GuidelinePayload, MetricComparison, TopEdits,
};
pub use validate::parse_analysis_response;
