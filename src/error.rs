use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("catalog contains no usable rows")]
    EmptyInput,

    #[error("target record not found: {0}")]
    TargetNotFound(String),

    #[error("invalid analysis result: {0}")]
    AnalysisParse(String),

    #[error("oracle request failed: {0}")]
    OracleTransport(String),
}

impl PipelineError {
    /// Errors scoped to a single analysis; the catalog stays usable and the
    /// caller may re-run the analysis for the same target.
    pub fn is_analysis_scoped(&self) -> bool {
        matches!(
            self,
            Self::AnalysisParse(_) | Self::OracleTransport(_) | Self::TargetNotFound(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::TargetNotFound(_) => "target_not_found",
            Self::AnalysisParse(_) => "analysis_parse",
            Self::OracleTransport(_) => "oracle_transport",
        }
    }
}
