use std::sync::LazyLock;

use regex::Regex;

use super::types::AnalysisResult;
use crate::error::{PipelineError, Result};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*\s*(?P<body>.*?)\s*```$").expect("valid code fence regex")
});

/// Parses an oracle response into a checked result. Missing sections, wrong
/// types, unknown compliance statuses and out-of-range scores are all
/// rejected; nothing is defaulted.
pub fn parse_analysis_response(raw: &str) -> Result<AnalysisResult> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(PipelineError::AnalysisParse(
            "empty response from oracle".to_string(),
        ));
    }

    let result: AnalysisResult = serde_json::from_str(body)
        .map_err(|err| PipelineError::AnalysisParse(err.to_string()))?;

    check_result(&result)?;
    Ok(result)
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|captures| captures.name("body"))
        .map(|body| body.as_str())
        .unwrap_or(raw)
}

fn check_result(result: &AnalysisResult) -> Result<()> {
    if !result.score.is_finite() || !(0.0..=100.0).contains(&result.score) {
        return Err(PipelineError::AnalysisParse(format!(
            "score {} outside 0-100",
            result.score
        )));
    }

    Ok(())
}
