use serde_json::{Value, json};

use super::types::{AnalysisRequest, GuidelinePayload};

pub const SYSTEM_INSTRUCTION: &str = "\
You are a marketplace content analyst. You compare one product listing against its \
closest competitors in the same category and recommend concrete content edits.

INPUT:
- The target product and its competitors as JSON records. `image_url` may hold a JSON \
list of URLs; count the URLs it contains.
- Retailer content guidelines, either as text or as attached documents.

TASKS:
- Compare title length, bullet count and clarity, description depth and image count \
against the competitor average.
- If `brand_name` is empty, infer the brand from the title.
- Apply the guidelines strictly and report each relevant rule as pass, fail or warning.
- Propose an improved title, bullets and description for the target product.

OUTPUT: a single JSON object with the fields `score` (0-100), `comparison` (one entry \
per metric with `metric`, `skuValue`, `competitorAvg`, `recommendation`), `topEdits` \
(`title`, `bullets`, `description`, `rulesLink` pointing at the relevant guideline, \
`competitorRef` naming a competitor id from the data) and `complianceCheck` (entries \
with `status` and `issue`).";

pub fn render_prompt(request: &AnalysisRequest) -> serde_json::Result<String> {
    let target = serde_json::to_string_pretty(&request.target)?;
    let competitors = serde_json::to_string_pretty(&request.competitors)?;

    let guideline_section = match &request.guideline {
        GuidelinePayload::Text(text) => format!("GUIDELINES (text):\n{text}"),
        GuidelinePayload::Attachments(attachments) => format!(
            "GUIDELINES: see the {} attached document(s).",
            attachments.len()
        ),
    };

    Ok(format!(
        "Analyze this product for retailer: {retailer}.\n\n\
         TARGET PRODUCT:\n{target}\n\n\
         COMPETITORS ({count}):\n{competitors}\n\n\
         {guideline_section}\n",
        retailer = request.retailer,
        count = request.competitors.len(),
    ))
}

/// JSON schema handed to the oracle so it answers in the result shape.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER", "description": "Overall listing score 0-100" },
            "comparison": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "metric": { "type": "STRING" },
                        "skuValue": { "type": "NUMBER" },
                        "competitorAvg": { "type": "NUMBER" },
                        "recommendation": { "type": "STRING" }
                    },
                    "required": ["metric", "skuValue", "competitorAvg", "recommendation"]
                }
            },
            "topEdits": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "bullets": { "type": "STRING" },
                    "description": { "type": "STRING" },
                    "rulesLink": { "type": "STRING" },
                    "competitorRef": { "type": "STRING" }
                },
                "required": ["title", "bullets", "description", "rulesLink", "competitorRef"]
            },
            "complianceCheck": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "status": { "type": "STRING", "enum": ["pass", "fail", "warning"] },
                        "issue": { "type": "STRING" }
                    },
                    "required": ["status", "issue"]
                }
            }
        },
        "required": ["score", "comparison", "topEdits", "complianceCheck"]
    })
}
