use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::prompt::{SYSTEM_INSTRUCTION, render_prompt, response_schema};
use super::types::{AnalysisRequest, GuidelinePayload};
use crate::error::{PipelineError, Result};

pub const DEFAULT_ORACLE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// External content-analysis service. Implementations return the raw text of
/// the answer; validation happens in the caller.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, request: &AnalysisRequest) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct GeminiOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

impl GeminiOracle {
    pub fn new(config: OracleConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build oracle HTTP client")?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn complete(&self, request: &AnalysisRequest) -> Result<String> {
        let body = build_generate_request(request)?;
        debug!(endpoint = %self.endpoint(), model = %self.config.model, "calling oracle");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|err| PipelineError::OracleTransport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(PipelineError::OracleTransport(format!(
                "oracle returned {status}: {text}"
            )));
        }

        let body = response.text().await.map_err(|err| {
            PipelineError::OracleTransport(format!("failed to read oracle response: {err}"))
        })?;

        parse_envelope(&body)
    }
}

/// Extracts the answer text from a `generateContent` response body.
fn parse_envelope(body: &str) -> Result<String> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|err| PipelineError::AnalysisParse(format!("malformed oracle envelope: {err}")))?;
    Ok(parsed.text())
}

fn build_generate_request(request: &AnalysisRequest) -> Result<GenerateRequest> {
    let prompt = render_prompt(request)
        .map_err(|err| PipelineError::OracleTransport(format!("failed to encode request: {err}")))?;

    let mut parts = vec![Part::Text { text: prompt }];
    if let GuidelinePayload::Attachments(attachments) = &request.guideline {
        parts.extend(attachments.iter().map(|attachment| Part::InlineData {
            inline_data: InlineData {
                mime_type: attachment.mime_type.clone(),
                data: STANDARD.encode(&attachment.data),
            },
        }));
    }

    Ok(GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text {
                text: SYSTEM_INSTRUCTION.to_string(),
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
        },
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<String>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::analysis::Attachment;
    use crate::catalog::CanonicalRecord;

    fn request(guideline: GuidelinePayload) -> AnalysisRequest {
        AnalysisRequest {
            retailer: "Acme Retail".to_string(),
            target: CanonicalRecord {
                id: "a1".to_string(),
                ..CanonicalRecord::default()
            },
            competitors: Vec::new(),
            guideline,
        }
    }

    #[test]
    fn generate_request_inlines_attachments_as_base64() {
        let body = build_generate_request(&request(GuidelinePayload::Attachments(vec![
            Attachment {
                mime_type: "image/png".to_string(),
                data: b"png!".to_vec(),
            },
        ])))
        .expect("request should build");
        let value = serde_json::to_value(&body).expect("request should serialize");

        let parts = &value["contents"][0]["parts"];
        assert_eq!(value["contents"][0]["role"], "user");
        assert!(parts[0]["text"].as_str().is_some_and(|text| text.contains("a1")));
        assert_eq!(
            parts[1],
            json!({ "inlineData": { "mimeType": "image/png", "data": "cG5nIQ==" } })
        );
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert!(value["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn generate_request_sends_text_guidelines_in_prompt_only() {
        let body = build_generate_request(&request(GuidelinePayload::Text(
            "Max 200 characters.".to_string(),
        )))
        .expect("request should build");

        assert_eq!(body.contents[0].parts.len(), 1);
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let envelope: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"score\"" }, { "text": ": 1}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .expect("envelope should parse");
        assert_eq!(envelope.text(), "{\"score\": 1}");

        let empty: GenerateResponse =
            serde_json::from_value(json!({})).expect("empty envelope should parse");
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn envelope_decode_failures_are_parse_errors() {
        assert_eq!(
            parse_envelope(r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#),
            Ok("ok".to_string())
        );
        assert!(matches!(
            parse_envelope("<html>bad gateway</html>"),
            Err(PipelineError::AnalysisParse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_oracle_is_a_transport_error() {
        let oracle = GeminiOracle::new(OracleConfig {
            api_key: "key".to_string(),
            model: "gemini-test".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
        })
        .expect("client should build");

        let err = oracle
            .complete(&request(GuidelinePayload::Text(String::new())))
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, PipelineError::OracleTransport(_)));
    }

    /// Serves one response whose body stops short of its declared length.
    fn truncated_body_server() -> String {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let address = listener.local_addr().expect("listener address");

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("connection should arrive");
            let mut received = Vec::new();
            let mut buffer = [0_u8; 4096];
            loop {
                let read = stream.read(&mut buffer).expect("request should be readable");
                received.extend_from_slice(&buffer[..read]);
                let text = String::from_utf8_lossy(&received);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if read == 0 {
                    break;
                }
            }

            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 200\r\n\r\n{\"candidates\"",
                )
                .expect("response should be written");
        });

        format!("http://{address}")
    }

    #[tokio::test]
    async fn interrupted_response_body_is_a_transport_error() {
        let oracle = GeminiOracle::new(OracleConfig {
            api_key: "key".to_string(),
            model: "gemini-test".to_string(),
            base_url: truncated_body_server(),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build");

        let err = oracle
            .complete(&request(GuidelinePayload::Text(String::new())))
            .await
            .expect_err("truncated body should fail");
        assert!(
            matches!(err, PipelineError::OracleTransport(_)),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn endpoint_joins_base_url_and_model() {
        let oracle = GeminiOracle::new(OracleConfig {
            api_key: "key".to_string(),
            model: "gemini-test".to_string(),
            base_url: "http://localhost:8080/v1beta/".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build");

        assert_eq!(
            oracle.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
    }
}
