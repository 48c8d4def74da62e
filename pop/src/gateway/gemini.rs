//! Gemini gateway implementation
//!
//! Implements [`PlanGateway`] against the Gemini `generateContent` HTTP API.
//! Decomposition constrains the response with a JSON schema; image execution
//! asks for inline image bytes. Responses are defensively unwrapped from
//! markdown code fences before structural parsing, since upstream output is
//! not guaranteed to be bare JSON.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ResolvedGatewayConfig;
use crate::domain::TaskDraft;

use super::{GatewayError, ImageConfig, ImageReference, MAX_DRAFTS, MIN_DRAFTS, NO_OUTPUT, PlanGateway};

/// Gemini API client
pub struct GeminiGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
    /// Rendered system instruction for decomposition
    decompose_instruction: String,
}

impl GeminiGateway {
    /// Create a gateway from resolved configuration
    ///
    /// `decompose_instruction` is the rendered decomposition prompt; it is
    /// fixed for the gateway's lifetime.
    pub fn from_config(config: &ResolvedGatewayConfig, decompose_instruction: String) -> Result<Self, GatewayError> {
        debug!(model = %config.model, image_model = %config.image_model, "GeminiGateway::from_config");
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GatewayError::Network)?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            image_model: config.image_model.clone(),
            decompose_instruction,
        })
    }

    fn build_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    /// POST a generateContent request and parse the response envelope
    async fn post(&self, model: &str, body: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let url = self.build_url(model);
        let response = self.http.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            debug!(status, "GeminiGateway::post: API error");
            return Err(GatewayError::Api { status, message });
        }

        let parsed: GenerateResponse = response.json().await?;
        if let Some(error) = parsed.error {
            debug!(message = %error.message, "GeminiGateway::post: error payload");
            return Err(GatewayError::Api {
                status: error.code.unwrap_or(0),
                message: error.message,
            });
        }
        Ok(parsed)
    }
}

#[async_trait]
impl PlanGateway for GeminiGateway {
    async fn decompose(&self, idea: &str) -> Result<Vec<TaskDraft>, GatewayError> {
        debug!(idea_len = idea.len(), model = %self.model, "decompose: called");
        let body = GenerateRequest {
            contents: vec![Content::user(idea)],
            system_instruction: Some(SystemInstruction::from_text(&self.decompose_instruction)),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(draft_schema()),
                image_config: None,
            }),
        };

        // The whole decomposition attempt fails as one unit: transport
        // problems and unusable payloads are the same outcome for the caller.
        let response = self
            .post(&self.model, &body)
            .await
            .map_err(|e| GatewayError::Decomposition(e.to_string()))?;

        let text = response
            .text()
            .ok_or_else(|| GatewayError::Decomposition("response contained no text".to_string()))?;

        let drafts = parse_drafts(&text)?;
        debug!(draft_count = drafts.len(), "decompose: drafts parsed");
        Ok(drafts)
    }

    async fn execute_text(&self, prompt: &str) -> Result<String, GatewayError> {
        debug!(prompt_len = prompt.len(), model = %self.model, "execute_text: called");
        let body = GenerateRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            generation_config: None,
        };

        let response = self
            .post(&self.model, &body)
            .await
            .map_err(|e| GatewayError::Execution(e.to_string()))?;

        // Empty output is tolerated and degrades to the sentinel.
        Ok(response.text().filter(|t| !t.trim().is_empty()).unwrap_or_else(|| {
            debug!("execute_text: empty response, using sentinel");
            NO_OUTPUT.to_string()
        }))
    }

    async fn execute_image(&self, prompt: &str, config: &ImageConfig) -> Result<ImageReference, GatewayError> {
        debug!(
            prompt_len = prompt.len(),
            model = %self.image_model,
            aspect_ratio = %config.aspect_ratio,
            size = %config.size,
            "execute_image: called"
        );
        let body = GenerateRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                image_config: Some(*config),
            }),
        };

        let response = self.post(&self.image_model, &body).await?;
        let parts = response.into_parts();
        image_from_parts(parts)
    }
}

/// The decomposition response schema, mirrored from the draft wire format
fn draft_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "task_name": {
                    "type": "STRING",
                    "description": "Name of the task in the user's language"
                },
                "executor_type": {
                    "type": "STRING",
                    "enum": ["AI", "HUMAN", "TOOL"],
                    "description": "Who should execute this task"
                },
                "actionable_content": {
                    "type": "STRING",
                    "description": "The prompt, job description, or tool recommendation"
                }
            },
            "required": ["task_name", "executor_type", "actionable_content"]
        }
    })
}

/// Strip an optional markdown code fence wrapper from model output
///
/// Handles both ```json ... ``` and bare ``` ... ``` wrappers.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    for opener in ["```json", "```"] {
        if let Some(rest) = trimmed.strip_prefix(opener)
            && let Some(inner) = rest.trim_start().strip_suffix("```")
        {
            return inner.trim();
        }
    }
    trimmed
}

/// Parse and validate decomposition output into task drafts
pub(crate) fn parse_drafts(text: &str) -> Result<Vec<TaskDraft>, GatewayError> {
    let cleaned = strip_code_fences(text);
    let drafts: Vec<TaskDraft> = serde_json::from_str(cleaned)
        .map_err(|e| GatewayError::Decomposition(format!("response is not a valid draft list: {}", e)))?;

    if !(MIN_DRAFTS..=MAX_DRAFTS).contains(&drafts.len()) {
        return Err(GatewayError::Decomposition(format!(
            "expected {} to {} tasks, got {}",
            MIN_DRAFTS,
            MAX_DRAFTS,
            drafts.len()
        )));
    }
    for (idx, draft) in drafts.iter().enumerate() {
        if draft.name.trim().is_empty() || draft.actionable_content.trim().is_empty() {
            return Err(GatewayError::Decomposition(format!(
                "task {} has an empty name or content",
                idx + 1
            )));
        }
    }
    Ok(drafts)
}

/// Resolve the image call's response parts into a reference
///
/// Image bytes win over any accompanying text. Text without bytes is a
/// refusal. Neither is a distinct failure.
pub(crate) fn image_from_parts(parts: Vec<ResponsePart>) -> Result<ImageReference, GatewayError> {
    let mut refusal = String::new();

    for part in parts {
        if let Some(inline) = part.inline_data {
            match BASE64.decode(inline.data.as_bytes()) {
                Ok(decoded) => {
                    let mime_type = if inline.mime_type.is_empty() {
                        "image/png".to_string()
                    } else {
                        inline.mime_type
                    };
                    return Ok(ImageReference {
                        uri: format!("data:{};base64,{}", mime_type, inline.data),
                        mime_type,
                        bytes: decoded.len(),
                    });
                }
                Err(e) => {
                    // Undecodable payloads are treated as absent.
                    warn!(error = %e, "image_from_parts: discarding undecodable inline data");
                }
            }
        }
        if let Some(text) = part.text {
            refusal.push_str(&text);
        }
    }

    if !refusal.trim().is_empty() {
        return Err(GatewayError::Refused { reason: refusal });
    }
    Err(GatewayError::NoImage)
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

impl SystemInstruction {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiErrorDetail>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts, if any
    fn text(self) -> Option<String> {
        let parts = self.into_parts();
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() { None } else { Some(text) }
    }

    /// All parts of the first candidate
    fn into_parts(self) -> Vec<ResponsePart> {
        self.candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponsePart {
    pub(crate) text: Option<String>,
    pub(crate) inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    #[serde(default)]
    pub(crate) mime_type: String,
    pub(crate) data: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::domain::ExecutorType;

    const SIX_DRAFTS: &str = r#"[
        {"task_name":"scout location","executor_type":"HUMAN","actionable_content":"Visit three candidate sites"},
        {"task_name":"name the bakery","executor_type":"AI","actionable_content":"Propose ten names"},
        {"task_name":"write tagline","executor_type":"AI","actionable_content":"Write a warm one-line tagline"},
        {"task_name":"design logo","executor_type":"AI","actionable_content":"A minimal wheat-sheaf logo"},
        {"task_name":"set up payments","executor_type":"TOOL","actionable_content":"Use a card terminal provider"},
        {"task_name":"hire a baker","executor_type":"HUMAN","actionable_content":"Interview candidates"}
    ]"#;

    fn gateway() -> GeminiGateway {
        let config = GatewayConfig {
            api_key_env: "POP_TEST_KEY".to_string(),
            ..GatewayConfig::default()
        };
        // SAFETY: test-only env mutation
        unsafe { std::env::set_var("POP_TEST_KEY", "test-key") };
        let resolved = config.resolve().expect("resolve should succeed with env key");
        GeminiGateway::from_config(&resolved, "instruction".to_string()).expect("gateway should build")
    }

    #[test]
    fn test_build_url() {
        let gw = gateway();
        let url = gw.build_url("gemini-2.5-flash");
        assert!(url.contains("models/gemini-2.5-flash:generateContent"));
        assert!(url.contains("key=test-key"));
    }

    #[test]
    fn test_strip_code_fences_json_fence() {
        assert_eq!(strip_code_fences("```json\n[1,2]\n```"), "[1,2]");
    }

    #[test]
    fn test_strip_code_fences_bare_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_code_fences_passthrough() {
        assert_eq!(strip_code_fences("  [1,2,3]  "), "[1,2,3]");
    }

    #[test]
    fn test_parse_drafts_bare_json() {
        let drafts = parse_drafts(SIX_DRAFTS).expect("six drafts should parse");
        assert_eq!(drafts.len(), 6);
        assert_eq!(drafts[0].executor, ExecutorType::Human);
        assert_eq!(drafts[1].executor, ExecutorType::Ai);
        assert_eq!(drafts[0].name, "scout location");
    }

    #[test]
    fn test_parse_drafts_fenced_json() {
        let fenced = format!("```json\n{}\n```", SIX_DRAFTS);
        let drafts = parse_drafts(&fenced).expect("fenced drafts should parse");
        assert_eq!(drafts.len(), 6);
    }

    #[test]
    fn test_parse_drafts_rejects_garbage() {
        let err = parse_drafts("the model apologizes").unwrap_err();
        assert!(matches!(err, GatewayError::Decomposition(_)));
    }

    #[test]
    fn test_parse_drafts_rejects_count_out_of_range() {
        let four = r#"[
            {"task_name":"a","executor_type":"AI","actionable_content":"x"},
            {"task_name":"b","executor_type":"AI","actionable_content":"x"},
            {"task_name":"c","executor_type":"AI","actionable_content":"x"},
            {"task_name":"d","executor_type":"AI","actionable_content":"x"}
        ]"#;
        assert!(matches!(parse_drafts(four), Err(GatewayError::Decomposition(_))));
    }

    #[test]
    fn test_parse_drafts_rejects_unknown_executor() {
        let bad = SIX_DRAFTS.replace("\"HUMAN\"", "\"ROBOT\"");
        assert!(matches!(parse_drafts(&bad), Err(GatewayError::Decomposition(_))));
    }

    #[test]
    fn test_parse_drafts_rejects_empty_fields() {
        let bad = SIX_DRAFTS.replace("Visit three candidate sites", "   ");
        assert!(matches!(parse_drafts(&bad), Err(GatewayError::Decomposition(_))));
    }

    fn inline_part(data: &str) -> ResponsePart {
        ResponsePart {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: data.to_string(),
            }),
        }
    }

    fn text_part(text: &str) -> ResponsePart {
        ResponsePart {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    #[test]
    fn test_image_from_parts_bytes_win() {
        let payload = BASE64.encode(b"pngbytes");
        let parts = vec![text_part("here is your image"), inline_part(&payload)];
        let image = image_from_parts(parts).expect("bytes should win over text");
        assert_eq!(image.uri, format!("data:image/png;base64,{}", payload));
        assert_eq!(image.bytes, 8);
    }

    #[test]
    fn test_image_from_parts_refusal() {
        let parts = vec![text_part("I can't generate that image.")];
        match image_from_parts(parts) {
            Err(GatewayError::Refused { reason }) => assert!(reason.contains("can't generate")),
            other => panic!("expected refusal, got {:?}", other.map(|i| i.uri)),
        }
    }

    #[test]
    fn test_image_from_parts_neither() {
        assert!(matches!(image_from_parts(vec![]), Err(GatewayError::NoImage)));
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response = GenerateResponse {
            candidates: Some(vec![Candidate {
                content: Some(CandidateContent {
                    parts: Some(vec![text_part("Hello "), text_part("world")]),
                }),
            }]),
            error: None,
        };
        assert_eq!(response.text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_decompose_request_serializes_schema() {
        let body = GenerateRequest {
            contents: vec![Content::user("idea")],
            system_instruction: Some(SystemInstruction::from_text("sys")),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(draft_schema()),
                image_config: None,
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn test_image_request_serializes_config() {
        let body = GenerateRequest {
            contents: vec![Content::user("a poster")],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                image_config: Some(ImageConfig::default()),
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
        assert_eq!(json["generationConfig"]["imageConfig"]["imageSize"], "1K");
    }
}
