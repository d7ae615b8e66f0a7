use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{MessagePart, Provider, ProviderFuture, ProviderResponse, ProviderUsage};
use crate::settings::DEFAULT_MODEL;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
pub struct Gemini {
    key: String,
    model: String,
    client: reqwest::Client,
    parts: Vec<MessagePart>,
}

impl Gemini {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
            parts: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Ok(client) = reqwest::Client::builder().timeout(timeout).build() {
            self.client = client;
        }
        self
    }

}

impl Provider for Gemini {
    fn append_user_input(mut self, input: String) -> Self {
        self.parts.push(MessagePart::Text(input));
        self
    }

    fn append_user_data(mut self, data: crate::data::DataAttachment) -> Self {
        self.parts.push(MessagePart::Data(data));
        self
    }

    fn generate(self) -> ProviderFuture {
        Box::pin(async move {
            let url = format!("{}/{}:generateContent", BASE_URL, self.model);
            let body = build_request_body(&self.parts);
            debug!("sending {} part(s) to {}", self.parts.len(), self.model);

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", self.key.clone())
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                return extract_text_response(&text, &self.model);
            }
            Err(anyhow!(
                "Gemini API error ({}): {}",
                status,
                extract_gemini_error(&text).unwrap_or(text)
            ))
        })
    }
}

fn build_request_body(parts: &[MessagePart]) -> serde_json::Value {
    let parts = parts
        .iter()
        .map(|part| match part {
            MessagePart::Text(text) => json!({"text": text}),
            MessagePart::Data(data) => {
                let encoded = BASE64.encode(&data.bytes);
                json!({
                    "inline_data": {
                        "mime_type": data.mime,
                        "data": encoded
                    }
                })
            }
        })
        .collect::<Vec<_>>();
    json!({
        "contents": [
            {
                "role": "user",
                "parts": parts
            }
        ]
    })
}

fn extract_text_response(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse, anyhow::Error> {
    let payload: GeminiResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse Gemini response JSON: {}", err))?;
    let candidate = payload
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .ok_or_else(|| anyhow!("no candidate returned from Gemini"))?;

    let joined = candidate
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    if joined.trim().is_empty() {
        return Err(anyhow!("Received empty response from Gemini API"));
    }

    let model = payload
        .model_version
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage_metadata.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    });
    Ok(ProviderResponse {
        text: joined,
        model,
        usage,
    })
}

fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiError>,
    }

    #[derive(Deserialize)]
    struct GeminiError {
        message: Option<String>,
        status: Option<String>,
        code: Option<i32>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(
        error.message,
        error.status,
        error.code.map(|value| value.to_string()),
    ))
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message
        && !message.trim().is_empty()
    {
        parts.push(message);
    }
    if let Some(kind) = kind
        && !kind.trim().is_empty()
    {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code
        && !code.trim().is_empty()
    {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataAttachment;

    #[test]
    fn gemini_extracts_text_and_usage() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/gemini_text_response.json"
        ));
        let response = extract_text_response(payload, "gemini-2.0-flash").unwrap();
        assert_eq!(response.text, "नमस्ते दुनिया\nदूसरी पंक्ति");
        assert_eq!(response.model.as_deref(), Some("gemini-2.0-flash-001"));
        assert_eq!(
            response.usage,
            Some(ProviderUsage {
                prompt_tokens: Some(42),
                completion_tokens: Some(7),
                total_tokens: Some(49),
            })
        );
    }

    #[test]
    fn candidate_without_text_is_an_error() {
        let payload = r#"{"candidates":[{"content":{"parts":[{}]}}]}"#;
        let err = extract_text_response(payload, "m").unwrap_err();
        assert!(err.to_string().contains("empty response"));

        let err = extract_text_response(r#"{"candidates":[]}"#, "m").unwrap_err();
        assert!(err.to_string().contains("no candidate"));
    }

    #[test]
    fn error_body_is_summarised() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_gemini_error(body).as_deref(),
            Some("API key not valid | type: INVALID_ARGUMENT | code: 400")
        );
        assert_eq!(extract_gemini_error("not json"), None);
    }

    #[test]
    fn request_body_orders_prompt_before_image() {
        let parts = vec![
            MessagePart::Text("Extract".to_string()),
            MessagePart::Data(DataAttachment::png(vec![0xff], None)),
        ];
        let body = build_request_body(&parts);
        let sent = &body["contents"][0]["parts"];
        assert_eq!(sent[0]["text"], "Extract");
        assert_eq!(sent[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(sent[1]["inline_data"]["data"], "/w==");
    }
}
