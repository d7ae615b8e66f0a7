use anyhow::{anyhow, Result};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, warn};

use crate::data::DataAttachment;

mod gemini;

pub use gemini::Gemini;

pub const CONNECTIVITY_PROMPT: &str = "Hello, please respond with 'API is working'";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone)]
pub enum MessagePart {
    Text(String),
    Data(DataAttachment),
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

/// A remote generative model. Builders accumulate the user turn and
/// `generate` sends it; any failure, including an empty reply, is an error.
pub trait Provider: Clone + Send + Sync + 'static {
    fn append_user_input(self, input: String) -> Self;
    fn append_user_data(self, data: DataAttachment) -> Self;
    fn generate(self) -> ProviderFuture;
}

/// Sends `prompt` (and `image`, if any) and returns the trimmed reply text.
pub async fn generate<P: Provider>(
    provider: &P,
    prompt: &str,
    image: Option<DataAttachment>,
) -> Result<String> {
    let mut request = provider.clone().append_user_input(prompt.to_string());
    if let Some(image) = image {
        request = request.append_user_data(image);
    }
    let response = request.generate().await?;
    debug!("{}", usage_summary(&response));
    let text = response.text.trim().to_string();
    if text.is_empty() {
        return Err(anyhow!("Received empty response from model API"));
    }
    Ok(text)
}

fn usage_summary(response: &ProviderResponse) -> String {
    let model = response.model.as_deref().unwrap_or("unknown model");
    let Some(usage) = response.usage.as_ref() else {
        return format!("{}: tokens unavailable", model);
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });
    let show = |value: Option<u64>| value.map_or_else(|| "?".to_string(), |n| n.to_string());
    format!(
        "{}: tokens prompt={} completion={} total={}",
        model,
        show(usage.prompt_tokens),
        show(usage.completion_tokens),
        show(total)
    )
}

/// Sends a trivial prompt to confirm the credential and model work.
pub async fn check_connectivity<P: Provider>(provider: &P) -> bool {
    match generate(provider, CONNECTIVITY_PROMPT, None).await {
        Ok(reply) => {
            info!("API test response: {}", reply);
            true
        }
        Err(err) => {
            warn!("failed to connect to model API: {:#}", err);
            false
        }
    }
}

pub fn resolve_key(override_key: Option<&str>) -> Option<String> {
    if let Some(key) = override_key
        && !key.trim().is_empty()
    {
        return Some(key.trim().to_string());
    }
    get_env("GEMINI_API_KEY").or_else(|| get_env("GOOGLE_API_KEY"))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
