use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

pub mod data;
pub mod extraction;
pub mod languages;
pub mod logging;
pub mod providers;
pub mod retry;
pub mod server;
pub mod settings;
pub mod translations;
mod translator;

pub use extraction::{Extraction, Extractor};
pub use languages::{Language, LanguageTable};
pub use providers::{Gemini, Provider, ProviderUsage};
pub use server::{build_router, run_server, ServerState};
pub use settings::Settings;
pub use translator::{Translation, Translator};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub key: Option<String>,
    pub settings_path: Option<String>,
    pub skip_api_check: bool,
}

/// Resolves settings and credentials once, checks the model API, and serves
/// until the listener fails.
pub async fn run(config: Config) -> Result<()> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let state = bootstrap(&config, settings).await;
    let addr = format!("{}:{}", config.host, config.port);
    run_server(state, addr).await
}

pub async fn bootstrap(config: &Config, settings: Settings) -> ServerState<Gemini> {
    let key = providers::resolve_key(config.key.as_deref());
    let api_ready = key.is_some();
    if !api_ready {
        warn!("GEMINI_API_KEY is not set; extraction and translation requests will fail");
    }

    let provider = Gemini::new(key.unwrap_or_default())
        .with_model(settings.model.clone())
        .with_timeout(settings.request_timeout);
    info!("using model {}", settings.model);

    if api_ready && !config.skip_api_check {
        if providers::check_connectivity(&provider).await {
            info!("model API connection successful");
        } else {
            warn!("model API check failed; continuing anyway");
        }
    }

    ServerState::new(provider, settings, LanguageTable::builtin(), api_ready)
}
