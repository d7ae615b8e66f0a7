use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub request_timeout: Duration,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
    pub max_image_dimension: u32,
    pub pdf_max_pages: usize,
    pub pdf_dpi: u32,
    pub pdf_ocr_fallback: bool,
    pub scratch_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(120),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            max_image_dimension: 1024,
            pdf_max_pages: 5,
            pdf_dpi: 200,
            pdf_ocr_fallback: true,
            scratch_dir: PathBuf::from("temp"),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    model: Option<ModelSettings>,
    retry: Option<RetrySettings>,
    extraction: Option<ExtractionSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelSettings {
    name: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrySettings {
    attempts: Option<usize>,
    delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionSettings {
    max_image_dimension: Option<u32>,
    pdf_max_pages: Option<usize>,
    pdf_dpi: Option<u32>,
    ocr_fallback: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    scratch_dir: Option<String>,
    max_upload_mb: Option<usize>,
}

/// Loads settings from `settings.toml`, then `settings.local.toml`, then the
/// optional extra file. Later files win field by field.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_toml(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(model) = incoming.model {
            if let Some(name) = model.name
                && !name.trim().is_empty()
            {
                self.model = name.trim().to_string();
            }
            if let Some(secs) = model.timeout_secs
                && secs > 0
            {
                self.request_timeout = Duration::from_secs(secs);
            }
        }
        if let Some(retry) = incoming.retry {
            if let Some(attempts) = retry.attempts
                && attempts > 0
            {
                self.retry_attempts = attempts;
            }
            // zero is allowed here: retry immediately
            if let Some(secs) = retry.delay_secs {
                self.retry_delay = Duration::from_secs(secs);
            }
        }
        if let Some(extraction) = incoming.extraction {
            if let Some(max) = extraction.max_image_dimension
                && max > 0
            {
                self.max_image_dimension = max;
            }
            if let Some(pages) = extraction.pdf_max_pages
                && pages > 0
            {
                self.pdf_max_pages = pages;
            }
            if let Some(dpi) = extraction.pdf_dpi
                && dpi > 0
            {
                self.pdf_dpi = dpi;
            }
            if let Some(enabled) = extraction.ocr_fallback {
                self.pdf_ocr_fallback = enabled;
            }
        }
        if let Some(server) = incoming.server {
            if let Some(dir) = server.scratch_dir
                && !dir.trim().is_empty()
            {
                self.scratch_dir = PathBuf::from(dir.trim());
            }
            if let Some(mb) = server.max_upload_mb
                && mb > 0
            {
                self.max_upload_bytes = mb * 1024 * 1024;
            }
        }
    }
}
