//! Turns an uploaded image or PDF into plain text.
//!
//! Images go straight to the vision model. PDFs try their embedded text
//! layer first and only fall back to rendering pages for the model when the
//! layer is empty or unreadable. Failures never escape as errors: they come
//! back as an [`Extraction`] variant so the HTTP layer can decide how to show
//! them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::data::DocumentKind;
use crate::providers::{self, Provider};
use crate::retry::{with_retries, RetryPolicy};
use crate::settings::Settings;

pub(crate) mod image;
pub mod pdf;

pub use pdf::{CommandRenderer, DisabledRenderer, PageRenderer};

pub const EXTRACTION_PROMPT: &str =
    "Extract all the text from this image. Return only the extracted text, nothing else.";
pub const EXTRACTION_FAILED_PREFIX: &str = "Could not extract text from the image";
pub const NO_PDF_TEXT: &str = "No text found in PDF.";
pub const OCR_UNAVAILABLE: &str =
    "No embedded text found in PDF, and OCR fallback is unavailable on this server.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(String),
    /// Pages were rendered and read, but nothing came back.
    NoText,
    /// The PDF has no text layer and pages could not be rendered.
    OcrUnavailable { reason: String },
    /// Every model attempt failed.
    Failed { reason: String },
}

impl Extraction {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Extraction::Text(_))
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::Text(text) => f.write_str(text),
            Extraction::NoText => f.write_str(NO_PDF_TEXT),
            Extraction::OcrUnavailable { .. } => f.write_str(OCR_UNAVAILABLE),
            Extraction::Failed { reason } => write!(f, "{}: {}", EXTRACTION_FAILED_PREFIX, reason),
        }
    }
}

#[derive(Clone)]
pub struct Extractor<P: Provider> {
    provider: P,
    policy: RetryPolicy,
    max_image_dimension: u32,
    pdf_max_pages: usize,
    pdf_dpi: u32,
    scratch_dir: PathBuf,
    renderer: Arc<dyn PageRenderer>,
}

impl<P: Provider> Extractor<P> {
    pub fn new(provider: P, settings: &Settings) -> Self {
        let renderer: Arc<dyn PageRenderer> = if settings.pdf_ocr_fallback {
            Arc::new(CommandRenderer)
        } else {
            Arc::new(DisabledRenderer)
        };
        Self {
            provider,
            policy: RetryPolicy::from_settings(settings),
            max_image_dimension: settings.max_image_dimension,
            pdf_max_pages: settings.pdf_max_pages,
            pdf_dpi: settings.pdf_dpi,
            scratch_dir: settings.scratch_dir.clone(),
            renderer,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub async fn extract(&self, path: &Path, kind: DocumentKind) -> Extraction {
        match kind {
            DocumentKind::Image => self.extract_image(path).await,
            DocumentKind::Pdf => self.extract_pdf(path).await,
        }
    }

    /// Reads an image with the vision model. Oversized images are shrunk and
    /// written back over `path` before sending.
    pub async fn extract_image(&self, path: &Path) -> Extraction {
        let result = with_retries(self.policy, "text extraction", |_| {
            self.extract_image_once(path)
        })
        .await;
        match result {
            Ok(text) => {
                info!("successfully extracted text (length: {})", text.chars().count());
                Extraction::Text(text)
            }
            Err(err) => {
                warn!("giving up on text extraction: {:#}", err);
                Extraction::Failed {
                    reason: format!("{:#}", err),
                }
            }
        }
    }

    async fn extract_image_once(&self, path: &Path) -> anyhow::Result<String> {
        let image = image::load_for_model(path.to_path_buf(), self.max_image_dimension).await?;
        providers::generate(&self.provider, EXTRACTION_PROMPT, Some(image)).await
    }

    pub async fn extract_pdf(&self, path: &Path) -> Extraction {
        match pdf::read_text_layer(path.to_path_buf()).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("using embedded PDF text (length: {})", text.trim().chars().count());
                return Extraction::Text(text.trim().to_string());
            }
            Ok(_) => info!("PDF has no embedded text; falling back to OCR"),
            Err(err) => warn!("PDF text extraction error: {:#}", err),
        }

        let pages = match pdf::render_pages(
            self.renderer.clone(),
            path.to_path_buf(),
            &self.scratch_dir,
            self.pdf_max_pages,
            self.pdf_dpi,
        )
        .await
        {
            Ok(pages) => pages,
            Err(err) => {
                warn!("PDF OCR fallback unavailable: {:#}", err);
                return Extraction::OcrUnavailable {
                    reason: format!("{:#}", err),
                };
            }
        };

        let mut results = Vec::new();
        for page in pages.paths() {
            let outcome = self.extract_image(page).await;
            pdf::discard_page(page);
            results.push(outcome.to_string());
        }
        drop(pages);

        let combined = results
            .into_iter()
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let combined = combined.trim();
        if combined.is_empty() {
            Extraction::NoText
        } else {
            Extraction::Text(combined.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedProvider;
    use std::time::Duration;

    fn test_settings(scratch: &Path) -> Settings {
        Settings {
            retry_delay: Duration::ZERO,
            scratch_dir: scratch.to_path_buf(),
            ..Settings::default()
        }
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = ::image::RgbImage::from_pixel(width, height, ::image::Rgb([250, 250, 250]));
        img.save(path).expect("write png");
    }

    #[test]
    fn display_renders_legacy_messages() {
        let failed = Extraction::Failed {
            reason: "timeout".to_string(),
        };
        assert_eq!(
            failed.to_string(),
            "Could not extract text from the image: timeout"
        );
        assert_eq!(Extraction::NoText.to_string(), "No text found in PDF.");
        assert_eq!(
            Extraction::OcrUnavailable {
                reason: "x".to_string()
            }
            .to_string(),
            OCR_UNAVAILABLE
        );
        assert!(failed.is_degraded());
        assert!(!Extraction::Text("a".to_string()).is_degraded());
    }

    #[tokio::test]
    async fn image_is_sent_with_extraction_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload.png");
        write_png(&path, 40, 20);
        let provider = ScriptedProvider::new(vec![Ok("  Invoice 42  ")]);
        let extractor = Extractor::new(provider.clone(), &test_settings(dir.path()));

        let outcome = extractor.extract(&path, DocumentKind::Image).await;
        assert_eq!(outcome, Extraction::Text("Invoice 42".to_string()));
        assert_eq!(provider.prompts(), vec![EXTRACTION_PROMPT.to_string()]);
        assert_eq!(provider.attachments()[0].mime, "image/png");
    }

    #[tokio::test]
    async fn image_failure_after_retries_is_reported_as_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload.png");
        write_png(&path, 8, 8);
        let provider = ScriptedProvider::new(vec![Err("one"), Err("two"), Err("quota exceeded")]);
        let extractor = Extractor::new(provider.clone(), &test_settings(dir.path()));

        let outcome = extractor.extract_image(&path).await;
        assert_eq!(
            outcome,
            Extraction::Failed {
                reason: "quota exceeded".to_string()
            }
        );
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn image_recovers_on_third_attempt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload.png");
        write_png(&path, 8, 8);
        let provider = ScriptedProvider::new(vec![Err("one"), Err("two"), Ok("finally")]);
        let extractor = Extractor::new(provider.clone(), &test_settings(dir.path()));

        let outcome = extractor.extract_image(&path).await;
        assert_eq!(outcome, Extraction::Text("finally".to_string()));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn undecodable_image_fails_without_model_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload.png");
        std::fs::write(&path, b"not an image").expect("write");
        let provider = ScriptedProvider::new(vec![]);
        let extractor = Extractor::new(provider.clone(), &test_settings(dir.path()));

        let outcome = extractor.extract_image(&path).await;
        assert!(matches!(outcome, Extraction::Failed { .. }));
        assert_eq!(provider.call_count(), 0);
    }
}
