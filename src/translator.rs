use std::fmt;
use tracing::{info, warn};

use crate::extraction::{Extraction, EXTRACTION_FAILED_PREFIX};
use crate::languages::{Language, LanguageTable};
use crate::providers::{self, Provider};
use crate::retry::{with_retries, RetryPolicy};
use crate::settings::Settings;
use crate::translations;

pub const NOTHING_TO_TRANSLATE: &str = "No text to translate.";
pub const SOURCE_UNAVAILABLE: &str = "Cannot translate due to OCR failure.";
pub const TRANSLATION_FAILED_PREFIX: &str = "Translation failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Translated(String),
    NothingToTranslate,
    /// The input was an extraction failure message, not document text.
    SourceUnavailable,
    Failed { reason: String },
}

impl Translation {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Translation::Translated(_))
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translation::Translated(text) => f.write_str(text),
            Translation::NothingToTranslate => f.write_str(NOTHING_TO_TRANSLATE),
            Translation::SourceUnavailable => f.write_str(SOURCE_UNAVAILABLE),
            Translation::Failed { reason } => {
                write!(f, "{}: {}", TRANSLATION_FAILED_PREFIX, reason)
            }
        }
    }
}

#[derive(Clone)]
pub struct Translator<P: Provider> {
    provider: P,
    languages: LanguageTable,
    policy: RetryPolicy,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P, languages: LanguageTable, settings: &Settings) -> Self {
        Self {
            provider,
            languages,
            policy: RetryPolicy::from_settings(settings),
        }
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    pub fn resolve_language(&self, code: Option<&str>) -> &Language {
        self.languages.resolve(code)
    }

    /// Translates whatever the extraction step produced. A failed extraction
    /// never reaches the model; the other degraded outcomes are translated as
    /// their message text so the reader sees it in the target language.
    pub async fn translate_extraction(&self, extraction: &Extraction, lang: Option<&str>) -> Translation {
        match extraction {
            Extraction::Failed { .. } => Translation::SourceUnavailable,
            other => self.translate(&other.to_string(), lang).await,
        }
    }

    /// Translates extracted text into the language named by `lang`.
    ///
    /// Blank input and extraction failure messages are answered without a
    /// model call. Unknown codes fall back to Hindi.
    pub async fn translate(&self, text: &str, lang: Option<&str>) -> Translation {
        if text.trim().is_empty() {
            return Translation::NothingToTranslate;
        }
        if text.starts_with(EXTRACTION_FAILED_PREFIX) {
            return Translation::SourceUnavailable;
        }

        let target = self.resolve_language(lang);
        let prompt = match translations::render_translation_prompt(text, target) {
            Ok(prompt) => prompt,
            Err(err) => {
                return Translation::Failed {
                    reason: format!("{:#}", err),
                };
            }
        };

        let label = format!("translation to {}", target.name);
        let result = with_retries(self.policy, &label, |_| {
            providers::generate(&self.provider, &prompt, None)
        })
        .await;

        match result {
            Ok(reply) => {
                let cleaned = translations::strip_source_echoes(text, &reply);
                info!(
                    "translated {} chars into {} ({} chars)",
                    text.chars().count(),
                    target.code,
                    cleaned.chars().count()
                );
                Translation::Translated(cleaned)
            }
            Err(err) => {
                warn!("giving up on translation: {:#}", err);
                Translation::Failed {
                    reason: format!("{:#}", err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedProvider;
    use std::time::Duration;

    fn translator(provider: &ScriptedProvider) -> Translator<ScriptedProvider> {
        let settings = Settings {
            retry_delay: Duration::from_secs(2),
            ..Settings::default()
        };
        Translator::new(provider.clone(), LanguageTable::builtin(), &settings)
    }

    #[tokio::test]
    async fn blank_text_skips_the_model() {
        let provider = ScriptedProvider::new(vec![Ok("unused")]);
        let outcome = translator(&provider).translate("  \n\t", Some("es")).await;
        assert_eq!(outcome, Translation::NothingToTranslate);
        assert_eq!(outcome.to_string(), "No text to translate.");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn extraction_failure_text_skips_the_model() {
        let provider = ScriptedProvider::new(vec![Ok("unused")]);
        let outcome = translator(&provider)
            .translate("Could not extract text from the image: timeout", Some("fr"))
            .await;
        assert_eq!(outcome, Translation::SourceUnavailable);
        assert_eq!(outcome.to_string(), "Cannot translate due to OCR failure.");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn third_attempt_success_is_returned() {
        let provider = ScriptedProvider::new(vec![Err("503"), Err("503"), Ok("Hola")]);
        let started = tokio::time::Instant::now();
        let outcome = translator(&provider).translate("Hello", Some("es")).await;
        assert_eq!(outcome, Translation::Translated("Hola".to_string()));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_report_last_error() {
        let provider = ScriptedProvider::new(vec![Err("a"), Err("b"), Err("quota exceeded")]);
        let outcome = translator(&provider).translate("Hello", None).await;
        assert_eq!(outcome.to_string(), "Translation failed: quota exceeded");
        assert!(outcome.is_degraded());
    }

    #[tokio::test]
    async fn echoed_source_lines_are_removed() {
        let provider =
            ScriptedProvider::new(vec![Ok("Hello World\nनमस्ते दुनिया\nHello World")]);
        let outcome = translator(&provider)
            .translate("Hello World", Some("hi"))
            .await;
        assert_eq!(outcome, Translation::Translated("नमस्ते दुनिया".to_string()));
    }

    #[tokio::test]
    async fn failed_extraction_is_not_sent() {
        let provider = ScriptedProvider::new(vec![Ok("unused")]);
        let extraction = Extraction::Failed {
            reason: "bad gateway".to_string(),
        };
        let outcome = translator(&provider)
            .translate_extraction(&extraction, Some("de"))
            .await;
        assert_eq!(outcome, Translation::SourceUnavailable);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn pdf_without_text_message_is_translated() {
        let provider = ScriptedProvider::new(vec![Ok("PDF में कोई पाठ नहीं मिला।")]);
        let outcome = translator(&provider)
            .translate_extraction(&Extraction::NoText, None)
            .await;
        assert_eq!(
            outcome,
            Translation::Translated("PDF में कोई पाठ नहीं मिला।".to_string())
        );
        assert!(provider.prompts()[0].contains("No text found in PDF."));
    }

    #[tokio::test]
    async fn unknown_language_targets_hindi() {
        let provider = ScriptedProvider::new(vec![Ok("अनुवाद")]);
        translator(&provider).translate("Invoice", Some("xx")).await;
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("following text to Hindi."));
        assert!(prompts[0].contains("--- BEGIN SOURCE ---\nInvoice\n--- END SOURCE ---"));
    }
}
