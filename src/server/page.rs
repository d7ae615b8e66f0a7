use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::data::ALLOWED_EXTENSIONS;
use crate::languages::{LanguageTable, DEFAULT_LANG};

const HOME_TEMPLATE: &str = include_str!("assets/home.html.tera");
pub(crate) const HOME_SCRIPT: &str = include_str!("assets/home.js");

/// Renders the landing page. Only whether a key is configured reaches the
/// page; the key itself never does.
pub(crate) fn render_home(languages: &LanguageTable, api_ready: bool) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("languages", languages.languages());
    context.insert("default_lang", DEFAULT_LANG);
    context.insert("api_ready", &api_ready);
    context.insert("extensions", ALLOWED_EXTENSIONS);
    Tera::one_off(HOME_TEMPLATE, &context, true).with_context(|| "failed to render home page")
}
