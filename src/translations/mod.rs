use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::languages::Language;

const TRANSLATE_TEMPLATE: &str = include_str!("prompts/translate.tera");

/// Source lines shorter than this are never stripped from a translation.
const MIN_ECHO_LINE_CHARS: usize = 6;

pub fn render_translation_prompt(source: &str, target: &Language) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("target_name", target.name.as_str());
    context.insert("source", source);
    let rendered = Tera::one_off(TRANSLATE_TEMPLATE, &context, false)
        .with_context(|| "failed to render translation prompt")?;
    Ok(rendered.trim_end().to_string())
}

/// Removes source-language lines the model echoed back.
///
/// A trimmed source line is treated as an echo candidate when it has at
/// least six characters, all ASCII, with at least one ASCII letter. Every
/// occurrence of such a line is cut from `translated` wherever it appears,
/// including inside longer lines. Remaining lines are right-trimmed and the
/// whole result trimmed.
pub fn strip_source_echoes(source: &str, translated: &str) -> String {
    if source.is_empty() || translated.is_empty() {
        return translated.to_string();
    }

    let mut out = translated.to_string();
    for line in source.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if is_echo_candidate(line) {
            out = out.replace(line, "");
        }
    }

    out.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_echo_candidate(line: &str) -> bool {
    line.is_ascii()
        && line.chars().count() >= MIN_ECHO_LINE_CHARS
        && line.chars().any(|ch| ch.is_ascii_alphabetic())
}
