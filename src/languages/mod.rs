use serde::Serialize;

pub const DEFAULT_LANG: &str = "hi";

const SUPPORTED: &[(&str, &str)] = &[
    ("hi", "Hindi"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("ar", "Arabic"),
    ("zh", "Chinese (Simplified)"),
    ("ja", "Japanese"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("bn", "Bengali"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("mr", "Marathi"),
    ("ur", "Urdu"),
    ("ko", "Korean"),
    ("it", "Italian"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

/// Target languages offered for translation.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    entries: Vec<Language>,
    fallback: usize,
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LanguageTable {
    pub fn builtin() -> Self {
        let entries = SUPPORTED
            .iter()
            .map(|(code, name)| Language {
                code: code.to_string(),
                name: name.to_string(),
            })
            .collect::<Vec<_>>();
        let fallback = entries
            .iter()
            .position(|lang| lang.code == DEFAULT_LANG)
            .unwrap_or(0);
        Self { entries, fallback }
    }

    /// Resolves a requested code, falling back to Hindi for anything
    /// missing, blank, or outside the table.
    pub fn resolve(&self, code: Option<&str>) -> &Language {
        code.and_then(|value| self.find(value))
            .unwrap_or(&self.entries[self.fallback])
    }

    pub fn languages(&self) -> &[Language] {
        &self.entries
    }

    fn find(&self, code: &str) -> Option<&Language> {
        let code = normalize_code(code);
        self.entries.iter().find(|lang| lang.code == code)
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_codes_case_insensitively() {
        let table = LanguageTable::builtin();
        let lang = table.resolve(Some("JA"));
        assert_eq!(lang.code, "ja");
        assert_eq!(lang.name, "Japanese");
        assert_eq!(table.resolve(Some("zh")).name, "Chinese (Simplified)");
    }

    #[test]
    fn unknown_or_missing_codes_fall_back_to_hindi() {
        let table = LanguageTable::builtin();
        for code in [None, Some(""), Some("xx"), Some("en")] {
            let lang = table.resolve(code);
            assert_eq!(lang.code, "hi");
            assert_eq!(lang.name, "Hindi");
        }
    }

    #[test]
    fn table_has_sixteen_languages() {
        let table = LanguageTable::builtin();
        assert_eq!(table.languages().len(), 16);
        assert_eq!(table.resolve(Some(" IT ")).code, "it");
        assert_eq!(table.resolve(Some("nl")).code, "hi");
    }
}
