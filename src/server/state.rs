use std::sync::Arc;

use crate::extraction::{Extractor, PageRenderer};
use crate::languages::LanguageTable;
use crate::providers::Provider;
use crate::settings::Settings;
use crate::translator::Translator;

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct ServerState<P: Provider> {
    pub(crate) extractor: Extractor<P>,
    pub(crate) translator: Translator<P>,
    pub(crate) settings: Settings,
    pub(crate) api_ready: bool,
}

impl<P: Provider> ServerState<P> {
    /// `api_ready` only drives the status badge on the landing page.
    pub fn new(provider: P, settings: Settings, languages: LanguageTable, api_ready: bool) -> Self {
        Self {
            extractor: Extractor::new(provider.clone(), &settings),
            translator: Translator::new(provider, languages, &settings),
            settings,
            api_ready,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.extractor = self.extractor.with_renderer(renderer);
        self
    }
}
