use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) original_text: String,
    pub(crate) translated_text: String,
    pub(crate) target_lang: String,
    pub(crate) target_lang_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
