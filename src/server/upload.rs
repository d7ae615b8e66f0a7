use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::data::{self, DocumentKind};
use crate::providers::Provider;

use super::models::{ErrorResponse, UploadResponse};
use super::state::ServerState;
use super::util;

pub(crate) const NO_FILE_UPLOADED: &str = "No file uploaded";
pub(crate) const NO_FILE_SELECTED: &str = "No file selected";
pub(crate) const INVALID_FILE_FORMAT: &str =
    "Invalid file format. Please upload an image or PDF (PNG, JPG, JPEG, GIF, BMP, WEBP, PDF).";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn processing(message: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Error processing image: {}", message),
        }
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self {
                status: err.status(),
                message: err.body_text(),
            };
        }
        warn!("unreadable multipart body: {}", err.body_text());
        ServerError::bad_request(NO_FILE_UPLOADED)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

struct UploadForm {
    file: Option<(String, Bytes)>,
    lang: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ServerError> {
    let mut form = UploadForm {
        file: None,
        lang: None,
    };
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" if form.file.is_none() => {
                // a plain text part named `file` is not an upload
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let bytes = field.bytes().await?;
                form.file = Some((filename, bytes));
            }
            "lang" => {
                form.lang = Some(field.text().await?);
            }
            _ => {}
        }
    }
    Ok(form)
}

pub(crate) async fn handle_upload<P: Provider>(
    State(state): State<Arc<ServerState<P>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ServerError> {
    info!("received upload request");
    let multipart = multipart.map_err(|err| {
        warn!("upload without a multipart body: {}", err.body_text());
        ServerError::bad_request(NO_FILE_UPLOADED)
    })?;
    let form = read_form(multipart).await?;

    let Some((filename, bytes)) = form.file else {
        warn!("no file part in the request");
        return Err(ServerError::bad_request(NO_FILE_UPLOADED));
    };
    if filename.is_empty() {
        warn!("no file selected");
        return Err(ServerError::bad_request(NO_FILE_SELECTED));
    }
    let Some((ext, kind)) = data::extension_of(&filename)
        .and_then(|ext| DocumentKind::from_extension(&ext).map(|kind| (ext, kind)))
    else {
        warn!("invalid file format: {}", filename);
        return Err(ServerError::bad_request(INVALID_FILE_FORMAT));
    };

    let staged = util::stage_upload(&state.settings.scratch_dir, &ext, &bytes).map_err(|err| {
        error!("failed to stage upload: {:#}", err);
        ServerError::processing(format!("{:#}", err))
    })?;

    // The task owns the staged file so it outlives a dropped connection; a
    // panic unwinds through the TempPath and removes it as well.
    let task = tokio::spawn(async move {
        let response = process_upload(state, &staged, kind, form.lang).await;
        util::discard_upload(staged);
        response
    });

    task.await.map(Json).map_err(|err| {
        error!("upload processing task failed: {}", err);
        ServerError::processing(err)
    })
}

async fn process_upload<P: Provider>(
    state: Arc<ServerState<P>>,
    path: &Path,
    kind: DocumentKind,
    lang: Option<String>,
) -> UploadResponse {
    info!("starting {} text extraction", kind.as_str());
    let extraction = state.extractor.extract(path, kind).await;
    if extraction.is_degraded() {
        warn!("extraction degraded: {}", extraction);
    }
    let original_text = extraction.to_string();
    info!(
        "text extraction completed (length: {})",
        original_text.chars().count()
    );

    let target = state.translator.resolve_language(lang.as_deref()).clone();
    let translation = state
        .translator
        .translate_extraction(&extraction, Some(&target.code))
        .await;
    if translation.is_degraded() {
        warn!("translation degraded: {}", translation);
    }
    let translated_text = translation.to_string();
    info!(
        "translation completed (length: {})",
        translated_text.chars().count()
    );

    UploadResponse {
        original_text,
        translated_text,
        target_lang: target.code,
        target_lang_name: target.name,
    }
}
