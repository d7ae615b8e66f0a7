use std::path::Path;

pub const PNG_MIME: &str = "image/png";

/// Upload extensions accepted by the service, lowercase and without the dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().to_ascii_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        if ext == "pdf" {
            Some(DocumentKind::Pdf)
        } else {
            Some(DocumentKind::Image)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
        }
    }
}

/// Bytes handed to the model alongside a prompt.
#[derive(Debug, Clone)]
pub struct DataAttachment {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub name: Option<String>,
}

impl DataAttachment {
    pub fn png(bytes: Vec<u8>, name: Option<String>) -> Self {
        Self {
            bytes,
            mime: PNG_MIME.to_string(),
            name,
        }
    }
}

/// Returns the lowercase extension after the last dot, if any.
///
/// `"scan.final.PDF"` yields `pdf`; names without a dot yield `None`.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|value| value.to_str())
        .map(|value| value.to_string())
        .unwrap_or_else(|| path.display().to_string())
}
