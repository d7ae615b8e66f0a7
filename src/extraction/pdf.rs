use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Rasterises the leading pages of a PDF into PNG files.
pub trait PageRenderer: Send + Sync {
    /// Writes at most `max_pages` pages into `out_dir` and returns their
    /// paths in page order.
    fn render(
        &self,
        pdf: &Path,
        out_dir: &Path,
        max_pages: usize,
        dpi: u32,
    ) -> Result<Vec<PathBuf>>;
}

/// Shells out to `mutool` (MuPDF) or `pdftoppm` (Poppler), whichever exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRenderer;

impl PageRenderer for CommandRenderer {
    fn render(
        &self,
        pdf: &Path,
        out_dir: &Path,
        max_pages: usize,
        dpi: u32,
    ) -> Result<Vec<PathBuf>> {
        let max_pages = max_pages.max(1);
        if command_exists("mutool") {
            let output = Command::new("mutool")
                .arg("draw")
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-o")
                .arg(out_dir.join("page-%03d.png"))
                .arg(pdf)
                .arg(format!("1-{}", max_pages))
                .output()
                .with_context(|| "failed to run mutool")?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(anyhow!("mutool failed: {}", stderr.trim()));
            }
        } else if command_exists("pdftoppm") {
            let output = Command::new("pdftoppm")
                .arg("-png")
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-f")
                .arg("1")
                .arg("-l")
                .arg(max_pages.to_string())
                .arg(pdf)
                .arg(out_dir.join("page"))
                .output()
                .with_context(|| "failed to run pdftoppm")?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(anyhow!("pdftoppm failed: {}", stderr.trim()));
            }
        } else {
            return Err(anyhow!(
                "pdf rendering requires mutool or pdftoppm (install mupdf or poppler)"
            ));
        }

        let mut pages = collect_pages(out_dir)?;
        pages.truncate(max_pages);
        Ok(pages)
    }
}

/// Always fails; used when the OCR fallback is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

impl PageRenderer for DisabledRenderer {
    fn render(
        &self,
        _pdf: &Path,
        _out_dir: &Path,
        _max_pages: usize,
        _dpi: u32,
    ) -> Result<Vec<PathBuf>> {
        Err(anyhow!("pdf page rendering is disabled"))
    }
}

/// Rendered page images plus the private directory holding them. The
/// directory and anything left in it go away on drop.
pub(crate) struct RenderedPages {
    _dir: TempDir,
    pages: Vec<PathBuf>,
}

impl RenderedPages {
    pub(crate) fn paths(&self) -> &[PathBuf] {
        &self.pages
    }
}

pub(crate) async fn read_text_layer(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let bytes = fs::read(&path)
            .with_context(|| format!("failed to read pdf: {}", path.display()))?;
        pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|err| anyhow!("failed to extract pdf text: {}", err))
    })
    .await
    .with_context(|| "pdf text extraction aborted")?
}

pub(crate) async fn render_pages(
    renderer: Arc<dyn PageRenderer>,
    pdf: PathBuf,
    scratch_dir: &Path,
    max_pages: usize,
    dpi: u32,
) -> Result<RenderedPages> {
    fs::create_dir_all(scratch_dir)
        .with_context(|| format!("failed to create scratch dir: {}", scratch_dir.display()))?;
    let dir = tempfile::Builder::new()
        .prefix("pdf_pages_")
        .tempdir_in(scratch_dir)
        .with_context(|| "failed to create page directory")?;
    let out_dir = dir.path().to_path_buf();
    let mut pages =
        tokio::task::spawn_blocking(move || renderer.render(&pdf, &out_dir, max_pages, dpi))
            .await
            .with_context(|| "pdf rendering aborted")??;
    pages.truncate(max_pages);
    debug!("rendered {} pdf page(s)", pages.len());
    Ok(RenderedPages { _dir: dir, pages })
}

pub(crate) fn discard_page(path: &Path) {
    if let Err(err) = fs::remove_file(path)
        && err.kind() != std::io::ErrorKind::NotFound
    {
        warn!("failed to remove page image {}: {}", path.display(), err);
    }
}

fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| "failed to read rendered page directory")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();
    entries.sort_by_key(|path| {
        path.file_stem()
            .and_then(|name| name.to_str())
            .and_then(page_index_from_name)
            .unwrap_or(u32::MAX)
    });
    Ok(entries)
}

fn command_exists(cmd: &str) -> bool {
    match Command::new(cmd).arg("-h").output() {
        Ok(_) => true,
        Err(err) => err.kind() != std::io::ErrorKind::NotFound,
    }
}

fn page_index_from_name(name: &str) -> Option<u32> {
    let mut digits = String::new();
    for ch in name.chars().rev() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        return None;
    }
    digits.chars().rev().collect::<String>().parse().ok()
}
