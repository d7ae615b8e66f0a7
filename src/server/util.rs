use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use tracing::{info, warn};

/// Creates the scratch directory if needed and makes sure it is writable.
pub(crate) fn ensure_scratch_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create scratch dir: {}", dir.display()))?;
    let readonly = std::fs::metadata(dir)
        .map(|meta| meta.permissions().readonly())
        .unwrap_or(false);
    if readonly {
        match set_mode(dir, 0o755) {
            Ok(()) => info!("updated permissions for scratch dir: {}", dir.display()),
            Err(err) => warn!("could not update permissions for {}: {:#}", dir.display(), err),
        }
    }
    Ok(())
}

/// Writes an upload into the scratch dir under a fresh `upload_XXXXXX.<ext>`
/// name. The file is removed when the returned path is closed or dropped.
pub(crate) fn stage_upload(dir: &Path, ext: &str, bytes: &[u8]) -> Result<TempPath> {
    ensure_scratch_dir(dir)?;
    let suffix = format!(".{}", ext);
    let mut file = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(&suffix)
        .tempfile_in(dir)
        .with_context(|| format!("failed to create upload file in {}", dir.display()))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .with_context(|| "failed to write uploaded file")?;
    let path = file.into_temp_path();
    if let Err(err) = set_mode(&path, 0o644) {
        warn!("could not update permissions for {}: {:#}", path.display(), err);
    }
    info!("saved upload to {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Removes a staged upload. Failures are logged and otherwise ignored.
pub(crate) fn discard_upload(path: TempPath) {
    let shown = path.display().to_string();
    match path.close() {
        Ok(()) => info!("removed temporary file: {}", shown),
        Err(err) => warn!("failed to remove temporary file {}: {}", shown, err),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("failed to chmod {:o}", mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
