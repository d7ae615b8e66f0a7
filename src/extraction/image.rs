use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::data::{self, DataAttachment};

/// Loads, shrinks, and PNG-encodes the image at `path` on a blocking thread.
pub(crate) async fn load_for_model(path: PathBuf, max_dimension: u32) -> Result<DataAttachment> {
    tokio::task::spawn_blocking(move || prepare_image(&path, max_dimension))
        .await
        .with_context(|| "image preparation task failed")?
}

/// Downscales the image in place when either side exceeds `max_dimension`,
/// then returns it as PNG bytes for the model.
pub(crate) fn prepare_image(path: &Path, max_dimension: u32) -> Result<DataAttachment> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read image: {}", path.display()))?;
    let format = reader.format();
    let mut img = reader
        .decode()
        .with_context(|| format!("failed to decode image: {}", path.display()))?;
    info!(
        "image loaded from {} (size: {}x{}, format: {:?})",
        path.display(),
        img.width(),
        img.height(),
        format
    );

    if let Some((width, height)) = fit_within(img.width(), img.height(), max_dimension) {
        info!(
            "resizing large image from {}x{} to {}x{}",
            img.width(),
            img.height(),
            width,
            height
        );
        img = img.resize_exact(width, height, FilterType::Lanczos3);
        save_in_place(&img, path, format)?;
    }

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .with_context(|| "failed to encode image as png")?;
    debug!("encoded image as png ({} bytes)", bytes.len());
    Ok(DataAttachment::png(bytes, Some(data::file_label(path))))
}

/// Target size keeping the aspect ratio with the larger side equal to
/// `max`, or `None` when the image already fits.
pub(crate) fn fit_within(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    if width <= max && height <= max {
        return None;
    }
    let scale = |side: u32, longest: u32| -> u32 {
        ((side as u64 * max as u64) / longest as u64).max(1) as u32
    };
    if width >= height {
        Some((max, scale(height, width)))
    } else {
        Some((scale(width, height), max))
    }
}

fn save_in_place(img: &DynamicImage, path: &Path, guessed: Option<ImageFormat>) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .ok()
        .or(guessed)
        .unwrap_or(ImageFormat::Png);
    let result = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8()).save_with_format(path, format)
    } else {
        img.save_with_format(path, format)
    };
    result.with_context(|| format!("failed to save resized image: {}", path.display()))
}
