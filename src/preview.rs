//! Decoding imported images for the question-entry view.
//!
//! Images are only ever shrunk to fit the preview box, never enlarged. The
//! untouched original is kept alongside the display copy so the view can
//! save it at full resolution.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

pub const DEFAULT_MAX_WIDTH: u32 = 560;
pub const DEFAULT_MAX_HEIGHT: u32 = 800;

/// Label shown next to the image surface when nothing is displayed.
pub const EMPTY_SIZE_LABEL: &str = "Size: -";

/// Bounding box for the displayed copy of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewBox {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for PreviewBox {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no pixels")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct PreviewImage {
    original: DynamicImage,
    display: DynamicImage,
}

impl PreviewImage {
    pub fn original(&self) -> &DynamicImage {
        &self.original
    }

    pub fn display(&self) -> &DynamicImage {
        &self.display
    }

    pub fn original_size(&self) -> (u32, u32) {
        self.original.dimensions()
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display.dimensions()
    }

    /// `Size: WxH` of the original image.
    pub fn size_label(&self) -> String {
        let (w, h) = self.original_size();
        format!("Size: {}x{}", w, h)
    }
}

/// Target size for a `width`×`height` image inside `bounds`.
///
/// Scale is `min(max_w / w, max_h / h, 1)`, truncated, never below 1px.
pub fn fit_within(width: u32, height: u32, bounds: PreviewBox) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let scale = (bounds.max_width as f64 / width as f64)
        .min(bounds.max_height as f64 / height as f64)
        .min(1.0);
    if scale >= 1.0 {
        return (width, height);
    }
    let w = ((width as f64 * scale) as u32).max(1);
    let h = ((height as f64 * scale) as u32).max(1);
    (w, h)
}

pub fn decode_preview(bytes: &[u8], bounds: PreviewBox) -> Result<PreviewImage, PreviewError> {
    let original = image::load_from_memory(bytes)?;
    let (width, height) = original.dimensions();
    if width == 0 || height == 0 {
        return Err(PreviewError::Empty);
    }

    let (w, h) = fit_within(width, height, bounds);
    let display = if (w, h) == (width, height) {
        original.clone()
    } else {
        original.resize_exact(w, h, FilterType::Lanczos3)
    };

    Ok(PreviewImage { original, display })
}
