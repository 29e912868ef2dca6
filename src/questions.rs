//! Question lookups and image storage in the data directory.
//!
//! Images live next to the database as `<data>/item_img_path/<id>.png` and are
//! overwritten when a question is imported again.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

pub const IMAGE_DIR_NAME: &str = "item_img_path";
pub const MAX_QUESTION_ID_LEN: usize = 64;

/// Question ids are ASCII letters, digits and `-`, at most 64 characters.
pub fn is_valid_question_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_QUESTION_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub async fn question_exists(pool: &SqlitePool, id: &str) -> Result<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT item_id FROM items WHERE item_id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub fn image_path(data_dir: &Path, id: &str) -> PathBuf {
    data_dir.join(IMAGE_DIR_NAME).join(format!("{}.png", id))
}

/// Saves `image` as PNG for question `id`, replacing any previous image.
pub fn save_question_image(data_dir: &Path, id: &str, image: &DynamicImage) -> Result<PathBuf> {
    if !is_valid_question_id(id) {
        anyhow::bail!("invalid question id '{}'", id);
    }
    let path = image_path(data_dir, id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create image directory {}", parent.display()))?;
    }
    image
        .save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("Failed to save image {}", path.display()))?;
    Ok(path)
}
