//! Applying an import to the question-entry view, on the GUI thread.
//!
//! For each request the applier:
//!
//! 1. ensures a live view is registered (opening or replacing one if needed),
//! 2. writes the question id into the id field,
//! 3. decodes the image and shows it scaled into the preview box, or shows the
//!    "failed to load" placeholder,
//! 4. moves focus to the query field.
//!
//! The steps do not depend on each other's success; an undecodable image still
//! gets its id written and the focus moved.

use tracing::{debug, warn};

use crate::models::ImportRequest;
use crate::preview::{decode_preview, PreviewBox, PreviewImage};
use crate::view::{EntryViewFactory, ViewRegistry};

/// Text the image surface shows when decoding fails.
pub const IMAGE_FAILED_MESSAGE: &str = "Image failed to load";

#[derive(Debug, Clone)]
pub enum ImageOutcome {
    Shown(PreviewImage),
    Failed(String),
    /// No view was available to show it in.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub question_id: String,
    pub view_available: bool,
    pub image: ImageOutcome,
}

pub struct ImportApplier {
    registry: ViewRegistry,
    factory: Box<dyn EntryViewFactory>,
    preview_box: PreviewBox,
}

impl ImportApplier {
    pub fn new(
        registry: ViewRegistry,
        factory: impl EntryViewFactory + 'static,
        preview_box: PreviewBox,
    ) -> Self {
        Self {
            registry,
            factory: Box::new(factory),
            preview_box,
        }
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    pub fn apply(&mut self, request: ImportRequest) -> ApplyReport {
        let ImportRequest {
            question_id,
            image_bytes,
        } = request;

        let view_available = self.registry.ensure_exists(self.factory.as_mut());
        if !view_available {
            warn!(question_id = %question_id, "no question entry view; import dropped");
            return ApplyReport {
                question_id,
                view_available,
                image: ImageOutcome::Skipped,
            };
        }

        self.registry
            .with_target(|view| view.id_field.replace_text(&question_id));

        let image = match decode_preview(&image_bytes, self.preview_box) {
            Ok(preview) => {
                self.registry
                    .with_target(|view| view.image.show_image(&preview));
                let (w, h) = preview.original_size();
                debug!(question_id = %question_id, width = w, height = h, "imported image shown");
                ImageOutcome::Shown(preview)
            }
            Err(e) => {
                warn!(question_id = %question_id, error = %e, "imported image could not be decoded");
                self.registry
                    .with_target(|view| view.image.show_failed(IMAGE_FAILED_MESSAGE));
                ImageOutcome::Failed(e.to_string())
            }
        };

        self.registry.with_target(|view| view.focus.focus());

        ApplyReport {
            question_id,
            view_available,
            image,
        }
    }
}
