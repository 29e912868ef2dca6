//! Data types shared by the import listener and the GUI side of the bridge.

use serde::{Deserialize, Serialize};

/// A validated import, ready to be applied on the GUI thread.
///
/// The token has already been checked by the validator and is not carried
/// across the thread boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub question_id: String,
    pub image_bytes: Vec<u8>,
}

/// JSON body of every import endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub ok: bool,
    pub message: String,
}

impl StatusBody {
    pub fn new(ok: bool, message: impl Into<String>) -> Self {
        Self {
            ok,
            message: message.into(),
        }
    }
}
