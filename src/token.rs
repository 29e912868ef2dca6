//! Import token store.
//!
//! The token is a shared secret between the browser extension and this
//! process. It is created lazily on first use, persisted in the settings file
//! and returned unchanged on every later call until explicitly regenerated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;
use tracing::info;

use crate::settings::{SettingsError, SettingsStore};

/// Random bytes per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("configuration error: {0}")]
    Configuration(#[from] SettingsError),
}

/// Generates a fresh URL-safe token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns the persisted token, creating and persisting one if none exists.
/// A blank stored value counts as absent.
pub fn get_or_create_token(store: &SettingsStore) -> Result<String, TokenError> {
    if let Some(existing) = stored_token(store) {
        return Ok(existing);
    }

    let token = store.update(|settings| match settings.import_token.as_deref() {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => {
            let fresh = generate_token();
            settings.import_token = Some(fresh.clone());
            fresh
        }
    })?;
    info!(settings = %store.path().display(), "created import token");
    Ok(token)
}

/// Replaces the stored token. Clients holding the old one get 403 afterwards.
pub fn regenerate_token(store: &SettingsStore) -> Result<String, TokenError> {
    let token = generate_token();
    store.update(|settings| settings.import_token = Some(token.clone()))?;
    info!(settings = %store.path().display(), "regenerated import token");
    Ok(token)
}

fn stored_token(store: &SettingsStore) -> Option<String> {
    store
        .snapshot()
        .import_token
        .filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> SettingsStore {
        SettingsStore::open(tmp.path().join("settings.json")).unwrap()
    }

    #[test]
    fn test_generated_token_is_url_safe() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let first = get_or_create_token(&store).unwrap();
        let second = get_or_create_token(&store).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_token_survives_restart() {
        let tmp = TempDir::new().unwrap();
        let first = get_or_create_token(&store(&tmp)).unwrap();
        let after_restart = get_or_create_token(&store(&tmp)).unwrap();
        assert_eq!(first, after_restart);
    }

    #[test]
    fn test_blank_token_is_replaced() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("settings.json"),
            r#"{"import_token": "  "}"#,
        )
        .unwrap();
        let token = get_or_create_token(&store(&tmp)).unwrap();
        assert_eq!(token.trim(), token);
        assert!(!token.is_empty());
    }

    #[test]
    fn test_existing_token_is_returned_verbatim() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("settings.json"),
            r#"{"import_token": "hand-written"}"#,
        )
        .unwrap();
        assert_eq!(get_or_create_token(&store(&tmp)).unwrap(), "hand-written");
    }

    #[test]
    fn test_regenerate_changes_token() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let old = get_or_create_token(&store).unwrap();
        let new = regenerate_token(&store).unwrap();
        assert_ne!(old, new);
        assert_eq!(get_or_create_token(&store).unwrap(), new);
    }

    #[test]
    fn test_unwritable_settings_is_configuration_error() {
        let tmp = TempDir::new().unwrap();
        // A directory where the file should be makes the write fail.
        let path = tmp.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();
        fs::create_dir_all(&path).unwrap();
        assert!(matches!(
            get_or_create_token(&store),
            Err(TokenError::Configuration(_))
        ));
    }
}
