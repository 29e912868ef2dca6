//! Process-wide state of the import bridge.
//!
//! Created once at startup and passed to whoever needs it. Owns the token,
//! the import configuration, the sending half of the GUI queue and, once
//! started, the listener handle. Import is optional: if the listener cannot
//! start the rest of the application keeps running.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::dispatch::UiDispatcher;
use crate::preview::PreviewBox;
use crate::server::{import_router, spawn_listener, ListenerError, ListenerHandle};
use crate::settings::SettingsStore;
use crate::token::{get_or_create_token, TokenError};

pub struct ImportBridgeState {
    token: Arc<str>,
    config: ImportConfig,
    dispatcher: UiDispatcher,
    listener: Option<ListenerHandle>,
}

impl ImportBridgeState {
    /// Loads (or creates) the import token. The listener cannot start without one.
    pub fn new(
        settings: &SettingsStore,
        config: ImportConfig,
        dispatcher: UiDispatcher,
    ) -> Result<Self, TokenError> {
        let token = get_or_create_token(settings)?;
        Ok(Self::with_token(token, config, dispatcher))
    }

    pub fn with_token(
        token: impl Into<Arc<str>>,
        config: ImportConfig,
        dispatcher: UiDispatcher,
    ) -> Self {
        Self {
            token: token.into(),
            config,
            dispatcher,
            listener: None,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn preview_box(&self) -> PreviewBox {
        PreviewBox {
            max_width: self.config.preview_max_width,
            max_height: self.config.preview_max_height,
        }
    }

    pub fn listener(&self) -> Option<&ListenerHandle> {
        self.listener.as_ref()
    }

    /// Starts the listener. Calling it again returns the running listener.
    pub fn start(&mut self) -> Result<ListenerHandle, ListenerError> {
        if let Some(existing) = &self.listener {
            return Ok(existing.clone());
        }

        let bind: SocketAddr = self
            .config
            .bind
            .parse()
            .map_err(|_| ListenerError::InvalidBind(self.config.bind.clone()))?;
        let router = import_router(
            self.token.clone(),
            self.dispatcher.clone(),
            self.config.max_body_bytes,
        );
        let handle = spawn_listener(bind, router)?;
        self.listener = Some(handle.clone());
        Ok(handle)
    }

    /// Like [`start`](Self::start), but a failure only disables import.
    pub fn start_or_disable(&mut self) -> Option<ListenerHandle> {
        if !self.config.enabled {
            info!("import listener disabled in config");
            return None;
        }
        match self.start() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "import listener unavailable; continuing without import");
                None
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.shutdown();
            info!("import listener stopped");
        }
    }
}
