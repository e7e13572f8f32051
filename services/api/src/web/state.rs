//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use doc_signer_core::compositor::Compositor;
use doc_signer_core::ports::{DocumentStore, Notifier, SignatureRequestStore};
use rusttype::Font;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub requests: Arc<dyn SignatureRequestStore>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
    /// Loaded once at startup from `Config::burn_font_path`.
    pub burn_font: Font<'static>,
}

impl AppState {
    /// A compositor configured for this deployment's raster scale and
    /// burn-in font. Cheap to build per request.
    pub fn compositor(&self) -> Compositor {
        Compositor::new(self.config.raster_scale).with_font(self.burn_font.clone())
    }
}
