//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use doc_signer_core::geometry::RasterScale;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Base URL signing links point at, e.g. `https://sign.example.com`.
    pub frontend_url: String,
    /// TrueType font used when burning text field values into pages.
    pub burn_font_path: PathBuf,
    /// Ratio between page-capture resolution and the editing canvas.
    pub raster_scale: RasterScale,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Signing and Compositing Settings ---
        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:4200".to_string());

        let burn_font_path = std::env::var("BURN_FONT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")
            });

        let page_raster_scale = parse_scale("PAGE_RASTER_SCALE", 2.0)?;
        let editing_canvas_scale = parse_scale("EDITING_CANVAS_SCALE", 1.0)?;
        let raster_scale = RasterScale::new(page_raster_scale, editing_canvas_scale);

        // --- Load Mail Settings (dispatch is disabled when unset) ---
        let mail_api_url = std::env::var("MAIL_API_URL").ok();
        let mail_api_key = std::env::var("MAIL_API_KEY").ok();
        let mail_from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Document Signer <no-reply@docsigner.local>".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            frontend_url,
            burn_font_path,
            raster_scale,
            mail_api_url,
            mail_api_key,
            mail_from,
        })
    }
}

fn parse_scale(var: &str, default: f32) -> Result<f32, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => {
            let value = raw.parse::<f32>().map_err(|_| {
                ConfigError::InvalidValue(var.to_string(), format!("'{raw}' is not a number"))
            })?;
            if value <= 0.0 {
                return Err(ConfigError::InvalidValue(
                    var.to_string(),
                    "scale factors must be positive".to_string(),
                ));
            }
            Ok(value)
        }
    }
}
