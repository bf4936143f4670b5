use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_MAX_TURNS: u32 = 15;
pub const DEFAULT_PAUSE_SECS: f64 = 1.5;
pub const FALLBACK_TEXT: &str = "Oh la la, la ligne a coupé...";
pub const DEFAULT_CONSTRAINT: &str = "Aucune";

/// Client-side settings. Everything the backend decides (persona, scenario,
/// turn limit enforcement) stays on the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin. API paths and relative sound files are resolved against it.
    pub api_base: String,
    /// Where transient speech clips are written while they play.
    pub clip_dir: PathBuf,
    /// Display only; the backend owns the real cap.
    pub max_turns: u32,
    /// Pause length when a pause segment carries no duration.
    pub default_pause: Duration,
    pub fallback_text: String,
    /// Sent with every manual chat message.
    pub chat_constraint: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            clip_dir: std::env::temp_dir().join("jeanne-clips"),
            max_turns: DEFAULT_MAX_TURNS,
            default_pause: Duration::from_secs_f64(DEFAULT_PAUSE_SECS),
            fallback_text: FALLBACK_TEXT.to_string(),
            chat_constraint: DEFAULT_CONSTRAINT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `JEANNE_API_BASE`, `JEANNE_CLIP_DIR`,
    /// `JEANNE_MAX_TURNS` and `JEANNE_PAUSE_DEFAULT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(base) = std::env::var("JEANNE_API_BASE") {
            config.api_base = base;
        }
        if let Ok(dir) = std::env::var("JEANNE_CLIP_DIR") {
            config.clip_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("JEANNE_MAX_TURNS") {
            config.max_turns = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "JEANNE_MAX_TURNS",
                value: raw.clone(),
            })?;
        }
        if let Ok(raw) = std::env::var("JEANNE_PAUSE_DEFAULT_SECS") {
            let secs: f64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "JEANNE_PAUSE_DEFAULT_SECS",
                value: raw.clone(),
            })?;
            config.default_pause = Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::Invalid {
                key: "JEANNE_PAUSE_DEFAULT_SECS",
                value: raw.clone(),
            })?;
        }

        // Fail early rather than on the first request.
        config.origin()?;
        debug!(?config, "client configuration loaded");
        Ok(config)
    }

    pub fn origin(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.api_base).map_err(|e| ConfigError::ApiBase {
            value: self.api_base.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::ApiBase {
                value: self.api_base.clone(),
                reason: "not a base url".to_string(),
            });
        }
        Ok(url)
    }
}

/// Origin with a trailing '/' on its path, so relative joins append to any
/// prefix (`http://host/proxy`) instead of replacing its last segment.
pub fn base_url(mut origin: Url) -> Url {
    if !origin.path().ends_with('/') {
        let path = format!("{}/", origin.path());
        origin.set_path(&path);
    }
    origin
}
