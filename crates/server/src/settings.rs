use std::net::SocketAddr;

use anyhow::Context;
use livetrans_translation::TranslationConfig;

/// Process configuration, read from `LIVETRANS_*` environment variables at
/// startup. Per-session settings can still be changed live over the config
/// RPC; these are the defaults new sessions start with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub google_api_key: String,
    /// Override for the Translate API endpoint (tests, proxies).
    pub google_endpoint: Option<String>,
    pub translation: TranslationConfig,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = env_or("LIVETRANS_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid LIVETRANS_LISTEN_ADDR")?;

        let google_api_key = std::env::var("LIVETRANS_GOOGLE_API_KEY").unwrap_or_default();
        if google_api_key.trim().is_empty() {
            anyhow::bail!("LIVETRANS_GOOGLE_API_KEY is required");
        }
        let google_endpoint = std::env::var("LIVETRANS_GOOGLE_ENDPOINT").ok();

        let mut translation = TranslationConfig::default();
        if let Ok(value) = std::env::var("LIVETRANS_SOURCE_LANGUAGE") {
            translation.source_lang = value;
        }
        if let Ok(value) = std::env::var("LIVETRANS_TARGET_LANGUAGE") {
            translation.target_lang = value;
        }
        translation.debounce_ms = env_u64("LIVETRANS_DEBOUNCE_MS", translation.debounce_ms)?;
        translation.interim_debounce_enabled = env_flag(
            "LIVETRANS_DEBOUNCE_ENABLED",
            translation.interim_debounce_enabled,
        );
        translation.batch_size =
            env_u64("LIVETRANS_BATCH_SIZE", translation.batch_size as u64)? as usize;
        translation.batch_timeout_ms =
            env_u64("LIVETRANS_BATCH_TIMEOUT_MS", translation.batch_timeout_ms)?;
        translation.sync_display_mode =
            env_flag("LIVETRANS_SYNC_DISPLAY_MODE", translation.sync_display_mode);
        translation.request_timeout_ms = env_u64(
            "LIVETRANS_REQUEST_TIMEOUT_MS",
            translation.request_timeout_ms,
        )?;

        if translation.batch_size == 0 {
            anyhow::bail!("LIVETRANS_BATCH_SIZE must be at least 1");
        }

        Ok(Self {
            listen_addr,
            google_api_key,
            google_endpoint,
            translation,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: '{value}'")),
        Err(_) => Ok(default),
    }
}

/// Truthy values follow the usual convention: "1", "true", "yes", "on".
fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
