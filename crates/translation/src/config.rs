use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Runtime configuration for one translation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Source language code sent to the translation service (e.g. "en").
    pub source_lang: String,
    /// Target language code (e.g. "zh").
    pub target_lang: String,
    /// Debounce window for interim translation, in milliseconds.
    pub debounce_ms: u64,
    /// When false, interim snapshots are translated without the debounce
    /// sleep (supersession still applies).
    pub interim_debounce_enabled: bool,
    /// Flush a pending batch once it holds this many sentences.
    pub batch_size: usize,
    /// Flush a pending batch this long after its last addition, in
    /// milliseconds.
    pub batch_timeout_ms: u64,
    /// When true, interim originals are withheld until their translation is
    /// ready and both are delivered in one message.
    pub sync_display_mode: bool,
    /// Per-request timeout for translation service calls, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: "en".to_string(),
            target_lang: "zh".to_string(),
            debounce_ms: 500,
            interim_debounce_enabled: true,
            batch_size: 3,
            batch_timeout_ms: 500,
            sync_display_mode: false,
            request_timeout_ms: 10_000,
        }
    }
}

/// Accepted ranges for live-updatable settings. Out-of-range updates are
/// clamped, not rejected.
const DEBOUNCE_MS_MAX: u64 = 5000;
const BATCH_SIZE_MIN: usize = 1;
const BATCH_SIZE_MAX: usize = 16;
const BATCH_TIMEOUT_MS_MIN: u64 = 50;
const BATCH_TIMEOUT_MS_MAX: u64 = 5000;

/// Partial configuration update received over the config RPC.
/// Field names match the wire payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub source: Option<String>,
    pub target: Option<String>,
    pub debounce: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_timeout_ms: Option<u64>,
    pub sync_display_mode: Option<bool>,
    pub interim_debounce_enabled: Option<bool>,
}

/// Shared, hot-swappable session configuration.
///
/// Readers take a snapshot at event handling time; work already in flight
/// keeps the snapshot it started with.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<TranslationConfig>>,
}

impl SharedConfig {
    pub fn new(config: TranslationConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub async fn snapshot(&self) -> TranslationConfig {
        self.inner.read().await.clone()
    }

    /// Applies a partial update, clamping out-of-range values into their
    /// accepted ranges.
    pub async fn apply(&self, update: &ConfigUpdate) {
        let mut config = self.inner.write().await;
        if let Some(source) = &update.source {
            config.source_lang = source.clone();
        }
        if let Some(target) = &update.target {
            config.target_lang = target.clone();
        }
        if let Some(debounce) = update.debounce {
            config.debounce_ms = debounce.min(DEBOUNCE_MS_MAX);
        }
        if let Some(batch_size) = update.batch_size {
            config.batch_size = batch_size.clamp(BATCH_SIZE_MIN, BATCH_SIZE_MAX);
        }
        if let Some(batch_timeout) = update.batch_timeout_ms {
            config.batch_timeout_ms = batch_timeout.clamp(BATCH_TIMEOUT_MS_MIN, BATCH_TIMEOUT_MS_MAX);
        }
        if let Some(sync) = update.sync_display_mode {
            config.sync_display_mode = sync;
        }
        if let Some(enabled) = update.interim_debounce_enabled {
            config.interim_debounce_enabled = enabled;
        }
    }
}
