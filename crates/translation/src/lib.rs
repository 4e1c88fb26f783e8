pub mod batch;
pub mod config;
pub mod delta;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod interim;
pub mod session;
pub mod sink;
pub mod translate;

pub use config::{ConfigUpdate, SharedConfig, TranslationConfig};
pub use engine::TranslationEngine;
pub use session::TranslationSession;
pub use translate::{TranslateBackend, TranslateRequest};

use serde::{Deserialize, Serialize};

/// One STT emission: an evolving interim hypothesis or a confirmed final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisEvent {
    pub text: String,
    pub is_final: bool,
    /// Detected source language, if the STT engine reports one. Passed
    /// through for display; the configured source language stays
    /// authoritative for the translation direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Whether an outbound message reflects a revisable hypothesis or a
/// confirmed sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Interim,
    Final,
}

/// One rendered text stream: the full text plus the minimal delta since the
/// previous emission of the same stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub full_text: String,
    pub delta: String,
    pub language: String,
}

/// Outbound UI message carrying the original stream and, when available,
/// its translation. `translation` is null for original-only interims and
/// for finals whose translation failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub original: TextBlock,
    pub translation: Option<TextBlock>,
    /// Unix milliseconds, monotonic within a session.
    pub timestamp: u64,
}

/// Events delivered to the session's transport consumer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// An outbound translation message to forward to the UI.
    Translation(TranslationMessage),
    /// The session hit an unrecoverable error and is shutting down.
    Fatal(String),
}
