pub mod google;

use async_trait::async_trait;

use crate::error::TranslateError;

/// Request to translate a batch of texts between two languages.
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    /// Texts in submission order; the response carries one entry per text.
    pub texts: Vec<String>,
    /// Source language code (e.g. "en").
    pub source_lang: String,
    /// Target language code (e.g. "zh").
    pub target_lang: String,
}

/// Trait for pluggable translation services.
#[async_trait]
pub trait TranslateBackend: Send + Sync + 'static {
    /// Translates a batch of texts, preserving order.
    ///
    /// Implementations return exactly one translation per input text.
    async fn translate(&self, request: TranslateRequest) -> Result<Vec<String>, TranslateError>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
