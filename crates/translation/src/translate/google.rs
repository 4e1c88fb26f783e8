use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{TranslateBackend, TranslateRequest};
use crate::error::TranslateError;

const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// Google Cloud Translate v2 REST backend.
///
/// Batch requests repeat the `q` parameter once per text; `format=text`
/// keeps the service from HTML-entity-encoding the output (`&#39;` → `'`).
pub struct GoogleTranslateBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<TranslationEntry>,
}

#[derive(Deserialize)]
struct TranslationEntry {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl GoogleTranslateBackend {
    pub fn new(
        api_key: &str,
        endpoint: Option<&str>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("Google Translate API key is empty");
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            endpoint: endpoint.unwrap_or(DEFAULT_ENDPOINT).to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn classify(error: reqwest::Error) -> TranslateError {
        if error.is_timeout() {
            TranslateError::Timeout
        } else {
            TranslateError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl TranslateBackend for GoogleTranslateBackend {
    async fn translate(&self, request: TranslateRequest) -> Result<Vec<String>, TranslateError> {
        if request.texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut params: Vec<(&str, &str)> = vec![
            ("key", self.api_key.as_str()),
            ("source", request.source_lang.as_str()),
            ("target", request.target_lang.as_str()),
            ("format", "text"),
        ];
        for text in &request.texts {
            params.push(("q", text.as_str()));
        }

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                code: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Malformed(e.to_string()))?;

        let translations: Vec<String> = parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect();

        if translations.len() != request.texts.len() {
            return Err(TranslateError::Malformed(format!(
                "expected {} translations, got {}",
                request.texts.len(),
                translations.len()
            )));
        }

        debug!(
            texts = request.texts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            source = %request.source_lang,
            target = %request.target_lang,
            "Translation request complete"
        );

        Ok(translations)
    }

    fn name(&self) -> &str {
        "google_translate_v2"
    }
}
