use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::config::SharedConfig;
use crate::dispatch::{FinalResult, OrderedDispatcher};
use crate::translate::{TranslateBackend, TranslateRequest};

/// One finalized utterance queued for translation.
#[derive(Debug, Clone)]
pub struct Sentence {
    /// Session-unique, monotonically increasing from 0.
    pub sequence: u64,
    pub text: String,
    /// Detected source language reported by the STT engine, if any.
    pub detected_language: Option<String>,
    pub enqueued_at: Instant,
}

struct BatchState {
    pending: Vec<Sentence>,
    timer: Option<JoinHandle<()>>,
    in_flight: usize,
}

/// Translates finalized sentences efficiently under variable arrival rate.
///
/// An arrival with no backlog is translated immediately as a single-item
/// request, preserving the fast-path latency of isolated sentences.
/// Arrivals while work is outstanding are coalesced into a batch that
/// flushes on reaching the configured size, on timer expiry (re-armed on
/// every addition), or when the outstanding request completes.
///
/// One mutex guards the pending batch, the timer handle and the in-flight
/// count; translation requests always run outside the lock.
pub struct BatchCollector {
    backend: Arc<dyn TranslateBackend>,
    config: SharedConfig,
    dispatcher: Arc<OrderedDispatcher>,
    state: Mutex<BatchState>,
}

impl BatchCollector {
    pub fn new(
        backend: Arc<dyn TranslateBackend>,
        config: SharedConfig,
        dispatcher: Arc<OrderedDispatcher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            config,
            dispatcher,
            state: Mutex::new(BatchState {
                pending: Vec::new(),
                timer: None,
                in_flight: 0,
            }),
        })
    }

    /// Enqueues one finalized sentence, choosing between the immediate
    /// fast path and backlog batching.
    pub async fn add_sentence(self: &Arc<Self>, sentence: Sentence) {
        let config = self.config.snapshot().await;
        let mut state = self.state.lock().await;
        let sequence = sentence.sequence;
        let backlog =
            state.in_flight > 0 || !state.pending.is_empty() || state.timer.is_some();
        state.pending.push(sentence);

        if !backlog {
            debug!(sequence, "No backlog, translating immediately");
            self.flush_locked(&mut state);
        } else if state.pending.len() >= config.batch_size {
            debug!(
                sequence,
                pending = state.pending.len(),
                "Batch size reached, flushing"
            );
            self.flush_locked(&mut state);
        } else {
            // Re-arm the timeout on every addition.
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            let collector = Arc::clone(self);
            let timeout = Duration::from_millis(config.batch_timeout_ms);
            state.timer = Some(tokio::spawn(async move {
                sleep(timeout).await;
                collector.flush_on_timeout().await;
            }));
            debug!(
                sequence,
                pending = state.pending.len(),
                timeout_ms = config.batch_timeout_ms,
                "Appended to batch, timer armed"
            );
        }
    }

    /// Cancels the batch timer and drops queued sentences. In-flight
    /// requests run to completion but deliver into a closed sink.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if !state.pending.is_empty() {
            debug!(
                dropped = state.pending.len(),
                "Dropping queued sentences on teardown"
            );
            state.pending.clear();
        }
    }

    async fn flush_on_timeout(self: Arc<Self>) {
        let mut state = self.state.lock().await;
        state.timer = None;
        if !state.pending.is_empty() {
            debug!(pending = state.pending.len(), "Batch timeout, flushing");
            self.flush_locked(&mut state);
        }
    }

    /// Takes the pending batch and spawns the translation request outside
    /// the lock. Caller holds the state lock.
    fn flush_locked(self: &Arc<Self>, state: &mut BatchState) {
        if state.pending.is_empty() {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let batch = std::mem::take(&mut state.pending);
        state.in_flight += 1;

        let collector = Arc::clone(self);
        tokio::spawn(collector.run_batch(batch));
    }

    /// Translates one batch, then flushes any backlog that accumulated
    /// while the request was outstanding.
    async fn run_batch(self: Arc<Self>, mut batch: Vec<Sentence>) {
        loop {
            self.translate_and_dispatch(batch).await;

            let mut state = self.state.lock().await;
            state.in_flight -= 1;
            if state.in_flight == 0 && !state.pending.is_empty() {
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                }
                batch = std::mem::take(&mut state.pending);
                state.in_flight += 1;
                debug!(
                    size = batch.len(),
                    "Request complete, flushing accumulated backlog"
                );
                continue;
            }
            break;
        }
    }

    async fn translate_and_dispatch(&self, batch: Vec<Sentence>) {
        let config = self.config.snapshot().await;
        let queued_ms = batch
            .first()
            .map(|s| s.enqueued_at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        info!(
            size = batch.len(),
            first_sequence = batch.first().map(|s| s.sequence).unwrap_or(0),
            queued_ms,
            source = %config.source_lang,
            target = %config.target_lang,
            "Translating batch"
        );

        let translations: Vec<Option<String>> = if config.source_lang == config.target_lang {
            batch.iter().map(|s| Some(s.text.clone())).collect()
        } else {
            let request = TranslateRequest {
                texts: batch.iter().map(|s| s.text.clone()).collect(),
                source_lang: config.source_lang.clone(),
                target_lang: config.target_lang.clone(),
            };
            match self.backend.translate(request).await {
                Ok(texts) => {
                    if texts.len() != batch.len() {
                        warn!(
                            expected = batch.len(),
                            got = texts.len(),
                            "Translation count mismatch, padding with originals-only"
                        );
                    }
                    let mut out: Vec<Option<String>> = texts.into_iter().map(Some).collect();
                    out.resize(batch.len(), None);
                    out
                }
                Err(e) => {
                    // The sentences still go out, untranslated, so ordering
                    // and source delivery are preserved.
                    if e.is_permanent() {
                        error!(%e, size = batch.len(), "Permanent translation failure");
                    } else {
                        warn!(%e, size = batch.len(), "Translation failed");
                    }
                    vec![None; batch.len()]
                }
            }
        };

        for (sentence, translated) in batch.into_iter().zip(translations) {
            let result = FinalResult {
                sequence: sentence.sequence,
                source_text: sentence.text,
                translated_text: translated,
                source_lang: sentence
                    .detected_language
                    .unwrap_or_else(|| config.source_lang.clone()),
                target_lang: config.target_lang.clone(),
            };
            if let Err(e) = self.dispatcher.submit(result).await {
                error!(%e, "Dispatcher rejected result, stopping batch submission");
                break;
            }
        }
    }
}
