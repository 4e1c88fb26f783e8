use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::batch::{BatchCollector, Sentence};
use crate::config::{ConfigUpdate, SharedConfig, TranslationConfig};
use crate::delta::text_delta;
use crate::dispatch::OrderedDispatcher;
use crate::interim::{DebouncedTranslator, InterimState};
use crate::sink::DeliverySink;
use crate::translate::TranslateBackend;
use crate::{HypothesisEvent, MessageKind, SessionEvent, TextBlock};

/// Per-session coordinator between an STT hypothesis stream and the UI.
///
/// Classifies incoming hypotheses, drives the debounced interim translator
/// and the adaptive batch translator, applies live config updates, and owns
/// teardown. Events are expected to be fed serially, in production order;
/// blocking work (debounce sleeps, translation requests) runs as spawned
/// tasks that report back through the delivery sink.
pub struct TranslationSession {
    config: SharedConfig,
    sink: Arc<DeliverySink>,
    interim: DebouncedTranslator,
    interim_state: Arc<Mutex<InterimState>>,
    batch: Arc<BatchCollector>,
    next_sequence: AtomicU64,
    last_interim: Mutex<String>,
    skipped_events: AtomicU64,
}

impl TranslationSession {
    /// Builds a session and returns the receiver its transport drains.
    pub fn new(
        backend: Arc<dyn TranslateBackend>,
        config: TranslationConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let config = SharedConfig::new(config);
        let (sink, rx) = DeliverySink::channel();
        let interim_state = Arc::new(Mutex::new(InterimState::default()));
        let dispatcher = Arc::new(OrderedDispatcher::new(
            Arc::clone(&sink),
            Arc::clone(&interim_state),
        ));
        let batch = BatchCollector::new(Arc::clone(&backend), config.clone(), dispatcher);
        let interim = DebouncedTranslator::new(
            backend,
            config.clone(),
            Arc::clone(&sink),
            Arc::clone(&interim_state),
        );

        let session = Arc::new(Self {
            config,
            sink,
            interim,
            interim_state,
            batch,
            next_sequence: AtomicU64::new(0),
            last_interim: Mutex::new(String::new()),
            skipped_events: AtomicU64::new(0),
        });
        (session, rx)
    }

    /// Feeds one STT hypothesis through the pipeline.
    pub async fn handle_event(&self, event: HypothesisEvent) {
        let text = event.text.trim();
        if text.is_empty() {
            self.record_skipped();
            debug!("Empty hypothesis, skipping");
            return;
        }

        if event.is_final {
            self.handle_final(text.to_string(), event.language).await;
        } else {
            self.handle_interim(text.to_string(), event.language).await;
        }
    }

    async fn handle_interim(&self, text: String, detected: Option<String>) {
        {
            let mut last = self.last_interim.lock().await;
            if *last == text {
                debug!("Duplicate interim, skipping");
                return;
            }
            *last = text.clone();
        }

        let config = self.config.snapshot().await;
        if !config.sync_display_mode {
            // Show the evolving source immediately; the translation follows
            // once the debounce window settles.
            let mut snapshots = self.interim_state.lock().await;
            let original = TextBlock {
                delta: text_delta(&snapshots.last_original, &text),
                full_text: text.clone(),
                language: detected.unwrap_or(config.source_lang),
            };
            if self.sink.deliver(MessageKind::Interim, original, None) {
                snapshots.last_original = text.clone();
            }
        }

        self.interim.submit(text).await;
    }

    async fn handle_final(&self, text: String, detected: Option<String>) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.last_interim.lock().await.clear();

        // The confirmed sentence supersedes whatever interim translation is
        // still pending for this utterance; cancel before enqueueing so no
        // stale interim can land after the final.
        if self.interim.cancel().await {
            debug!(sequence, "Final cancelled pending interim translation");
        }

        info!(
            sequence,
            chars = text.chars().count(),
            detected = detected.as_deref().unwrap_or("-"),
            "Final sentence enqueued"
        );
        self.batch
            .add_sentence(Sentence {
                sequence,
                text,
                detected_language: detected,
                enqueued_at: Instant::now(),
            })
            .await;
    }

    /// Applies a partial config update, clamping out-of-range values.
    /// Returns the config RPC reply string.
    pub async fn update_config(&self, update: ConfigUpdate) -> String {
        let debounce_disabled = update.interim_debounce_enabled == Some(false);
        self.config.apply(&update).await;
        if debounce_disabled {
            // Matching the toggle semantics: disabling the debounce drops
            // whatever is waiting out its window.
            self.interim.cancel().await;
        }
        let config = self.config.snapshot().await;
        info!(
            source = %config.source_lang,
            target = %config.target_lang,
            debounce_ms = config.debounce_ms,
            batch_size = config.batch_size,
            batch_timeout_ms = config.batch_timeout_ms,
            sync_display_mode = config.sync_display_mode,
            "Translation config updated"
        );
        "ok".to_string()
    }

    /// Counts a malformed or empty event that was skipped. The transport
    /// layer calls this for events it could not even deserialize.
    pub fn record_skipped(&self) {
        self.skipped_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of events discarded as empty or malformed.
    pub fn skipped_events(&self) -> u64 {
        self.skipped_events.load(Ordering::Relaxed)
    }

    /// Begins teardown: outbound delivery stops first, then pending work is
    /// cancelled. In-flight translation requests are abandoned; whatever
    /// they produce is dropped at the closed sink.
    pub async fn shutdown(&self) {
        self.sink.close();
        self.interim.cancel().await;
        self.batch.shutdown().await;
        info!(
            skipped_events = self.skipped_events(),
            "Translation session shut down"
        );
    }
}
