use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, warn};

use crate::config::SharedConfig;
use crate::delta::text_delta;
use crate::sink::DeliverySink;
use crate::translate::{TranslateBackend, TranslateRequest};
use crate::{MessageKind, TextBlock};

/// Last delivered snapshots for the interim original and translation
/// streams.
///
/// Shared between the ingestor (which delivers originals directly in async
/// display mode) and the debounced translator; reset whenever a final is
/// released, starting the next sentence cycle from empty.
#[derive(Debug, Default)]
pub struct InterimState {
    pub last_original: String,
    pub last_translation: String,
}

impl InterimState {
    pub fn reset(&mut self) {
        self.last_original.clear();
        self.last_translation.clear();
    }
}

/// Translates the evolving interim hypothesis without calling the service
/// on every STT update.
///
/// Each submission supersedes the previous one, aborting its debounce sleep
/// or in-flight request; a final cancels whatever is pending. At most one
/// task is ever active, and an aborted task produces no outbound message:
/// the snapshot lock acquisition is the last cancellation point before
/// delivery, and delivery itself never awaits.
pub struct DebouncedTranslator {
    backend: Arc<dyn TranslateBackend>,
    config: SharedConfig,
    sink: Arc<DeliverySink>,
    state: Arc<Mutex<InterimState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedTranslator {
    pub fn new(
        backend: Arc<dyn TranslateBackend>,
        config: SharedConfig,
        sink: Arc<DeliverySink>,
        state: Arc<Mutex<InterimState>>,
    ) -> Self {
        Self {
            backend,
            config,
            sink,
            state,
            task: Mutex::new(None),
        }
    }

    /// Schedules translation of the latest interim snapshot, superseding any
    /// previously scheduled or in-flight task.
    pub async fn submit(&self, snapshot: String) {
        let config = self.config.snapshot().await;
        let mut task = self.task.lock().await;
        if let Some(prev) = task.take() {
            prev.abort();
        }

        let backend = Arc::clone(&self.backend);
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);

        *task = Some(tokio::spawn(async move {
            if config.interim_debounce_enabled && config.debounce_ms > 0 {
                sleep(Duration::from_millis(config.debounce_ms)).await;
            }

            let translated = if config.source_lang == config.target_lang {
                snapshot.clone()
            } else {
                let request = TranslateRequest {
                    texts: vec![snapshot.clone()],
                    source_lang: config.source_lang.clone(),
                    target_lang: config.target_lang.clone(),
                };
                match backend.translate(request).await {
                    Ok(mut texts) if !texts.is_empty() => texts.remove(0),
                    Ok(_) => {
                        warn!("Translation service returned no texts for interim");
                        return;
                    }
                    Err(e) => {
                        // Best effort: a failed interim yields no outbound
                        // message; the last delivered source stays on screen.
                        if e.is_permanent() {
                            error!(%e, "Interim translation failed permanently");
                        } else {
                            warn!(%e, "Interim translation failed");
                        }
                        return;
                    }
                }
            };

            let mut snapshots = state.lock().await;
            let original = TextBlock {
                delta: text_delta(&snapshots.last_original, &snapshot),
                full_text: snapshot.clone(),
                language: config.source_lang.clone(),
            };
            let translation = TextBlock {
                delta: text_delta(&snapshots.last_translation, &translated),
                full_text: translated.clone(),
                language: config.target_lang.clone(),
            };
            if sink.deliver(MessageKind::Interim, original, Some(translation)) {
                snapshots.last_original = snapshot;
                snapshots.last_translation = translated;
            }
        }));
    }

    /// Cancels any scheduled or in-flight interim task. Called when a final
    /// arrives for the same utterance and on session teardown.
    ///
    /// Returns true if a live task was actually cancelled.
    pub async fn cancel(&self) -> bool {
        let mut task = self.task.lock().await;
        match task.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                debug!("Cancelled pending interim translation");
                true
            }
            _ => false,
        }
    }
}
