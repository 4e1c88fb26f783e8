use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::interim::InterimState;
use crate::sink::DeliverySink;
use crate::{MessageKind, TextBlock};

/// Hard cap on buffered out-of-order results. Exceeding it means upstream
/// is producing finals far faster than the service can translate them.
const PENDING_CAP: usize = 256;

/// A translated (or failed) sentence awaiting ordered release.
#[derive(Debug)]
pub struct FinalResult {
    pub sequence: u64,
    pub source_text: String,
    /// None when the translation call failed; the original still goes out.
    pub translated_text: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
}

struct DispatchState {
    next_to_emit: u64,
    pending: BTreeMap<u64, FinalResult>,
}

/// Releases translated finals to the UI strictly in sequence order, even
/// though batches may complete out of order (a short sentence can overtake
/// a long one issued just before it).
pub struct OrderedDispatcher {
    sink: Arc<DeliverySink>,
    interim_state: Arc<Mutex<InterimState>>,
    state: Mutex<DispatchState>,
}

impl OrderedDispatcher {
    pub fn new(sink: Arc<DeliverySink>, interim_state: Arc<Mutex<InterimState>>) -> Self {
        Self {
            sink,
            interim_state,
            state: Mutex::new(DispatchState {
                next_to_emit: 0,
                pending: BTreeMap::new(),
            }),
        }
    }

    /// Buffers one result and releases everything now emittable.
    ///
    /// On overflow the sink is failed and the error returned; the session
    /// is expected to tear down.
    pub async fn submit(&self, result: FinalResult) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        debug!(
            sequence = result.sequence,
            next = state.next_to_emit,
            buffered = state.pending.len(),
            "Final result received"
        );
        state.pending.insert(result.sequence, result);

        if state.pending.len() > PENDING_CAP {
            let error = SessionError::DispatchOverflow {
                pending: state.pending.len(),
                cap: PENDING_CAP,
            };
            self.sink.fail(error.to_string());
            return Err(error);
        }

        while let Some(result) = {
            let next = state.next_to_emit;
            state.pending.remove(&next)
        } {
            self.emit(result).await;
            state.next_to_emit += 1;
        }
        Ok(())
    }

    async fn emit(&self, result: FinalResult) {
        let sequence = result.sequence;
        // Finals are whole-sentence atomic: the prev snapshot is always
        // empty, so the delta equals the full text.
        let original = TextBlock {
            delta: result.source_text.clone(),
            full_text: result.source_text,
            language: result.source_lang,
        };
        let translation = result.translated_text.map(|text| TextBlock {
            delta: text.clone(),
            full_text: text,
            language: result.target_lang,
        });

        let delivered = self
            .sink
            .deliver(MessageKind::Final, original, translation);
        info!(sequence, delivered, "Final released");

        // A released final starts a fresh sentence cycle for the interim
        // streams.
        self.interim_state.lock().await.reset();
    }
}
