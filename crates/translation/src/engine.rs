use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::SessionEvent;
use crate::config::TranslationConfig;
use crate::session::TranslationSession;
use crate::translate::TranslateBackend;

/// Manages per-connection translation sessions.
///
/// Created once at startup and shared via `Arc`. The transport layer starts
/// one session per client connection and stops it on disconnect; the
/// translation service client is shared across sessions.
pub struct TranslationEngine {
    backend: Arc<dyn TranslateBackend>,
    defaults: TranslationConfig,
    sessions: DashMap<String, Arc<TranslationSession>>,
}

impl TranslationEngine {
    pub fn new(backend: Arc<dyn TranslateBackend>, defaults: TranslationConfig) -> Arc<Self> {
        info!(backend = %backend.name(), "Translation engine created");
        Arc::new(Self {
            backend,
            defaults,
            sessions: DashMap::new(),
        })
    }

    /// Starts a session keyed by connection id, replacing (and shutting
    /// down) any existing session under the same key.
    pub async fn start_session(
        &self,
        session_id: &str,
    ) -> (Arc<TranslationSession>, mpsc::UnboundedReceiver<SessionEvent>) {
        if let Some((_, old)) = self.sessions.remove(session_id) {
            debug!(%session_id, "Replacing existing session");
            old.shutdown().await;
        }

        let (session, rx) = TranslationSession::new(Arc::clone(&self.backend), self.defaults.clone());
        self.sessions.insert(session_id.to_string(), Arc::clone(&session));
        info!(
            %session_id,
            active = self.sessions.len(),
            "Translation session started"
        );
        (session, rx)
    }

    /// Stops and removes a session. No-op for unknown ids.
    pub async fn stop_session(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            session.shutdown().await;
            debug!(
                %session_id,
                active = self.sessions.len(),
                "Translation session stopped"
            );
        }
    }

    /// Number of currently active sessions.
    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }
}
