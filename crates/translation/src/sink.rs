use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{MessageKind, SessionEvent, TextBlock, TranslationMessage};

/// Hands outbound messages to the session's transport, one at a time, in
/// call order.
///
/// Delivery is synchronous (unbounded channel), so a task aborted at an
/// await point can never have half-delivered a message: either `deliver`
/// ran to completion or it never ran.
pub struct DeliverySink {
    tx: mpsc::UnboundedSender<SessionEvent>,
    closed: AtomicBool,
    last_timestamp: AtomicU64,
}

impl DeliverySink {
    /// Returns the sink and the receiver the transport drains.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                closed: AtomicBool::new(false),
                last_timestamp: AtomicU64::new(0),
            }),
            rx,
        )
    }

    /// Delivers one message unless teardown has begun.
    ///
    /// Returns false if the message was dropped (sink closed or receiver
    /// gone); callers use this to decide whether to advance their
    /// last-delivered snapshots.
    pub fn deliver(
        &self,
        kind: MessageKind,
        original: TextBlock,
        translation: Option<TextBlock>,
    ) -> bool {
        if self.closed.load(Ordering::Acquire) {
            debug!("Sink closed, dropping outbound message");
            return false;
        }
        let message = TranslationMessage {
            kind,
            original,
            translation,
            timestamp: self.next_timestamp(),
        };
        self.tx.send(SessionEvent::Translation(message)).is_ok()
    }

    /// Reports a session-fatal error and closes the sink.
    pub fn fail(&self, reason: String) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        error!(%reason, "Session failed");
        let _ = self.tx.send(SessionEvent::Fatal(reason));
    }

    /// Stops accepting messages; outstanding pipeline tasks become no-ops.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wall clock in unix milliseconds, forced non-decreasing across the
    /// session so consumers can order messages by timestamp.
    fn next_timestamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let prev = self.last_timestamp.fetch_max(now, Ordering::AcqRel);
        prev.max(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> TextBlock {
        TextBlock {
            full_text: text.to_string(),
            delta: text.to_string(),
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn test_deliver_and_receive() {
        let (sink, mut rx) = DeliverySink::channel();
        assert!(sink.deliver(MessageKind::Interim, block("hello"), None));

        match rx.recv().await {
            Some(SessionEvent::Translation(message)) => {
                assert_eq!(message.original.full_text, "hello");
                assert!(message.translation.is_none());
                assert!(message.timestamp > 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_sink_refuses_delivery() {
        let (sink, mut rx) = DeliverySink::channel();
        sink.close();
        assert!(!sink.deliver(MessageKind::Interim, block("late"), None));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fail_emits_fatal_once_and_closes() {
        let (sink, mut rx) = DeliverySink::channel();
        sink.fail("overflow".to_string());
        sink.fail("second".to_string());

        match rx.recv().await {
            Some(SessionEvent::Fatal(reason)) => assert_eq!(reason, "overflow"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_timestamps_non_decreasing() {
        let (sink, mut rx) = DeliverySink::channel();
        for i in 0..10 {
            assert!(sink.deliver(MessageKind::Interim, block(&format!("t{i}")), None));
        }
        let mut last = 0;
        for _ in 0..10 {
            match rx.recv().await {
                Some(SessionEvent::Translation(message)) => {
                    assert!(message.timestamp >= last);
                    last = message.timestamp;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
}
