//! Outbound message queue
//!
//! `send_message` intents return as soon as the message is queued; a
//! background worker performs the actual send. Messages are attempted in
//! FIFO order, exactly once each: a failed send is logged and counted but
//! never re-queued. An item counts as pending until its attempt finishes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use shadow_core::Messenger;

use crate::AgentError;

/// One message waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub platform: String,
    pub contact: String,
    pub body: String,
}

/// Delivery counters shared between the queue handle and the worker
#[derive(Debug, Default)]
pub struct QueueStats {
    pending: AtomicUsize,
    delivered: AtomicUsize,
    failed: AtomicUsize,
}

impl QueueStats {
    /// Queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Producer side of the queue
#[derive(Debug, Clone)]
pub struct MessageQueue {
    tx: mpsc::Sender<OutboundMessage>,
    stats: Arc<QueueStats>,
}

impl MessageQueue {
    /// Start the worker on the current tokio runtime
    ///
    /// The worker drains what is left and exits once every queue handle
    /// has been dropped.
    pub fn spawn(
        capacity: usize,
        messenger: Arc<dyn Messenger>,
        send_timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(QueueStats::default());
        let worker = QueueWorker {
            rx,
            messenger,
            send_timeout,
            stats: stats.clone(),
        };
        let handle = tokio::spawn(worker.run());
        (Self { tx, stats }, handle)
    }

    /// Queue a message without waiting for delivery
    pub fn enqueue(&self, message: OutboundMessage) -> Result<(), AgentError> {
        self.stats.pending.fetch_add(1, Ordering::SeqCst);
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stats.pending.fetch_sub(1, Ordering::SeqCst);
                Err(match e {
                    mpsc::error::TrySendError::Full(_) => AgentError::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => AgentError::QueueClosed,
                })
            }
        }
    }

    pub fn stats(&self) -> &Arc<QueueStats> {
        &self.stats
    }
}

struct QueueWorker {
    rx: mpsc::Receiver<OutboundMessage>,
    messenger: Arc<dyn Messenger>,
    send_timeout: Duration,
    stats: Arc<QueueStats>,
}

impl QueueWorker {
    async fn run(mut self) {
        tracing::debug!("Message queue worker started");
        while let Some(message) = self.rx.recv().await {
            self.deliver(&message).await;
            self.stats.pending.fetch_sub(1, Ordering::SeqCst);
        }
        tracing::debug!("Message queue worker stopped");
    }

    async fn deliver(&self, message: &OutboundMessage) {
        let send = self
            .messenger
            .send_message(&message.platform, &message.contact, &message.body);

        let error = match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(result)) if result.success => {
                self.stats.delivered.fetch_add(1, Ordering::SeqCst);
                tracing::info!(contact = %message.contact, platform = %message.platform, "Message delivered");
                return;
            }
            Ok(Ok(result)) => result.error_text().to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.send_timeout),
        };

        self.stats.failed.fetch_add(1, Ordering::SeqCst);
        tracing::error!(
            contact = %message.contact,
            platform = %message.platform,
            %error,
            "Message delivery failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shadow_core::{CapabilityResult, Result};

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_message(&self, _platform: &str, contact: &str, body: &str) -> Result<CapabilityResult> {
            self.sent.lock().push(contact.to_string());
            if body == "fail" {
                Ok(CapabilityResult::failure("rejected"))
            } else {
                Ok(CapabilityResult::ok("sent"))
            }
        }
    }

    fn message(contact: &str, body: &str) -> OutboundMessage {
        OutboundMessage {
            platform: "whatsapp".into(),
            contact: contact.into(),
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn test_fifo_delivery_without_requeue() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (queue, worker) = MessageQueue::spawn(8, messenger.clone(), Duration::from_secs(1));
        let stats = queue.stats().clone();

        queue.enqueue(message("a", "hi")).unwrap();
        queue.enqueue(message("b", "fail")).unwrap();
        queue.enqueue(message("c", "hi")).unwrap();
        drop(queue);
        worker.await.unwrap();

        assert_eq!(*messenger.sent.lock(), vec!["a", "b", "c"]);
        assert_eq!(stats.delivered(), 2);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.pending(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_is_reported() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (tx, _rx) = mpsc::channel(1);
        let queue = MessageQueue {
            tx,
            stats: Arc::new(QueueStats::default()),
        };
        queue.enqueue(message("a", "hi")).unwrap();
        let err = queue.enqueue(message("b", "hi")).unwrap_err();
        assert!(matches!(err, AgentError::QueueFull));
        assert_eq!(queue.stats().pending(), 1);
        drop(messenger);
    }
}
