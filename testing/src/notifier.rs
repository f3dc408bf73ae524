//! Recording notification sink.

use async_trait::async_trait;
use gatepass_core::notify::{Notifier, NotifyCategory};
use std::sync::{Arc, Mutex};

/// One notification captured by [`RecordingNotifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushedNotification {
    /// Recipient address.
    pub recipient: String,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Routing category.
    pub category: NotifyCategory,
}

/// Notifier that records every push instead of delivering it.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<PushedNotification>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything pushed so far, in order.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<PushedNotification> {
        self.sent.lock().unwrap().clone()
    }

    /// Makes subsequent pushes fail, to exercise best-effort delivery.
    #[allow(clippy::unwrap_used)]
    pub fn fail_next_pushes(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    #[allow(clippy::unwrap_used)]
    async fn push(
        &self,
        recipient: &str,
        title: &str,
        body: &str,
        category: NotifyCategory,
    ) -> Result<(), String> {
        if *self.fail.lock().unwrap() {
            return Err("notifier configured to fail".to_string());
        }
        self.sent.lock().unwrap().push(PushedNotification {
            recipient: recipient.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            category,
        });
        Ok(())
    }
}
