//! Notification sink backed by the log stream.
//!
//! Stand-in delivery channel: confirmations land in structured logs until a
//! real email/push integration is wired behind the same trait.

use async_trait::async_trait;
use gatepass_core::notify::{Notifier, NotifyCategory};

/// Notifier that emits each notification as a tracing event.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn push(
        &self,
        recipient: &str,
        title: &str,
        body: &str,
        category: NotifyCategory,
    ) -> Result<(), String> {
        tracing::info!(
            recipient = recipient,
            title = title,
            body = body,
            category = category.as_str(),
            "notification dispatched"
        );
        Ok(())
    }
}
