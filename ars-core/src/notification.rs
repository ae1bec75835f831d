use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::CoreResult;

/// Outbound message channel (email, SMS, ...). Delivery is fire-and-forget:
/// callers log failures and carry on.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> CoreResult<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub sent_at: DateTime<Utc>,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message in memory so it can be inspected later.
#[derive(Default)]
pub struct OutboxNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, to: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSender for OutboxNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> CoreResult<()> {
        tracing::info!(subject, "Queued notification");
        self.sent.lock().await.push(Notification {
            sent_at: Utc::now(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Writes messages to the log only.
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(&self, _to: &str, subject: &str, body: &str) -> CoreResult<()> {
        tracing::info!(subject, body, "Notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_records_messages() {
        let outbox = OutboxNotifier::new();
        outbox.send("a@example.com", "Booking confirmed", "ARS123").await.unwrap();
        outbox.send("b@example.com", "Payment failed", "retry").await.unwrap();

        assert_eq!(outbox.sent().await.len(), 2);
        let for_a = outbox.sent_to("a@example.com").await;
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].subject, "Booking confirmed");
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let sender: Box<dyn NotificationSender> = Box::new(LogNotifier);
        assert!(sender.send("a@example.com", "Hold expired", "released").await.is_ok());
    }
}
