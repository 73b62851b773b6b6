//! Notifier trait definition and shared error types.

use std::collections::HashMap;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// The rendered subject/title.
    pub subject: String,
    /// The rendered body content.
    pub body: String,
    /// Additional metadata (e.g., severity, rule name).
    pub metadata: HashMap<String, String>,
}

/// Rich context passed to notifiers for template rendering and delivery,
/// mirroring the alert row that triggered this dispatch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NotificationContext {
    pub alert_id: i64,
    pub alert_type: String,
    pub cluster_id: Option<i64>,
    pub topic_canonical: Option<String>,
    pub message: String,
    pub timestamp: String,
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Test connectivity with a sample notification.
    async fn test(&self) -> Result<(), NotifyError> {
        let test_notification = Notification {
            subject: "[TEST] Pain Mining Alert".to_string(),
            body: "This is a test notification from the pain mining alert dispatcher.".to_string(),
            metadata: HashMap::from([
                ("alert_type".to_string(), "test".to_string()),
            ]),
        };
        self.send(&test_notification).await
    }

    /// Human-readable name for this channel (e.g., "webhook", "email").
    fn channel_name(&self) -> &str;
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub entity_key: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
