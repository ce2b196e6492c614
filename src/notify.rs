use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::models::{Notification, Severity, Warning};

/// How long the surface keeps a warning alert on screen.
pub const WARNING_DISPLAY_MS: u64 = 5000;

/// Receives one-shot alerts. Implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        warn!(
            severity = ?notification.severity,
            duration_ms = notification.duration_ms,
            "{}",
            notification.message
        );
    }
}

/// Forwards alerts to a channel; a closed receiver drops them silently.
impl NotificationSink for UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}

pub fn warning_notification(warning: &Warning) -> Notification {
    Notification {
        message: warning.message.clone(),
        severity: Severity::Warning,
        duration_ms: WARNING_DISPLAY_MS,
        closable: true,
    }
}
