//! Staff notifications through the chat bot
//!
//! Delivery is best-effort: failures are logged and never reach the caller.

use crate::config::TelegramConfig;
use crate::external::TelegramClient;
use crate::models::EnrollmentNotification;

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    telegram: Option<TelegramClient>,
}

impl NotificationService {
    /// Build from configuration; without a bot token and chat ID nothing is sent
    pub fn new(http: reqwest::Client, config: &TelegramConfig) -> Self {
        Self {
            telegram: TelegramClient::from_config(http, config),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.telegram.is_some()
    }

    /// Announce a new enrollment; returns whether the message was delivered
    pub async fn notify_enrollment(&self, notification: &EnrollmentNotification) -> bool {
        let Some(telegram) = &self.telegram else {
            tracing::debug!("Chat bot not configured, skipping enrollment notification");
            return false;
        };

        match telegram.send_html(&notification.to_html_message()).await {
            Ok(()) => {
                tracing::info!("Enrollment notification sent");
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send enrollment notification: {}", e);
                false
            }
        }
    }
}
