//! Log-only sink, used when no mail settings are configured.

use async_trait::async_trait;
use tracing::warn;

use super::NotificationSink;
use crate::error::DeliveryError;

#[derive(Debug, Clone)]
pub struct LogSink {
    description: String,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            description: "log".to_string(),
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        warn!(subject, "{}", body);
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
