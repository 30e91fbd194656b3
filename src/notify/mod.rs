//! Notification sinks for detector alerts.
//!
//! A sink delivers one human-readable alert per call. Delivery failures
//! come back as [`DeliveryError`] and are never fatal to the caller.
//!
//! - [`EmailSink`]: SMTP delivery to the configured mailbox
//! - [`LogSink`]: writes the alert to the log only
//! - [`ChannelSink`]: forwards alerts over an in-process channel

mod channel;
mod email;
mod log;

pub use channel::{ChannelSink, Notification};
pub use email::EmailSink;
pub use log::LogSink;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::DeliveryError;

/// Something that can deliver an alert.
///
/// # Example
///
/// ```
/// use bbq_monitor::{LogSink, NotificationSink};
///
/// # tokio_test::block_on(async {
/// let sink = LogSink::new();
/// sink.send("SMOKER ALERT", "Smoker temp dropped").await.unwrap();
/// # });
/// ```
#[async_trait]
pub trait NotificationSink: Send + Sync + Debug {
    /// Deliver one alert.
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError>;

    /// Human-readable description of where alerts go.
    fn description(&self) -> &str;
}
