//! Channel-based sink.
//!
//! Forwards alerts to an in-process receiver. Useful for embedding the
//! consumer in a larger application or observing alerts in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::NotificationSink;
use crate::error::DeliveryError;

/// An alert as delivered through a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// A sink that pushes alerts onto an unbounded channel.
///
/// ```
/// use bbq_monitor::{ChannelSink, NotificationSink};
///
/// # tokio_test::block_on(async {
/// let (sink, mut rx) = ChannelSink::create("test");
/// sink.send("FOOD A STALL", "stalled").await.unwrap();
/// assert_eq!(rx.recv().await.unwrap().subject, "FOOD A STALL");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
    description: String,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<Notification>, destination: &str) -> Self {
        Self {
            sender,
            description: format!("channel: {}", destination),
        }
    }

    /// Create a sink together with the receiver its alerts arrive on.
    pub fn create(destination: &str) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, destination), rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        self.sender
            .send(Notification {
                subject: subject.to_string(),
                body: body.to_string(),
            })
            .map_err(|_| DeliveryError::Closed)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::create("test");
        sink.send("one", "first").await.unwrap();
        sink.send("two", "second").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().body, "first");
        assert_eq!(rx.recv().await.unwrap().body, "second");
        assert_eq!(sink.description(), "channel: test");
    }

    #[tokio::test]
    async fn test_channel_sink_closed_receiver() {
        let (sink, rx) = ChannelSink::create("test");
        drop(rx);

        let result = sink.send("subject", "body").await;
        assert!(matches!(result, Err(DeliveryError::Closed)));
    }
}
