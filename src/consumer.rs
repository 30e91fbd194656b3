//! Per-stream consumer: window, detector and alerting for one queue.
//!
//! [`StreamConsumer::handle`] runs the per-message protocol and reports
//! what happened as an [`Outcome`]. It never talks to the broker; the
//! delivery loop in [`broker`](crate::broker) turns the outcome's
//! [`Disposition`] into an ack or nack.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::detector::{round_tenths, DetectorConfig, StallDetector, Verdict};
use crate::error::ParseError;
use crate::notify::NotificationSink;
use crate::reading::{format_temperature, Reading};
use crate::stream::StreamId;
use crate::window::SlidingWindow;

/// What the delivery loop should tell the broker about a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// Reject without requeueing.
    Nack,
}

/// A detection event, built only when the detector fires.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    /// Queue the triggering reading arrived on.
    pub queue: String,
    pub current_value: f64,
    /// Newest minus oldest over the window, rounded to tenths.
    pub delta: f64,
    pub timestamp: String,
}

/// Result of processing one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Body could not be parsed; the window is untouched.
    Malformed(ParseError),
    /// Window not yet full, no detection ran.
    WarmingUp(Reading),
    /// Window full, detector did not fire.
    Normal { reading: Reading, delta: f64 },
    /// Detector fired; `delivered` is false if the sink failed.
    Alert { event: AlertEvent, delivered: bool },
}

impl Outcome {
    /// Every outcome is acknowledged: malformed bodies never become valid,
    /// and a failed alert must not cause the reading to be reprocessed.
    pub fn disposition(&self) -> Disposition {
        Disposition::Ack
    }
}

/// Binds one queue to its window, detector and notification sink.
///
/// The window is owned exclusively by the consumer, so a fresh consumer
/// always starts warming up.
///
/// ```
/// use bbq_monitor::{ChannelSink, Outcome, StreamConsumer, StreamId};
///
/// # tokio_test::block_on(async {
/// let (sink, _alerts) = ChannelSink::create("doc");
/// let mut consumer = StreamConsumer::for_stream(StreamId::Smoker, Box::new(sink));
///
/// let outcome = consumer.handle(b"12:00, 225.0").await;
/// assert!(matches!(outcome, Outcome::WarmingUp(_)));
/// # });
/// ```
#[derive(Debug)]
pub struct StreamConsumer {
    queue: String,
    config: DetectorConfig,
    window: SlidingWindow<f64>,
    detector: StallDetector,
    sink: Box<dyn NotificationSink>,
    interval: Duration,
}

impl StreamConsumer {
    pub fn new(
        queue: impl Into<String>,
        config: DetectorConfig,
        sink: Box<dyn NotificationSink>,
    ) -> Self {
        Self {
            queue: queue.into(),
            window: SlidingWindow::new(config.window_capacity),
            detector: StallDetector::new(&config),
            config,
            sink,
            interval: Duration::from_secs(30),
        }
    }

    /// Consumer for one of the fixed probe streams.
    pub fn for_stream(stream: StreamId, sink: Box<dyn NotificationSink>) -> Self {
        Self::new(stream.queue_name(), stream.detector_config(), sink)
    }

    /// Reading interval used to describe the window span in logs.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn window(&self) -> &SlidingWindow<f64> {
        &self.window
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Process one message body.
    pub async fn handle(&mut self, body: &[u8]) -> Outcome {
        let reading = match Reading::parse(body) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(
                    queue = %self.queue,
                    body = %String::from_utf8_lossy(body),
                    "Dropping malformed reading: {}",
                    e
                );
                return Outcome::Malformed(e);
            }
        };

        self.window.push(reading.value);

        let delta = match self.window.delta() {
            Ok(delta) => round_tenths(delta),
            Err(_) => {
                info!(
                    queue = %self.queue,
                    timestamp = %reading.timestamp,
                    warming_up = self.window.len(),
                    "Current temp is {}",
                    format_temperature(reading.value)
                );
                return Outcome::WarmingUp(reading);
            }
        };

        match self.detector.evaluate(delta) {
            Verdict::Normal => {
                info!(
                    queue = %self.queue,
                    timestamp = %reading.timestamp,
                    delta,
                    "Current temp is {}",
                    format_temperature(reading.value)
                );
                Outcome::Normal { reading, delta }
            }
            Verdict::Alert => {
                let event = AlertEvent {
                    queue: self.queue.clone(),
                    current_value: reading.value,
                    delta,
                    timestamp: reading.timestamp,
                };
                let delivered = self.notify(&event).await;
                Outcome::Alert { event, delivered }
            }
        }
    }

    async fn notify(&self, event: &AlertEvent) -> bool {
        let span = self.config.span(self.interval);
        warn!(
            queue = %event.queue,
            timestamp = %event.timestamp,
            delta = event.delta,
            span_minutes = span.as_secs_f64() / 60.0,
            "{}: current temp is {}, change over window is {} degrees",
            self.config.subject,
            format_temperature(event.current_value),
            event.delta
        );

        match self.sink.send(&self.config.subject, &self.config.body).await {
            Ok(()) => {
                debug!(queue = %event.queue, sink = self.sink.description(), "Alert delivered");
                true
            }
            Err(e) => {
                warn!(
                    queue = %event.queue,
                    sink = self.sink.description(),
                    "Failed to deliver alert: {}",
                    e
                );
                false
            }
        }
    }
}
