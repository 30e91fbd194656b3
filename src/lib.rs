//! # bbq-monitor
//!
//! Streams smoker and food probe readings through RabbitMQ and watches each
//! stream for trouble: a food probe that stalls, or a smoker whose
//! temperature drops sharply.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     01-smoker    ┌────────────────────────────────────┐
//! │              │─────────────────▶│ StreamConsumer (smoker, 5 / -15.0) │──┐
//! │StreamProducer│     02-food-A    ├────────────────────────────────────┤  │ alert
//! │ (CSV replay) │─────────────────▶│ StreamConsumer (food A, 20 / 1.0)  │──┼──────▶ NotificationSink
//! │              │     03-food-B    ├────────────────────────────────────┤  │
//! │              │─────────────────▶│ StreamConsumer (food B, 20 / 1.0)  │──┘
//! └──────────────┘  durable queues  └────────────────────────────────────┘
//! ```
//!
//! Each consumer runs in its own process with one message in flight. It
//! folds readings into a [`SlidingWindow`], and once the window is full a
//! [`StallDetector`] classifies the newest-minus-oldest delta.
//!
//! - **[`window`]**: fixed-capacity ring buffer and its delta
//! - **[`detector`]**: threshold policy and per-stream presets
//! - **[`consumer`]**: per-message protocol, returns an [`Outcome`]
//! - **[`broker`]**: AMQP session, queue reset, delivery loop, publishing
//! - **[`producer`]**: historical log replay with fixed pacing
//! - **[`notify`]**: email, log and channel notification sinks
//!
//! ## Usage
//!
//! ```bash
//! # Replay the log (resets all three queues first)
//! bbq-monitor produce --source smoker-temps.csv
//!
//! # One consumer per stream, each in its own terminal
//! bbq-monitor consume smoker
//! bbq-monitor consume food-a
//! bbq-monitor consume food-b
//! ```
//!
//! ### As a library
//!
//! ```
//! use bbq_monitor::{ChannelSink, Outcome, StreamConsumer, StreamId};
//!
//! # tokio_test::block_on(async {
//! let (sink, mut alerts) = ChannelSink::create("example");
//! let mut consumer = StreamConsumer::for_stream(StreamId::Smoker, Box::new(sink));
//!
//! for (n, temp) in [225.0, 220.0, 215.0, 210.0, 205.0].iter().enumerate() {
//!     let body = format!("t{}, {}", n, temp);
//!     consumer.handle(body.as_bytes()).await;
//! }
//!
//! assert_eq!(alerts.recv().await.unwrap().subject, "SMOKER ALERT");
//! # });
//! ```

pub mod broker;
pub mod config;
pub mod consumer;
pub mod detector;
pub mod error;
pub mod notify;
pub mod producer;
pub mod reading;
pub mod stream;
pub mod window;

pub use broker::{BrokerSession, ConsumerState, InboundMessage, LoopExit, Publisher, QueueBinding};
pub use config::Settings;
pub use consumer::{AlertEvent, Disposition, Outcome, StreamConsumer};
pub use detector::{Comparison, DetectorConfig, StallDetector, Verdict};
pub use error::{BrokerError, DeliveryError, Error, ExitStatus, ParseError, WindowError};
pub use notify::{ChannelSink, EmailSink, LogSink, Notification, NotificationSink};
pub use producer::{ProducerReport, StreamProducer};
pub use reading::Reading;
pub use stream::StreamId;
pub use window::SlidingWindow;
