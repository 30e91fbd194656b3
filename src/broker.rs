//! RabbitMQ plumbing.
//!
//! Everything that talks AMQP lives here: connecting, resetting queues,
//! publishing, and the delivery loop that feeds a [`StreamConsumer`] and
//! settles each message according to its [`Disposition`].
//!
//! # Consumer lifecycle
//!
//! ```text
//! Connecting ──▶ Bound ──▶ Listening ──▶ Processing ─┐
//!                              ▲                     │
//!                              └─────────────────────┘
//!                  interrupt / stream end / error ──▶ Closed
//! ```

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, info, warn};

use crate::consumer::{Disposition, StreamConsumer};
use crate::error::BrokerError;
use crate::stream::StreamId;

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;

/// How a queue is declared and consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub name: String,
    pub durable: bool,
    /// Unacknowledged messages allowed in flight per consumer.
    pub prefetch: u16,
    pub manual_ack: bool,
}

impl QueueBinding {
    /// Durable, manually acknowledged queue with one message in flight.
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            prefetch: 1,
            manual_ack: true,
        }
    }

    pub fn for_stream(stream: StreamId) -> Self {
        Self::durable(stream.queue_name())
    }
}

/// Consumer lifecycle states, logged on each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Connecting,
    Bound,
    Listening,
    Processing,
    Closed,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumerState::Connecting => "connecting",
            ConsumerState::Bound => "bound",
            ConsumerState::Listening => "listening",
            ConsumerState::Processing => "processing",
            ConsumerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a delivery loop returned without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Shutdown was requested.
    Interrupted,
    /// The broker ended the delivery stream.
    StreamEnded,
}

/// A delivered message that can be settled with the broker.
#[async_trait]
pub trait InboundMessage: Send {
    fn body(&self) -> &[u8];

    /// Ack or nack this message.
    async fn settle(self, disposition: Disposition) -> Result<(), BrokerError>;
}

#[async_trait]
impl InboundMessage for Delivery {
    fn body(&self) -> &[u8] {
        &self.data
    }

    async fn settle(self, disposition: Disposition) -> Result<(), BrokerError> {
        let result = match disposition {
            Disposition::Ack => self.acker.ack(BasicAckOptions::default()).await,
            Disposition::Nack => {
                self.acker
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
            }
        };
        result.map_err(|e| BrokerError::Delivery(e.to_string()))
    }
}

/// Something readings can be published to.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Delete then re-declare a queue so it starts empty.
    async fn reset_queue(&self, binding: &QueueBinding) -> Result<(), BrokerError>;

    /// Publish one persistent message to a queue via the default exchange.
    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), BrokerError>;
}

/// An open connection and channel to the broker.
pub struct BrokerSession {
    connection: Connection,
    channel: Channel,
    url: String,
}

impl BrokerSession {
    /// Connect and open a channel.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        debug!(url, "Connecting to broker");
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::Connection(format!("{}: {}", url, e)))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        info!(url, "Connected to broker");
        Ok(Self {
            connection,
            channel,
            url: url.to_string(),
        })
    }

    /// Close the connection. Errors are logged; the session is gone either way.
    pub async fn close(self) {
        if let Err(e) = self.connection.close(200, "Goodbye").await {
            warn!(url = %self.url, "Error closing broker connection: {}", e);
        } else {
            info!(url = %self.url, "Closed broker connection");
        }
    }

    /// Reset the queue, cap in-flight messages and run the delivery loop.
    ///
    /// Returns when `shutdown` resolves, the broker ends the stream, or an
    /// acknowledgment fails.
    pub async fn consume<F>(
        &self,
        binding: &QueueBinding,
        consumer: &mut StreamConsumer,
        shutdown: F,
    ) -> Result<LoopExit, BrokerError>
    where
        F: Future<Output = ()>,
    {
        self.reset_queue(binding).await?;
        debug!(queue = %binding.name, state = %ConsumerState::Bound);

        self.channel
            .basic_qos(binding.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| queue_error(&binding.name, e))?;

        let deliveries = self
            .channel
            .basic_consume(
                &binding.name,
                &format!("bbq-monitor-{}", binding.name),
                BasicConsumeOptions {
                    no_ack: !binding.manual_ack,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| queue_error(&binding.name, e))?
            .map(|delivery| delivery.map_err(|e| BrokerError::Delivery(e.to_string())));

        info!(queue = %binding.name, "Ready for work. To exit press CTRL+C");
        drive(deliveries, consumer, shutdown).await
    }
}

#[async_trait]
impl Publisher for BrokerSession {
    async fn reset_queue(&self, binding: &QueueBinding) -> Result<(), BrokerError> {
        self.channel
            .queue_delete(&binding.name, QueueDeleteOptions::default())
            .await
            .map_err(|e| queue_error(&binding.name, e))?;

        self.channel
            .queue_declare(
                &binding.name,
                QueueDeclareOptions {
                    durable: binding.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| queue_error(&binding.name, e))?;

        debug!(queue = %binding.name, durable = binding.durable, "Queue reset");
        Ok(())
    }

    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), BrokerError> {
        let publish_error = |e: lapin::Error| BrokerError::Publish {
            queue: queue.to_string(),
            reason: e.to_string(),
        };

        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await
            .map_err(publish_error)?
            .await
            .map_err(publish_error)?;
        Ok(())
    }
}

impl fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSession").field("url", &self.url).finish()
    }
}

fn queue_error(queue: &str, err: lapin::Error) -> BrokerError {
    BrokerError::Queue {
        queue: queue.to_string(),
        reason: err.to_string(),
    }
}

/// Feed deliveries to `consumer` one at a time until shutdown or stream end.
///
/// Each message is fully processed and settled before the next is pulled,
/// so readings are handled strictly in delivery order. A pending shutdown
/// takes priority over the next delivery but never interrupts a message
/// that is already being processed.
pub async fn drive<S, M, F>(
    deliveries: S,
    consumer: &mut StreamConsumer,
    shutdown: F,
) -> Result<LoopExit, BrokerError>
where
    S: Stream<Item = Result<M, BrokerError>>,
    M: InboundMessage,
    F: Future<Output = ()>,
{
    tokio::pin!(deliveries);
    tokio::pin!(shutdown);

    debug!(queue = consumer.queue(), state = %ConsumerState::Listening);

    let exit = loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break LoopExit::Interrupted,
            next = deliveries.next() => match next {
                Some(Ok(message)) => {
                    debug!(queue = consumer.queue(), state = %ConsumerState::Processing);
                    let outcome = consumer.handle(message.body()).await;
                    message.settle(outcome.disposition()).await?;
                }
                Some(Err(e)) => return Err(e),
                None => break LoopExit::StreamEnded,
            },
        }
    };

    debug!(queue = consumer.queue(), state = %ConsumerState::Closed, ?exit);
    Ok(exit)
}
