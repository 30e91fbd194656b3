use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bbq_monitor::config::parse_duration;
use bbq_monitor::{
    BrokerSession, ConsumerState, EmailSink, Error, ExitStatus, LogSink, LoopExit,
    NotificationSink, QueueBinding, Settings, StreamConsumer, StreamId, StreamProducer,
};

#[derive(Parser, Debug)]
#[command(name = "bbq-monitor")]
#[command(about = "Stream smoker and food probe readings through RabbitMQ and alert on stalls")]
struct Args {
    /// Settings file (default: bbq.toml in the working directory, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the historical log onto the three stream queues
    Produce {
        /// Historical CSV log to replay
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Pause between rows (e.g., "30s", "500ms")
        #[arg(short, long)]
        interval: Option<String>,
    },

    /// Watch one stream for a stall or temperature drop
    Consume {
        /// Stream to watch: smoker, food-a or food-b
        stream: StreamId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let status = match run(args).await {
        Ok(status) => status,
        Err(e) => {
            error!("{}", e);
            e.exit_status()
        }
    };

    debug!(code = status.code(), "Exiting");
    status.into()
}

async fn run(args: Args) -> Result<ExitStatus, Error> {
    let mut settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Command::Produce { source, interval } => {
            if let Some(source) = source {
                settings.producer.source = source;
            }
            if let Some(interval) = interval {
                settings.producer.interval =
                    parse_duration(&interval).map_err(|e| Error::Config(e.to_string()))?;
            }
            produce(&settings).await
        }
        Command::Consume { stream } => consume(stream, &settings).await,
    }
}

/// Replay the source log. The connection is closed on every exit path.
async fn produce(settings: &Settings) -> Result<ExitStatus, Error> {
    let producer = StreamProducer::new(settings.producer.interval);
    info!("Monitor the queues at {}", settings.rabbitmq.management_url);

    let session = BrokerSession::connect(&settings.rabbitmq.url).await?;

    let result = tokio::select! {
        result = producer.run(&session, &settings.producer.source, &StreamId::ALL) => {
            result.map(|_| ExitStatus::Completed)
        }
        _ = shutdown_signal() => {
            info!("User interrupted the producer");
            Ok(ExitStatus::Interrupted)
        }
    };

    session.close().await;
    result
}

/// Listen on one stream until interrupted. The connection is closed on every exit path.
async fn consume(stream: StreamId, settings: &Settings) -> Result<ExitStatus, Error> {
    let sink = notification_sink(settings)?;
    info!(%stream, sink = sink.description(), "Starting consumer");

    let mut consumer =
        StreamConsumer::for_stream(stream, sink).with_interval(settings.producer.interval);
    let binding = QueueBinding::for_stream(stream);

    debug!(queue = %binding.name, state = %ConsumerState::Connecting);
    let session = BrokerSession::connect(&settings.rabbitmq.url).await?;

    let result = session
        .consume(&binding, &mut consumer, shutdown_signal())
        .await;
    session.close().await;

    match result? {
        LoopExit::Interrupted => {
            info!(queue = %binding.name, "User interrupted continuous listening process");
            Ok(ExitStatus::Interrupted)
        }
        LoopExit::StreamEnded => Err(Error::Runtime(format!(
            "Broker stopped delivering from '{}'",
            binding.name
        ))),
    }
}

fn notification_sink(settings: &Settings) -> Result<Box<dyn NotificationSink>, Error> {
    match &settings.email {
        Some(email) => {
            let sink = EmailSink::from_settings(email).map_err(|e| Error::Config(e.to_string()))?;
            Ok(Box::new(sink))
        }
        None => {
            warn!("No [email] settings; alerts will only be logged");
            Ok(Box::new(LogSink::new()))
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
