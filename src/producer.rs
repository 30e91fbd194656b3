//! Replays a historical probe log onto the stream queues.
//!
//! The source is a CSV-like text file with a header row followed by
//! `timestamp,smoker,food_a,food_b` rows. Each parsable temperature is
//! published to its stream's queue; blank or non-numeric fields are
//! skipped for that stream only.

use std::path::Path;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::broker::{Publisher, QueueBinding};
use crate::error::Error;
use crate::reading::{parse_temperature, Reading};
use crate::stream::StreamId;

/// Counts from a completed replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    /// Data rows read (header excluded).
    pub rows: u64,
    /// Messages published across all streams.
    pub published: u64,
    /// Fields skipped because they did not parse.
    pub skipped: u64,
}

/// Publishes one reading per stream per source row, pacing rows at a fixed interval.
#[derive(Debug, Clone)]
pub struct StreamProducer {
    interval: Duration,
}

impl StreamProducer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replay `source` onto the queues of `targets`.
    ///
    /// The source is opened first, so a missing file leaves the queues
    /// untouched. Each target queue is then reset before the first row.
    pub async fn run<P>(
        &self,
        publisher: &P,
        source: &Path,
        targets: &[StreamId],
    ) -> Result<ProducerReport, Error>
    where
        P: Publisher + ?Sized,
    {
        let source_error = |e: std::io::Error| Error::Source {
            path: source.to_path_buf(),
            reason: e.to_string(),
        };

        let file = File::open(source).await.map_err(source_error)?;
        let mut lines = BufReader::new(file).lines();

        for stream in targets {
            publisher
                .reset_queue(&QueueBinding::for_stream(*stream))
                .await?;
        }

        let header = lines.next_line().await.map_err(source_error)?;
        debug!(?header, "Skipped header row");

        let mut report = ProducerReport::default();
        while let Some(line) = lines.next_line().await.map_err(source_error)? {
            if line.trim().is_empty() {
                continue;
            }
            if report.rows > 0 {
                tokio::time::sleep(self.interval).await;
            }
            report.rows += 1;

            let (readings, skipped) = row_readings(&line, targets);
            report.skipped += skipped;
            for (stream, reading) in readings {
                publisher
                    .publish(stream.queue_name(), &reading.to_body())
                    .await?;
                report.published += 1;
                info!(queue = stream.queue_name(), "Sent {}", reading);
            }
        }

        info!(
            rows = report.rows,
            published = report.published,
            skipped = report.skipped,
            "Finished replaying {}",
            source.display()
        );
        Ok(report)
    }
}

/// Split one source row into readings for the requested streams.
///
/// Returns the readings in column order and the number of target fields
/// that were missing or not numeric.
pub fn row_readings(line: &str, targets: &[StreamId]) -> (Vec<(StreamId, Reading)>, u64) {
    let mut fields = line.split(',').map(str::trim);
    let timestamp = fields.next().unwrap_or_default();
    let values: Vec<&str> = fields.collect();

    let mut readings = Vec::new();
    let mut skipped = 0;
    for (column, stream) in StreamId::ALL.iter().enumerate() {
        if !targets.contains(stream) {
            continue;
        }
        match values.get(column).and_then(|field| parse_temperature(field)) {
            Some(value) => readings.push((*stream, Reading::new(timestamp, value))),
            None => skipped += 1,
        }
    }
    (readings, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrokerError;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    #[derive(Default)]
    struct RecordingPublisher {
        resets: Mutex<Vec<String>>,
        published: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn reset_queue(&self, binding: &QueueBinding) -> Result<(), BrokerError> {
            assert!(binding.durable);
            self.resets.lock().unwrap().push(binding.name.clone());
            Ok(())
        }

        async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), BrokerError> {
            self.published
                .lock()
                .unwrap()
                .push((queue.to_string(), String::from_utf8(body.to_vec()).unwrap()));
            Ok(())
        }
    }

    fn source(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_row_readings_all_fields() {
        let (readings, skipped) = row_readings("6/4/24 16:00:00,35,32.2,40.1", &StreamId::ALL);
        assert_eq!(skipped, 0);
        assert_eq!(
            readings,
            vec![
                (StreamId::Smoker, Reading::new("6/4/24 16:00:00", 35.0)),
                (StreamId::FoodA, Reading::new("6/4/24 16:00:00", 32.2)),
                (StreamId::FoodB, Reading::new("6/4/24 16:00:00", 40.1)),
            ]
        );
    }

    #[test]
    fn test_row_readings_skips_bad_field_only() {
        let (readings, skipped) = row_readings("16:00:30,225.6,n/a,40.1", &StreamId::ALL);
        assert_eq!(skipped, 1);
        let streams: Vec<StreamId> = readings.iter().map(|(s, _)| *s).collect();
        assert_eq!(streams, vec![StreamId::Smoker, StreamId::FoodB]);
    }

    #[test]
    fn test_row_readings_blank_and_missing_fields() {
        let (readings, skipped) = row_readings("16:01:00,,", &StreamId::ALL);
        assert!(readings.is_empty());
        assert_eq!(skipped, 3);
    }

    #[test]
    fn test_row_readings_respects_targets() {
        let (readings, skipped) = row_readings("16:01:00,1,2,3", &[StreamId::FoodB]);
        assert_eq!(skipped, 0);
        assert_eq!(readings, vec![(StreamId::FoodB, Reading::new("16:01:00", 3.0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_publishes_and_resets() {
        let file = source(
            "Time (UTC),Channel1,Channel2,Channel3\n\
             6/4/24 16:00:00,35,32.2,\n\
             6/4/24 16:00:30,35.9,abc,40.5\n",
        );
        let publisher = RecordingPublisher::default();
        let producer = StreamProducer::new(Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        let report = producer
            .run(&publisher, file.path(), &StreamId::ALL)
            .await
            .unwrap();

        assert_eq!(
            report,
            ProducerReport {
                rows: 2,
                published: 4,
                skipped: 2
            }
        );
        assert_eq!(
            *publisher.resets.lock().unwrap(),
            vec!["01-smoker", "02-food-A", "03-food-B"]
        );
        assert_eq!(
            *publisher.published.lock().unwrap(),
            vec![
                ("01-smoker".to_string(), "6/4/24 16:00:00, 35.0".to_string()),
                ("02-food-A".to_string(), "6/4/24 16:00:00, 32.2".to_string()),
                ("01-smoker".to_string(), "6/4/24 16:00:30, 35.9".to_string()),
                ("03-food-B".to_string(), "6/4/24 16:00:30, 40.5".to_string()),
            ]
        );
        // one pause between the two rows, none after the last
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_run_header_only() {
        let file = source("Time (UTC),Channel1,Channel2,Channel3\n");
        let publisher = RecordingPublisher::default();
        let report = StreamProducer::new(Duration::ZERO)
            .run(&publisher, file.path(), &StreamId::ALL)
            .await
            .unwrap();

        assert_eq!(report, ProducerReport::default());
        assert_eq!(publisher.resets.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_run_missing_source_leaves_queues_alone() {
        let publisher = RecordingPublisher::default();
        let err = StreamProducer::new(Duration::ZERO)
            .run(&publisher, Path::new("/nonexistent/smoker-temps.csv"), &StreamId::ALL)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Source { .. }));
        assert_eq!(err.exit_status(), crate::ExitStatus::SourceUnavailable);
        assert!(publisher.resets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_publish_failure() {
        struct RejectingPublisher;

        #[async_trait]
        impl Publisher for RejectingPublisher {
            async fn reset_queue(&self, _binding: &QueueBinding) -> Result<(), BrokerError> {
                Ok(())
            }

            async fn publish(&self, queue: &str, _body: &[u8]) -> Result<(), BrokerError> {
                Err(BrokerError::Publish {
                    queue: queue.to_string(),
                    reason: "channel closed".to_string(),
                })
            }
        }

        let file = source("header\n16:00,1,2,3\n");
        let err = StreamProducer::new(Duration::ZERO)
            .run(&RejectingPublisher, file.path(), &StreamId::ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Broker(BrokerError::Publish { .. })));
    }
}
