//! Partitioned, ordered log broker adapter (spec.md §4.C).
//!
//! Chat frames are appended keyed by sender-id so the broker's partition
//! hashing gives per-sender FIFO ordering. The consumer side is a single
//! reader commiting offsets on an interval, starting at the latest offset on
//! cold boot — history is served from the store, never replayed from here.

use std::time::Duration;

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message as _;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::KafkaConfig;

pub struct BrokerProducer {
    producer: FutureProducer,
    topic: String,
    write_timeout: Duration,
}

impl BrokerProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.host_port)
            .set("message.timeout.ms", config.write_timeout_ms.to_string())
            .create()?;
        Ok(Self {
            producer,
            topic: config.topic.clone(),
            write_timeout: Duration::from_millis(config.write_timeout_ms),
        })
    }

    /// Append a frame keyed by sender-id. Same key -> same partition -> FIFO.
    pub async fn append(&self, key: &str, value: &[u8]) -> Result<(), String> {
        let record = FutureRecord::to(&self.topic).key(key).payload(value);
        self.producer
            .send(record, self.write_timeout)
            .await
            .map(|_| ())
            .map_err(|(e, _)| e.to_string())
    }
}

pub struct BrokerConsumer {
    consumer: StreamConsumer,
}

impl BrokerConsumer {
    pub fn new(config: &KafkaConfig) -> Result<Self, rdkafka::error::KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.host_port)
            .set("group.id", &config.consumer_group)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", config.commit_interval_ms.to_string())
            .set("auto.offset.reset", "latest")
            .create()?;
        consumer.subscribe(&[&config.topic])?;
        Ok(Self { consumer })
    }

    /// Block until a frame arrives or `token` is cancelled. Returns `None`
    /// on cancellation (clean exit, spec.md §4.F step 1).
    pub async fn recv(&self, token: &CancellationToken) -> Option<Result<(String, Vec<u8>), String>> {
        loop {
            tokio::select! {
                _ = token.cancelled() => return None,
                result = self.consumer.recv() => {
                    return match result {
                        Ok(borrowed) => {
                            let key = borrowed
                                .key()
                                .map(|k| String::from_utf8_lossy(k).into_owned())
                                .unwrap_or_default();
                            let value = borrowed.payload().unwrap_or_default().to_vec();
                            Some(Ok((key, value)))
                        }
                        Err(e) => Some(Err(e.to_string())),
                    };
                }
            }
        }
    }

    /// Read loop wrapper applying the literal 100ms backoff-and-retry policy
    /// on non-shutdown read errors (spec.md §4.C).
    pub async fn recv_with_backoff(&self, token: &CancellationToken) -> Option<(String, Vec<u8>)> {
        loop {
            match self.recv(token).await? {
                Ok(frame) => return Some(frame),
                Err(e) => {
                    warn!(error = %e, "broker read error, backing off");
                    if timeout(Duration::from_millis(100), token.cancelled())
                        .await
                        .is_ok()
                    {
                        return None;
                    }
                }
            }
        }
    }
}

/// Delete and recreate the topic at startup to guarantee a known partition
/// count (spec.md §4.C).
pub async fn ensure_topic(config: &KafkaConfig) -> Result<(), rdkafka::error::KafkaError> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", &config.host_port)
        .create()?;
    let opts = AdminOptions::new();

    if let Err(e) = admin.delete_topics(&[&config.topic], &opts).await {
        info!(topic = %config.topic, error = %e, "topic delete skipped (likely absent)");
    }

    let topic = NewTopic::new(
        &config.topic,
        config.partitions,
        TopicReplication::Fixed(config.replication_factor),
    );
    match admin.create_topics(&[topic], &opts).await {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(topic = %config.topic, error = %e, "topic create failed");
            Err(e)
        }
    }
}
