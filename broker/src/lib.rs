use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use parking_lot::RwLock;
use shared_structures::{Message, Metadata};
use tracing::info;
use uuid::Uuid;

pub mod config;
pub mod partition;
pub mod partitioner;
pub mod topic;

mod error;

pub use config::BrokerConfig;
pub use error::{BrokerError, Result};
pub use partition::{InMemoryPartition, Partition, ReadOffset};
pub use partitioner::{Partitioner, RoundRobinPartitioner};
pub use topic::Topic;

/// In-process registry of topics.
///
/// Topics are created the first time a name is produced to or consumed from,
/// using the configured default partition count. A topic keeps that partition
/// count for as long as the broker lives.
#[derive(Debug)]
pub struct Broker {
    id: String,
    config: BrokerConfig,
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl Broker {
    pub fn new(default_partition_count: usize) -> Result<Self> {
        Self::with_config(BrokerConfig::with_partitions(default_partition_count))
    }

    pub fn with_config(config: BrokerConfig) -> Result<Self> {
        config.validate()?;

        let broker = Self {
            id: Uuid::new_v4().to_string(),
            config,
            topics: RwLock::new(HashMap::new()),
        };

        info!(
            broker_id = %broker.id,
            default_partition_count = broker.config.default_partition_count,
            retention_messages = ?broker.config.retention_messages,
            "broker created"
        );

        Ok(broker)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn produce(&self, topic_name: &str, message: Message) -> Result<Message> {
        self.get_or_create_topic(topic_name)?.produce(message)
    }

    pub fn consume(&self, topic_name: &str) -> Result<Message> {
        self.get_or_create_topic(topic_name)?.consume()
    }

    /// Creates a topic with an explicit partition count instead of the default one.
    pub fn create_topic(&self, topic_name: &str, partition_count: usize) -> Result<Arc<Topic>> {
        let mut topics = self.topics.write();

        if topics.contains_key(topic_name) {
            return Err(BrokerError::TopicAlreadyExists(topic_name.to_string()));
        }

        let topic = Arc::new(Topic::new(
            topic_name,
            partition_count,
            self.config.retention_messages,
        )?);
        topics.insert(topic_name.to_string(), topic.clone());

        info!(topic = topic_name, id = topic.id(), partition_count, "topic created");

        Ok(topic)
    }

    pub fn topic(&self, topic_name: &str) -> Option<Arc<Topic>> {
        self.topics.read().get(topic_name).cloned()
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    /// Serializable snapshot of every topic and where its partitions are at.
    pub fn metadata(&self) -> Result<Metadata> {
        let topics: Vec<Arc<Topic>> = self.topics.read().values().cloned().collect();

        let mut topics = topics
            .iter()
            .map(|t| t.details())
            .collect::<Result<Vec<_>>>()?;
        topics.sort_by(|a, b| a.topic.name.cmp(&b.topic.name));

        Ok(Metadata {
            broker_id: self.id.clone(),
            default_partition_count: self.config.default_partition_count,
            topics,
        })
    }

    fn get_or_create_topic(&self, topic_name: &str) -> Result<Arc<Topic>> {
        if let Some(topic) = self.topic(topic_name) {
            return Ok(topic);
        }

        // Someone may have created it between the two locks, the entry check
        // below runs under the write lock and settles it.
        let mut topics = self.topics.write();

        match topics.entry(topic_name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let topic = Arc::new(Topic::new(
                    topic_name,
                    self.config.default_partition_count,
                    self.config.retention_messages,
                )?);

                info!(
                    topic = topic_name,
                    id = topic.id(),
                    partition_count = topic.partition_count(),
                    "topic created on first use"
                );

                Ok(entry.insert(topic).clone())
            }
        }
    }
}
