use parking_lot::Mutex;
use shared_structures::{Message, PartitionDetails, Topic as TopicInfo, TopicDetails};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{BrokerError, Result},
    partition::{InMemoryPartition, Partition, ReadOffset},
    partitioner::{Partitioner, RoundRobinPartitioner},
};

/// A named stream split into a fixed number of partitions.
///
/// Both produce and consume are spread round-robin over the partitions, so a
/// single consumer loop drains every partition instead of sticking to the
/// first one. Each partition also has a consume cursor: the offset the next
/// topic-level consume reads from it.
#[derive(Debug)]
pub struct Topic {
    id: String,
    name: String,
    partitions: Vec<Box<dyn Partition>>,
    consume_offsets: Vec<Mutex<u64>>,
    partitioner: Box<dyn Partitioner>,
}

impl Topic {
    /// Creates a topic backed by in-memory partitions.
    pub fn new(name: &str, partition_count: usize, retention: Option<usize>) -> Result<Self> {
        let partitioner = RoundRobinPartitioner::new(partition_count)?;

        let partitions = (0..partition_count)
            .map(|_| -> Result<Box<dyn Partition>> {
                Ok(match retention {
                    Some(max) => Box::new(InMemoryPartition::with_retention(max)?),
                    None => Box::new(InMemoryPartition::new()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_parts(name, partitions, Box::new(partitioner))
    }

    /// Assembles a topic from partitions and a partitioner built elsewhere.
    pub fn from_parts(
        name: &str,
        partitions: Vec<Box<dyn Partition>>,
        partitioner: Box<dyn Partitioner>,
    ) -> Result<Self> {
        if partitions.is_empty() {
            return Err(BrokerError::InvalidConfig(format!(
                "topic `{}` needs at least one partition",
                name
            )));
        }

        if partitions.len() != partitioner.partition_count() {
            return Err(BrokerError::InvalidConfig(format!(
                "topic `{}` has {} partitions but its partitioner spans {}",
                name,
                partitions.len(),
                partitioner.partition_count()
            )));
        }

        let consume_offsets = partitions.iter().map(|_| Mutex::new(0)).collect();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            partitions,
            consume_offsets,
            partitioner,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition(&self, partition_number: usize) -> Result<&dyn Partition> {
        self.partitions
            .get(partition_number)
            .map(|p| p.as_ref())
            .ok_or_else(|| BrokerError::PartitionNotFound {
                topic: self.name.clone(),
                partition: partition_number,
            })
    }

    pub fn produce(&self, message: Message) -> Result<Message> {
        let partition_number = self.partitioner.next_for_produce();

        let stored = self
            .partition(partition_number)?
            .append(message.routed_to(&self.name, partition_number))?;

        debug!(
            topic = %self.name,
            partition = partition_number,
            offset = ?stored.offset(),
            "message appended"
        );

        Ok(stored)
    }

    /// Reads the next unread message of the partition the consume cursor points at.
    ///
    /// `EmptyPartition` means that partition has nothing new yet; the caller
    /// should poll again. On `CleanedMessage` the partition's cursor is moved to
    /// the earliest retained offset before the error is returned.
    pub fn consume(&self) -> Result<Message> {
        let partition_number = self.partitioner.next_for_consume();
        let partition = self.partition(partition_number)?;

        // Held across the read so two consumers never get the same message.
        let mut cursor = self.consume_offsets[partition_number].lock();

        match partition.read(ReadOffset::At(*cursor)) {
            Ok(message) => {
                *cursor += 1;
                debug!(
                    topic = %self.name,
                    partition = partition_number,
                    offset = ?message.offset(),
                    "message consumed"
                );
                Ok(message)
            }
            Err(BrokerError::CleanedMessage { offset, earliest }) => {
                warn!(
                    topic = %self.name,
                    partition = partition_number,
                    offset,
                    earliest,
                    "consume offset was cleaned, re-seeking to earliest"
                );
                *cursor = earliest;
                Err(BrokerError::CleanedMessage { offset, earliest })
            }
            Err(e) => Err(e),
        }
    }

    /// Offset-addressed read that leaves the consume cursors alone.
    pub fn read(&self, partition_number: usize, from: ReadOffset) -> Result<Message> {
        self.partition(partition_number)?.read(from)
    }

    pub fn info(&self) -> TopicInfo {
        TopicInfo::new(self.id.clone(), self.name.clone(), self.partition_count())
    }

    pub fn details(&self) -> Result<TopicDetails> {
        let partitions = self
            .partitions
            .iter()
            .zip(&self.consume_offsets)
            .enumerate()
            .map(|(partition_number, (partition, cursor))| -> Result<PartitionDetails> {
                // Same lock order as `consume`: cursor first, then the log.
                let cursor = cursor.lock();
                let (earliest_offset, next_offset) = partition.offsets()?;

                Ok(PartitionDetails {
                    partition_number,
                    earliest_offset,
                    next_offset,
                    consume_offset: *cursor,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TopicDetails {
            topic: self.info(),
            partitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    };

    use super::*;

    fn placements(topic: &Topic, count: usize) -> Vec<(usize, u64)> {
        (0..count)
            .map(|i| {
                let stored = topic
                    .produce(Message::new("a", format!("x-{}", i)))
                    .unwrap();
                (stored.partition().unwrap(), stored.offset().unwrap())
            })
            .collect()
    }

    #[test]
    fn zero_partitions_is_rejected() {
        assert!(matches!(
            Topic::new("orders", 0, None),
            Err(BrokerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_retention_is_rejected() {
        assert!(matches!(
            Topic::new("orders", 2, Some(0)),
            Err(BrokerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn mismatched_partitioner_is_rejected() {
        let partitions: Vec<Box<dyn Partition>> = vec![Box::new(InMemoryPartition::new())];
        let partitioner = Box::new(RoundRobinPartitioner::new(3).unwrap());

        assert!(matches!(
            Topic::from_parts("orders", partitions, partitioner),
            Err(BrokerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn produce_spreads_round_robin() {
        let topic = Topic::new("orders", 3, None).unwrap();

        let got = placements(&topic, 5);

        assert_eq!(got, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn produce_stamps_the_topic_name() {
        let topic = Topic::new("orders", 2, None).unwrap();

        let stored = topic.produce(Message::new("a", "x")).unwrap();

        assert!(stored.is_placed());
        assert_eq!(stored.topic(), Some("orders"));
        assert_eq!(stored.key(), b"a");
        assert_eq!(stored.payload(), b"x");
    }

    #[test]
    fn consume_walks_partitions_in_order() {
        let topic = Topic::new("orders", 2, None).unwrap();
        placements(&topic, 4);

        let got: Vec<(usize, u64)> = (0..4)
            .map(|_| {
                let message = topic.consume().unwrap();
                (message.partition().unwrap(), message.offset().unwrap())
            })
            .collect();

        assert_eq!(got, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(topic.consume(), Err(BrokerError::EmptyPartition));
    }

    #[test]
    fn consume_on_empty_topic_is_retryable() {
        let topic = Topic::new("orders", 3, None).unwrap();

        let err = topic.consume().unwrap_err();

        assert_eq!(err, BrokerError::EmptyPartition);
        assert!(err.is_retryable());
    }

    #[test]
    fn consume_does_not_remove_messages() {
        let topic = Topic::new("orders", 1, None).unwrap();
        placements(&topic, 2);

        topic.consume().unwrap();

        assert_eq!(topic.read(0, ReadOffset::At(0)).unwrap().offset(), Some(0));
        assert_eq!(topic.partition(0).unwrap().len().unwrap(), 2);
    }

    #[test]
    fn consume_re_seeks_after_cleaning() {
        let topic = Topic::new("orders", 1, Some(2)).unwrap();
        placements(&topic, 5);

        assert_eq!(
            topic.consume(),
            Err(BrokerError::CleanedMessage {
                offset: 0,
                earliest: 3
            })
        );

        assert_eq!(topic.consume().unwrap().offset(), Some(3));
        assert_eq!(topic.consume().unwrap().offset(), Some(4));
        assert_eq!(topic.consume(), Err(BrokerError::EmptyPartition));
    }

    #[test]
    fn details_stay_within_retention_while_producing() {
        let topic = Arc::new(Topic::new("orders", 1, Some(1)).unwrap());
        let done = Arc::new(AtomicBool::new(false));

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let topic = topic.clone();
                let done = done.clone();
                std::thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        topic.produce(Message::from_payload("x")).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..20_000 {
            let details = topic.details().unwrap();
            let retained = details.retained_messages();
            assert!(retained <= 1, "{} retained with retention 1", retained);
        }

        done.store(true, Ordering::Relaxed);
        for producer in producers {
            producer.join().unwrap();
        }
    }

    #[test]
    fn concurrent_produce_and_consume_deliver_each_message_once() {
        let topic = Arc::new(Topic::new("orders", 3, None).unwrap());
        let total = 3_000;
        let done = Arc::new(AtomicBool::new(false));

        let producer = {
            let topic = topic.clone();
            std::thread::spawn(move || {
                for i in 0..total {
                    topic
                        .produce(Message::from_payload(format!("m-{}", i)))
                        .unwrap();
                }
            })
        };

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let topic = topic.clone();
                let done = done.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while !done.load(Ordering::Acquire) {
                        match topic.consume() {
                            Ok(message) => seen
                                .push((message.partition().unwrap(), message.offset().unwrap())),
                            Err(BrokerError::EmptyPartition) => std::thread::yield_now(),
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                    seen
                })
            })
            .collect();

        producer.join().unwrap();
        done.store(true, Ordering::Release);

        let mut seen: Vec<(usize, u64)> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();

        // Whatever the consumers had not reached yet.
        let mut misses = 0;
        while misses < topic.partition_count() {
            match topic.consume() {
                Ok(message) => {
                    misses = 0;
                    seen.push((message.partition().unwrap(), message.offset().unwrap()));
                }
                Err(BrokerError::EmptyPartition) => misses += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        let unique: HashSet<(usize, u64)> = seen.iter().copied().collect();

        assert_eq!(unique.len(), seen.len());
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn read_unknown_partition() {
        let topic = Topic::new("orders", 2, None).unwrap();

        assert_eq!(
            topic.read(2, ReadOffset::Earliest),
            Err(BrokerError::PartitionNotFound {
                topic: "orders".to_string(),
                partition: 2
            })
        );
    }

    #[test]
    fn uninitialized_partitions_surface_through_the_topic() {
        let partitions: Vec<Box<dyn Partition>> = vec![
            Box::new(InMemoryPartition::uninitialized()),
            Box::new(InMemoryPartition::uninitialized()),
        ];
        let partitioner = Box::new(RoundRobinPartitioner::new(2).unwrap());
        let topic = Topic::from_parts("orders", partitions, partitioner).unwrap();

        assert_eq!(
            topic.produce(Message::new("a", "x")),
            Err(BrokerError::UninitializedPartition)
        );
        assert_eq!(topic.consume(), Err(BrokerError::UninitializedPartition));
        assert_eq!(topic.details(), Err(BrokerError::UninitializedPartition));
    }

    #[test]
    fn details_reports_offsets_and_cursors() {
        let topic = Topic::new("orders", 2, None).unwrap();
        placements(&topic, 3);
        topic.consume().unwrap();

        let details = topic.details().unwrap();

        assert_eq!(details.topic.name, "orders");
        assert_eq!(details.topic.partition_count, 2);
        assert_eq!(details.partitions[0].next_offset, 2);
        assert_eq!(details.partitions[0].consume_offset, 1);
        assert_eq!(details.partitions[1].next_offset, 1);
        assert_eq!(details.partitions[1].consume_offset, 0);
        assert_eq!(details.retained_messages(), 3);
    }
}
