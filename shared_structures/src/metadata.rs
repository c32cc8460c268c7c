use crate::Topic;

/// Position of a single partition at the time the snapshot was taken.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PartitionDetails {
    pub partition_number: usize,
    pub earliest_offset: u64,
    pub next_offset: u64,
    pub consume_offset: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TopicDetails {
    pub topic: Topic,
    pub partitions: Vec<PartitionDetails>,
}

impl TopicDetails {
    /// Total messages still retained across every partition of the topic.
    pub fn retained_messages(&self) -> u64 {
        self.partitions
            .iter()
            .map(|p| p.next_offset.saturating_sub(p.earliest_offset))
            .sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Metadata {
    pub broker_id: String,
    pub default_partition_count: usize,
    pub topics: Vec<TopicDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retained_messages_skips_cleaned_ones() {
        let details = TopicDetails {
            topic: Topic::new("id".to_string(), "orders".to_string(), 2),
            partitions: vec![
                PartitionDetails {
                    partition_number: 0,
                    earliest_offset: 3,
                    next_offset: 5,
                    consume_offset: 3,
                },
                PartitionDetails {
                    partition_number: 1,
                    earliest_offset: 0,
                    next_offset: 4,
                    consume_offset: 1,
                },
            ],
        };

        assert_eq!(details.retained_messages(), 6);
    }

    #[test]
    fn retained_messages_never_underflows() {
        let details = TopicDetails {
            topic: Topic::new("id".to_string(), "orders".to_string(), 1),
            partitions: vec![PartitionDetails {
                partition_number: 0,
                earliest_offset: 9,
                next_offset: 4,
                consume_offset: 0,
            }],
        };

        assert_eq!(details.retained_messages(), 0);
    }

    #[test]
    fn default_metadata_is_empty() {
        let metadata = Metadata::default();

        assert!(metadata.topics.is_empty());
        assert_eq!(metadata.default_partition_count, 0);
    }
}
