use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrokerError>;

/// Everything the broker can hand back to a caller.
///
/// Partition errors travel up through the topic and the broker untouched, so a
/// caller of `Broker::consume` matches on the same variants a partition
/// produces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("partition is not initialized")]
    UninitializedPartition,

    /// No message is available at the requested position yet.
    #[error("partition is empty")]
    EmptyPartition,

    /// The requested offset was evicted by retention, re-seek from `earliest`.
    #[error("requested message is cleaned: offset {offset}, earliest retained {earliest}")]
    CleanedMessage { offset: u64, earliest: u64 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("topic `{0}` already exists")]
    TopicAlreadyExists(String),

    #[error("topic `{topic}` has no partition {partition}")]
    PartitionNotFound { topic: String, partition: usize },
}

impl BrokerError {
    /// Only an empty partition is worth polling again as is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmptyPartition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_empty_partition_is_retryable() {
        assert!(BrokerError::EmptyPartition.is_retryable());
        assert!(!BrokerError::UninitializedPartition.is_retryable());
        assert!(!BrokerError::CleanedMessage {
            offset: 1,
            earliest: 4
        }
        .is_retryable());
        assert!(!BrokerError::InvalidConfig("zero".to_string()).is_retryable());
    }

    #[test]
    fn cleaned_message_names_the_offsets() {
        let err = BrokerError::CleanedMessage {
            offset: 2,
            earliest: 10,
        };

        let text = err.to_string();
        assert!(text.contains("cleaned"));
        assert!(text.contains('2'));
        assert!(text.contains("10"));
    }
}
