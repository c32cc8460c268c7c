use std::fmt::Debug;

use parking_lot::Mutex;

use crate::error::{BrokerError, Result};

/// Decides which partition the next produce or consume call goes to.
///
/// Produce and consume keep separate cursors: a topic can be written and read
/// at different paces without one side moving the other.
pub trait Partitioner: Send + Sync + Debug {
    /// Returns the partition for this produce call and moves the produce cursor on.
    fn next_for_produce(&self) -> usize;

    /// Returns the partition for this consume call and moves the consume cursor on.
    fn next_for_consume(&self) -> usize;

    fn peek_produce_cursor(&self) -> usize;

    fn peek_consume_cursor(&self) -> usize;

    fn partition_count(&self) -> usize;
}

#[derive(Debug)]
pub struct RoundRobinPartitioner {
    partition_count: usize,
    last_produced_partition: Mutex<usize>,
    last_consumed_partition: Mutex<usize>,
}

impl RoundRobinPartitioner {
    pub fn new(partition_count: usize) -> Result<Self> {
        if partition_count == 0 {
            return Err(BrokerError::InvalidConfig(
                "partition count must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            partition_count,
            last_produced_partition: Mutex::new(0),
            last_consumed_partition: Mutex::new(0),
        })
    }

    // The whole read-modify-write happens under the cursor's lock so two
    // callers can never leave with the same partition in one cycle.
    fn advance(&self, cursor: &Mutex<usize>) -> usize {
        let mut cursor = cursor.lock();
        let last = *cursor;
        *cursor = (last + 1) % self.partition_count;
        last
    }
}

impl Partitioner for RoundRobinPartitioner {
    fn next_for_produce(&self) -> usize {
        self.advance(&self.last_produced_partition)
    }

    fn next_for_consume(&self) -> usize {
        self.advance(&self.last_consumed_partition)
    }

    fn peek_produce_cursor(&self) -> usize {
        *self.last_produced_partition.lock()
    }

    fn peek_consume_cursor(&self) -> usize {
        *self.last_consumed_partition.lock()
    }

    fn partition_count(&self) -> usize {
        self.partition_count
    }
}
