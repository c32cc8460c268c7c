use std::fmt::Debug;

use shared_structures::Message;

use crate::error::Result;

mod in_memory;

pub use in_memory::InMemoryPartition;

/// Where a read should start from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOffset {
    /// Earliest message still retained by the partition.
    Earliest,
    /// Most recently appended message.
    Latest,
    /// Absolute offset within the partition.
    At(u64),
}

impl From<u64> for ReadOffset {
    fn from(offset: u64) -> Self {
        Self::At(offset)
    }
}

/// A single ordered, append-only log.
///
/// Reads never remove anything; several consumers can walk the same partition
/// at their own pace. Messages only leave a partition from the front, through
/// retention or `clean_until`.
pub trait Partition: Send + Sync + Debug {
    /// Stores `message` at the tail and returns it with its offset set.
    fn append(&self, message: Message) -> Result<Message>;

    fn read(&self, from: ReadOffset) -> Result<Message>;

    /// Offset of the earliest retained message, or of the next one when nothing is retained.
    fn earliest_offset(&self) -> Result<u64>;

    /// Offset the next append will get.
    fn next_offset(&self) -> Result<u64>;

    /// `(earliest_offset, next_offset)` read together, so they describe the same moment.
    fn offsets(&self) -> Result<(u64, u64)>;

    /// Number of retained messages.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Evicts every message below `offset`, returns how many went away.
    fn clean_until(&self, offset: u64) -> Result<usize>;
}
