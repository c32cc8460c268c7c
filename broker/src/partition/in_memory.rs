use std::collections::VecDeque;

use parking_lot::RwLock;
use shared_structures::Message;

use crate::error::{BrokerError, Result};

use super::{Partition, ReadOffset};

#[derive(Debug, Default)]
struct Log {
    // Offset of `messages[0]`, moves forward on eviction only.
    base_offset: u64,
    messages: VecDeque<Message>,
}

impl Log {
    fn next_offset(&self) -> u64 {
        self.base_offset + self.messages.len() as u64
    }

    fn evict_until(&mut self, offset: u64) -> usize {
        let upto = offset.min(self.next_offset());
        let mut evicted = 0;

        while self.base_offset < upto {
            self.messages.pop_front();
            self.base_offset += 1;
            evicted += 1;
        }

        evicted
    }
}

/// Partition kept entirely in memory.
///
/// A partition built with [`InMemoryPartition::uninitialized`] has no log at
/// all and refuses every call, which keeps a wiring mistake from looking like
/// an empty partition.
#[derive(Debug)]
pub struct InMemoryPartition {
    log: Option<RwLock<Log>>,
    retention: Option<usize>,
}

impl InMemoryPartition {
    pub fn new() -> Self {
        Self {
            log: Some(RwLock::new(Log::default())),
            retention: None,
        }
    }

    /// Keeps at most `max_messages`, evicting the oldest on append.
    pub fn with_retention(max_messages: usize) -> Result<Self> {
        if max_messages == 0 {
            return Err(BrokerError::InvalidConfig(
                "retention must keep at least one message".to_string(),
            ));
        }

        Ok(Self {
            retention: Some(max_messages),
            ..Self::new()
        })
    }

    pub fn uninitialized() -> Self {
        Self {
            log: None,
            retention: None,
        }
    }

    pub fn retention(&self) -> Option<usize> {
        self.retention
    }

    fn log(&self) -> Result<&RwLock<Log>> {
        self.log.as_ref().ok_or(BrokerError::UninitializedPartition)
    }
}

impl Default for InMemoryPartition {
    fn default() -> Self {
        Self::new()
    }
}

impl Partition for InMemoryPartition {
    fn append(&self, message: Message) -> Result<Message> {
        let mut log = self.log()?.write();

        let message = message.at_offset(log.next_offset());
        log.messages.push_back(message.clone());

        if let Some(max) = self.retention {
            if log.messages.len() > max {
                let keep_from = log.next_offset() - max as u64;
                log.evict_until(keep_from);
            }
        }

        Ok(message)
    }

    fn read(&self, from: ReadOffset) -> Result<Message> {
        let log = self.log()?.read();

        if log.messages.is_empty() {
            return Err(BrokerError::EmptyPartition);
        }

        let message = match from {
            ReadOffset::Earliest => log.messages.front(),
            ReadOffset::Latest => log.messages.back(),
            ReadOffset::At(offset) if offset < log.base_offset => {
                return Err(BrokerError::CleanedMessage {
                    offset,
                    earliest: log.base_offset,
                })
            }
            ReadOffset::At(offset) => log.messages.get((offset - log.base_offset) as usize),
        };

        // Past the tail: nothing has been written there yet.
        message.cloned().ok_or(BrokerError::EmptyPartition)
    }

    fn earliest_offset(&self) -> Result<u64> {
        Ok(self.log()?.read().base_offset)
    }

    fn next_offset(&self) -> Result<u64> {
        Ok(self.log()?.read().next_offset())
    }

    fn offsets(&self) -> Result<(u64, u64)> {
        let log = self.log()?.read();
        Ok((log.base_offset, log.next_offset()))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.log()?.read().messages.len())
    }

    fn clean_until(&self, offset: u64) -> Result<usize> {
        Ok(self.log()?.write().evict_until(offset))
    }
}
