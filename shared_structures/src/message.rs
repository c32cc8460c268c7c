/// A produced message together with the position the broker gave it.
///
/// Callers build a message with a key and a payload only; `offset`,
/// `partition` and `topic` stay `None` until the broker places it. Once placed
/// the `(topic, partition, offset)` triple identifies the message for good, so
/// the type hands out clones rather than mutable access.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    key: Vec<u8>,
    payload: Vec<u8>,
    offset: Option<u64>,
    partition: Option<usize>,
    topic: Option<String>,
}

impl Message {
    pub fn new(key: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn from_payload(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(Vec::new(), payload)
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn partition(&self) -> Option<usize> {
        self.partition
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// True once the broker has stamped topic, partition and offset.
    pub fn is_placed(&self) -> bool {
        self.topic.is_some() && self.partition.is_some() && self.offset.is_some()
    }

    /// Stamps the owning topic and partition. Used by the broker right before append.
    pub fn routed_to(self, topic: &str, partition: usize) -> Self {
        Self {
            topic: Some(topic.to_string()),
            partition: Some(partition),
            ..self
        }
    }

    /// Stamps the offset. Only the partition that stores the message calls this.
    pub fn at_offset(self, offset: u64) -> Self {
        Self {
            offset: Some(offset),
            ..self
        }
    }
}
