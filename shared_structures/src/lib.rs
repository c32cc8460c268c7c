mod message;
mod metadata;
mod topic;

pub use message::Message;
pub use metadata::{Metadata, PartitionDetails, TopicDetails};
pub use topic::Topic;
