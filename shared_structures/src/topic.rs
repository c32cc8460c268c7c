#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub partition_count: usize,
}

impl Topic {
    pub fn new(id: String, name: String, partition_count: usize) -> Self {
        Self {
            id,
            name,
            partition_count,
        }
    }
}
