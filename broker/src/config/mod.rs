use std::{fs, path::Path};

use crate::error::{BrokerError, Result};

pub const DEFAULT_PARTITION_COUNT_KEY: &str = "default.partition.count";
pub const RETENTION_MESSAGES_KEY: &str = "retention.messages";

/// Settings every topic of a broker is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub default_partition_count: usize,
    /// Max messages each partition keeps, `None` keeps everything.
    pub retention_messages: Option<usize>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_partition_count: 1,
            retention_messages: None,
        }
    }
}

impl BrokerConfig {
    pub fn with_partitions(default_partition_count: usize) -> Self {
        Self {
            default_partition_count,
            ..Default::default()
        }
    }

    pub fn retention_messages(mut self, max: usize) -> Self {
        self.retention_messages = Some(max);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_partition_count == 0 {
            return Err(BrokerError::InvalidConfig(
                "default partition count must be greater than zero".to_string(),
            ));
        }

        if self.retention_messages == Some(0) {
            return Err(BrokerError::InvalidConfig(
                "retention must keep at least one message".to_string(),
            ));
        }

        Ok(())
    }

    /// Loads a `key=value` properties file, see [`BrokerConfig::parse`].
    pub fn from_properties(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| BrokerError::Config(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parses properties content. Lines starting with `#` and blank lines are
    /// skipped, keys that are not set keep their default, and the result is
    /// validated before it is returned.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (i, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                BrokerError::Config(format!(
                    "property format is incorrect on line {}, should be key=value",
                    i + 1
                ))
            })?;

            let (key, value) = (key.trim(), value.trim());

            match key {
                DEFAULT_PARTITION_COUNT_KEY => {
                    config.default_partition_count = parse_number(key, value, i)?
                }
                RETENTION_MESSAGES_KEY => {
                    config.retention_messages = Some(parse_number(key, value, i)?)
                }
                _ => {
                    return Err(BrokerError::Config(format!(
                        "unknown property `{}` on line {}",
                        key,
                        i + 1
                    )))
                }
            }
        }

        config.validate()?;

        Ok(config)
    }
}

fn parse_number(key: &str, value: &str, line: usize) -> Result<usize> {
    value.parse::<usize>().map_err(|e| {
        BrokerError::Config(format!(
            "`{}` on line {} should be a number: {}",
            key,
            line + 1,
            e
        ))
    })
}
