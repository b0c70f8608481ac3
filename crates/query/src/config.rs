//! Executor configuration.

use quarry_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of rows Select pulls from its child per batch.
pub const DEFAULT_SELECT_BATCH_SIZE: usize = 1000;

/// Tunables for the streams built by [`crate::executor::StreamExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Rows pulled per Select batch.
    pub select_batch_size: usize,
    /// Whether PathUnion reports rows merged on equal keys.
    pub warn_on_overlapping_keys: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            select_batch_size: DEFAULT_SELECT_BATCH_SIZE,
            warn_on_overlapping_keys: true,
        }
    }
}

impl ExecutorConfig {
    /// Checks the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.select_batch_size == 0 {
            return Err(Error::invalid_parameter("select_batch_size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.select_batch_size, 1000);
        assert!(config.warn_on_overlapping_keys);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"select_batch_size": 16}"#).unwrap();
        assert_eq!(config.select_batch_size, 16);
        assert!(config.warn_on_overlapping_keys);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = ExecutorConfig {
            select_batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_validation());
    }
}
