//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Tables inherit the config of the table they were derived from.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    DEFAULT_AUTOTYPE_SAMPLE_SIZE, DEFAULT_DUMP_ROW_LIMIT, DEFAULT_NUM_DECIMAL_PLACES,
    DEFAULT_SLOW_OPERATION_MS,
};
use crate::error::TableResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Link derived tables to their parent's provenance record
    #[serde(default = "default_provenance")]
    pub provenance: bool,

    /// Rows sampled when guessing delimited column types
    #[serde(default = "default_autotype_sample_size")]
    pub autotype_sample_size: usize,

    /// Operations slower than this (ms) are logged as warnings
    #[serde(default = "default_slow_operation_ms")]
    pub slow_operation_ms: f64,

    #[serde(default = "default_dump_row_limit")]
    pub dump_row_limit: usize,

    #[serde(default = "default_num_decimal_places")]
    pub default_num_decimal_places: usize,
}

fn default_provenance() -> bool {
    true
}

fn default_autotype_sample_size() -> usize {
    DEFAULT_AUTOTYPE_SAMPLE_SIZE
}

fn default_slow_operation_ms() -> f64 {
    DEFAULT_SLOW_OPERATION_MS
}

fn default_dump_row_limit() -> usize {
    DEFAULT_DUMP_ROW_LIMIT
}

fn default_num_decimal_places() -> usize {
    DEFAULT_NUM_DECIMAL_PLACES
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provenance: default_provenance(),
            autotype_sample_size: default_autotype_sample_size(),
            slow_operation_ms: default_slow_operation_ms(),
            dump_row_limit: default_dump_row_limit(),
            default_num_decimal_places: default_num_decimal_places(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> TableResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> TableResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded engine config");
        Ok(config)
    }
}
