use crate::error::ConfigError;
use crate::model::chunk_utils::AVERAGE_BUFFER_SIZE;
use crate::model::position::DefaultEndOfLine;
use crate::search::{DEFAULT_LIMIT, DEFAULT_WORD_SEPARATORS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Buffer construction and search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BufferConfig {
    /// Rewrite every line terminator to the detected EOL when a document is loaded
    #[serde(default = "default_true")]
    pub normalize_eol: bool,

    /// Line terminator for documents that contain none
    #[serde(default)]
    pub default_eol: DefaultEndOfLine,

    /// Entries kept by the node lookup cache
    #[serde(default = "default_search_cache_capacity")]
    pub search_cache_capacity: usize,

    /// Largest buffer created for loaded or inserted text, in UTF-16 code units.
    /// Inserts longer than this get buffers of their own instead of going to
    /// the change buffer.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters that end a word in whole-word search
    #[serde(default = "default_word_separators")]
    pub word_separators: String,

    /// Maximum number of matches returned by a find-all
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_search_cache_capacity() -> usize {
    1
}

fn default_chunk_size() -> usize {
    AVERAGE_BUFFER_SIZE
}

fn default_word_separators() -> String {
    DEFAULT_WORD_SEPARATORS.to_string()
}

fn default_search_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            normalize_eol: true,
            default_eol: DefaultEndOfLine::default(),
            search_cache_capacity: default_search_cache_capacity(),
            chunk_size: default_chunk_size(),
            word_separators: default_word_separators(),
            search_limit: default_search_limit(),
        }
    }
}

impl BufferConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: BufferConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;

        tracing::debug!(path = %path.as_ref().display(), "loaded buffer config");
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "search_cache_capacity must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size < 2 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 2".to_string(),
            ));
        }

        if self.search_limit == 0 {
            return Err(ConfigError::ValidationError(
                "search_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Cache capacity as the non-zero value the cache wants
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.search_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// JSON schema of the configuration file
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(BufferConfig)).unwrap_or_default()
    }
}
