//! Configuration for ingestion and retrieval.

use serde::{Deserialize, Serialize};

use crate::chunking::DEFAULT_MAX_CHUNK_SIZE;
use crate::error::{RagError, Result};

/// Configuration parameters for the knowledge pipeline.
///
/// `match_threshold` and `match_count` are the defaults used by
/// [`RetrievalService`](crate::RetrievalService) when a caller does not pass
/// its own values; they are policy knobs, not structural constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters (advisory for oversized sentences).
    pub chunk_size: usize,
    /// Maximum number of chunks embedded and stored concurrently per document.
    pub ingest_concurrency: usize,
    /// Default minimum similarity; results must score strictly above it.
    pub match_threshold: f32,
    /// Default maximum number of results returned by a search.
    pub match_count: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            ingest_concurrency: 4,
            match_threshold: 0.35,
            match_count: 5,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set how many chunks of one document may be processed at once.
    pub fn ingest_concurrency(mut self, concurrency: usize) -> Self {
        self.config.ingest_concurrency = concurrency;
        self
    }

    /// Set the default similarity threshold.
    pub fn match_threshold(mut self, threshold: f32) -> Self {
        self.config.match_threshold = threshold;
        self
    }

    /// Set the default maximum result count.
    pub fn match_count(mut self, count: usize) -> Self {
        self.config.match_count = count;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `ingest_concurrency == 0`
    /// - `match_count == 0`
    /// - `match_threshold` is not within `[-1, 1]`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.config.ingest_concurrency == 0 {
            return Err(RagError::Config(
                "ingest_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.config.match_count == 0 {
            return Err(RagError::Config("match_count must be greater than zero".to_string()));
        }
        if !(-1.0..=1.0).contains(&self.config.match_threshold) {
            return Err(RagError::Config(format!(
                "match_threshold ({}) must be within [-1, 1]",
                self.config.match_threshold
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let built = RagConfig::builder().build().unwrap();
        assert_eq!(built, RagConfig::default());
        assert_eq!(built.chunk_size, 1000);
    }

    #[test]
    fn rejects_zero_values_and_out_of_range_threshold() {
        assert!(RagConfig::builder().chunk_size(0).build().is_err());
        assert!(RagConfig::builder().ingest_concurrency(0).build().is_err());
        assert!(RagConfig::builder().match_count(0).build().is_err());
        assert!(RagConfig::builder().match_threshold(1.5).build().is_err());
        assert!(RagConfig::builder().match_threshold(-0.2).match_count(3).build().is_ok());
    }
}
