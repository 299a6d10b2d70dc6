//! Vectorizer configuration from environment variables or JSON.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::env;

/// Tunables shared by the vectorizers built from a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeConfig {
    /// Elements per chunk for the stream target
    pub stream_chunk_size: usize,

    /// Smallest chunk handed to a rayon worker by the parallel target
    pub parallel_min_chunk: usize,

    /// Skip GPU acquisition; gpu targets use the CPU fallbacks
    pub gpu_disabled: bool,

    /// OpenCL platform index to acquire a device from
    pub gpu_platform: usize,
}

impl Default for VectorizeConfig {
    fn default() -> Self {
        Self {
            stream_chunk_size: 4096,
            parallel_min_chunk: 1024,
            gpu_disabled: false,
            gpu_platform: 0,
        }
    }
}

impl VectorizeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `VECTORIZE_STREAM_CHUNK`: Stream chunk size (default: 4096)
    /// - `VECTORIZE_PARALLEL_MIN_CHUNK`: Minimum parallel chunk (default: 1024)
    /// - `VECTORIZE_DISABLE_GPU`: Disable GPU acquisition (default: false)
    /// - `VECTORIZE_GPU_PLATFORM`: OpenCL platform index (default: 0)
    ///
    /// Unparseable or zero values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            stream_chunk_size: env::var("VECTORIZE_STREAM_CHUNK")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.stream_chunk_size),

            parallel_min_chunk: env::var("VECTORIZE_PARALLEL_MIN_CHUNK")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.parallel_min_chunk),

            gpu_disabled: env::var("VECTORIZE_DISABLE_GPU")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.gpu_disabled),

            gpu_platform: env::var("VECTORIZE_GPU_PLATFORM")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.gpu_platform),
        }
    }

    /// Load configuration from a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidValue {
                key: "json".to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.stream_chunk_size == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "stream_chunk_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.parallel_min_chunk == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "parallel_min_chunk".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Builder-style method to set the stream chunk size
    pub fn with_stream_chunk_size(mut self, size: usize) -> Self {
        self.stream_chunk_size = size;
        self
    }

    /// Builder-style method to set the parallel minimum chunk
    pub fn with_parallel_min_chunk(mut self, size: usize) -> Self {
        self.parallel_min_chunk = size;
        self
    }

    /// Builder-style method to disable GPU acquisition
    pub fn without_gpu(mut self) -> Self {
        self.gpu_disabled = true;
        self
    }
}
