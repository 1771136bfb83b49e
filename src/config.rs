//! Engine configuration.
//!
//! Serde-backed options loadable from TOML. Defaults mirror the built-in
//! behavior, so an absent file and `EngineConfig::default()` are the same
//! thing.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub ghost: GhostConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

/// Streaming execution options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Release consumed input fragments leaf-by-leaf. Turning this off keeps
    /// inputs alive for debug dumps.
    pub release_fragments: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            release_fragments: true,
        }
    }
}

/// Ghost-data defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GhostConfig {
    /// Request zone ghosts even when no filter asks for them.
    pub always_request_zone_ghosts: bool,
}

/// Chunker policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target zones per chunk; 0 means unbounded.
    pub target_zones_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_zones_per_chunk: 0,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Save to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text =
            toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Load from a file, or fall back to defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.as_ref().display(), error = %e, "using default config");
                Self::default()
            }
        }
    }
}
