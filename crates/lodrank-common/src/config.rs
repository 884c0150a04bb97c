//! Configuration types and utilities
//!
//! Configuration is layered: defaults, then an optional TOML file, then
//! `LODRANK_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{LodRankError, Result};
use crate::lod::MAX_LOD_DEPTH;
use crate::types::Device;

#[cfg(test)]
mod tests;

pub const ENV_RANK_LEVEL: &str = "LODRANK_RANK_LEVEL";
pub const ENV_DEVICE: &str = "LODRANK_DEVICE";
pub const ENV_PREFER_GPU: &str = "LODRANK_PREFER_GPU";
pub const ENV_REVALIDATE: &str = "LODRANK_REVALIDATE";

/// Main lodrank configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LodRankConfig {
    pub rank: RankConfig,
    pub kernel: KernelConfig,
    pub validation: ValidationConfig,
}

/// Rank-table construction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Reference level ranked when the caller does not name one.
    pub level: usize,
}

/// Kernel provider selection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub device: Device,
    /// Try the GPU provider before the CPU fallback.
    pub prefer_gpu: bool,
}

/// Eager metadata checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Re-check LoD consistency whenever an engine consumes a tensor.
    pub revalidate_on_consume: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { revalidate_on_consume: true }
    }
}

impl LodRankConfig {
    pub fn builder() -> LodRankConfigBuilder {
        LodRankConfigBuilder::default()
    }

    /// Load from a TOML file. Sections and fields that are absent keep their
    /// defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            LodRankError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// File (when given) overlaid with environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        tracing::debug!(?config, "loaded lodrank configuration");
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var(ENV_RANK_LEVEL) {
            self.rank.level = value.trim().parse().map_err(|_| {
                LodRankError::Config(format!("{ENV_RANK_LEVEL} must be an integer, got '{value}'"))
            })?;
        }
        if let Ok(value) = env::var(ENV_DEVICE) {
            self.kernel.device = value.parse()?;
        }
        if let Ok(value) = env::var(ENV_PREFER_GPU) {
            self.kernel.prefer_gpu = parse_flag(ENV_PREFER_GPU, &value)?;
        }
        if let Ok(value) = env::var(ENV_REVALIDATE) {
            self.validation.revalidate_on_consume = parse_flag(ENV_REVALIDATE, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rank.level >= MAX_LOD_DEPTH {
            return Err(LodRankError::Config(format!(
                "rank level {} exceeds maximum LoD depth {MAX_LOD_DEPTH}",
                self.rank.level
            )));
        }
        if self.kernel.prefer_gpu && self.kernel.device.is_cpu() {
            return Err(LodRankError::Config(
                "prefer_gpu requires a cuda device".to_string(),
            ));
        }
        Ok(())
    }

    /// Take every value of `other` that differs from the default.
    pub fn merge_with(&mut self, other: Self) {
        let defaults = Self::default();
        if other.rank.level != defaults.rank.level {
            self.rank.level = other.rank.level;
        }
        if other.kernel.device != defaults.kernel.device {
            self.kernel.device = other.kernel.device;
        }
        if other.kernel.prefer_gpu != defaults.kernel.prefer_gpu {
            self.kernel.prefer_gpu = other.kernel.prefer_gpu;
        }
        if other.validation.revalidate_on_consume != defaults.validation.revalidate_on_consume {
            self.validation.revalidate_on_consume = other.validation.revalidate_on_consume;
        }
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LodRankError::Config(format!("{var} must be a boolean flag, got '{value}'"))),
    }
}

/// Builder for [`LodRankConfig`]
#[derive(Debug, Default)]
pub struct LodRankConfigBuilder {
    config: LodRankConfig,
}

impl LodRankConfigBuilder {
    pub fn rank_level(mut self, level: usize) -> Self {
        self.config.rank.level = level;
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.config.kernel.device = device;
        self
    }

    pub fn prefer_gpu(mut self, prefer: bool) -> Self {
        self.config.kernel.prefer_gpu = prefer;
        self
    }

    pub fn revalidate_on_consume(mut self, revalidate: bool) -> Self {
        self.config.validation.revalidate_on_consume = revalidate;
        self
    }

    pub fn build(self) -> Result<LodRankConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
