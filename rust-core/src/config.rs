//! Channel and engine configuration
//!
//! Configurations are plain data. They can be built in code, taken from
//! [`EngineConfig::default`] (the six analog inputs of the acquisition board),
//! or parsed from TOML:
//!
//! ```toml
//! [[channels]]
//! id = 0
//! label = "adc1-in1"
//! block_len = 256
//! sample_rate = 1000.0
//! ```

use crate::error::{Result, StftError};
use crate::spectrum::window::validate_block_length;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u16);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Default block length for board channels
pub const DEFAULT_BLOCK_LEN: usize = 256;

/// Default per-channel sample rate in Hz (after the moving-average stage)
pub const DEFAULT_SAMPLE_RATE: f32 = 1000.0;

/// Configuration of a single channel pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel identifier, unique within an engine
    pub id: ChannelId,

    /// Human-readable name (e.g. the ADC input it is wired to)
    #[serde(default)]
    pub label: String,

    /// Block length L (power of two)
    #[serde(default = "default_block_len")]
    pub block_len: usize,

    /// Sample rate in Hz, used only for the frequency axis
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f32,
}

fn default_block_len() -> usize {
    DEFAULT_BLOCK_LEN
}

fn default_sample_rate() -> f32 {
    DEFAULT_SAMPLE_RATE
}

impl ChannelConfig {
    /// Create a channel configuration with default sample rate
    pub fn new(id: u16, block_len: usize) -> Self {
        Self {
            id: ChannelId(id),
            label: String::new(),
            block_len,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the sample rate
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Number of magnitude bins this channel produces (L/2)
    pub fn num_bins(&self) -> usize {
        self.block_len / 2
    }
}

/// Configuration of a multi-channel engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub channels: Vec<ChannelConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let labels = ["adc1-in1", "adc1-in2", "adc2-in3", "adc2-in4", "adc3-in1", "adc3-in2"];

        Self {
            channels: labels
                .iter()
                .enumerate()
                .map(|(i, label)| ChannelConfig::new(i as u16, DEFAULT_BLOCK_LEN).with_label(*label))
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check block lengths and id uniqueness
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.channels.len());

        for channel in &self.channels {
            validate_block_length(channel.block_len)?;
            if !seen.insert(channel.id) {
                return Err(StftError::DuplicateChannel(channel.id));
            }
        }

        Ok(())
    }
}
