use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const MAX_MIXER_INDEX: u32 = 99;

/// Options recognized when opening the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AoConfig {
    /// Device string; empty selects one from the channel layout
    pub device: String,
    pub mixer_device: String,
    pub mixer_name: String,
    pub mixer_index: u32,
    /// Open the device in blocking mode instead of probing non-blocking first
    pub block: bool,
    /// Allow the device's own resampler. Off by default since some drivers
    /// report broken delays with it enabled.
    pub resample: bool,
    /// Keep planar sample layouts instead of interleaving
    pub non_interleaved: bool,
}

impl Default for AoConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            mixer_device: "default".to_string(),
            mixer_name: "Master".to_string(),
            mixer_index: 0,
            block: true,
            resample: false,
            non_interleaved: false,
        }
    }
}

impl AoConfig {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let config: Self =
            serde_json::from_value(value).context("invalid audio output options")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mixer_index > MAX_MIXER_INDEX {
            anyhow::bail!(
                "mixer-index {} out of range 0-{}",
                self.mixer_index,
                MAX_MIXER_INDEX
            );
        }
        if self.mixer_name.is_empty() {
            anyhow::bail!("mixer-name must not be empty");
        }
        Ok(())
    }

    /// Configured device string, if one was given
    pub fn device(&self) -> Option<&str> {
        (!self.device.is_empty()).then_some(self.device.as_str())
    }
}
