//! Volume and mute through the sound system's simple mixer controls.
//!
//! Each call opens the mixer, works on one control and closes it again, so a
//! failure here never touches a playing stream.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::AoConfig;
use crate::error::{AoError, Result};
use crate::hal::{ControlId, HardwareDriver, MixerChannel, MixerDevice};

/// Per-channel volume in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub left: f32,
    pub right: f32,
}

impl Volume {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub fn uniform(value: f32) -> Self {
        Self::new(value, value)
    }
}

/// Handle on the configured mixer control
pub struct MixerControl {
    driver: Arc<dyn HardwareDriver>,
    device: String,
    control: ControlId,
}

impl MixerControl {
    pub fn new(driver: Arc<dyn HardwareDriver>, options: &AoConfig) -> Self {
        Self {
            driver,
            device: options.mixer_device.clone(),
            control: ControlId::new(options.mixer_name.clone(), options.mixer_index),
        }
    }

    pub fn control(&self) -> &ControlId {
        &self.control
    }

    pub fn volume(&self) -> Result<Volume> {
        self.with_control(|mixer, id| {
            let (min, max) = volume_range(mixer, id)?;
            let scale = 100.0 / (max - min) as f64;
            let read = |channel: MixerChannel| -> Result<f32> {
                let raw = mixer
                    .playback_volume(id, channel)
                    .map_err(mixer_err("get volume"))?;
                Ok(((raw - min) as f64 * scale) as f32)
            };
            let volume = Volume::new(
                read(MixerChannel::FrontLeft)?,
                read(MixerChannel::FrontRight)?,
            );
            debug!(left = volume.left, right = volume.right, "mixer volume");
            Ok(volume)
        })
    }

    /// Set the volume; values are clamped to 0-100
    pub fn set_volume(&self, volume: Volume) -> Result<()> {
        self.with_control(|mixer, id| {
            let (min, max) = volume_range(mixer, id)?;
            let scale = 100.0 / (max - min) as f64;
            let raw = |percent: f32| {
                (percent.clamp(0.0, 100.0) as f64 / scale + min as f64 + 0.5) as i64
            };

            mixer
                .set_playback_volume(id, MixerChannel::FrontLeft, raw(volume.left))
                .map_err(mixer_err("set left volume"))?;
            mixer
                .set_playback_volume(id, MixerChannel::FrontRight, raw(volume.right))
                .map_err(mixer_err("set right volume"))?;
            debug!(left = volume.left, right = volume.right, "mixer volume set");
            Ok(())
        })
    }

    pub fn mute(&self) -> Result<bool> {
        self.with_control(|mixer, id| {
            require_switch(mixer, id)?;
            let left_on = mixer
                .playback_switch(id, MixerChannel::FrontLeft)
                .map_err(mixer_err("get mute"))?;
            let mut muted = !left_on;
            if !mixer.playback_switch_joined(id) {
                let right_on = mixer
                    .playback_switch(id, MixerChannel::FrontRight)
                    .map_err(mixer_err("get mute"))?;
                muted = muted && !right_on;
            }
            Ok(muted)
        })
    }

    pub fn set_mute(&self, mute: bool) -> Result<()> {
        self.with_control(|mixer, id| {
            require_switch(mixer, id)?;
            if !mixer.playback_switch_joined(id) {
                mixer
                    .set_playback_switch(id, MixerChannel::FrontRight, !mute)
                    .map_err(mixer_err("set mute"))?;
            }
            mixer
                .set_playback_switch(id, MixerChannel::FrontLeft, !mute)
                .map_err(mixer_err("set mute"))
        })
    }

    fn with_control<T>(
        &self,
        op: impl FnOnce(&mut dyn MixerDevice, &ControlId) -> Result<T>,
    ) -> Result<T> {
        let mut mixer = self
            .driver
            .open_mixer(&self.device)
            .map_err(|source| AoError::MixerOpen {
                device: self.device.clone(),
                source,
            })?;

        if !mixer.has_control(&self.control) {
            return Err(AoError::ControlNotFound {
                name: self.control.name.clone(),
                index: self.control.index,
            });
        }
        op(mixer.as_mut(), &self.control)
    }
}

fn volume_range(mixer: &dyn MixerDevice, id: &ControlId) -> Result<(i64, i64)> {
    let (min, max) = mixer
        .playback_volume_range(id)
        .map_err(mixer_err("get volume range"))?;
    if max <= min {
        return Err(AoError::VolumeRange { min, max });
    }
    Ok((min, max))
}

fn require_switch(mixer: &dyn MixerDevice, id: &ControlId) -> Result<()> {
    if mixer.has_playback_switch(id) {
        Ok(())
    } else {
        Err(AoError::NoPlaybackSwitch(id.name.clone()))
    }
}

fn mixer_err(op: &'static str) -> impl Fn(crate::hal::PcmError) -> AoError {
    move |source| AoError::Mixer { op, source }
}
