use serde::{Deserialize, Serialize};

use super::{lock, SharedState, SimulatedState};
use crate::hal::{ControlId, MixerChannel, MixerDevice, PcmError};

/// A simple mixer control with stereo volume and an optional switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedControl {
    pub name: String,
    pub index: u32,
    pub min: i64,
    pub max: i64,
    pub left: i64,
    pub right: i64,
    pub has_switch: bool,
    pub switch_joined: bool,
    pub left_on: bool,
    pub right_on: bool,
}

impl SimulatedControl {
    pub fn new(name: impl Into<String>, index: u32, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            index,
            min,
            max,
            left: max,
            right: max,
            has_switch: true,
            switch_joined: false,
            left_on: true,
            right_on: true,
        }
    }

    pub fn volume(&self, channel: MixerChannel) -> i64 {
        match channel {
            MixerChannel::FrontLeft => self.left,
            MixerChannel::FrontRight => self.right,
        }
    }

    pub fn switch(&self, channel: MixerChannel) -> bool {
        match channel {
            MixerChannel::FrontLeft => self.left_on,
            MixerChannel::FrontRight => self.right_on,
        }
    }

    fn matches(&self, id: &ControlId) -> bool {
        self.name == id.name && self.index == id.index
    }
}

/// Mixer handle on the simulated card
pub struct SimulatedMixer {
    state: SharedState,
}

impl SimulatedMixer {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    fn control<T>(
        &self,
        id: &ControlId,
        f: impl FnOnce(&mut SimulatedControl) -> Result<T, PcmError>,
    ) -> Result<T, PcmError> {
        let mut state = lock(&self.state);
        let SimulatedState { hardware, .. } = &mut *state;
        let control = hardware
            .mixer_controls
            .iter_mut()
            .find(|c| c.matches(id))
            .ok_or(PcmError::InvalidArgument)?;
        f(control)
    }
}

impl MixerDevice for SimulatedMixer {
    fn has_control(&self, id: &ControlId) -> bool {
        self.control(id, |_| Ok(())).is_ok()
    }

    fn playback_volume_range(&self, id: &ControlId) -> Result<(i64, i64), PcmError> {
        self.control(id, |c| Ok((c.min, c.max)))
    }

    fn playback_volume(&self, id: &ControlId, channel: MixerChannel) -> Result<i64, PcmError> {
        self.control(id, |c| Ok(c.volume(channel)))
    }

    fn set_playback_volume(
        &mut self,
        id: &ControlId,
        channel: MixerChannel,
        value: i64,
    ) -> Result<(), PcmError> {
        self.control(id, |c| {
            let value = value.clamp(c.min, c.max);
            match channel {
                MixerChannel::FrontLeft => c.left = value,
                MixerChannel::FrontRight => c.right = value,
            }
            Ok(())
        })
    }

    fn has_playback_switch(&self, id: &ControlId) -> bool {
        self.control(id, |c| Ok(c.has_switch)).unwrap_or(false)
    }

    fn playback_switch_joined(&self, id: &ControlId) -> bool {
        self.control(id, |c| Ok(c.switch_joined)).unwrap_or(false)
    }

    fn playback_switch(&self, id: &ControlId, channel: MixerChannel) -> Result<bool, PcmError> {
        self.control(id, |c| {
            if !c.has_switch {
                return Err(PcmError::Unsupported);
            }
            Ok(c.switch(channel))
        })
    }

    fn set_playback_switch(
        &mut self,
        id: &ControlId,
        channel: MixerChannel,
        on: bool,
    ) -> Result<(), PcmError> {
        self.control(id, |c| {
            if !c.has_switch {
                return Err(PcmError::Unsupported);
            }
            // a joined switch moves both channels together
            if c.switch_joined {
                c.left_on = on;
                c.right_on = on;
            } else {
                match channel {
                    MixerChannel::FrontLeft => c.left_on = on,
                    MixerChannel::FrontRight => c.right_on = on,
                }
            }
            Ok(())
        })
    }
}
