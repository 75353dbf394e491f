use async_trait::async_trait;
use std::time::Duration;

use super::error::PcmError;
use super::types::{
    ChmapQuery, ControlId, DeviceHint, HwChannelPos, HwSetup, MixerChannel, OpenMode,
    PcmAccess, PcmFormat, PcmState, Readiness, SwParams,
};

/// Trait implemented by sound system drivers for enumeration and device access
#[async_trait]
pub trait HardwareDriver: Send + Sync {
    /// Unique driver identifier (e.g., "alsa", "simulated")
    fn driver_id(&self) -> &str;

    /// Raw endpoint hints (async since enumeration may block on some systems)
    async fn device_hints(&self) -> Result<Vec<DeviceHint>, PcmError>;

    /// Open a playback PCM by device string
    fn open_pcm(&self, name: &str, mode: OpenMode) -> Result<Box<dyn PcmDevice>, PcmError>;

    /// Open and load a mixer attached to `device`; closed when dropped
    fn open_mixer(&self, device: &str) -> Result<Box<dyn MixerDevice>, PcmError>;
}

/// An open playback PCM handle.
///
/// Hardware parameter calls narrow a configuration space and only take effect
/// with [`PcmDevice::install_hw_params`]. The `*_near` calls return the value
/// the device granted.
pub trait PcmDevice: Send {
    fn name(&self) -> &str;

    fn set_nonblock(&mut self, nonblock: bool) -> Result<(), PcmError>;

    // hardware parameters
    fn test_format(&mut self, format: PcmFormat) -> Result<(), PcmError>;
    fn set_format(&mut self, format: PcmFormat) -> Result<(), PcmError>;
    fn set_access(&mut self, access: PcmAccess) -> Result<(), PcmError>;
    /// `None` when the device cannot enumerate channel maps
    fn query_chmaps(&mut self) -> Option<Vec<ChmapQuery>>;
    fn set_channels_near(&mut self, channels: u32) -> Result<u32, PcmError>;
    fn set_rate_resample(&mut self, enable: bool) -> Result<(), PcmError>;
    fn set_rate_near(&mut self, rate: u32) -> Result<u32, PcmError>;
    fn set_buffer_time_near(&mut self, micros: u32) -> Result<u32, PcmError>;
    fn set_periods_near(&mut self, periods: u32) -> Result<u32, PcmError>;
    fn install_hw_params(&mut self) -> Result<HwSetup, PcmError>;

    fn set_chmap(&mut self, positions: &[HwChannelPos]) -> Result<(), PcmError>;
    fn get_chmap(&mut self) -> Option<Vec<HwChannelPos>>;

    // software parameters
    fn boundary(&mut self) -> Result<u64, PcmError>;
    fn install_sw_params(&mut self, params: &SwParams) -> Result<(), PcmError>;

    // runtime
    fn state(&self) -> PcmState;
    fn avail(&mut self) -> Result<usize, PcmError>;
    /// Frames between the application and hardware pointers; negative after an underrun
    fn delay(&mut self) -> Result<i64, PcmError>;
    fn forward(&mut self, frames: usize) -> Result<usize, PcmError>;
    fn write_interleaved(&mut self, data: &[u8], frames: usize) -> Result<usize, PcmError>;
    fn write_planar(&mut self, planes: &[&[u8]], frames: usize) -> Result<usize, PcmError>;
    fn pause(&mut self, enable: bool) -> Result<(), PcmError>;
    fn drop_pending(&mut self) -> Result<(), PcmError>;
    fn prepare(&mut self) -> Result<(), PcmError>;
    fn resume(&mut self) -> Result<(), PcmError>;
    fn drain(&mut self) -> Result<(), PcmError>;

    fn poll_descriptors_count(&mut self) -> Result<usize, PcmError>;
    fn wait_ready(&mut self, timeout: Duration) -> Result<Readiness, PcmError>;

    fn close(self: Box<Self>) -> Result<(), PcmError>;
}

/// A loaded mixer; every call addresses a simple control by [`ControlId`]
pub trait MixerDevice: Send {
    fn has_control(&self, id: &ControlId) -> bool;
    fn playback_volume_range(&self, id: &ControlId) -> Result<(i64, i64), PcmError>;
    fn playback_volume(&self, id: &ControlId, channel: MixerChannel) -> Result<i64, PcmError>;
    fn set_playback_volume(
        &mut self,
        id: &ControlId,
        channel: MixerChannel,
        value: i64,
    ) -> Result<(), PcmError>;
    fn has_playback_switch(&self, id: &ControlId) -> bool;
    fn playback_switch_joined(&self, id: &ControlId) -> bool;
    /// `true` means the channel is audible
    fn playback_switch(&self, id: &ControlId, channel: MixerChannel) -> Result<bool, PcmError>;
    fn set_playback_switch(
        &mut self,
        id: &ControlId,
        channel: MixerChannel,
        on: bool,
    ) -> Result<(), PcmError>;
}
