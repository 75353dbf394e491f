//! libasound backend over the `alsa` crate.
//!
//! Hardware parameters are recorded as they are granted and replayed onto a
//! fresh configuration space whenever the next one is narrowed, so every
//! `*_near` call sees the choices made before it.

use alsa::device_name::HintIter;
use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use alsa::pcm::{Access, Chmap, ChmapPosition, Format, Frames, HwParams, State, PCM};
use alsa::{Direction, PollDescriptors, ValueOr};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::hal::{
    ChmapQuery, ChmapType, ControlId, DeviceHint, HardwareDriver, HwChannelPos, HwSetup,
    MixerChannel, MixerDevice, OpenMode, PcmAccess, PcmDevice, PcmError, PcmFormat, PcmState,
    Readiness, SwParams,
};

// Linux errno values libasound reports
const ENOENT: i32 = 2;
const EINTR: i32 = 4;
const ENXIO: i32 = 6;
const EAGAIN: i32 = 11;
const EBUSY: i32 = 16;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const EPIPE: i32 = 32;
const ENOSYS: i32 = 38;
const ESTRPIPE: i32 = 86;

impl PcmError {
    /// Map a positive errno value
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            EINTR => PcmError::Interrupted,
            EAGAIN => PcmError::WouldBlock,
            EBUSY => PcmError::Busy,
            ESTRPIPE => PcmError::Suspended,
            EPIPE => PcmError::Underrun,
            ENXIO | ENOSYS => PcmError::Unsupported,
            EINVAL => PcmError::InvalidArgument,
            ENODEV | ENOENT => PcmError::NoSuchDevice,
            _ => PcmError::Os {
                errno,
                message: std::io::Error::from_raw_os_error(errno).to_string(),
            },
        }
    }
}

impl From<alsa::Error> for PcmError {
    fn from(e: alsa::Error) -> Self {
        PcmError::from_errno(e.errno().abs())
    }
}

fn native_format(format: PcmFormat) -> Format {
    #[cfg(target_endian = "little")]
    match format {
        PcmFormat::S8 => Format::S8,
        PcmFormat::U8 => Format::U8,
        PcmFormat::S16 => Format::S16LE,
        PcmFormat::U16 => Format::U16LE,
        PcmFormat::S24Packed => Format::S243LE,
        PcmFormat::U24Packed => Format::U243LE,
        PcmFormat::S32 => Format::S32LE,
        PcmFormat::U32 => Format::U32LE,
        PcmFormat::Float => Format::FloatLE,
        PcmFormat::Mpeg => Format::MPEG,
    }
    #[cfg(target_endian = "big")]
    match format {
        PcmFormat::S8 => Format::S8,
        PcmFormat::U8 => Format::U8,
        PcmFormat::S16 => Format::S16BE,
        PcmFormat::U16 => Format::U16BE,
        PcmFormat::S24Packed => Format::S243BE,
        PcmFormat::U24Packed => Format::U243BE,
        PcmFormat::S32 => Format::S32BE,
        PcmFormat::U32 => Format::U32BE,
        PcmFormat::Float => Format::FloatBE,
        PcmFormat::Mpeg => Format::MPEG,
    }
}

fn pcm_state(state: State) -> PcmState {
    match state {
        State::Open => PcmState::Open,
        State::Setup => PcmState::Setup,
        State::Prepared => PcmState::Prepared,
        State::Running => PcmState::Running,
        State::XRun => PcmState::XRun,
        State::Draining => PcmState::Draining,
        State::Paused => PcmState::Paused,
        State::Suspended => PcmState::Suspended,
        #[allow(unreachable_patterns)]
        _ => PcmState::Disconnected,
    }
}

fn chmap_type(kind: alsa::pcm::ChmapType) -> ChmapType {
    match kind as u32 {
        1 => ChmapType::Fixed,
        2 => ChmapType::Variable,
        3 => ChmapType::Paired,
        _ => ChmapType::None,
    }
}

fn hw_positions(map: &Chmap) -> Vec<HwChannelPos> {
    Vec::<ChmapPosition>::from(map)
        .into_iter()
        .map(|pos| HwChannelPos(pos as u32))
        .collect()
}

fn chmap_position(pos: HwChannelPos) -> Option<ChmapPosition> {
    use ChmapPosition::*;
    Some(match pos.0 {
        0 => Unknown,
        1 => NA,
        2 => Mono,
        3 => FL,
        4 => FR,
        5 => RL,
        6 => RR,
        7 => FC,
        8 => LFE,
        9 => SL,
        10 => SR,
        11 => RC,
        12 => FLC,
        13 => FRC,
        14 => RLC,
        15 => RRC,
        16 => FLW,
        17 => FRW,
        18 => FLH,
        19 => FCH,
        20 => FRH,
        21 => TC,
        22 => TFL,
        23 => TFR,
        24 => TFC,
        25 => TRL,
        26 => TRR,
        27 => TRC,
        _ => return None,
    })
}

/// Sound system access through libasound
#[derive(Debug, Clone, Default)]
pub struct AlsaDriver;

impl AlsaDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HardwareDriver for AlsaDriver {
    fn driver_id(&self) -> &str {
        "alsa"
    }

    async fn device_hints(&self) -> Result<Vec<DeviceHint>, PcmError> {
        // Hint enumeration walks the configuration tree and may touch every card
        tokio::task::spawn_blocking(|| -> Result<Vec<DeviceHint>, PcmError> {
            let hints = HintIter::new(None, c"pcm")?
                .map(|hint| DeviceHint {
                    name: hint.name,
                    description: hint.desc,
                    io: hint.direction.map(|direction| match direction {
                        Direction::Playback => "Output".to_string(),
                        Direction::Capture => "Input".to_string(),
                    }),
                })
                .collect();
            Ok(hints)
        })
        .await
        .map_err(|e| PcmError::Os {
            errno: 0,
            message: format!("hint enumeration task failed: {}", e),
        })?
    }

    fn open_pcm(&self, name: &str, mode: OpenMode) -> Result<Box<dyn PcmDevice>, PcmError> {
        Ok(Box::new(AlsaPcm::open(name, mode)?))
    }

    fn open_mixer(&self, device: &str) -> Result<Box<dyn MixerDevice>, PcmError> {
        Ok(Box::new(AlsaMixer::open(device)?))
    }
}

/// Hardware parameter choices granted so far
#[derive(Debug, Clone, Copy, Default)]
struct GrantedHw {
    access: Option<PcmAccess>,
    format: Option<PcmFormat>,
    channels: Option<u32>,
    resample: Option<bool>,
    rate: Option<u32>,
    buffer_time_us: Option<u32>,
    period_size: Option<Frames>,
}

/// Playback PCM handle
pub struct AlsaPcm {
    name: String,
    nonblock: bool,
    // None only after a failed reopen
    pcm: Option<PCM>,
    granted: GrantedHw,
    frame_bytes: usize,
}

impl AlsaPcm {
    pub fn open(name: &str, mode: OpenMode) -> Result<Self, PcmError> {
        let nonblock = mode == OpenMode::NonBlocking;
        let pcm = PCM::new(name, Direction::Playback, nonblock)?;
        Ok(Self {
            name: name.to_string(),
            nonblock,
            pcm: Some(pcm),
            granted: GrantedHw::default(),
            frame_bytes: 0,
        })
    }

    fn pcm(&self) -> Result<&PCM, PcmError> {
        self.pcm.as_ref().ok_or(PcmError::NoSuchDevice)
    }

    /// Full configuration space narrowed by everything granted so far
    fn narrowed(&self) -> Result<HwParams<'_>, PcmError> {
        let hwp = HwParams::any(self.pcm()?)?;
        let granted = &self.granted;
        if let Some(access) = granted.access {
            hwp.set_access(match access {
                PcmAccess::Interleaved => Access::RWInterleaved,
                PcmAccess::NonInterleaved => Access::RWNonInterleaved,
            })?;
        }
        if let Some(format) = granted.format {
            hwp.set_format(native_format(format))?;
        }
        if let Some(channels) = granted.channels {
            hwp.set_channels(channels)?;
        }
        if let Some(resample) = granted.resample {
            hwp.set_rate_resample(resample)?;
        }
        if let Some(rate) = granted.rate {
            hwp.set_rate(rate, ValueOr::Nearest)?;
        }
        if let Some(us) = granted.buffer_time_us {
            hwp.set_buffer_time_near(us, ValueOr::Nearest)?;
        }
        if let Some(frames) = granted.period_size {
            hwp.set_period_size_near(frames, ValueOr::Nearest)?;
        }
        Ok(hwp)
    }
}

impl PcmDevice for AlsaPcm {
    fn name(&self) -> &str {
        &self.name
    }

    /// The mode is fixed at open time, so switching it reopens the device.
    /// Only valid before hardware parameters are installed.
    fn set_nonblock(&mut self, nonblock: bool) -> Result<(), PcmError> {
        if nonblock == self.nonblock {
            return Ok(());
        }
        self.pcm = None;
        self.pcm = Some(PCM::new(&self.name, Direction::Playback, nonblock)?);
        self.nonblock = nonblock;
        Ok(())
    }

    fn test_format(&mut self, format: PcmFormat) -> Result<(), PcmError> {
        self.narrowed()?.set_format(native_format(format))?;
        Ok(())
    }

    fn set_format(&mut self, format: PcmFormat) -> Result<(), PcmError> {
        self.test_format(format)?;
        self.granted.format = Some(format);
        Ok(())
    }

    fn set_access(&mut self, access: PcmAccess) -> Result<(), PcmError> {
        if access == PcmAccess::NonInterleaved {
            // transfers go through interleaved byte IO only
            debug!(device = %self.name, "planar access not offered by this backend");
            return Err(PcmError::Unsupported);
        }
        self.narrowed()?.set_access(Access::RWInterleaved)?;
        self.granted.access = Some(access);
        Ok(())
    }

    fn query_chmaps(&mut self) -> Option<Vec<ChmapQuery>> {
        let maps: Vec<ChmapQuery> = self
            .pcm()
            .ok()?
            .query_chmaps()
            .map(|(kind, map)| ChmapQuery {
                kind: chmap_type(kind),
                positions: hw_positions(&map),
            })
            .collect();
        (!maps.is_empty()).then_some(maps)
    }

    fn set_channels_near(&mut self, channels: u32) -> Result<u32, PcmError> {
        let granted = self.narrowed()?.set_channels_near(channels)?;
        self.granted.channels = Some(granted);
        Ok(granted)
    }

    fn set_rate_resample(&mut self, enable: bool) -> Result<(), PcmError> {
        self.narrowed()?.set_rate_resample(enable)?;
        self.granted.resample = Some(enable);
        Ok(())
    }

    fn set_rate_near(&mut self, rate: u32) -> Result<u32, PcmError> {
        let granted = self.narrowed()?.set_rate_near(rate, ValueOr::Nearest)?;
        self.granted.rate = Some(granted);
        Ok(granted)
    }

    fn set_buffer_time_near(&mut self, micros: u32) -> Result<u32, PcmError> {
        let granted = self
            .narrowed()?
            .set_buffer_time_near(micros, ValueOr::Nearest)?;
        self.granted.buffer_time_us = Some(granted);
        Ok(granted)
    }

    /// Periods are reached through the period size the buffer divides into
    fn set_periods_near(&mut self, periods: u32) -> Result<u32, PcmError> {
        if periods == 0 {
            return Err(PcmError::InvalidArgument);
        }
        let (period_size, granted) = {
            let hwp = self.narrowed()?;
            let buffer = hwp.get_buffer_size()?;
            let period_size =
                hwp.set_period_size_near(buffer / periods as Frames, ValueOr::Nearest)?;
            let granted = hwp
                .get_periods()
                .unwrap_or_else(|_| (buffer / period_size.max(1)) as u32);
            (period_size, granted)
        };
        self.granted.period_size = Some(period_size);
        Ok(granted)
    }

    fn install_hw_params(&mut self) -> Result<HwSetup, PcmError> {
        {
            let hwp = self.narrowed()?;
            self.pcm()?.hw_params(&hwp)?;
        }
        let (setup, channels) = {
            let current = self.pcm()?.hw_params_current()?;
            let setup = HwSetup {
                buffer_size: current.get_buffer_size()?.max(0) as usize,
                period_size: current.get_period_size()?.max(0) as usize,
                can_pause: current.can_pause(),
            };
            (setup, current.get_channels()?)
        };
        let sample = self.granted.format.map(|f| f.sample_bytes()).unwrap_or(2);
        self.frame_bytes = sample * channels as usize;
        Ok(setup)
    }

    fn set_chmap(&mut self, positions: &[HwChannelPos]) -> Result<(), PcmError> {
        let native = positions
            .iter()
            .map(|&pos| chmap_position(pos))
            .collect::<Option<Vec<_>>>()
            .ok_or(PcmError::InvalidArgument)?;
        self.pcm()?.set_chmap(&Chmap::from(&native[..]))?;
        Ok(())
    }

    fn get_chmap(&mut self) -> Option<Vec<HwChannelPos>> {
        let map = self.pcm().ok()?.get_chmap().ok()?;
        Some(hw_positions(&map))
    }

    fn boundary(&mut self) -> Result<u64, PcmError> {
        let swp = self.pcm()?.sw_params_current()?;
        Ok(swp.get_boundary()?.max(0) as u64)
    }

    fn install_sw_params(&mut self, params: &SwParams) -> Result<(), PcmError> {
        let pcm = self.pcm()?;
        let swp = pcm.sw_params_current()?;
        swp.set_start_threshold(params.start_threshold as Frames)?;
        swp.set_stop_threshold(params.stop_threshold as Frames)?;
        // silence size is not exposed by the safe bindings; the device keeps its default
        debug!(silence_size = params.silence_size, "leaving silence size at device default");
        pcm.sw_params(&swp)?;
        Ok(())
    }

    fn state(&self) -> PcmState {
        match &self.pcm {
            Some(pcm) => pcm_state(pcm.state()),
            None => PcmState::Disconnected,
        }
    }

    fn avail(&mut self) -> Result<usize, PcmError> {
        Ok(self.pcm()?.avail()?.max(0) as usize)
    }

    fn delay(&mut self) -> Result<i64, PcmError> {
        Ok(self.pcm()?.delay()? as i64)
    }

    fn forward(&mut self, frames: usize) -> Result<usize, PcmError> {
        Ok(self.pcm()?.forward(frames as Frames)?.max(0) as usize)
    }

    fn write_interleaved(&mut self, data: &[u8], frames: usize) -> Result<usize, PcmError> {
        let bytes = (frames * self.frame_bytes).min(data.len());
        let io = self.pcm()?.io_bytes();
        Ok(io.writei(&data[..bytes])?)
    }

    fn write_planar(&mut self, _planes: &[&[u8]], _frames: usize) -> Result<usize, PcmError> {
        Err(PcmError::Unsupported)
    }

    fn pause(&mut self, enable: bool) -> Result<(), PcmError> {
        Ok(self.pcm()?.pause(enable)?)
    }

    fn drop_pending(&mut self) -> Result<(), PcmError> {
        Ok(self.pcm()?.drop()?)
    }

    fn prepare(&mut self) -> Result<(), PcmError> {
        Ok(self.pcm()?.prepare()?)
    }

    fn resume(&mut self) -> Result<(), PcmError> {
        Ok(self.pcm()?.resume()?)
    }

    fn drain(&mut self) -> Result<(), PcmError> {
        Ok(self.pcm()?.drain()?)
    }

    fn poll_descriptors_count(&mut self) -> Result<usize, PcmError> {
        Ok(PollDescriptors::count(self.pcm()?))
    }

    fn wait_ready(&mut self, timeout: Duration) -> Result<Readiness, PcmError> {
        let millis = timeout.as_millis().min(u32::MAX as u128) as u32;
        match self.pcm()?.wait(Some(millis)) {
            Ok(true) => Ok(Readiness::Writable),
            Ok(false) => Ok(Readiness::Timeout),
            Err(e) => match PcmError::from(e) {
                // the next write reports and recovers these
                PcmError::Underrun | PcmError::Suspended => Ok(Readiness::Writable),
                e if e.is_transient() => Ok(Readiness::Timeout),
                e => {
                    debug!(device = %self.name, error = %e, "pcm wait failed");
                    Ok(Readiness::Error)
                }
            },
        }
    }

    fn close(self: Box<Self>) -> Result<(), PcmError> {
        // snd_pcm_close runs when the handle drops
        drop(self);
        Ok(())
    }
}

/// Loaded simple mixer
pub struct AlsaMixer {
    mixer: Mixer,
}

impl AlsaMixer {
    pub fn open(device: &str) -> Result<Self, PcmError> {
        Ok(Self {
            mixer: Mixer::new(device, false)?,
        })
    }

    fn selem(&self, id: &ControlId) -> Result<Selem<'_>, PcmError> {
        self.mixer
            .find_selem(&SelemId::new(&id.name, id.index))
            .ok_or(PcmError::InvalidArgument)
    }
}

fn selem_channel(channel: MixerChannel) -> SelemChannelId {
    match channel {
        MixerChannel::FrontLeft => SelemChannelId::FrontLeft,
        MixerChannel::FrontRight => SelemChannelId::FrontRight,
    }
}

impl MixerDevice for AlsaMixer {
    fn has_control(&self, id: &ControlId) -> bool {
        self.selem(id).is_ok()
    }

    fn playback_volume_range(&self, id: &ControlId) -> Result<(i64, i64), PcmError> {
        Ok(self.selem(id)?.get_playback_volume_range())
    }

    fn playback_volume(&self, id: &ControlId, channel: MixerChannel) -> Result<i64, PcmError> {
        Ok(self
            .selem(id)?
            .get_playback_volume(selem_channel(channel))?)
    }

    fn set_playback_volume(
        &mut self,
        id: &ControlId,
        channel: MixerChannel,
        value: i64,
    ) -> Result<(), PcmError> {
        Ok(self
            .selem(id)?
            .set_playback_volume(selem_channel(channel), value)?)
    }

    fn has_playback_switch(&self, id: &ControlId) -> bool {
        self.selem(id).map(|s| s.has_playback_switch()).unwrap_or(false)
    }

    fn playback_switch_joined(&self, id: &ControlId) -> bool {
        self.selem(id)
            .map(|s| s.has_playback_switch_joined())
            .unwrap_or(false)
    }

    fn playback_switch(&self, id: &ControlId, channel: MixerChannel) -> Result<bool, PcmError> {
        Ok(self
            .selem(id)?
            .get_playback_switch(selem_channel(channel))?
            != 0)
    }

    fn set_playback_switch(
        &mut self,
        id: &ControlId,
        channel: MixerChannel,
        on: bool,
    ) -> Result<(), PcmError> {
        Ok(self
            .selem(id)?
            .set_playback_switch(selem_channel(channel), on as i32)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(PcmError::from_errno(EAGAIN), PcmError::WouldBlock);
        assert_eq!(PcmError::from_errno(ESTRPIPE), PcmError::Suspended);
        assert_eq!(PcmError::from_errno(EPIPE), PcmError::Underrun);
        assert!(matches!(
            PcmError::from_errno(5),
            PcmError::Os { errno: 5, .. }
        ));
    }

    #[test]
    fn test_position_codes_round_trip() {
        for code in 0..=27 {
            let pos = chmap_position(HwChannelPos(code)).unwrap();
            assert_eq!(pos as u32, code);
        }
        assert!(chmap_position(HwChannelPos(99)).is_none());
    }
}
