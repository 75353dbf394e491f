use std::time::Duration;

use super::{lock, SharedState, SimulatedState};
use crate::hal::{
    ChmapQuery, HwChannelPos, HwSetup, PcmAccess, PcmDevice, PcmError, PcmFormat, PcmState,
    Readiness, SwParams,
};

const EBADFD: i32 = 77;

fn bad_state(state: PcmState) -> PcmError {
    PcmError::Os {
        errno: EBADFD,
        message: format!("file descriptor in bad state ({:?})", state),
    }
}

fn nearest(candidates: &[u32], wanted: u32) -> Option<u32> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&c| (c.abs_diff(wanted), c))
}

/// PCM handle on the simulated card
pub struct SimulatedPcm {
    name: String,
    state: SharedState,
}

impl SimulatedPcm {
    pub(crate) fn new(name: &str, state: SharedState) -> Self {
        Self {
            name: name.to_string(),
            state,
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut SimulatedState) -> T) -> T {
        f(&mut *lock(&self.state))
    }

    fn log(&self, call: impl Into<String>) {
        let call = call.into();
        self.with(|s| s.calls.push(call));
    }
}

/// Copy up to `frames` frames into the device, playing a period when the
/// buffer is full and the handle blocks
fn transfer(s: &mut SimulatedState, frames: usize, data: &[&[u8]]) -> Result<usize, PcmError> {
    if let Some(error) = s.faults.write_errors.pop_front() {
        return Err(error);
    }
    match s.pcm.state {
        PcmState::Prepared | PcmState::Running => {}
        PcmState::Suspended => return Err(PcmError::Suspended),
        PcmState::XRun => return Err(PcmError::Underrun),
        state => return Err(bad_state(state)),
    }

    if s.pcm.avail() == 0 {
        if s.pcm.nonblock || s.faults.stalled {
            return Err(PcmError::WouldBlock);
        }
        s.pcm.hw_ptr += s.pcm.period_size as i64;
    }

    let n = frames.min(s.pcm.avail());
    let bytes = n * s.pcm.frame_bytes_per_plane(data.len());
    for plane in data {
        s.written.extend_from_slice(&plane[..bytes.min(plane.len())]);
    }
    s.pcm.appl_ptr += n as i64;
    s.writes.push(n);

    let start = s.pcm.sw_params.map(|p| p.start_threshold).unwrap_or(1);
    if s.pcm.state == PcmState::Prepared && s.pcm.queued() >= start as i64 {
        s.pcm.state = PcmState::Running;
    }
    Ok(n)
}

impl super::PcmRuntime {
    fn frame_bytes_per_plane(&self, planes: usize) -> usize {
        let sample = self.format.map(|f| f.sample_bytes()).unwrap_or(2);
        if planes > 1 {
            sample
        } else {
            sample * self.channels as usize
        }
    }
}

impl PcmDevice for SimulatedPcm {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_nonblock(&mut self, nonblock: bool) -> Result<(), PcmError> {
        self.with(|s| s.pcm.nonblock = nonblock);
        Ok(())
    }

    fn test_format(&mut self, format: PcmFormat) -> Result<(), PcmError> {
        self.with(|s| {
            if s.hardware.formats.contains(&format) {
                Ok(())
            } else {
                Err(PcmError::InvalidArgument)
            }
        })
    }

    fn set_format(&mut self, format: PcmFormat) -> Result<(), PcmError> {
        self.test_format(format)?;
        self.with(|s| s.pcm.format = Some(format));
        Ok(())
    }

    fn set_access(&mut self, access: PcmAccess) -> Result<(), PcmError> {
        self.with(|s| {
            if !s.hardware.access.contains(&access) {
                return Err(PcmError::InvalidArgument);
            }
            s.pcm.access = Some(access);
            Ok(())
        })
    }

    fn query_chmaps(&mut self) -> Option<Vec<ChmapQuery>> {
        self.with(|s| s.hardware.chmaps.clone())
    }

    fn set_channels_near(&mut self, channels: u32) -> Result<u32, PcmError> {
        self.with(|s| -> Result<u32, PcmError> {
            let granted =
                nearest(&s.hardware.channel_counts, channels).ok_or(PcmError::InvalidArgument)?;
            s.pcm.channels = granted;
            Ok(granted)
        })
    }

    fn set_rate_resample(&mut self, enable: bool) -> Result<(), PcmError> {
        self.with(|s| s.pcm.resample = Some(enable));
        Ok(())
    }

    fn set_rate_near(&mut self, rate: u32) -> Result<u32, PcmError> {
        self.with(|s| -> Result<u32, PcmError> {
            let granted = nearest(&s.hardware.rates, rate).ok_or(PcmError::InvalidArgument)?;
            s.pcm.rate = granted;
            Ok(granted)
        })
    }

    fn set_buffer_time_near(&mut self, micros: u32) -> Result<u32, PcmError> {
        self.with(|s| {
            if s.hardware.reject_buffer_time || s.pcm.rate == 0 {
                return Err(PcmError::InvalidArgument);
            }
            let frames = (s.pcm.rate as u64 * micros as u64 / 1_000_000) as usize;
            let frames = frames.clamp(1, s.hardware.max_buffer_frames);
            let granted = (frames as u64 * 1_000_000 / s.pcm.rate as u64) as u32;
            s.pcm.buffer_time_us = Some(granted);
            Ok(granted)
        })
    }

    fn set_periods_near(&mut self, periods: u32) -> Result<u32, PcmError> {
        self.with(|s| {
            if s.hardware.reject_periods || periods == 0 {
                return Err(PcmError::InvalidArgument);
            }
            s.pcm.periods = Some(periods);
            Ok(periods)
        })
    }

    fn install_hw_params(&mut self) -> Result<HwSetup, PcmError> {
        self.with(|s| -> Result<HwSetup, PcmError> {
            if s.pcm.format.is_none() || s.pcm.access.is_none() || s.pcm.channels == 0 {
                return Err(PcmError::InvalidArgument);
            }
            if s.pcm.rate == 0 {
                s.pcm.rate = s.hardware.rates.first().copied().ok_or(PcmError::InvalidArgument)?;
            }

            let buffer = match s.pcm.buffer_time_us {
                Some(us) => (s.pcm.rate as u64 * us as u64 / 1_000_000) as usize,
                None => s.hardware.max_buffer_frames,
            };
            let periods = s.pcm.periods.unwrap_or(4) as usize;
            let period = (buffer / periods).max(s.hardware.min_period_frames);
            let buffer = (buffer / period).max(1) * period;

            s.pcm.buffer_size = buffer;
            s.pcm.period_size = period;
            s.pcm.appl_ptr = 0;
            s.pcm.hw_ptr = 0;
            s.pcm.state = PcmState::Prepared;
            Ok(HwSetup {
                buffer_size: buffer,
                period_size: period,
                can_pause: s.hardware.can_pause,
            })
        })
    }

    fn set_chmap(&mut self, positions: &[HwChannelPos]) -> Result<(), PcmError> {
        self.with(|s| {
            if !s.hardware.accepts_chmap {
                return Err(PcmError::Unsupported);
            }
            if let Some(error) = s.hardware.chmap_error.clone() {
                return Err(error);
            }
            if positions.len() != s.pcm.channels as usize {
                return Err(PcmError::InvalidArgument);
            }
            s.pcm.chmap = Some(positions.to_vec());
            Ok(())
        })
    }

    fn get_chmap(&mut self) -> Option<Vec<HwChannelPos>> {
        self.with(|s| {
            s.hardware
                .forced_chmap
                .clone()
                .or_else(|| s.pcm.chmap.clone())
                .or_else(|| s.hardware.default_chmap.clone())
        })
    }

    fn boundary(&mut self) -> Result<u64, PcmError> {
        Ok(self.with(|s| s.hardware.boundary))
    }

    fn install_sw_params(&mut self, params: &SwParams) -> Result<(), PcmError> {
        self.with(|s| s.pcm.sw_params = Some(*params));
        Ok(())
    }

    fn state(&self) -> PcmState {
        self.with(|s| s.pcm.state)
    }

    fn avail(&mut self) -> Result<usize, PcmError> {
        self.with(|s| {
            if s.faults.fail_avail {
                return Err(PcmError::Os {
                    errno: 5,
                    message: "input/output error".into(),
                });
            }
            Ok(s.pcm.avail())
        })
    }

    fn delay(&mut self) -> Result<i64, PcmError> {
        self.with(|s| {
            if s.faults.fail_delay {
                return Err(PcmError::Os {
                    errno: 5,
                    message: "input/output error".into(),
                });
            }
            Ok(s.pcm.queued())
        })
    }

    fn forward(&mut self, frames: usize) -> Result<usize, PcmError> {
        self.log(format!("forward({})", frames));
        self.with(|s| s.pcm.appl_ptr += frames as i64);
        Ok(frames)
    }

    fn write_interleaved(&mut self, data: &[u8], frames: usize) -> Result<usize, PcmError> {
        self.with(|s| transfer(s, frames, &[data]))
    }

    fn write_planar(&mut self, planes: &[&[u8]], frames: usize) -> Result<usize, PcmError> {
        self.with(|s| transfer(s, frames, planes))
    }

    fn pause(&mut self, enable: bool) -> Result<(), PcmError> {
        self.log(format!("pause({})", enable));
        self.with(|s| {
            if !s.hardware.can_pause {
                return Err(PcmError::Unsupported);
            }
            s.pcm.state = match (s.pcm.state, enable) {
                (PcmState::Running, true) => PcmState::Paused,
                (PcmState::Paused, false) => PcmState::Running,
                (state, _) => return Err(bad_state(state)),
            };
            Ok(())
        })
    }

    fn drop_pending(&mut self) -> Result<(), PcmError> {
        self.log("drop");
        self.with(|s| s.pcm.state = PcmState::Setup);
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), PcmError> {
        self.log("prepare");
        self.with(|s| {
            if s.faults.fail_prepare {
                return Err(bad_state(s.pcm.state));
            }
            s.pcm.appl_ptr = 0;
            s.pcm.hw_ptr = 0;
            s.pcm.state = PcmState::Prepared;
            Ok(())
        })
    }

    fn resume(&mut self) -> Result<(), PcmError> {
        self.log("resume");
        self.with(|s| {
            if s.pcm.state != PcmState::Suspended {
                return Err(bad_state(s.pcm.state));
            }
            if s.faults.resume_again > 0 {
                s.faults.resume_again -= 1;
                return Err(PcmError::WouldBlock);
            }
            if s.faults.fail_resume {
                return Err(PcmError::Os {
                    errno: 38,
                    message: "function not implemented".into(),
                });
            }
            s.pcm.state = s.pcm.suspended_from.take().unwrap_or(PcmState::Running);
            Ok(())
        })
    }

    fn drain(&mut self) -> Result<(), PcmError> {
        self.log("drain");
        self.with(|s| {
            s.pcm.hw_ptr = s.pcm.appl_ptr;
            s.pcm.state = PcmState::Setup;
        });
        Ok(())
    }

    fn poll_descriptors_count(&mut self) -> Result<usize, PcmError> {
        Ok(self.with(|s| s.hardware.poll_descriptors))
    }

    fn wait_ready(&mut self, timeout: Duration) -> Result<Readiness, PcmError> {
        let ready = self.with(|s| {
            if s.faults.poll_error {
                return Some(Readiness::Error);
            }
            let playing = matches!(s.pcm.state, PcmState::Prepared | PcmState::Running);
            if s.faults.stalled || !playing {
                return None;
            }
            if s.pcm.avail() < s.pcm.period_size {
                // the card plays a period while we wait
                s.pcm.hw_ptr += s.pcm.period_size as i64;
            }
            Some(Readiness::Writable)
        });

        match ready {
            Some(readiness) => Ok(readiness),
            None => {
                std::thread::sleep(timeout);
                Ok(Readiness::Timeout)
            }
        }
    }

    fn close(self: Box<Self>) -> Result<(), PcmError> {
        self.log("close");
        self.with(|s| s.pcm.closed = true);
        Ok(())
    }
}
