use crossbeam_channel::{Receiver, TryRecvError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{AudioOutput, SessionState};
use crate::error::{AoError, Result};
use crate::hal::{PcmError, PcmState, Readiness};

/// Upper bound on the device's poll descriptor count
pub const MAX_POLL_DESCRIPTORS: usize = 20;

const MIN_WAIT_SLICE: Duration = Duration::from_millis(5);
const MAX_WAIT_SLICE: Duration = Duration::from_millis(50);

/// Why `wait` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The device can take more audio
    Writable,
    /// The caller's wakeup channel fired
    Woken,
}

impl AudioOutput {
    /// Frames that can be written without blocking, in whole periods
    pub fn space(&mut self) -> usize {
        let Some(geometry) = self.geometry() else {
            return 0;
        };
        let Some(pcm) = self.pcm.as_mut() else {
            return 0;
        };

        let avail = match pcm.avail() {
            Ok(avail) => avail,
            Err(e) => {
                error!(error = %e, "error received from snd_pcm_avail");
                return 0;
            }
        };

        // underruns can make avail exceed the buffer
        let space = avail.min(geometry.buffer_size);
        space / geometry.period_size * geometry.period_size
    }

    /// Seconds of queued audio not yet heard
    pub fn delay(&mut self) -> f64 {
        if self.state == SessionState::Paused {
            return self.pause_memory.delay_before_pause;
        }
        let rate = match self.config.as_ref() {
            Some(config) if config.sample_rate > 0 => config.sample_rate as f64,
            _ => return 0.0,
        };
        let Some(pcm) = self.pcm.as_mut() else {
            return 0.0;
        };

        match pcm.delay() {
            Ok(frames) if frames < 0 => {
                // The hardware pointer ran past the application pointer
                // during an underrun; catch up so later delays are sane.
                if let Err(e) = pcm.forward(frames.unsigned_abs() as usize) {
                    debug!(error = %e, "pcm forward failed");
                }
                0.0
            }
            Ok(frames) => frames as f64 / rate,
            Err(e) => {
                error!(error = %e, "error received from snd_pcm_delay");
                0.0
            }
        }
    }

    /// Write `frames` frames from `planes`.
    ///
    /// Interleaved streams pass one plane, planar streams one per channel.
    /// Unless `final_chunk` is set, only whole periods are written.
    pub fn write(&mut self, planes: &[&[u8]], frames: usize, final_chunk: bool) -> Result<usize> {
        if self.state != SessionState::Running {
            return Err(if self.pcm.is_none() {
                AoError::NotOpen
            } else {
                AoError::InvalidState {
                    op: "write",
                    state: self.state,
                }
            });
        }
        let (config, geometry) = match (self.config.as_ref(), self.geometry()) {
            (Some(config), Some(geometry)) => (config, geometry),
            _ => return Err(AoError::NotOpen),
        };

        let frames = if final_chunk {
            frames
        } else {
            frames / geometry.period_size * geometry.period_size
        };
        if frames == 0 {
            return Ok(0);
        }

        let expected_planes = config.plane_count();
        if planes.len() != expected_planes {
            return Err(AoError::PlaneCount {
                expected: expected_planes,
                actual: planes.len(),
            });
        }
        let needed = frames * config.plane_stride();
        if let Some(short) = planes.iter().find(|p| p.len() < needed) {
            return Err(AoError::ShortBuffer {
                expected: needed,
                actual: short.len(),
            });
        }
        let planar = config.is_planar();

        loop {
            let result = {
                let Some(pcm) = self.pcm.as_mut() else {
                    return Err(AoError::NotOpen);
                };
                if planar {
                    pcm.write_planar(planes, frames)
                } else {
                    pcm.write_interleaved(planes[0], frames)
                }
            };

            match result {
                Ok(0) => continue,
                Ok(written) => return Ok(written),
                Err(e) if e.is_transient() => continue,
                Err(PcmError::Suspended) => {
                    info!("audio device suspended, trying to resume");
                    self.recover_from_suspend()?;
                }
                Err(e) => {
                    error!(error = %e, "error received from snd_pcm_write");
                    let pcm = self.pcm.as_mut().ok_or(AoError::NotOpen)?;
                    pcm.prepare().map_err(AoError::Recovery)?;
                }
            }
        }
    }

    /// Write exactly `frames` frames of silence
    pub(crate) fn play_silence(&mut self, frames: usize) -> Result<()> {
        let Some(config) = self.config.as_ref() else {
            return Err(AoError::NotOpen);
        };
        let stride = config.plane_stride();
        let mut plane = vec![0u8; frames * stride];
        config.format.fill_silence(&mut plane);
        let planes: Vec<&[u8]> = (0..config.plane_count()).map(|_| plane.as_slice()).collect();

        let mut remaining = frames;
        while remaining > 0 {
            let offset = (frames - remaining) * stride;
            let chunk: Vec<&[u8]> = planes.iter().map(|p| &p[offset..]).collect();
            let written = self.write(&chunk, remaining, true)?;
            remaining -= written.min(remaining);
        }
        Ok(())
    }

    /// Block until the device is writable or `wakeup` fires.
    ///
    /// A message on `wakeup` or a dropped sender both count as a wakeup.
    pub fn wait(&mut self, wakeup: &Receiver<()>) -> Result<WaitOutcome> {
        let slice = self.wait_slice();
        let pcm = match self.pcm.as_mut() {
            Some(pcm) if self.state.is_active() => pcm,
            Some(_) => {
                return Err(AoError::InvalidState {
                    op: "wait",
                    state: self.state,
                })
            }
            None => return Err(AoError::NotOpen),
        };

        let count = pcm
            .poll_descriptors_count()
            .map_err(AoError::device("poll descriptors"))?;
        if count == 0 || count >= MAX_POLL_DESCRIPTORS {
            return Err(AoError::PollDescriptors(count));
        }

        loop {
            match wakeup.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => return Ok(WaitOutcome::Woken),
                Err(TryRecvError::Empty) => {}
            }

            match pcm.wait_ready(slice) {
                Ok(Readiness::Writable) => return Ok(WaitOutcome::Writable),
                Ok(Readiness::Timeout) => {}
                Ok(Readiness::Error) => {
                    error!("poll reported an error on the audio device");
                    return Err(AoError::PollError);
                }
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(AoError::Device { op: "wait", source: e }),
            }
        }
    }

    fn wait_slice(&self) -> Duration {
        let period = match (self.geometry(), self.config.as_ref()) {
            (Some(geometry), Some(config)) if config.sample_rate > 0 => Duration::from_secs_f64(
                geometry.period_size as f64 / config.sample_rate as f64,
            ),
            _ => MAX_WAIT_SLICE,
        };
        period.clamp(MIN_WAIT_SLICE, MAX_WAIT_SLICE)
    }

    /// Resume a suspended transport, re-preparing it if resume gives up.
    ///
    /// A failed re-prepare leaves the session `Suspended` and returns
    /// [`AoError::Recovery`].
    pub(crate) fn recover_from_suspend(&mut self) -> Result<()> {
        let previous = self.state;
        if previous != SessionState::Suspended {
            self.transition(SessionState::Suspended);
        }

        let pcm = self.pcm.as_mut().ok_or(AoError::NotOpen)?;
        loop {
            match pcm.resume() {
                Ok(()) => break,
                Err(PcmError::WouldBlock) => std::thread::sleep(self.suspend_retry),
                Err(e) => {
                    warn!(error = %e, "resume failed, re-preparing the stream");
                    if let Err(e) = pcm.prepare() {
                        error!(error = %e, "pcm prepare error");
                        return Err(AoError::Recovery(e));
                    }
                    break;
                }
            }
        }
        info!(state = previous.name(), "audio device resumed");
        self.transition(SessionState::Running);
        Ok(())
    }

    pub(crate) fn device_state(&self) -> Option<PcmState> {
        self.pcm.as_ref().map(|pcm| pcm.state())
    }
}
