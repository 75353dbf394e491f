use tracing::{debug, error};

use super::{AudioOutput, PauseMemory, SessionState};
use crate::error::{AoError, Result};
use crate::hal::PcmState;

impl AudioOutput {
    /// Stop playback, natively when the device can pause, otherwise by
    /// dropping the queue and remembering how much audio was in flight.
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            SessionState::Paused => return Ok(()),
            SessionState::Running | SessionState::Suspended => {}
            state => return Err(AoError::InvalidState { op: "pause", state }),
        }

        if self.can_pause() {
            let delay = self.delay();
            if self.device_state() == Some(PcmState::Running) {
                let pcm = self.pcm.as_mut().ok_or(AoError::NotOpen)?;
                pcm.pause(true).map_err(AoError::device("pcm pause"))?;
            }
            self.pause_memory.delay_before_pause = delay;
        } else {
            let rate = self.config.as_ref().map(|c| c.sample_rate).unwrap_or(0);
            let pcm = self.pcm.as_mut().ok_or(AoError::NotOpen)?;
            let in_flight = match pcm.delay() {
                Ok(frames) if frames > 0 => frames as usize,
                Ok(_) => 0,
                Err(e) => {
                    debug!(error = %e, "delay query failed before pause");
                    0
                }
            };
            debug!(frames = in_flight, "emulating pause, dropping queued audio");
            pcm.drop_pending().map_err(AoError::device("pcm drop"))?;

            self.pause_memory = PauseMemory {
                prepause_frames: in_flight,
                delay_before_pause: if rate > 0 {
                    in_flight as f64 / rate as f64
                } else {
                    0.0
                },
            };
        }

        self.transition(SessionState::Paused);
        Ok(())
    }

    /// Continue playback after `pause` or a device suspend.
    pub fn resume(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(if self.pcm.is_none() {
                AoError::NotOpen
            } else {
                AoError::InvalidState {
                    op: "resume",
                    state: self.state,
                }
            });
        }
        let was_paused = self.state == SessionState::Paused;

        if self.device_state() == Some(PcmState::Suspended) {
            self.recover_from_suspend()?;
        }

        if self.can_pause() {
            if self.device_state() == Some(PcmState::Paused) {
                let pcm = self.pcm.as_mut().ok_or(AoError::NotOpen)?;
                pcm.pause(false).map_err(AoError::device("pcm resume"))?;
            }
        } else if was_paused {
            debug!("resuming emulated pause");
            let pcm = self.pcm.as_mut().ok_or(AoError::NotOpen)?;
            pcm.prepare().map_err(AoError::device("pcm prepare"))?;

            // Running again so the silence passes the write state check
            self.transition(SessionState::Running);
            let frames = std::mem::take(&mut self.pause_memory.prepause_frames);
            if frames > 0 {
                debug!(frames, "backfilling paused audio with silence");
                self.play_silence(frames)?;
            }
        }

        self.pause_memory.delay_before_pause = 0.0;
        self.transition(SessionState::Running);
        Ok(())
    }

    /// Drop everything queued and start over with an empty buffer
    pub fn reset(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(if self.pcm.is_none() {
                AoError::NotOpen
            } else {
                AoError::InvalidState {
                    op: "reset",
                    state: self.state,
                }
            });
        }

        self.pause_memory = PauseMemory::default();
        let pcm = self.pcm.as_mut().ok_or(AoError::NotOpen)?;
        if let Err(e) = pcm.drop_pending() {
            error!(error = %e, "pcm drop error");
        }
        pcm.prepare().map_err(AoError::device("pcm prepare"))?;
        self.transition(SessionState::Running);
        Ok(())
    }
}
