//! In-memory sound system for tests and demos.
//!
//! A [`SimulatedDriver`] hands out PCM and mixer handles that share one
//! [`SimulatedState`]; a [`SimulatedProbe`] looks at that state from the
//! outside, advances playback and scripts failures.

pub mod mixer;
pub mod pcm;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::hal::{
    ChmapQuery, DeviceHint, HardwareDriver, HwChannelPos, MixerChannel, MixerDevice, OpenMode,
    PcmAccess, PcmDevice, PcmError, PcmFormat, PcmState, SwParams,
};
pub use mixer::{SimulatedControl, SimulatedMixer};
pub use pcm::SimulatedPcm;

/// Capabilities of the simulated card
#[derive(Debug, Clone)]
pub struct SimulatedHardware {
    pub formats: Vec<PcmFormat>,
    pub access: Vec<PcmAccess>,
    /// Channel counts the device can do; requests snap to the nearest
    pub channel_counts: Vec<u32>,
    pub rates: Vec<u32>,
    /// `None` models a device without channel map enumeration
    pub chmaps: Option<Vec<ChmapQuery>>,
    pub accepts_chmap: bool,
    /// Error answered to an accepted channel map push
    pub chmap_error: Option<PcmError>,
    /// Map reported when none was pushed
    pub default_chmap: Option<Vec<HwChannelPos>>,
    /// Map reported whatever was pushed
    pub forced_chmap: Option<Vec<HwChannelPos>>,
    pub can_pause: bool,
    pub max_buffer_frames: usize,
    pub min_period_frames: usize,
    pub boundary: u64,
    pub poll_descriptors: usize,
    /// Non-blocking opens fail with `Busy`
    pub busy_when_nonblocking: bool,
    /// Opens of any name containing one of these fail with `NoSuchDevice`
    pub rejected_names: Vec<String>,
    pub reject_buffer_time: bool,
    pub reject_periods: bool,
    pub mixer_controls: Vec<SimulatedControl>,
    pub hints: Vec<DeviceHint>,
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self {
            formats: vec![PcmFormat::S16],
            access: vec![PcmAccess::Interleaved],
            channel_counts: vec![2],
            rates: vec![48000],
            chmaps: None,
            accepts_chmap: false,
            chmap_error: None,
            default_chmap: None,
            forced_chmap: None,
            can_pause: true,
            max_buffer_frames: 16384,
            min_period_frames: 64,
            boundary: 0x4000_0000,
            poll_descriptors: 1,
            busy_when_nonblocking: false,
            rejected_names: Vec::new(),
            reject_buffer_time: false,
            reject_periods: false,
            mixer_controls: vec![SimulatedControl::new("Master", 0, 0, 87)],
            hints: Vec::new(),
        }
    }
}

/// Everything the simulated PCM has been told
#[derive(Debug, Default)]
pub struct PcmRuntime {
    pub state: PcmState,
    pub nonblock: bool,
    pub format: Option<PcmFormat>,
    pub access: Option<PcmAccess>,
    pub channels: u32,
    pub rate: u32,
    pub resample: Option<bool>,
    pub buffer_time_us: Option<u32>,
    pub periods: Option<u32>,
    pub buffer_size: usize,
    pub period_size: usize,
    pub sw_params: Option<SwParams>,
    pub chmap: Option<Vec<HwChannelPos>>,
    pub appl_ptr: i64,
    pub hw_ptr: i64,
    pub suspended_from: Option<PcmState>,
    pub closed: bool,
}

impl PcmRuntime {
    /// Frames queued but not yet played; negative after an underrun
    pub fn queued(&self) -> i64 {
        self.appl_ptr - self.hw_ptr
    }

    pub fn avail(&self) -> usize {
        (self.buffer_size as i64 - self.queued()).max(0) as usize
    }
}

/// Scripted misbehavior
#[derive(Debug, Default)]
pub struct Faults {
    pub write_errors: VecDeque<PcmError>,
    /// Number of resume calls answered with "try again"
    pub resume_again: usize,
    pub fail_resume: bool,
    pub fail_prepare: bool,
    pub fail_delay: bool,
    pub fail_avail: bool,
    pub stalled: bool,
    pub poll_error: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedState {
    pub hardware: SimulatedHardware,
    pub open_attempts: Vec<(String, OpenMode)>,
    pub mixer_opens: Vec<String>,
    pub pcm: PcmRuntime,
    pub faults: Faults,
    pub writes: Vec<usize>,
    pub written: Vec<u8>,
    pub calls: Vec<String>,
}

pub(crate) type SharedState = Arc<Mutex<SimulatedState>>;

pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, SimulatedState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Driver backed by [`SimulatedHardware`]
pub struct SimulatedDriver {
    state: SharedState,
}

impl SimulatedDriver {
    pub fn new(hardware: SimulatedHardware) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                hardware,
                ..Default::default()
            })),
        }
    }

    pub fn probe(&self) -> SimulatedProbe {
        SimulatedProbe {
            state: self.state.clone(),
        }
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(SimulatedHardware::default())
    }
}

#[async_trait]
impl HardwareDriver for SimulatedDriver {
    fn driver_id(&self) -> &str {
        "simulated"
    }

    async fn device_hints(&self) -> Result<Vec<DeviceHint>, PcmError> {
        Ok(lock(&self.state).hardware.hints.clone())
    }

    fn open_pcm(&self, name: &str, mode: OpenMode) -> Result<Box<dyn PcmDevice>, PcmError> {
        let mut state = lock(&self.state);
        state.open_attempts.push((name.to_string(), mode));

        if state
            .hardware
            .rejected_names
            .iter()
            .any(|rejected| name.contains(rejected.as_str()))
        {
            return Err(PcmError::NoSuchDevice);
        }
        if mode == OpenMode::NonBlocking && state.hardware.busy_when_nonblocking {
            return Err(PcmError::Busy);
        }

        state.pcm = PcmRuntime {
            nonblock: mode == OpenMode::NonBlocking,
            ..Default::default()
        };
        drop(state);
        Ok(Box::new(SimulatedPcm::new(name, self.state.clone())))
    }

    fn open_mixer(&self, device: &str) -> Result<Box<dyn MixerDevice>, PcmError> {
        let mut state = lock(&self.state);
        state.mixer_opens.push(device.to_string());
        if state
            .hardware
            .rejected_names
            .iter()
            .any(|rejected| device.contains(rejected.as_str()))
        {
            return Err(PcmError::NoSuchDevice);
        }
        drop(state);
        Ok(Box::new(SimulatedMixer::new(self.state.clone())))
    }
}

/// Outside view of a [`SimulatedDriver`]
#[derive(Clone)]
pub struct SimulatedProbe {
    state: SharedState,
}

impl SimulatedProbe {
    /// Run an arbitrary closure against the shared state
    pub fn inspect<T>(&self, f: impl FnOnce(&SimulatedState) -> T) -> T {
        f(&*lock(&self.state))
    }

    pub fn with_hardware(&self, f: impl FnOnce(&mut SimulatedHardware)) {
        f(&mut lock(&self.state).hardware)
    }

    pub fn open_attempts(&self) -> Vec<(String, OpenMode)> {
        self.inspect(|s| s.open_attempts.clone())
    }

    pub fn mixer_opens(&self) -> usize {
        self.inspect(|s| s.mixer_opens.len())
    }

    pub fn is_closed(&self) -> bool {
        self.inspect(|s| s.pcm.closed)
    }

    pub fn state(&self) -> PcmState {
        self.inspect(|s| s.pcm.state)
    }

    pub fn format(&self) -> Option<PcmFormat> {
        self.inspect(|s| s.pcm.format)
    }

    pub fn access(&self) -> Option<PcmAccess> {
        self.inspect(|s| s.pcm.access)
    }

    pub fn resample(&self) -> Option<bool> {
        self.inspect(|s| s.pcm.resample)
    }

    pub fn nonblock(&self) -> bool {
        self.inspect(|s| s.pcm.nonblock)
    }

    pub fn sw_params(&self) -> Option<SwParams> {
        self.inspect(|s| s.pcm.sw_params)
    }

    pub fn chmap(&self) -> Option<Vec<HwChannelPos>> {
        self.inspect(|s| s.pcm.chmap.clone())
    }

    pub fn queued(&self) -> i64 {
        self.inspect(|s| s.pcm.queued())
    }

    pub fn writes(&self) -> Vec<usize> {
        self.inspect(|s| s.writes.clone())
    }

    pub fn frames_written(&self) -> usize {
        self.inspect(|s| s.writes.iter().sum())
    }

    /// Raw bytes in the order they reached the device
    pub fn written_bytes(&self) -> Vec<u8> {
        self.inspect(|s| s.written.clone())
    }

    /// Transport calls such as "pause(true)", "drop", "prepare"
    pub fn calls(&self) -> Vec<String> {
        self.inspect(|s| s.calls.clone())
    }

    pub fn clear_log(&self) {
        let mut state = lock(&self.state);
        state.calls.clear();
        state.writes.clear();
        state.written.clear();
    }

    /// Let the hardware consume `frames` frames. Running past the queued
    /// audio leaves the pointers in underrun.
    pub fn played(&self, frames: usize) {
        let mut state = lock(&self.state);
        if state.pcm.state == PcmState::Running {
            state.pcm.hw_ptr += frames as i64;
        }
    }

    pub fn suspend(&self) {
        let mut state = lock(&self.state);
        let previous = state.pcm.state;
        state.pcm.suspended_from = Some(previous);
        state.pcm.state = PcmState::Suspended;
    }

    pub fn push_write_error(&self, error: PcmError) {
        lock(&self.state).faults.write_errors.push_back(error);
    }

    pub fn set_resume_again(&self, attempts: usize) {
        lock(&self.state).faults.resume_again = attempts;
    }

    pub fn set_fail_resume(&self, fail: bool) {
        lock(&self.state).faults.fail_resume = fail;
    }

    pub fn set_fail_prepare(&self, fail: bool) {
        lock(&self.state).faults.fail_prepare = fail;
    }

    pub fn set_fail_delay(&self, fail: bool) {
        lock(&self.state).faults.fail_delay = fail;
    }

    pub fn set_fail_avail(&self, fail: bool) {
        lock(&self.state).faults.fail_avail = fail;
    }

    /// Stop the device from ever becoming writable
    pub fn set_stalled(&self, stalled: bool) {
        lock(&self.state).faults.stalled = stalled;
    }

    pub fn set_poll_error(&self, error: bool) {
        lock(&self.state).faults.poll_error = error;
    }

    pub fn control_volume(&self, name: &str, index: u32, channel: MixerChannel) -> Option<i64> {
        self.inspect(|s| {
            s.hardware
                .mixer_controls
                .iter()
                .find(|c| c.name == name && c.index == index)
                .map(|c| c.volume(channel))
        })
    }

    pub fn control_switch(&self, name: &str, index: u32, channel: MixerChannel) -> Option<bool> {
        self.inspect(|s| {
            s.hardware
                .mixer_controls
                .iter()
                .find(|c| c.name == name && c.index == index)
                .map(|c| c.switch(channel))
        })
    }
}
