//! Playback session: device lifecycle, flow control and transport control.

pub mod device_name;
mod flow;
pub mod negotiate;
mod pause;
pub mod state;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::chmap::{ClosestLayout, LayoutSelector};
use crate::config::AoConfig;
use crate::error::{AoError, Result};
use crate::format::{DeviceConfig, MemoryLayout};
use crate::hal::{HardwareDriver, OpenMode, PcmDevice, PcmError, SwParams};
use crate::mixer::MixerControl;
use device_name::{append_params, iec958_params, resolve_device};
use negotiate::negotiate;

pub use flow::{WaitOutcome, MAX_POLL_DESCRIPTORS};
pub use negotiate::{ChannelMapSelection, Negotiated, NegotiatedGeometry, NegotiationWarning};
pub use state::{PauseMemory, SessionState};

/// Pause between resume attempts while a suspended device answers "try again"
pub const SUSPEND_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// A single playback stream on one device.
///
/// Not meant for concurrent use; the engine drives it from one audio thread.
pub struct AudioOutput {
    driver: Arc<dyn HardwareDriver>,
    options: AoConfig,
    selector: Box<dyn LayoutSelector>,
    pcm: Option<Box<dyn PcmDevice>>,
    state: SessionState,
    device_name: Option<String>,
    config: Option<DeviceConfig>,
    negotiated: Option<Negotiated>,
    pause_memory: PauseMemory,
    suspend_retry: Duration,
}

impl AudioOutput {
    pub fn new(driver: Arc<dyn HardwareDriver>, options: AoConfig) -> Self {
        Self {
            driver,
            options,
            selector: Box::new(ClosestLayout),
            pcm: None,
            state: SessionState::Closed,
            device_name: None,
            config: None,
            negotiated: None,
            pause_memory: PauseMemory::default(),
            suspend_retry: SUSPEND_RETRY_INTERVAL,
        }
    }

    /// Replace the channel layout selection policy
    pub fn with_selector(mut self, selector: Box<dyn LayoutSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn set_suspend_retry_interval(&mut self, interval: Duration) {
        self.suspend_retry = interval;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &AoConfig {
        &self.options
    }

    /// Device string the session opened
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Stream format as granted by the device
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    pub fn geometry(&self) -> Option<NegotiatedGeometry> {
        self.negotiated.as_ref().map(|n| n.geometry)
    }

    pub fn channel_map(&self) -> Option<&ChannelMapSelection> {
        self.negotiated.as_ref().map(|n| &n.channel_map)
    }

    /// Advisory conditions from the last open
    pub fn warnings(&self) -> &[NegotiationWarning] {
        self.negotiated
            .as_ref()
            .map(|n| n.warnings.as_slice())
            .unwrap_or(&[])
    }

    pub fn can_pause(&self) -> bool {
        self.negotiated.as_ref().map(|n| n.can_pause).unwrap_or(false)
    }

    pub fn pause_memory(&self) -> PauseMemory {
        self.pause_memory
    }

    /// Mixer control configured for this output
    pub fn mixer(&self) -> Result<MixerControl> {
        if let Some(config) = &self.config {
            if config.format.is_passthrough() {
                return Err(AoError::MixerUnavailable);
            }
        }
        Ok(MixerControl::new(self.driver.clone(), &self.options))
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!(from = self.state.name(), to = next.name(), "unexpected session transition");
        }
        self.state = next;
    }

    /// Open a device and negotiate `request` against it.
    ///
    /// Returns the granted configuration. On a fatal negotiation failure the
    /// handle is released and the session stays in `Error` until closed.
    pub fn open(
        &mut self,
        mut request: DeviceConfig,
        device_override: Option<&str>,
    ) -> Result<&DeviceConfig> {
        if self.state != SessionState::Closed {
            return Err(AoError::InvalidState {
                op: "open",
                state: self.state,
            });
        }

        if !self.options.non_interleaved || request.format.is_passthrough() {
            request.layout = MemoryLayout::Interleaved;
        }

        let resolved = resolve_device(
            &self.options,
            &request,
            device_override,
            self.selector.as_ref(),
        );
        if request.format.is_passthrough() {
            debug!(channels = request.channels.len(), "playing passthrough audio");
        }
        debug!(device = %resolved.name, "using device");

        let mut pcm = match self.open_device(&resolved.name, &request) {
            Ok(pcm) => pcm,
            Err(e) => {
                error!(error = %e, "audio output open failed");
                self.transition(SessionState::Error);
                return Err(e);
            }
        };
        self.transition(SessionState::Open);

        match pcm.set_nonblock(false) {
            Ok(()) => debug!("pcm opened in blocking mode"),
            Err(e) => error!(error = %e, "error setting block-mode"),
        }

        let setup = negotiate(
            pcm.as_mut(),
            &mut request,
            &resolved.implied_layout,
            &self.options,
            self.selector.as_ref(),
        )
        .and_then(|negotiated| {
            install_sw_params(pcm.as_mut(), negotiated.geometry.period_size)?;
            Ok(negotiated)
        });

        let negotiated = match setup {
            Ok(negotiated) => negotiated,
            Err(e) => {
                error!(device = %resolved.name, error = %e, "audio output setup failed");
                if let Err(close_err) = pcm.close() {
                    error!(error = %close_err, "pcm close error");
                }
                self.transition(SessionState::Error);
                return Err(e);
            }
        };

        info!(
            device = %resolved.name,
            format = %request.format,
            channels = %request.channels,
            rate = request.sample_rate,
            buffer = negotiated.geometry.buffer_size,
            period = negotiated.geometry.period_size,
            "audio output opened"
        );

        self.pcm = Some(pcm);
        self.device_name = Some(resolved.name);
        self.negotiated = Some(negotiated);
        self.pause_memory = PauseMemory::default();
        self.transition(SessionState::Running);
        Ok(&*self.config.insert(request))
    }

    fn open_device(&self, name: &str, request: &DeviceConfig) -> Result<Box<dyn PcmDevice>> {
        let mode = if self.options.block {
            OpenMode::Blocking
        } else {
            OpenMode::NonBlocking
        };

        match self.try_open(name, request, mode) {
            Ok(pcm) => Ok(pcm),
            Err(PcmError::Busy) if mode == OpenMode::NonBlocking => {
                warn!(device = %name, "open in nonblock-mode failed, trying to open in block-mode");
                self.try_open(name, request, OpenMode::Blocking)
                    .map_err(|source| AoError::Open {
                        device: name.to_string(),
                        source,
                    })
            }
            Err(source) => Err(AoError::Open {
                device: name.to_string(),
                source,
            }),
        }
    }

    /// Passthrough first tries the device with channel status parameters
    /// appended, then the bare name.
    fn try_open(
        &self,
        name: &str,
        request: &DeviceConfig,
        mode: OpenMode,
    ) -> std::result::Result<Box<dyn PcmDevice>, PcmError> {
        if request.format.is_passthrough() {
            let with_params = append_params(name, &iec958_params(request.sample_rate));
            match self.driver.open_pcm(&with_params, mode) {
                Ok(pcm) => return Ok(pcm),
                Err(e) => debug!(device = %with_params, error = %e, "parameterized open failed"),
            }
        }
        self.driver.open_pcm(name, mode)
    }

    /// Block until every queued frame has been played
    pub fn drain(&mut self) -> Result<()> {
        let pcm = self.active_pcm("drain")?;
        pcm.drain().map_err(AoError::device("pcm drain"))
    }

    /// Release the device. Safe to call in any state.
    pub fn close(&mut self) {
        if let Some(pcm) = self.pcm.take() {
            if let Err(e) = pcm.close() {
                error!(error = %e, "pcm close error");
            }
        }
        self.negotiated = None;
        self.config = None;
        self.device_name = None;
        self.pause_memory = PauseMemory::default();
        if self.state != SessionState::Closed {
            self.transition(SessionState::Closed);
        }
    }

    fn active_pcm(&mut self, op: &'static str) -> Result<&mut Box<dyn PcmDevice>> {
        if !self.state.is_active() {
            return Err(if self.pcm.is_none() {
                AoError::NotOpen
            } else {
                AoError::InvalidState {
                    op,
                    state: self.state,
                }
            });
        }
        self.pcm.as_mut().ok_or(AoError::NotOpen)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

/// Start once a full period is queued, never stop on underrun, and pad any
/// gap with silence rather than stale samples.
fn install_sw_params(pcm: &mut dyn PcmDevice, period_size: usize) -> Result<()> {
    let boundary = pcm
        .boundary()
        .map_err(AoError::negotiation("unable to get boundary"))?;
    let params = SwParams {
        start_threshold: period_size as u64,
        stop_threshold: boundary,
        silence_size: boundary,
    };
    pcm.install_sw_params(&params)
        .map_err(AoError::negotiation("unable to set sw-parameters"))
}
