//! Hardware parameter negotiation.
//!
//! Each step narrows the device's configuration space. Steps that decide what
//! the stream is (format, access, channel count, rate) are fatal on failure;
//! steps that only shape latency or channel order degrade to warnings.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::chmap::positions::{describe_positions, layout_from_positions, positions_from_layout};
use crate::chmap::{ChannelLayout, LayoutSelector, MAX_CHANNELS};
use crate::config::AoConfig;
use crate::error::{AoError, Result};
use crate::format::{passthrough_container, to_native, DeviceConfig, MemoryLayout, SampleFormat};
use crate::hal::{HwChannelPos, PcmAccess, PcmDevice, PcmError, PcmFormat};

/// Target buffer duration
pub const BUFFER_TIME_US: u32 = 250_000;
/// Target number of periods per buffer
pub const PERIOD_COUNT: u32 = 16;

/// Buffer geometry granted by the device, in frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedGeometry {
    pub buffer_size: usize,
    pub period_size: usize,
}

impl NegotiatedGeometry {
    /// Write granularity
    pub fn outburst(&self) -> usize {
        self.period_size
    }
}

/// Layout in force after negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapSelection {
    pub layout: ChannelLayout,
    /// Positions pushed to the device; `None` when the device keeps its own
    /// default mapping
    pub hw_positions: Option<Vec<HwChannelPos>>,
}

impl ChannelMapSelection {
    pub fn is_explicit(&self) -> bool {
        self.hw_positions.is_some()
    }
}

/// Advisory conditions met while negotiating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationWarning {
    FormatFallback {
        requested: SampleFormat,
        granted: SampleFormat,
    },
    PlanarUnsupported,
    ChannelCount {
        requested: u32,
        granted: u32,
    },
    SampleRate {
        requested: u32,
        granted: u32,
    },
    BufferTime {
        requested_us: u32,
        granted_us: Option<u32>,
    },
    Periods {
        requested: u32,
        granted: Option<u32>,
    },
    ChannelMapUnsupported,
    ChannelMapRejected(PcmError),
    ChannelMapConflict {
        reported: ChannelLayout,
    },
    UnknownChannelMap,
}

impl fmt::Display for NegotiationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormatFallback { requested, granted } => {
                write!(f, "format {} is not supported by hardware, using {}", requested, granted)
            }
            Self::PlanarUnsupported => f.write_str("planar access unavailable, interleaving"),
            Self::ChannelCount { requested, granted } => write!(
                f,
                "couldn't get requested number of channels ({} instead of {})",
                granted, requested
            ),
            Self::SampleRate { requested, granted } => {
                write!(f, "sample rate {} Hz changed to {} Hz", requested, granted)
            }
            Self::BufferTime { requested_us, granted_us } => match granted_us {
                Some(us) => write!(f, "buffer time {} us granted as {} us", requested_us, us),
                None => write!(f, "unable to set buffer time near {} us", requested_us),
            },
            Self::Periods { requested, granted } => match granted {
                Some(n) => write!(f, "period count {} granted as {}", requested, n),
                None => write!(f, "unable to set periods near {}", requested),
            },
            Self::ChannelMapUnsupported => {
                f.write_str("device does not support requested channel map")
            }
            Self::ChannelMapRejected(e) => write!(f, "channel map setup failed: {}", e),
            Self::ChannelMapConflict { reported } => write!(
                f,
                "device channel map {} conflicts with channel count",
                reported
            ),
            Self::UnknownChannelMap => f.write_str("got unknown channel map from device"),
        }
    }
}

/// Everything the session keeps from a successful negotiation
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub native_format: PcmFormat,
    pub access: PcmAccess,
    pub geometry: NegotiatedGeometry,
    pub channel_map: ChannelMapSelection,
    pub can_pause: bool,
    pub warnings: Vec<NegotiationWarning>,
}

struct Negotiator<'a> {
    pcm: &'a mut dyn PcmDevice,
    options: &'a AoConfig,
    selector: &'a dyn LayoutSelector,
    warnings: Vec<NegotiationWarning>,
}

/// Install hardware parameters for `request`, rewriting it to what the
/// device granted. `implied` is the layout the device name stands for.
pub(crate) fn negotiate(
    pcm: &mut dyn PcmDevice,
    request: &mut DeviceConfig,
    implied: &ChannelLayout,
    options: &AoConfig,
    selector: &dyn LayoutSelector,
) -> Result<Negotiated> {
    let mut negotiator = Negotiator {
        pcm,
        options,
        selector,
        warnings: Vec::new(),
    };

    let native_format = negotiator.select_format(request)?;
    let access = negotiator.select_access(request)?;
    let mut hw_map = negotiator.resolve_channel_map(request, implied);
    negotiator.negotiate_channels(request, &mut hw_map)?;
    negotiator.negotiate_timing(request)?;

    let setup = negotiator
        .pcm
        .install_hw_params()
        .map_err(AoError::negotiation("unable to set hw-parameters"))?;
    if setup.period_size == 0 || setup.buffer_size < setup.period_size {
        return Err(AoError::InvalidGeometry {
            buffer_size: setup.buffer_size,
            period_size: setup.period_size,
        });
    }
    debug!(
        buffer_size = setup.buffer_size,
        period_size = setup.period_size,
        "hardware parameters installed"
    );

    let channel_map = negotiator.apply_channel_map(request, hw_map);

    Ok(Negotiated {
        native_format,
        access,
        geometry: NegotiatedGeometry {
            buffer_size: setup.buffer_size,
            period_size: setup.period_size,
        },
        channel_map,
        can_pause: setup.can_pause,
        warnings: negotiator.warnings,
    })
}

impl<'a> Negotiator<'a> {
    fn warn(&mut self, warning: NegotiationWarning) {
        warn!(device = %self.pcm.name(), "{}", warning);
        self.warnings.push(warning);
    }

    fn select_format(&mut self, request: &mut DeviceConfig) -> Result<PcmFormat> {
        let requested = request.format;
        let passthrough = requested.is_passthrough();

        let mut native = if passthrough {
            passthrough_container(requested)
        } else {
            to_native(requested).unwrap_or(PcmFormat::S16)
        };
        if !passthrough && to_native(requested).is_none() {
            request.format = SampleFormat::S16;
        }

        if let Err(e) = self.pcm.test_format(native) {
            if passthrough {
                return Err(AoError::PassthroughRejected {
                    format: requested,
                    source: e,
                });
            }
            native = PcmFormat::S16;
            request.format = SampleFormat::S16;
        }

        if request.format != requested {
            info!(
                requested = %requested,
                "sample format not supported by hardware, trying default"
            );
            self.warnings.push(NegotiationWarning::FormatFallback {
                requested,
                granted: request.format,
            });
        }

        self.pcm
            .set_format(native)
            .map_err(AoError::negotiation("unable to set format"))?;
        Ok(native)
    }

    fn select_access(&mut self, request: &mut DeviceConfig) -> Result<PcmAccess> {
        let access = match request.layout {
            MemoryLayout::Planar => PcmAccess::NonInterleaved,
            MemoryLayout::Interleaved => PcmAccess::Interleaved,
        };

        match self.pcm.set_access(access) {
            Ok(()) => Ok(access),
            Err(_) if access == PcmAccess::NonInterleaved => {
                request.layout = MemoryLayout::Interleaved;
                self.warn(NegotiationWarning::PlanarUnsupported);
                self.pcm
                    .set_access(PcmAccess::Interleaved)
                    .map_err(AoError::negotiation("unable to set access type"))?;
                Ok(PcmAccess::Interleaved)
            }
            Err(e) => Err(AoError::Negotiation {
                context: "unable to set access type",
                source: e,
            }),
        }
    }

    /// Choose the layout from the device's channel map enumeration. Returns
    /// the layout to push to the device, if any.
    fn resolve_channel_map(
        &mut self,
        request: &mut DeviceConfig,
        implied: &ChannelLayout,
    ) -> Option<ChannelLayout> {
        let chosen = self.pcm.query_chmaps().and_then(|maps| {
            let mut candidates = Vec::new();
            for map in maps {
                if map.positions.len() > MAX_CHANNELS {
                    debug!("skipping channel map with too many channels");
                    continue;
                }
                match layout_from_positions(&map.positions) {
                    Some(layout) => {
                        debug!(
                            layout = %layout,
                            kind = map.kind.name(),
                            "got supported channel map"
                        );
                        candidates.push(layout);
                    }
                    None => debug!(
                        map = %describe_positions(&map.positions),
                        "skipping unknown channel map"
                    ),
                }
            }
            self.selector.select(&candidates, &request.channels)
        });

        match chosen {
            Some(layout) => {
                request.channels = layout.clone();
                Some(layout)
            }
            None => {
                request.channels = implied.clone();
                None
            }
        }
    }

    fn negotiate_channels(
        &mut self,
        request: &mut DeviceConfig,
        hw_map: &mut Option<ChannelLayout>,
    ) -> Result<()> {
        let requested = request.channels.len() as u32;
        let granted = self
            .pcm
            .set_channels_near(requested)
            .map_err(AoError::negotiation("unable to set channels"))?;

        if granted as usize > MAX_CHANNELS {
            return Err(AoError::TooManyChannels(granted));
        }

        if granted != requested {
            self.warn(NegotiationWarning::ChannelCount { requested, granted });
            request.channels = ChannelLayout::from_channel_count(granted as usize)
                .ok_or(AoError::NoChannelLayout(granted))?;
            // The resolved map no longer fits; the generic layout stays
            // provisional until the device reports its own map.
            *hw_map = None;
        }
        Ok(())
    }

    fn negotiate_timing(&mut self, request: &mut DeviceConfig) -> Result<()> {
        if !self.options.resample {
            self.pcm
                .set_rate_resample(false)
                .map_err(AoError::negotiation("unable to disable resampling"))?;
        }

        let requested = request.sample_rate;
        let granted = self
            .pcm
            .set_rate_near(requested)
            .map_err(AoError::negotiation("unable to set samplerate"))?;
        if granted != requested {
            self.warn(NegotiationWarning::SampleRate { requested, granted });
            request.sample_rate = granted;
        }

        match self.pcm.set_buffer_time_near(BUFFER_TIME_US) {
            Ok(us) if us == BUFFER_TIME_US => {}
            Ok(us) => self.warn(NegotiationWarning::BufferTime {
                requested_us: BUFFER_TIME_US,
                granted_us: Some(us),
            }),
            Err(_) => self.warn(NegotiationWarning::BufferTime {
                requested_us: BUFFER_TIME_US,
                granted_us: None,
            }),
        }

        match self.pcm.set_periods_near(PERIOD_COUNT) {
            Ok(n) if n == PERIOD_COUNT => {}
            Ok(n) => self.warn(NegotiationWarning::Periods {
                requested: PERIOD_COUNT,
                granted: Some(n),
            }),
            Err(_) => self.warn(NegotiationWarning::Periods {
                requested: PERIOD_COUNT,
                granted: None,
            }),
        }
        Ok(())
    }

    /// Push the resolved map, then reconcile with whatever the device reports.
    fn apply_channel_map(
        &mut self,
        request: &mut DeviceConfig,
        hw_map: Option<ChannelLayout>,
    ) -> ChannelMapSelection {
        let mut hw_positions = None;

        if let Some(layout) = hw_map.filter(|l| l.is_valid()) {
            let positions = positions_from_layout(&layout);
            debug!(map = %describe_positions(&positions), "trying to set channel map");
            match self.pcm.set_chmap(&positions) {
                Ok(()) => hw_positions = Some(positions),
                Err(PcmError::Unsupported) => {
                    self.warn(NegotiationWarning::ChannelMapUnsupported)
                }
                Err(e) => self.warn(NegotiationWarning::ChannelMapRejected(e)),
            }
        }

        if let Some(reported) = self.pcm.get_chmap() {
            debug!(map = %describe_positions(&reported), "channel map reported by device");
            match layout_from_positions(&reported) {
                Some(layout) if layout == request.channels => {
                    debug!("which is what we requested");
                }
                Some(layout) if layout.len() == request.channels.len() => {
                    debug!(layout = %layout, "using the device channel map");
                    request.channels = layout;
                    if hw_positions.is_some() {
                        hw_positions = Some(reported);
                    }
                }
                Some(layout) => {
                    self.warn(NegotiationWarning::ChannelMapConflict { reported: layout })
                }
                None => self.warn(NegotiationWarning::UnknownChannelMap),
            }
        }

        ChannelMapSelection {
            layout: request.channels.clone(),
            hw_positions,
        }
    }
}
