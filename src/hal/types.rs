use serde::{Deserialize, Serialize};

/// Sample formats understood by the device layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PcmFormat {
    S8,
    U8,
    S16,
    U16,
    S24Packed, // 3 bytes per sample
    U24Packed,
    S32,
    U32,
    Float,
    Mpeg, // compressed container for MP3 passthrough
}

impl PcmFormat {
    /// Physical width of one sample in bytes
    pub fn sample_bytes(self) -> usize {
        match self {
            PcmFormat::S8 | PcmFormat::U8 => 1,
            PcmFormat::S16 | PcmFormat::U16 | PcmFormat::Mpeg => 2,
            PcmFormat::S24Packed | PcmFormat::U24Packed => 3,
            PcmFormat::S32 | PcmFormat::U32 | PcmFormat::Float => 4,
        }
    }
}

/// Transfer access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcmAccess {
    Interleaved,
    NonInterleaved,
}

/// Transport state as reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcmState {
    #[default]
    Open,
    Setup,
    Prepared,
    Running,
    XRun,
    Draining,
    Paused,
    Suspended,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    Blocking,
    NonBlocking,
}

/// Hardware channel position code (ALSA `SND_CHMAP_*` numbering).
///
/// Devices may report codes this crate has no name for, so the type is an
/// open newtype rather than an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HwChannelPos(pub u32);

impl HwChannelPos {
    pub const UNKNOWN: Self = Self(0);
    pub const NA: Self = Self(1);
    pub const MONO: Self = Self(2);
    pub const FL: Self = Self(3);
    pub const FR: Self = Self(4);
    pub const RL: Self = Self(5);
    pub const RR: Self = Self(6);
    pub const FC: Self = Self(7);
    pub const LFE: Self = Self(8);
    pub const SL: Self = Self(9);
    pub const SR: Self = Self(10);
    pub const RC: Self = Self(11);
    pub const FLC: Self = Self(12);
    pub const FRC: Self = Self(13);
    pub const RLC: Self = Self(14);
    pub const RRC: Self = Self(15);
    pub const FLW: Self = Self(16);
    pub const FRW: Self = Self(17);
    pub const FLH: Self = Self(18);
    pub const FCH: Self = Self(19);
    pub const FRH: Self = Self(20);
    pub const TC: Self = Self(21);
    pub const TFL: Self = Self(22);
    pub const TFR: Self = Self(23);
    pub const TFC: Self = Self(24);
    pub const TRL: Self = Self(25);
    pub const TRR: Self = Self(26);
    pub const TRC: Self = Self(27);
}

/// How a device treats the channel maps it enumerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChmapType {
    None,
    Fixed,
    Variable,
    Paired,
}

impl ChmapType {
    pub fn name(self) -> &'static str {
        match self {
            ChmapType::None => "none",
            ChmapType::Fixed => "fixed",
            ChmapType::Variable => "variable",
            ChmapType::Paired => "paired",
        }
    }
}

/// One entry of a device's channel map enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChmapQuery {
    pub kind: ChmapType,
    pub positions: Vec<HwChannelPos>,
}

/// Geometry read back after hardware parameters are installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwSetup {
    pub buffer_size: usize,
    pub period_size: usize,
    pub can_pause: bool,
}

/// Software parameters installed after the hardware parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwParams {
    pub start_threshold: u64,
    pub stop_threshold: u64,
    pub silence_size: u64,
}

/// Result of waiting on the device's readiness primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Writable,
    Timeout,
    Error,
}

/// Raw enumeration entry as produced by a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHint {
    pub name: Option<String>,
    pub description: Option<String>,
    /// "Output", "Input" or `None` for bidirectional endpoints
    pub io: Option<String>,
}

/// Output endpoint offered to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixerChannel {
    FrontLeft,
    FrontRight,
}

/// Simple mixer control address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlId {
    pub name: String,
    pub index: u32,
}

impl ControlId {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}
