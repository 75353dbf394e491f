use thiserror::Error;

use crate::format::SampleFormat;
use crate::hal::PcmError;
use crate::output::SessionState;

pub type Result<T> = std::result::Result<T, AoError>;

#[derive(Debug, Error)]
pub enum AoError {
    #[error("audio output is not open")]
    NotOpen,

    #[error("cannot {op} while {state:?}")]
    InvalidState { op: &'static str, state: SessionState },

    #[error("playback open error on '{device}': {source}")]
    Open {
        device: String,
        #[source]
        source: PcmError,
    },

    /// A hardware parameter the stream cannot do without was refused
    #[error("{context}: {source}")]
    Negotiation {
        context: &'static str,
        #[source]
        source: PcmError,
    },

    #[error("passthrough format {format} rejected by device: {source}")]
    PassthroughRejected {
        format: SampleFormat,
        #[source]
        source: PcmError,
    },

    #[error("too many audio channels ({0})")]
    TooManyChannels(u32),

    #[error("no channel layout for {0} channels")]
    NoChannelLayout(u32),

    #[error("unusable buffer geometry (buffer {buffer_size}, period {period_size})")]
    InvalidGeometry {
        buffer_size: usize,
        period_size: usize,
    },

    #[error("{op} error: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: PcmError,
    },

    /// Re-preparing the stream after a write error failed
    #[error("pcm prepare error: {0}")]
    Recovery(#[source] PcmError),

    #[error("expected {expected} audio planes, got {actual}")]
    PlaneCount { expected: usize, actual: usize },

    #[error("audio buffer holds {actual} bytes, {expected} needed")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("unsupported poll descriptor count {0}")]
    PollDescriptors(usize),

    #[error("device reported an error while waiting")]
    PollError,

    #[error("mixer open error on '{device}': {source}")]
    MixerOpen {
        device: String,
        #[source]
        source: PcmError,
    },

    #[error("unable to find simple control '{name}',{index}")]
    ControlNotFound { name: String, index: u32 },

    #[error("control '{0}' has no playback switch")]
    NoPlaybackSwitch(String),

    #[error("invalid volume range {min}..{max}")]
    VolumeRange { min: i64, max: i64 },

    #[error("mixer {op} error: {source}")]
    Mixer {
        op: &'static str,
        #[source]
        source: PcmError,
    },

    #[error("mixer control is unavailable for passthrough output")]
    MixerUnavailable,
}

impl AoError {
    pub(crate) fn device(op: &'static str) -> impl FnOnce(PcmError) -> AoError {
        move |source| AoError::Device { op, source }
    }

    pub(crate) fn negotiation(context: &'static str) -> impl FnOnce(PcmError) -> AoError {
        move |source| AoError::Negotiation { context, source }
    }
}
