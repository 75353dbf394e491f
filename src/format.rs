use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chmap::ChannelLayout;
use crate::hal::PcmFormat;

/// Sample formats the engine can hand to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    U8,
    S8,
    U16,
    S16,
    U24, // packed, 3 bytes
    S24,
    U32,
    S32,
    Float,
    Double,
    // IEC 61937 passthrough
    SpdifAc3,
    SpdifEac3,
    SpdifDts,
    SpdifDtsHd,
    SpdifTrueHd,
    SpdifAac,
    SpdifMp3,
}

impl SampleFormat {
    pub fn is_passthrough(self) -> bool {
        matches!(
            self,
            SampleFormat::SpdifAc3
                | SampleFormat::SpdifEac3
                | SampleFormat::SpdifDts
                | SampleFormat::SpdifDtsHd
                | SampleFormat::SpdifTrueHd
                | SampleFormat::SpdifAac
                | SampleFormat::SpdifMp3
        )
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::S8 => 1,
            SampleFormat::U16 | SampleFormat::S16 => 2,
            SampleFormat::U24 | SampleFormat::S24 => 3,
            SampleFormat::U32 | SampleFormat::S32 | SampleFormat::Float => 4,
            SampleFormat::Double => 8,
            _ => 2, // passthrough bursts travel in 16-bit words
        }
    }

    /// Write digital silence for this format into `buf`
    pub fn fill_silence(self, buf: &mut [u8]) {
        let midpoint: &[u8] = match self {
            SampleFormat::U8 => &[0x80],
            SampleFormat::U16 => &[0x00, 0x80],
            SampleFormat::U24 => &[0x00, 0x00, 0x80],
            SampleFormat::U32 => &[0x00, 0x00, 0x00, 0x80],
            _ => {
                buf.fill(0);
                return;
            }
        };

        let mut pattern = midpoint.to_vec();
        if cfg!(target_endian = "big") {
            pattern.reverse();
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = pattern[i % pattern.len()];
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S8 => "s8",
            SampleFormat::U16 => "u16",
            SampleFormat::S16 => "s16",
            SampleFormat::U24 => "u24",
            SampleFormat::S24 => "s24",
            SampleFormat::U32 => "u32",
            SampleFormat::S32 => "s32",
            SampleFormat::Float => "float",
            SampleFormat::Double => "double",
            SampleFormat::SpdifAc3 => "spdif-ac3",
            SampleFormat::SpdifEac3 => "spdif-eac3",
            SampleFormat::SpdifDts => "spdif-dts",
            SampleFormat::SpdifDtsHd => "spdif-dtshd",
            SampleFormat::SpdifTrueHd => "spdif-truehd",
            SampleFormat::SpdifAac => "spdif-aac",
            SampleFormat::SpdifMp3 => "spdif-mp3",
        };
        f.write_str(name)
    }
}

/// Engine format ↔ device format
const NATIVE_FORMATS: &[(SampleFormat, PcmFormat)] = &[
    (SampleFormat::S8, PcmFormat::S8),
    (SampleFormat::U8, PcmFormat::U8),
    (SampleFormat::U16, PcmFormat::U16),
    (SampleFormat::S16, PcmFormat::S16),
    (SampleFormat::U32, PcmFormat::U32),
    (SampleFormat::S32, PcmFormat::S32),
    (SampleFormat::U24, PcmFormat::U24Packed),
    (SampleFormat::S24, PcmFormat::S24Packed),
    (SampleFormat::Float, PcmFormat::Float),
];

pub fn to_native(format: SampleFormat) -> Option<PcmFormat> {
    NATIVE_FORMATS
        .iter()
        .find(|(sample, _)| *sample == format)
        .map(|(_, native)| *native)
}

pub fn from_native(format: PcmFormat) -> Option<SampleFormat> {
    NATIVE_FORMATS
        .iter()
        .find(|(_, native)| *native == format)
        .map(|(sample, _)| *sample)
}

/// Device container for a passthrough stream
pub fn passthrough_container(format: SampleFormat) -> PcmFormat {
    match format {
        SampleFormat::SpdifMp3 => PcmFormat::Mpeg,
        _ => PcmFormat::S16,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryLayout {
    Interleaved,
    Planar,
}

/// Stream format requested by the engine; updated in place by negotiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub format: SampleFormat,
    pub layout: MemoryLayout,
    pub channels: ChannelLayout,
    pub sample_rate: u32,
}

impl DeviceConfig {
    pub fn new(format: SampleFormat, channels: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            format,
            layout: MemoryLayout::Interleaved,
            channels,
            sample_rate,
        }
    }

    pub fn planar(mut self) -> Self {
        self.layout = MemoryLayout::Planar;
        self
    }

    pub fn is_planar(&self) -> bool {
        self.layout == MemoryLayout::Planar
    }

    /// Number of buffers one write carries
    pub fn plane_count(&self) -> usize {
        if self.is_planar() {
            self.channels.len()
        } else {
            1
        }
    }

    /// Bytes one frame occupies in each plane
    pub fn plane_stride(&self) -> usize {
        if self.is_planar() {
            self.format.bytes_per_sample()
        } else {
            self.format.bytes_per_sample() * self.channels.len()
        }
    }
}
