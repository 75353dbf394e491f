//! Speaker layouts and the tables that tie them to device conventions.

pub mod catalog;
pub mod positions;
pub mod select;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use catalog::{select_device, CatalogMatch, DEVICE_CHANNEL_LAYOUTS};
pub use select::{ClosestLayout, LayoutSelector};

/// Most channels a layout may carry
pub const MAX_CHANNELS: usize = 8;

/// Abstract speaker position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Speaker {
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    BackLeft,
    BackRight,
    FrontLeftCenter,
    FrontRightCenter,
    BackCenter,
    SideLeft,
    SideRight,
    TopCenter,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopBackLeft,
    TopBackCenter,
    TopBackRight,
    WideLeft,
    WideRight,
}

const SPEAKER_NAMES: &[(Speaker, &str)] = &[
    (Speaker::FrontLeft, "fl"),
    (Speaker::FrontRight, "fr"),
    (Speaker::FrontCenter, "fc"),
    (Speaker::LowFrequency, "lfe"),
    (Speaker::BackLeft, "bl"),
    (Speaker::BackRight, "br"),
    (Speaker::FrontLeftCenter, "flc"),
    (Speaker::FrontRightCenter, "frc"),
    (Speaker::BackCenter, "bc"),
    (Speaker::SideLeft, "sl"),
    (Speaker::SideRight, "sr"),
    (Speaker::TopCenter, "tc"),
    (Speaker::TopFrontLeft, "tfl"),
    (Speaker::TopFrontCenter, "tfc"),
    (Speaker::TopFrontRight, "tfr"),
    (Speaker::TopBackLeft, "tbl"),
    (Speaker::TopBackCenter, "tbc"),
    (Speaker::TopBackRight, "tbr"),
    (Speaker::WideLeft, "wl"),
    (Speaker::WideRight, "wr"),
];

impl Speaker {
    pub fn name(self) -> &'static str {
        SPEAKER_NAMES
            .iter()
            .find(|(speaker, _)| *speaker == self)
            .map(|(_, name)| *name)
            .unwrap_or("?")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SPEAKER_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(speaker, _)| *speaker)
    }
}

/// Ordered list of speakers, one per channel
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelLayout {
    speakers: Vec<Speaker>,
}

impl ChannelLayout {
    pub fn new(speakers: Vec<Speaker>) -> Self {
        Self { speakers }
    }

    /// Parse a dash-separated speaker list such as "fl-fr-lfe"
    pub fn parse(s: &str) -> Option<Self> {
        s.split('-')
            .map(Speaker::from_name)
            .collect::<Option<Vec<_>>>()
            .map(Self::new)
    }

    pub fn mono() -> Self {
        Self::new(vec![Speaker::FrontCenter])
    }

    pub fn stereo() -> Self {
        Self::new(vec![Speaker::FrontLeft, Speaker::FrontRight])
    }

    pub fn surround51() -> Self {
        use Speaker::*;
        Self::new(vec![FrontLeft, FrontRight, BackLeft, BackRight, FrontCenter, LowFrequency])
    }

    /// Default layout for a bare channel count, in ALSA channel order
    pub fn from_channel_count(count: usize) -> Option<Self> {
        let spec = match count {
            1 => "fc",
            2 => "fl-fr",
            3 => "fl-fr-lfe",
            4 => "fl-fr-bl-br",
            5 => "fl-fr-bl-br-fc",
            6 => "fl-fr-bl-br-fc-lfe",
            7 => "fl-fr-fc-lfe-bc-sl-sr",
            8 => "fl-fr-bl-br-fc-lfe-sl-sr",
            _ => return None,
        };
        Self::parse(spec)
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    pub fn contains(&self, speaker: Speaker) -> bool {
        self.speakers.contains(&speaker)
    }

    /// Non-empty, within `MAX_CHANNELS`, no speaker twice
    pub fn is_valid(&self) -> bool {
        if self.is_empty() || self.len() > MAX_CHANNELS {
            return false;
        }
        self.speakers
            .iter()
            .enumerate()
            .all(|(i, speaker)| !self.speakers[..i].contains(speaker))
    }

    /// Same speakers regardless of order
    pub fn same_speakers(&self, other: &ChannelLayout) -> bool {
        self.len() == other.len() && self.speakers.iter().all(|s| other.contains(*s))
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("empty");
        }
        let names: Vec<&str> = self.speakers.iter().map(|s| s.name()).collect();
        f.write_str(&names.join("-"))
    }
}
