use super::{ChannelLayout, Speaker};
use crate::hal::HwChannelPos;

/// Hardware position ↔ speaker. MONO is last so the reverse lookup of
/// front-center yields FC.
const POSITION_TABLE: &[(HwChannelPos, Speaker)] = &[
    (HwChannelPos::FL, Speaker::FrontLeft),
    (HwChannelPos::FR, Speaker::FrontRight),
    (HwChannelPos::RL, Speaker::BackLeft),
    (HwChannelPos::RR, Speaker::BackRight),
    (HwChannelPos::FC, Speaker::FrontCenter),
    (HwChannelPos::LFE, Speaker::LowFrequency),
    (HwChannelPos::SL, Speaker::SideLeft),
    (HwChannelPos::SR, Speaker::SideRight),
    (HwChannelPos::RC, Speaker::BackCenter),
    (HwChannelPos::FLC, Speaker::FrontLeftCenter),
    (HwChannelPos::FRC, Speaker::FrontRightCenter),
    (HwChannelPos::FLW, Speaker::WideLeft),
    (HwChannelPos::FRW, Speaker::WideRight),
    (HwChannelPos::TC, Speaker::TopCenter),
    (HwChannelPos::TFL, Speaker::TopFrontLeft),
    (HwChannelPos::TFR, Speaker::TopFrontRight),
    (HwChannelPos::TFC, Speaker::TopFrontCenter),
    (HwChannelPos::TRL, Speaker::TopBackLeft),
    (HwChannelPos::TRR, Speaker::TopBackRight),
    (HwChannelPos::TRC, Speaker::TopBackCenter),
    (HwChannelPos::MONO, Speaker::FrontCenter),
];

pub fn speaker_for(pos: HwChannelPos) -> Option<Speaker> {
    POSITION_TABLE
        .iter()
        .find(|(p, _)| *p == pos)
        .map(|(_, speaker)| *speaker)
}

pub fn position_for(speaker: Speaker) -> HwChannelPos {
    POSITION_TABLE
        .iter()
        .find(|(_, s)| *s == speaker)
        .map(|(pos, _)| *pos)
        .unwrap_or(HwChannelPos::UNKNOWN)
}

/// Translate a hardware map; `None` if any position has no speaker or the
/// result is not a valid layout.
pub fn layout_from_positions(positions: &[HwChannelPos]) -> Option<ChannelLayout> {
    let speakers = positions
        .iter()
        .map(|pos| speaker_for(*pos))
        .collect::<Option<Vec<_>>>()?;
    let layout = ChannelLayout::new(speakers);
    layout.is_valid().then_some(layout)
}

pub fn positions_from_layout(layout: &ChannelLayout) -> Vec<HwChannelPos> {
    layout.speakers().iter().map(|s| position_for(*s)).collect()
}

/// Render a hardware map for log output, e.g. "FL FR 99"
pub fn describe_positions(positions: &[HwChannelPos]) -> String {
    positions
        .iter()
        .map(|pos| match speaker_for(*pos) {
            Some(speaker) if *pos != HwChannelPos::MONO => speaker.name().to_uppercase(),
            Some(_) => "MONO".to_string(),
            None => pos.0.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
