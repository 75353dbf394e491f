use audioout::chmap::catalog::DEFAULT_DEVICE;
use audioout::chmap::{select_device, ChannelLayout, ClosestLayout, LayoutSelector};
use audioout::format::DeviceConfig;
use audioout::output::device_name::resolve_device;
use audioout::{AoConfig, SampleFormat};

fn layout(spec: &str) -> ChannelLayout {
    ChannelLayout::parse(spec).unwrap()
}

#[test]
fn test_speaker_order_does_not_change_device() {
    let forward = select_device(&ClosestLayout, &layout("fl-fr"));
    let reversed = select_device(&ClosestLayout, &layout("fr-fl"));

    assert_eq!(forward.device, DEFAULT_DEVICE);
    assert_eq!(forward, reversed);
    assert_eq!(reversed.layout, layout("fl-fr"));
}

#[test]
fn test_surround_layouts_map_to_named_devices() {
    assert_eq!(
        select_device(&ClosestLayout, &ChannelLayout::surround51()).device,
        "surround51"
    );
    assert_eq!(
        select_device(&ClosestLayout, &layout("fl-fr-bl-br-fc-lfe-sl-sr")).device,
        "surround71"
    );
    assert_eq!(select_device(&ClosestLayout, &layout("sl-sr")).device, "side");
}

#[test]
fn test_mono_uses_default_device() {
    let found = select_device(&ClosestLayout, &ChannelLayout::mono());
    assert_eq!(found.device, DEFAULT_DEVICE);
    assert_eq!(found.layout, ChannelLayout::mono());
}

#[test]
fn test_inexact_request_takes_closest_superset() {
    let found = select_device(&ClosestLayout, &layout("fl-fr-fc"));
    assert_eq!(found.device, "surround50");
}

struct NoChoice;

impl LayoutSelector for NoChoice {
    fn select(&self, _: &[ChannelLayout], _: &ChannelLayout) -> Option<ChannelLayout> {
        None
    }
}

#[test]
fn test_no_selection_keeps_request_on_default() {
    let requested = layout("fl-fr-bl-br-fc-lfe-sl-sr");
    let found = select_device(&NoChoice, &requested);

    assert_eq!(found.device, DEFAULT_DEVICE);
    assert_eq!(found.layout, requested);
}

#[test]
fn test_computed_device_names() {
    let options = AoConfig::default();

    let stereo = DeviceConfig::new(SampleFormat::S16, ChannelLayout::stereo(), 48000);
    assert_eq!(resolve_device(&options, &stereo, None, &ClosestLayout).name, "default");

    let surround = DeviceConfig::new(SampleFormat::S16, ChannelLayout::surround51(), 48000);
    let resolved = resolve_device(&options, &surround, None, &ClosestLayout);
    assert_eq!(resolved.name, "plug:surround51");
    assert_eq!(resolved.implied_layout, ChannelLayout::surround51());

    let spdif = DeviceConfig::new(SampleFormat::SpdifEac3, ChannelLayout::stereo(), 48000);
    assert_eq!(resolve_device(&options, &spdif, None, &ClosestLayout).name, "iec958");
}
