use audioout::hal::mock::{SimulatedControl, SimulatedDriver, SimulatedHardware, SimulatedProbe};
use audioout::hal::MixerChannel;
use audioout::{
    AoConfig, AoError, AudioOutput, ChannelLayout, DeviceConfig, MixerControl, SampleFormat,
    SessionState, Volume,
};
use std::sync::Arc;

fn mixer_with(control: SimulatedControl, options: AoConfig) -> (MixerControl, SimulatedProbe) {
    let driver = SimulatedDriver::new(SimulatedHardware {
        mixer_controls: vec![control],
        ..Default::default()
    });
    let probe = driver.probe();
    (MixerControl::new(Arc::new(driver), &options), probe)
}

fn master_mixer(min: i64, max: i64) -> (MixerControl, SimulatedProbe) {
    mixer_with(SimulatedControl::new("Master", 0, min, max), AoConfig::default())
}

#[test]
fn test_full_volume_reads_as_hundred() {
    let (mixer, _probe) = master_mixer(0, 87);

    let volume = mixer.volume().unwrap();
    assert!((volume.left - 100.0).abs() < 0.01);
    assert!((volume.right - 100.0).abs() < 0.01);
}

#[test]
fn test_volume_maps_linearly_onto_native_range() {
    let (mixer, probe) = master_mixer(-10, 90);

    mixer.set_volume(Volume::new(30.0, 75.0)).unwrap();

    assert_eq!(probe.control_volume("Master", 0, MixerChannel::FrontLeft), Some(20));
    assert_eq!(probe.control_volume("Master", 0, MixerChannel::FrontRight), Some(65));
    assert_eq!(mixer.volume().unwrap(), Volume::new(30.0, 75.0));
}

#[test]
fn test_volume_clamped_to_percent_range() {
    let (mixer, probe) = master_mixer(0, 100);

    mixer.set_volume(Volume::new(150.0, -5.0)).unwrap();

    assert_eq!(probe.control_volume("Master", 0, MixerChannel::FrontLeft), Some(100));
    assert_eq!(probe.control_volume("Master", 0, MixerChannel::FrontRight), Some(0));
}

#[test]
fn test_configured_control_is_addressed() {
    let options = AoConfig {
        mixer_name: "PCM".into(),
        mixer_index: 1,
        ..Default::default()
    };
    let (mixer, probe) = mixer_with(SimulatedControl::new("PCM", 1, 0, 100), options);

    mixer.set_volume(Volume::uniform(40.0)).unwrap();

    assert_eq!(probe.control_volume("PCM", 1, MixerChannel::FrontLeft), Some(40));
    assert_eq!(probe.mixer_opens(), 1);
}

#[test]
fn test_missing_control() {
    let options = AoConfig {
        mixer_name: "Headphone".into(),
        ..Default::default()
    };
    let (mixer, _probe) = mixer_with(SimulatedControl::new("Master", 0, 0, 100), options);

    let err = mixer.volume().unwrap_err();
    assert!(matches!(
        err,
        AoError::ControlNotFound { ref name, index: 0 } if name == "Headphone"
    ));
}

#[test]
fn test_mixer_open_failure() {
    let driver = SimulatedDriver::new(SimulatedHardware {
        rejected_names: vec!["hw:9".into()],
        ..Default::default()
    });
    let options = AoConfig {
        mixer_device: "hw:9".into(),
        ..Default::default()
    };
    let mixer = MixerControl::new(Arc::new(driver), &options);

    assert!(matches!(
        mixer.mute(),
        Err(AoError::MixerOpen { ref device, .. }) if device == "hw:9"
    ));
}

#[test]
fn test_empty_volume_range() {
    let (mixer, _probe) = master_mixer(5, 5);
    assert!(matches!(
        mixer.volume(),
        Err(AoError::VolumeRange { min: 5, max: 5 })
    ));
}

#[test]
fn test_mute_separate_channels() {
    let (mixer, probe) = master_mixer(0, 100);

    mixer.set_mute(true).unwrap();
    assert!(mixer.mute().unwrap());
    assert_eq!(probe.control_switch("Master", 0, MixerChannel::FrontLeft), Some(false));
    assert_eq!(probe.control_switch("Master", 0, MixerChannel::FrontRight), Some(false));

    // one audible channel means not muted
    probe.with_hardware(|hw| hw.mixer_controls[0].right_on = true);
    assert!(!mixer.mute().unwrap());

    mixer.set_mute(false).unwrap();
    assert_eq!(probe.control_switch("Master", 0, MixerChannel::FrontLeft), Some(true));
}

#[test]
fn test_mute_joined_switch() {
    let mut control = SimulatedControl::new("Master", 0, 0, 100);
    control.switch_joined = true;
    let (mixer, probe) = mixer_with(control, AoConfig::default());

    mixer.set_mute(true).unwrap();

    assert!(mixer.mute().unwrap());
    assert_eq!(probe.control_switch("Master", 0, MixerChannel::FrontRight), Some(false));
}

#[test]
fn test_mute_without_switch() {
    let mut control = SimulatedControl::new("Master", 0, 0, 100);
    control.has_switch = false;
    let (mixer, _probe) = mixer_with(control, AoConfig::default());

    assert!(matches!(
        mixer.set_mute(true),
        Err(AoError::NoPlaybackSwitch(ref name)) if name == "Master"
    ));
}

#[test]
fn test_mixer_failure_leaves_session_playing() {
    let driver = SimulatedDriver::default();
    let options = AoConfig {
        mixer_name: "Missing".into(),
        ..Default::default()
    };
    let mut output = AudioOutput::new(Arc::new(driver), options);
    let request = DeviceConfig::new(SampleFormat::S16, ChannelLayout::stereo(), 48000);
    output.open(request, None).unwrap();

    let mixer = output.mixer().unwrap();
    assert!(mixer.set_volume(Volume::uniform(50.0)).is_err());
    assert_eq!(output.state(), SessionState::Running);
}

#[test]
fn test_no_mixer_for_passthrough() {
    let driver = SimulatedDriver::default();
    let mut output = AudioOutput::new(Arc::new(driver), AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::SpdifAc3, ChannelLayout::stereo(), 48000);
    output.open(request, None).unwrap();

    assert!(matches!(output.mixer(), Err(AoError::MixerUnavailable)));
}
