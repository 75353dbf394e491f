use audioout::hal::mock::{SimulatedDriver, SimulatedHardware};
use audioout::hal::{
    ChmapQuery, ChmapType, HwChannelPos, OpenMode, PcmAccess, PcmError, PcmFormat,
};
use audioout::output::NegotiationWarning;
use audioout::{
    AoConfig, AoError, AudioOutput, ChannelLayout, DeviceConfig, MemoryLayout, SampleFormat,
    SessionState,
};
use std::sync::Arc;

fn setup(
    hardware: SimulatedHardware,
    options: AoConfig,
) -> (AudioOutput, audioout::hal::mock::SimulatedProbe) {
    let driver = SimulatedDriver::new(hardware);
    let probe = driver.probe();
    (AudioOutput::new(Arc::new(driver), options), probe)
}

fn stereo_s16() -> DeviceConfig {
    DeviceConfig::new(SampleFormat::S16, ChannelLayout::stereo(), 48000)
}

#[test]
fn test_open_stereo_on_matching_device() {
    let (mut output, probe) = setup(SimulatedHardware::default(), AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(granted, stereo_s16());
    assert_eq!(output.state(), SessionState::Running);
    assert_eq!(output.device_name(), Some("default"));
    assert!(output.warnings().is_empty());
    assert!(output.can_pause());

    let geometry = output.geometry().unwrap();
    assert_eq!(geometry.buffer_size, 12000);
    assert_eq!(geometry.period_size, 750);
    assert_eq!(geometry.outburst(), 750);

    assert_eq!(probe.format(), Some(PcmFormat::S16));
    assert_eq!(probe.access(), Some(PcmAccess::Interleaved));
    assert_eq!(probe.resample(), Some(false));
    assert!(!probe.nonblock());
}

#[test]
fn test_float_surround_downgrades_on_stereo_device() {
    let (mut output, _probe) = setup(SimulatedHardware::default(), AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::Float, ChannelLayout::surround51(), 48000);

    let granted = output.open(request, None).unwrap().clone();

    assert_eq!(granted.format, SampleFormat::S16);
    assert_eq!(granted.channels, ChannelLayout::stereo());
    assert_eq!(granted.sample_rate, 48000);
    assert_eq!(output.device_name(), Some("plug:surround51"));
    assert!(output.warnings().contains(&NegotiationWarning::ChannelCount {
        requested: 6,
        granted: 2
    }));
    assert!(output.warnings().contains(&NegotiationWarning::FormatFallback {
        requested: SampleFormat::Float,
        granted: SampleFormat::S16
    }));
}

#[test]
fn test_format_without_device_equivalent_falls_back() {
    let (mut output, probe) = setup(SimulatedHardware::default(), AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::Double, ChannelLayout::stereo(), 48000);

    let granted = output.open(request, None).unwrap().clone();

    assert_eq!(granted.format, SampleFormat::S16);
    assert_eq!(probe.format(), Some(PcmFormat::S16));
}

#[test]
fn test_passthrough_rejection_is_fatal() {
    let hardware = SimulatedHardware {
        formats: vec![PcmFormat::S32],
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::SpdifAc3, ChannelLayout::stereo(), 48000);

    let err = output.open(request, None).unwrap_err();

    assert!(matches!(
        err,
        AoError::PassthroughRejected {
            format: SampleFormat::SpdifAc3,
            ..
        }
    ));
    assert_eq!(output.state(), SessionState::Error);
    assert!(probe.is_closed());

    // only close leaves the error state
    assert!(matches!(
        output.open(stereo_s16(), None),
        Err(AoError::InvalidState { .. })
    ));
    output.close();
    assert_eq!(output.state(), SessionState::Closed);
    assert!(output.open(stereo_s16(), None).is_err());
}

#[test]
fn test_passthrough_opens_iec958_with_channel_status() {
    let (mut output, probe) = setup(SimulatedHardware::default(), AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::SpdifAc3, ChannelLayout::stereo(), 48000);

    output.open(request, None).unwrap();

    let attempts = probe.open_attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].0, "iec958:AES0=6,AES1=130,AES2=0,AES3=2");
    assert_eq!(output.device_name(), Some("iec958"));
    assert_eq!(output.config().unwrap().format, SampleFormat::SpdifAc3);
}

#[test]
fn test_passthrough_falls_back_to_bare_device() {
    let hardware = SimulatedHardware {
        rejected_names: vec!["AES0".into()],
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::SpdifDts, ChannelLayout::stereo(), 44100);

    let _ = output.open(request, None);

    let attempts = probe.open_attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].0, "iec958:AES0=6,AES1=130,AES2=0,AES3=0");
    assert_eq!(attempts[1].0, "iec958");
}

#[test]
fn test_passthrough_forces_interleaved() {
    let options = AoConfig {
        non_interleaved: true,
        ..Default::default()
    };
    let (mut output, _probe) = setup(SimulatedHardware::default(), options);
    let request =
        DeviceConfig::new(SampleFormat::SpdifAc3, ChannelLayout::stereo(), 48000).planar();

    let granted = output.open(request, None).unwrap();
    assert_eq!(granted.layout, MemoryLayout::Interleaved);
}

#[test]
fn test_planar_request_interleaved_by_default() {
    let (mut output, probe) = setup(SimulatedHardware::default(), AoConfig::default());

    let granted = output.open(stereo_s16().planar(), None).unwrap().clone();

    assert_eq!(granted.layout, MemoryLayout::Interleaved);
    assert!(!output.warnings().contains(&NegotiationWarning::PlanarUnsupported));
    assert_eq!(probe.access(), Some(PcmAccess::Interleaved));
}

#[test]
fn test_planar_falls_back_when_device_refuses() {
    let options = AoConfig {
        non_interleaved: true,
        ..Default::default()
    };
    let (mut output, probe) = setup(SimulatedHardware::default(), options);

    let granted = output.open(stereo_s16().planar(), None).unwrap().clone();

    assert_eq!(granted.layout, MemoryLayout::Interleaved);
    assert!(output.warnings().contains(&NegotiationWarning::PlanarUnsupported));
    assert_eq!(probe.access(), Some(PcmAccess::Interleaved));
}

#[test]
fn test_planar_kept_when_supported() {
    let hardware = SimulatedHardware {
        access: vec![PcmAccess::Interleaved, PcmAccess::NonInterleaved],
        ..Default::default()
    };
    let options = AoConfig {
        non_interleaved: true,
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, options);

    let granted = output.open(stereo_s16().planar(), None).unwrap().clone();

    assert_eq!(granted.layout, MemoryLayout::Planar);
    assert_eq!(probe.access(), Some(PcmAccess::NonInterleaved));
}

#[test]
fn test_busy_nonblocking_open_retries_blocking() {
    let hardware = SimulatedHardware {
        busy_when_nonblocking: true,
        ..Default::default()
    };
    let options = AoConfig {
        block: false,
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, options);

    output.open(stereo_s16(), None).unwrap();

    assert_eq!(
        probe.open_attempts(),
        vec![
            ("default".to_string(), OpenMode::NonBlocking),
            ("default".to_string(), OpenMode::Blocking),
        ]
    );
}

#[test]
fn test_open_failure_reports_device() {
    let hardware = SimulatedHardware {
        rejected_names: vec!["default".into()],
        ..Default::default()
    };
    let (mut output, _probe) = setup(hardware, AoConfig::default());

    let err = output.open(stereo_s16(), None).unwrap_err();

    assert!(matches!(err, AoError::Open { ref device, .. } if device == "default"));
    assert_eq!(output.state(), SessionState::Error);
}

#[test]
fn test_device_precedence() {
    let options = AoConfig {
        device: "hw:1".into(),
        ..Default::default()
    };
    let (mut output, _probe) = setup(SimulatedHardware::default(), options);

    output.open(stereo_s16(), Some("hw:2")).unwrap();
    assert_eq!(output.device_name(), Some("hw:2"));
    output.close();

    output.open(stereo_s16(), None).unwrap();
    assert_eq!(output.device_name(), Some("hw:1"));
    output.close();

    output.open(stereo_s16(), Some("")).unwrap();
    assert_eq!(output.device_name(), Some("hw:1"));
}

#[test]
fn test_software_parameters() {
    let (mut output, probe) = setup(SimulatedHardware::default(), AoConfig::default());
    output.open(stereo_s16(), None).unwrap();

    let params = probe.sw_params().unwrap();
    assert_eq!(params.start_threshold, 750);
    assert_eq!(params.stop_threshold, 0x4000_0000);
    assert_eq!(params.silence_size, 0x4000_0000);
}

#[test]
fn test_resample_option_leaves_device_resampler_alone() {
    let options = AoConfig {
        resample: true,
        ..Default::default()
    };
    let (mut output, probe) = setup(SimulatedHardware::default(), options);
    output.open(stereo_s16(), None).unwrap();

    assert_eq!(probe.resample(), None);
}

#[test]
fn test_rate_change_is_advisory() {
    let hardware = SimulatedHardware {
        rates: vec![44100],
        ..Default::default()
    };
    let (mut output, _probe) = setup(hardware, AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(granted.sample_rate, 44100);
    assert!(output.warnings().contains(&NegotiationWarning::SampleRate {
        requested: 48000,
        granted: 44100
    }));
}

#[test]
fn test_buffer_time_refusal_is_advisory() {
    let hardware = SimulatedHardware {
        reject_buffer_time: true,
        reject_periods: true,
        ..Default::default()
    };
    let (mut output, _probe) = setup(hardware, AoConfig::default());

    output.open(stereo_s16(), None).unwrap();

    assert!(output.warnings().contains(&NegotiationWarning::BufferTime {
        requested_us: 250_000,
        granted_us: None
    }));
    assert!(output.warnings().contains(&NegotiationWarning::Periods {
        requested: 16,
        granted: None
    }));
    assert_eq!(output.state(), SessionState::Running);
}

#[test]
fn test_too_many_channels_is_fatal() {
    let hardware = SimulatedHardware {
        channel_counts: vec![10],
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());

    let err = output.open(stereo_s16(), None).unwrap_err();

    assert!(matches!(err, AoError::TooManyChannels(10)));
    assert_eq!(output.state(), SessionState::Error);
    assert!(probe.is_closed());
}

fn surround_chmaps() -> Vec<ChmapQuery> {
    vec![
        ChmapQuery {
            kind: ChmapType::Fixed,
            positions: vec![HwChannelPos::FL, HwChannelPos::FR],
        },
        ChmapQuery {
            kind: ChmapType::Variable,
            positions: vec![
                HwChannelPos::FL,
                HwChannelPos::FR,
                HwChannelPos::RL,
                HwChannelPos::RR,
                HwChannelPos::FC,
                HwChannelPos::LFE,
            ],
        },
    ]
}

#[test]
fn test_channel_map_pushed_to_device() {
    let hardware = SimulatedHardware {
        channel_counts: vec![2, 6],
        chmaps: Some(surround_chmaps()),
        accepts_chmap: true,
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::S16, ChannelLayout::surround51(), 48000);

    let granted = output.open(request, None).unwrap().clone();

    assert_eq!(granted.channels, ChannelLayout::surround51());
    let selection = output.channel_map().unwrap();
    assert!(selection.is_explicit());
    assert_eq!(
        probe.chmap(),
        Some(vec![
            HwChannelPos::FL,
            HwChannelPos::FR,
            HwChannelPos::RL,
            HwChannelPos::RR,
            HwChannelPos::FC,
            HwChannelPos::LFE,
        ])
    );
}

#[test]
fn test_channel_map_refusal_is_advisory() {
    let hardware = SimulatedHardware {
        channel_counts: vec![2, 6],
        chmaps: Some(surround_chmaps()),
        accepts_chmap: false,
        ..Default::default()
    };
    let (mut output, _probe) = setup(hardware, AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::S16, ChannelLayout::surround51(), 48000);

    output.open(request, None).unwrap();

    assert!(output
        .warnings()
        .contains(&NegotiationWarning::ChannelMapUnsupported));
    assert!(!output.channel_map().unwrap().is_explicit());
}

#[test]
fn test_channel_downgrade_takes_device_reported_order() {
    let hardware = SimulatedHardware {
        channel_counts: vec![2],
        chmaps: Some(surround_chmaps()),
        accepts_chmap: true,
        default_chmap: Some(vec![HwChannelPos::FR, HwChannelPos::FL]),
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());
    let request = DeviceConfig::new(SampleFormat::S16, ChannelLayout::surround51(), 48000);

    let granted = output.open(request, None).unwrap().clone();

    // the 5.1 map no longer fits and is never pushed
    assert_eq!(probe.chmap(), None);
    assert_eq!(granted.channels, ChannelLayout::parse("fr-fl").unwrap());
    assert!(!output.channel_map().unwrap().is_explicit());
}

fn fixed_map(positions: Vec<HwChannelPos>) -> ChmapQuery {
    ChmapQuery {
        kind: ChmapType::Fixed,
        positions,
    }
}

#[test]
fn test_untranslatable_maps_are_skipped() {
    let hardware = SimulatedHardware {
        chmaps: Some(vec![
            fixed_map(vec![HwChannelPos::FL, HwChannelPos(99)]),
            fixed_map(vec![HwChannelPos::FL, HwChannelPos::FL]),
            fixed_map(vec![HwChannelPos::FR, HwChannelPos::FL]),
        ]),
        accepts_chmap: true,
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(granted.channels, ChannelLayout::parse("fr-fl").unwrap());
    assert_eq!(probe.chmap(), Some(vec![HwChannelPos::FR, HwChannelPos::FL]));
    assert!(output.channel_map().unwrap().is_explicit());
    assert!(output.warnings().is_empty());
}

#[test]
fn test_no_valid_map_falls_back_to_device_name() {
    let hardware = SimulatedHardware {
        chmaps: Some(vec![
            fixed_map(vec![HwChannelPos::NA, HwChannelPos::FR]),
            fixed_map(vec![HwChannelPos::FR, HwChannelPos::FR]),
        ]),
        accepts_chmap: true,
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(output.device_name(), Some("default"));
    assert_eq!(granted.channels, ChannelLayout::stereo());
    assert_eq!(probe.chmap(), None);
    assert!(!output.channel_map().unwrap().is_explicit());
    assert!(output.warnings().is_empty());
}

#[test]
fn test_reported_map_with_other_channel_count() {
    let hardware = SimulatedHardware {
        default_chmap: Some(vec![HwChannelPos::FL, HwChannelPos::FR, HwChannelPos::FC]),
        ..Default::default()
    };
    let (mut output, _probe) = setup(hardware, AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(granted.channels, ChannelLayout::stereo());
    assert_eq!(
        output.warnings(),
        &[NegotiationWarning::ChannelMapConflict {
            reported: ChannelLayout::parse("fl-fr-fc").unwrap()
        }]
    );
}

#[test]
fn test_unknown_reported_map_keeps_layout() {
    let hardware = SimulatedHardware {
        default_chmap: Some(vec![HwChannelPos::FL, HwChannelPos(99)]),
        ..Default::default()
    };
    let (mut output, _probe) = setup(hardware, AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(granted.channels, ChannelLayout::stereo());
    assert_eq!(output.warnings(), &[NegotiationWarning::UnknownChannelMap]);
}

#[test]
fn test_channel_map_push_failure_is_advisory() {
    let hardware = SimulatedHardware {
        chmaps: Some(vec![fixed_map(vec![HwChannelPos::FL, HwChannelPos::FR])]),
        accepts_chmap: true,
        chmap_error: Some(PcmError::Busy),
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(granted.channels, ChannelLayout::stereo());
    assert_eq!(probe.chmap(), None);
    assert_eq!(
        output.warnings(),
        &[NegotiationWarning::ChannelMapRejected(PcmError::Busy)]
    );
    assert!(!output.channel_map().unwrap().is_explicit());
    assert_eq!(output.state(), SessionState::Running);
}

#[test]
fn test_pushed_map_reordered_by_device() {
    let hardware = SimulatedHardware {
        chmaps: Some(vec![fixed_map(vec![HwChannelPos::FL, HwChannelPos::FR])]),
        accepts_chmap: true,
        forced_chmap: Some(vec![HwChannelPos::FR, HwChannelPos::FL]),
        ..Default::default()
    };
    let (mut output, probe) = setup(hardware, AoConfig::default());

    let granted = output.open(stereo_s16(), None).unwrap().clone();

    assert_eq!(probe.chmap(), Some(vec![HwChannelPos::FL, HwChannelPos::FR]));
    assert_eq!(granted.channels, ChannelLayout::parse("fr-fl").unwrap());
    let selection = output.channel_map().unwrap();
    assert_eq!(selection.layout, granted.channels);
    assert_eq!(
        selection.hw_positions,
        Some(vec![HwChannelPos::FR, HwChannelPos::FL])
    );
}

#[test]
fn test_close_is_idempotent() {
    let (mut output, probe) = setup(SimulatedHardware::default(), AoConfig::default());
    output.open(stereo_s16(), None).unwrap();

    output.close();
    output.close();

    assert!(probe.is_closed());
    assert_eq!(output.state(), SessionState::Closed);
    assert!(output.config().is_none());
}
