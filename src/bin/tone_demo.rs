use anyhow::{Context, Result};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use audioout::hal::mock::{SimulatedDriver, SimulatedHardware};
use audioout::hal::{DeviceHint, HardwareDriver};
use audioout::{
    list_devices, AoConfig, AudioOutput, ChannelLayout, DeviceConfig, SampleFormat, Volume,
    WaitOutcome,
};

const TONE_HZ: f64 = 440.0;
const SECONDS: usize = 2;

fn driver() -> Arc<dyn HardwareDriver> {
    #[cfg(feature = "alsa-backend")]
    {
        if std::env::args().any(|a| a == "--alsa") {
            return Arc::new(audioout::hal::drivers::AlsaDriver::new());
        }
    }

    Arc::new(SimulatedDriver::new(SimulatedHardware {
        hints: vec![DeviceHint {
            name: Some("default".into()),
            description: Some("Simulated card\nDefault output".into()),
            io: None,
        }],
        ..Default::default()
    }))
}

/// Interleaved S16 sine, `frames` long, starting at `phase`
fn sine(frames: usize, channels: usize, rate: u32, phase: &mut f64) -> Vec<u8> {
    let step = 2.0 * PI * TONE_HZ / rate as f64;
    let mut out = Vec::with_capacity(frames * channels * 2);
    for _ in 0..frames {
        let sample = ((*phase).sin() * 0.25 * i16::MAX as f64) as i16;
        for _ in 0..channels {
            out.extend_from_slice(&sample.to_ne_bytes());
        }
        *phase = (*phase + step) % (2.0 * PI);
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let options = AoConfig::from_json(serde_json::json!({
        "mixer-name": "Master",
        "block": true
    }))?;
    let driver = driver();

    println!("Output devices ({}):", driver.driver_id());
    for device in list_devices(driver.as_ref()).await? {
        println!("  {:<24} {}", device.id, device.description);
    }

    let mut output = AudioOutput::new(driver.clone(), options);
    let request = DeviceConfig::new(SampleFormat::S16, ChannelLayout::stereo(), 48000);
    let granted = output
        .open(request, None)
        .context("failed to open audio output")?
        .clone();
    println!(
        "Playing {} Hz on '{}' as {} {} @ {} Hz",
        TONE_HZ,
        output.device_name().unwrap_or("?"),
        granted.format,
        granted.channels,
        granted.sample_rate
    );
    for warning in output.warnings() {
        println!("  note: {}", warning);
    }

    if let Ok(mixer) = output.mixer() {
        match mixer.volume() {
            Ok(v) => println!("Mixer volume {:.0}/{:.0}", v.left, v.right),
            Err(e) => println!("Mixer unavailable: {}", e),
        }
        if let Err(e) = mixer.set_volume(Volume::uniform(80.0)) {
            println!("Mixer volume not set: {}", e);
        }
    }

    let (_wake_tx, wake_rx) = crossbeam_channel::bounded::<()>(1);
    let channels = granted.channels.len();
    let mut phase = 0.0;
    let mut remaining = granted.sample_rate as usize * SECONDS;
    let mut paused_once = false;

    while remaining > 0 {
        let space = output.space();
        if space == 0 {
            if output.wait(&wake_rx)? == WaitOutcome::Woken {
                break;
            }
            continue;
        }
        let frames = space.min(remaining);
        let data = sine(frames, channels, granted.sample_rate, &mut phase);
        let final_chunk = frames == remaining;
        remaining -= output.write(&[data.as_slice()], frames, final_chunk)?;

        if !paused_once && remaining <= granted.sample_rate as usize {
            paused_once = true;
            output.pause()?;
            println!("Paused with {:.3}s queued", output.delay());
            output.resume()?;
        }
    }

    output.drain()?;
    output.close();
    println!("Done");
    Ok(())
}
