use crate::chmap::catalog::DEFAULT_DEVICE;
use crate::chmap::{select_device, ChannelLayout, LayoutSelector};
use crate::config::AoConfig;
use crate::format::DeviceConfig;

/// Digital output device used for passthrough
pub const IEC958_DEVICE: &str = "iec958";

// IEC 958 channel status bits (asoundef.h)
const AES0_NONAUDIO: u32 = 1 << 1;
const AES0_PRO_EMPHASIS_NONE: u32 = 1 << 2;
const AES1_CON_ORIGINAL: u32 = 1 << 7;
const AES1_CON_PCM_CODER: u32 = 0x02;
const AES3_CON_FS_NOTID: u32 = 1;

/// Device string chosen for a stream, plus the layout the name implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    pub name: String,
    pub implied_layout: ChannelLayout,
}

/// Pick the device string: explicit override, then the configured device,
/// then one derived from the stream.
pub fn resolve_device(
    options: &AoConfig,
    request: &DeviceConfig,
    device_override: Option<&str>,
    selector: &dyn LayoutSelector,
) -> ResolvedDevice {
    let (computed, implied_layout) = if request.format.is_passthrough() {
        (IEC958_DEVICE.to_string(), request.channels.clone())
    } else {
        let found = select_device(selector, &request.channels);
        // Anything but "default" is likely a hw device; route it through plug
        // so the sound system converts what the hardware can't take.
        let name = if found.device == DEFAULT_DEVICE {
            found.device.to_string()
        } else {
            format!("plug:{}", found.device)
        };
        (name, found.layout)
    };

    let name = device_override
        .filter(|d| !d.is_empty())
        .or_else(|| options.device())
        .map(str::to_string)
        .unwrap_or(computed);

    ResolvedDevice {
        name,
        implied_layout,
    }
}

/// IEC 958 AES3 sample rate code
pub fn iec958_rate_code(sample_rate: u32) -> u32 {
    match sample_rate {
        44100 => 0,
        48000 => 2,
        32000 => 3,
        22050 => 4,
        24000 => 6,
        88200 => 8,
        768000 => 9,
        96000 => 10,
        176400 => 12,
        192000 => 14,
        _ => AES3_CON_FS_NOTID,
    }
}

/// Channel status parameters marking a non-audio (passthrough) stream
pub fn iec958_params(sample_rate: u32) -> String {
    format!(
        "AES0={},AES1={},AES2=0,AES3={}",
        AES0_NONAUDIO | AES0_PRO_EMPHASIS_NONE,
        AES1_CON_ORIGINAL | AES1_CON_PCM_CODER,
        iec958_rate_code(sample_rate)
    )
}

/// Append parameters to a device string that may already carry some
pub fn append_params(device: &str, params: &str) -> String {
    if params.is_empty() {
        return device.to_string();
    }

    match device.find(':') {
        // no existing parameters
        None => format!("{}:{}", device, params),
        // ":" but nothing after it
        Some(pos) if pos + 1 == device.len() => format!("{}{}", device, params),
        // config syntax: add inside the { } block
        Some(pos) if device[pos + 1..].starts_with('{') && device.ends_with('}') => {
            format!("{} {}}}", &device[..device.len() - 1], params)
        }
        // plain parameter list
        Some(_) => format!("{},{}", device, params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_params_forms() {
        assert_eq!(append_params("iec958", "AES0=6"), "iec958:AES0=6");
        assert_eq!(append_params("iec958:", "AES0=6"), "iec958:AES0=6");
        assert_eq!(
            append_params("iec958:{CARD 0}", "AES0=6"),
            "iec958:{CARD 0 AES0=6}"
        );
        assert_eq!(append_params("hw:0,1", "AES0=6"), "hw:0,1,AES0=6");
        assert_eq!(append_params("hw:0", ""), "hw:0");
    }

    #[test]
    fn test_iec958_params() {
        assert_eq!(iec958_params(48000), "AES0=6,AES1=130,AES2=0,AES3=2");
        assert_eq!(iec958_params(44100), "AES0=6,AES1=130,AES2=0,AES3=0");
        assert_eq!(iec958_params(12345), "AES0=6,AES1=130,AES2=0,AES3=1");
    }
}
