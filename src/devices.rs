use tracing::debug;

use crate::error::{AoError, Result};
use crate::hal::{DeviceInfo, HardwareDriver};

/// Playback-capable devices as `(id, description)` pairs.
///
/// Hints without a direction are duplex and count as outputs. Multi-line
/// descriptions are flattened with "/".
pub async fn list_devices(driver: &dyn HardwareDriver) -> Result<Vec<DeviceInfo>> {
    let hints = driver
        .device_hints()
        .await
        .map_err(|source| AoError::Device {
            op: "device hints",
            source,
        })?;

    let devices: Vec<DeviceInfo> = hints
        .into_iter()
        .filter(|hint| matches!(hint.io.as_deref(), None | Some("Output")))
        .filter_map(|hint| {
            let id = hint.name?;
            let description = hint.description.unwrap_or_default().replace('\n', "/");
            Some(DeviceInfo { id, description })
        })
        .collect();

    debug!(driver = driver.driver_id(), count = devices.len(), "enumerated output devices");
    Ok(devices)
}
