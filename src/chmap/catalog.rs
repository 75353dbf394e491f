use tracing::error;

use super::select::LayoutSelector;
use super::ChannelLayout;

/// ALSA device names and the speaker layout each one implies.
/// Source: http://www.alsa-project.org/main/index.php/DeviceNames
pub const DEVICE_CHANNEL_LAYOUTS: &[(&str, &str)] = &[
    ("default", "fc"),
    ("default", "fl-fr"),
    ("rear", "bl-br"),
    ("center_lfe", "fc-lfe"),
    ("side", "sl-sr"),
    ("surround40", "fl-fr-bl-br"),
    ("surround50", "fl-fr-bl-br-fc"),
    ("surround41", "fl-fr-bl-br-lfe"),
    ("surround51", "fl-fr-bl-br-fc-lfe"),
    ("surround71", "fl-fr-bl-br-fc-lfe-sl-sr"),
];

pub const DEFAULT_DEVICE: &str = "default";

/// Catalog entry chosen for a requested layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMatch {
    pub device: &'static str,
    pub layout: ChannelLayout,
}

fn catalog_layouts() -> Vec<(&'static str, ChannelLayout)> {
    DEVICE_CHANNEL_LAYOUTS
        .iter()
        .filter_map(|(device, spec)| ChannelLayout::parse(spec).map(|layout| (*device, layout)))
        .collect()
}

/// Pick the catalog device whose layout best serves `requested`.
///
/// Falls back to "default" with the request untouched when the selector finds
/// nothing.
pub fn select_device(selector: &dyn LayoutSelector, requested: &ChannelLayout) -> CatalogMatch {
    let entries = catalog_layouts();
    let candidates: Vec<ChannelLayout> = entries.iter().map(|(_, l)| l.clone()).collect();

    let Some(chosen) = selector.select(&candidates, requested) else {
        return CatalogMatch {
            device: DEFAULT_DEVICE,
            layout: requested.clone(),
        };
    };

    match entries.into_iter().find(|(_, layout)| *layout == chosen) {
        Some((device, layout)) => CatalogMatch { device, layout },
        None => {
            error!(
                layout = %chosen,
                channels = chosen.len(),
                "channel layout not supported by any device name"
            );
            CatalogMatch {
                device: DEFAULT_DEVICE,
                layout: chosen,
            }
        }
    }
}
