pub mod chmap;
pub mod config;
pub mod devices;
pub mod error;
pub mod format;
pub mod hal;
pub mod mixer;
pub mod output;

pub use chmap::{ChannelLayout, Speaker};
pub use config::AoConfig;
pub use devices::list_devices;
pub use error::{AoError, Result};
pub use format::{DeviceConfig, MemoryLayout, SampleFormat};
pub use mixer::{MixerControl, Volume};
pub use output::{AudioOutput, SessionState, WaitOutcome};
