pub mod drivers;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::PcmError;
pub use traits::{HardwareDriver, MixerDevice, PcmDevice};
pub use types::{
    ChmapQuery, ChmapType, ControlId, DeviceHint, DeviceInfo, HwChannelPos, HwSetup,
    MixerChannel, OpenMode, PcmAccess, PcmFormat, PcmState, Readiness, SwParams,
};
