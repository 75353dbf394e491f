#[cfg(feature = "alsa-backend")]
pub mod alsa;

#[cfg(feature = "alsa-backend")]
pub use alsa::{AlsaDriver, AlsaMixer, AlsaPcm};
