pub mod config;
pub mod error;
pub mod types;

pub use config::{BeaconConfig, QueueConfig, SdkConfig};
pub use error::{OfferPulseError, OfferPulseResult};
