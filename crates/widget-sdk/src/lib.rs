//! Embeddable survey widget delivery SDK — click-event batching, bounded
//! offline persistence, retry with exponential backoff, and fire-and-forget
//! analytics beacons.
//!
//! The widget runs inside an untrusted third-party host page: no reliable
//! network, no long-lived process, no cooperative lifecycle. Everything here
//! is built around that, and none of it may ever block or break the survey
//! flow itself.
//!
//! # Modules
//!
//! - [`queue`] — Click queue: size/time batching, persistence, retry loop
//! - [`backoff`] — Exponential retry delay with a ceiling
//! - [`storage`] — Bounded, namespaced persistence of pending events
//! - [`network`] — Online/offline monitor with edge-triggered listeners
//! - [`delivery`] — Delivery client contract and HTTP implementation
//! - [`beacon`] — One-shot load/dwell analytics transport
//! - [`widget`] — Mount/unmount integration hook and consumer surface

pub mod backoff;
pub mod beacon;
pub mod delivery;
pub mod network;
pub mod queue;
pub mod storage;
pub mod widget;

pub use beacon::{BeaconSender, BeaconTransport, HttpBeaconTransport};
pub use delivery::{BatchDelivery, DeliveryClient, HttpDeliveryClient, SingleDelivery};
pub use network::NetworkMonitor;
pub use queue::ClickQueue;
pub use storage::{EventStore, FileStorage, MemoryStorage, StorageBackend};
pub use widget::SurveyWidget;
