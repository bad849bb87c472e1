//! Async client for the shinode host API.
//!
//! - **[`HostClient`]**: bearer-authenticated reqwest client for the
//!   handshake, sense, and control endpoints.
//! - **[`Host`]**: the trait the node agent is written against, so the
//!   transport can be swapped for a test double.
//! - **Wire types** ([`types`]): [`HostConfig`], [`Reading`], [`Measure`],
//!   [`ReportEntry`].

pub mod client;
pub mod error;
pub mod host;
pub mod transport;
pub mod types;

pub use client::HostClient;
pub use error::Error;
pub use host::Host;
pub use transport::{TlsMode, TransportConfig};
pub use types::{
    ControllerInput, ControllerResult, Descriptor, FailedEntry, HostConfig, Measure, Reading,
    ReportEntry, SensorResult,
};
