//! Node agent for a sensing / control node.
//!
//! - **[`NodeAgent`]**: owns the local [`Sensor`]s and [`Controller`]s and a
//!   [`Host`](shinode_api::Host) transport. [`connect()`](NodeAgent::connect)
//!   runs capability setup, the host handshake, and configuration
//!   validation.
//!
//! - **[`ConfiguredAgent`]**: the result of a successful handshake. Exposes
//!   [`sense()`](ConfiguredAgent::sense), [`control()`](ConfiguredAgent::control),
//!   the interval-gated [`sync()`](ConfiguredAgent::sync), and a
//!   [`run()`](ConfiguredAgent::run) loop that calls `sync()` on a timer.
//!
//! - **[`BatchPolicy`]**: whether one failing sensor or controller fails its
//!   whole batch (the default) or is reported as a per-item error.

pub mod agent;
mod batch;
pub mod capability;
pub mod config;
pub mod error;
pub mod handshake;

// ── Primary re-exports ──────────────────────────────────────────────
pub use agent::{ConfiguredAgent, NodeAgent, SyncOutcome};
pub use capability::{Controller, Sensor};
pub use config::{AgentConfig, BatchPolicy};
pub use error::{CapabilityError, CoreError, MismatchKind};

// Wire types callers need to implement capabilities.
pub use shinode_api::{
    ControllerInput, ControllerResult, Descriptor, HostConfig, Measure, Reading, ReportEntry,
    SensorResult, TlsMode,
};
