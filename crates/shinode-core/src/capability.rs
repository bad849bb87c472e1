// ── Local capabilities ──
//
// Sensors and controllers are supplied by the embedding application.
// The agent only knows their identity (name + unit) and how to call them.

use async_trait::async_trait;

use shinode_api::{ControllerInput, Descriptor, Measure};

use crate::error::CapabilityError;

/// A local capability producing a named, unit-labelled measurement.
///
/// Reads within one batch run concurrently, so `sense` takes `&self`;
/// drivers that need exclusive access should guard it internally.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Unique within the agent.
    fn name(&self) -> &str;

    fn unit(&self) -> &str;

    /// One-time initialization, run by the agent before the handshake.
    async fn setup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn sense(&self) -> Result<Measure, CapabilityError>;

    fn descriptor(&self) -> Descriptor {
        Descriptor::new(self.name(), self.unit())
    }
}

/// A local capability that accepts a desired value and reports the outcome.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Unique within the agent; host actions are dispatched by this name.
    fn name(&self) -> &str;

    fn unit(&self) -> &str;

    async fn setup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    /// Apply `input` and return the resulting value.
    async fn control(&self, input: &ControllerInput) -> Result<Measure, CapabilityError>;

    fn descriptor(&self) -> Descriptor {
        Descriptor::new(self.name(), self.unit())
    }
}
