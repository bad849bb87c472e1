// Shared test doubles for the agent tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use shinode_api::{Error as ApiError, Host};
use shinode_core::{
    CapabilityError, Controller, ControllerInput, Descriptor, HostConfig, Measure, ReportEntry,
    Sensor,
};

// ── Host ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Handshake,
    Sense(Vec<ReportEntry>),
    Control(Vec<ReportEntry>),
}

/// In-memory host that records every call in order.
pub struct FakeHost {
    config: Mutex<HostConfig>,
    actions: Mutex<Vec<ControllerInput>>,
    sense_error: Mutex<Option<fn() -> ApiError>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeHost {
    pub fn new(config: HostConfig) -> Arc<Self> {
        Arc::new(Self {
            config: Mutex::new(config),
            actions: Mutex::new(Vec::new()),
            sense_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Actions returned from every sense report.
    pub fn respond_with(&self, actions: Vec<ControllerInput>) {
        *self.actions.lock().unwrap() = actions;
    }

    pub fn fail_sense_with(&self, make: fn() -> ApiError) {
        *self.sense_error.lock().unwrap() = Some(make);
    }

    pub fn set_config(&self, config: HostConfig) {
        *self.config.lock().unwrap() = config;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn handshake_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Handshake))
            .count()
    }

    pub fn sense_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Sense(_)))
            .count()
    }

    pub fn control_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Control(_)))
            .count()
    }
}

#[async_trait]
impl Host for FakeHost {
    async fn handshake(&self) -> Result<HostConfig, ApiError> {
        self.calls.lock().unwrap().push(Call::Handshake);
        Ok(self.config.lock().unwrap().clone())
    }

    async fn report_sense(
        &self,
        _device_id: &str,
        entries: &[ReportEntry],
    ) -> Result<Vec<ControllerInput>, ApiError> {
        self.calls.lock().unwrap().push(Call::Sense(entries.to_vec()));
        if let Some(make) = *self.sense_error.lock().unwrap() {
            return Err(make());
        }
        Ok(self.actions.lock().unwrap().clone())
    }

    async fn report_control(&self, _device_id: &str, entries: &[ReportEntry]) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(Call::Control(entries.to_vec()));
        Ok(())
    }
}

pub fn host_config(interval_ms: u64, sensors: &[(&str, &str)], controls: &[(&str, &str)]) -> HostConfig {
    HostConfig {
        polling_interval: interval_ms,
        sensors: sensors.iter().map(|(n, u)| Descriptor::new(*n, *u)).collect(),
        controls: controls.iter().map(|(n, u)| Descriptor::new(*n, *u)).collect(),
    }
}

// ── Sensors ─────────────────────────────────────────────────────────

/// Returns a fixed value after a delay and logs its completion.
pub struct DelayedSensor {
    pub name: &'static str,
    pub unit: &'static str,
    pub value: Measure,
    pub delay: Duration,
    pub completed: Arc<Mutex<Vec<&'static str>>>,
    pub setups: Arc<AtomicUsize>,
}

impl DelayedSensor {
    pub fn new(name: &'static str, unit: &'static str, value: impl Into<Measure>) -> Self {
        Self {
            name,
            unit,
            value: value.into(),
            delay: Duration::ZERO,
            completed: Arc::default(),
            setups: Arc::default(),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn logging_to(mut self, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
        self.completed = Arc::clone(log);
        self
    }

    pub fn boxed(self) -> Box<dyn Sensor> {
        Box::new(self)
    }
}

#[async_trait]
impl Sensor for DelayedSensor {
    fn name(&self) -> &str {
        self.name
    }

    fn unit(&self) -> &str {
        self.unit
    }

    async fn setup(&self) -> Result<(), CapabilityError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sense(&self) -> Result<Measure, CapabilityError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.lock().unwrap().push(self.name);
        Ok(self.value.clone())
    }
}

/// Always fails to read.
pub struct BrokenSensor(pub &'static str, pub &'static str);

#[async_trait]
impl Sensor for BrokenSensor {
    fn name(&self) -> &str {
        self.0
    }

    fn unit(&self) -> &str {
        self.1
    }

    async fn sense(&self) -> Result<Measure, CapabilityError> {
        Err(CapabilityError::new("bus timeout"))
    }
}

// ── Controllers ─────────────────────────────────────────────────────

/// Echoes the requested value back and records what it was asked to do.
pub struct RecordingController {
    pub name: &'static str,
    pub unit: &'static str,
    pub received: Arc<Mutex<Vec<ControllerInput>>>,
    pub fail_setup: bool,
}

impl RecordingController {
    pub fn new(name: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            unit,
            received: Arc::default(),
            fail_setup: false,
        }
    }

    pub fn received(&self) -> Arc<Mutex<Vec<ControllerInput>>> {
        Arc::clone(&self.received)
    }

    pub fn boxed(self) -> Box<dyn Controller> {
        Box::new(self)
    }
}

#[async_trait]
impl Controller for RecordingController {
    fn name(&self) -> &str {
        self.name
    }

    fn unit(&self) -> &str {
        self.unit
    }

    async fn setup(&self) -> Result<(), CapabilityError> {
        if self.fail_setup {
            return Err(CapabilityError::new("gpio busy"));
        }
        Ok(())
    }

    async fn control(&self, input: &ControllerInput) -> Result<Measure, CapabilityError> {
        self.received.lock().unwrap().push(input.clone());
        Ok(input.measure.clone())
    }
}
