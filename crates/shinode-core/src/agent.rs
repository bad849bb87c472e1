// ── Node agent ──
//
// Two states. `NodeAgent` owns the capabilities but has not talked to the
// host; `connect()` runs capability setup and the handshake and, if the
// host agrees with the local configuration, yields a `ConfiguredAgent`.
// Only the configured agent knows the polling interval, so only it can
// sense, control, or sync.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shinode_api::{
    ControllerInput, Descriptor, Host, HostClient, HostConfig, ReportEntry, TransportConfig,
};

use crate::batch;
use crate::capability::{Controller, Sensor};
use crate::config::{AgentConfig, BatchPolicy};
use crate::error::{CoreError, MismatchKind};
use crate::handshake;

const DEFAULT_TICK: Duration = Duration::from_secs(1);

// ── SyncOutcome ──────────────────────────────────────────────────

/// What a call to [`ConfiguredAgent::sync`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Polling interval not yet elapsed; nothing was sent.
    Idle { remaining: Duration },
    /// A full sense + control cycle ran.
    Cycled {
        actions: Vec<ControllerInput>,
        results: Vec<ReportEntry>,
    },
}

// ── NodeAgent ────────────────────────────────────────────────────

/// A node agent that has not completed the host handshake.
pub struct NodeAgent<H = HostClient> {
    device_id: String,
    host: H,
    sensors: Vec<Box<dyn Sensor>>,
    controllers: IndexMap<String, Box<dyn Controller>>,
    batch_policy: BatchPolicy,
    initial_sense: bool,
    tick: Duration,
    last_poll: Instant,
}

impl NodeAgent<HostClient> {
    /// Build the HTTP host client from `config` and construct the agent.
    pub fn from_config(
        config: &AgentConfig,
        sensors: Vec<Box<dyn Sensor>>,
        controllers: Vec<Box<dyn Controller>>,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: config.tls.clone(),
            timeout: config.timeout,
        };
        let host = HostClient::new(config.host.as_str(), &config.token, &transport)?;

        Ok(Self::new(config.device_id.clone(), host, sensors, controllers)?
            .with_batch_policy(config.batch_policy)
            .with_initial_sense(config.initial_sense)
            .with_tick(config.tick))
    }
}

impl<H: Host> NodeAgent<H> {
    /// Create an agent. Does no I/O; call [`connect()`](Self::connect).
    ///
    /// Fails if two sensors or two controllers share a name.
    pub fn new(
        device_id: impl Into<String>,
        host: H,
        sensors: Vec<Box<dyn Sensor>>,
        controllers: Vec<Box<dyn Controller>>,
    ) -> Result<Self, CoreError> {
        for (i, sensor) in sensors.iter().enumerate() {
            if sensors[..i].iter().any(|s| s.name() == sensor.name()) {
                return Err(CoreError::DuplicateCapability {
                    kind: MismatchKind::Sensors,
                    name: sensor.name().to_owned(),
                });
            }
        }

        let mut by_name = IndexMap::with_capacity(controllers.len());
        for controller in controllers {
            let name = controller.name().to_owned();
            if by_name.contains_key(&name) {
                return Err(CoreError::DuplicateCapability {
                    kind: MismatchKind::Controllers,
                    name,
                });
            }
            by_name.insert(name, controller);
        }

        Ok(Self {
            device_id: device_id.into(),
            host,
            sensors,
            controllers: by_name,
            batch_policy: BatchPolicy::default(),
            initial_sense: true,
            tick: DEFAULT_TICK,
            last_poll: Instant::now(),
        })
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    /// Whether `connect()` reports one batch of readings right after a
    /// successful handshake. On by default.
    pub fn with_initial_sense(mut self, enabled: bool) -> Self {
        self.initial_sense = enabled;
        self
    }

    /// How often [`ConfiguredAgent::run`] calls `sync()`. The host's polling
    /// interval still decides whether a call does any work.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn last_poll(&self) -> Instant {
        self.last_poll
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Set up every capability, register with the host, and validate the
    /// local configuration against what the host declares.
    ///
    /// A [`CoreError::ConfigMismatch`] here means the node is deployed with
    /// the wrong sensors or controllers; it is not retried.
    pub async fn connect(self) -> Result<ConfiguredAgent<H>, CoreError> {
        self.setup_capabilities().await?;

        let host_config = self.handshake().await?;
        info!(
            device_id = %self.device_id,
            polling_interval_ms = host_config.polling_interval,
            sensors = self.sensors.len(),
            controllers = self.controllers.len(),
            "handshake complete"
        );

        let initial_sense = self.initial_sense;
        let agent = ConfiguredAgent {
            agent: self,
            host_config,
            connected: true,
        };

        if initial_sense {
            match agent.sense().await {
                Ok(actions) => debug!(count = actions.len(), "initial sense pass reported"),
                Err(e) => warn!(error = %e, "initial sense pass failed"),
            }
        }

        Ok(agent)
    }

    async fn setup_capabilities(&self) -> Result<(), CoreError> {
        for sensor in &self.sensors {
            debug!(sensor = sensor.name(), "setting up sensor");
            sensor
                .setup()
                .await
                .map_err(|source| CoreError::Capability {
                    name: sensor.name().to_owned(),
                    source,
                })?;
        }

        for controller in self.controllers.values() {
            debug!(controller = controller.name(), "setting up controller");
            controller
                .setup()
                .await
                .map_err(|source| CoreError::Capability {
                    name: controller.name().to_owned(),
                    source,
                })?;
        }

        Ok(())
    }

    async fn handshake(&self) -> Result<HostConfig, CoreError> {
        debug!(device_id = %self.device_id, "requesting host config");
        let host_config = self.host.handshake().await?;

        let sensors: Vec<Descriptor> = self.sensors.iter().map(|s| s.descriptor()).collect();
        let controllers: Vec<Descriptor> =
            self.controllers.values().map(|c| c.descriptor()).collect();
        handshake::validate(&host_config, &sensors, &controllers)?;

        Ok(host_config)
    }
}

// ── ConfiguredAgent ──────────────────────────────────────────────

/// A node agent whose configuration the host has accepted.
pub struct ConfiguredAgent<H = HostClient> {
    agent: NodeAgent<H>,
    host_config: HostConfig,
    /// Cleared by `run()` when a cycle fails; the next tick re-handshakes.
    connected: bool,
}

impl<H: Host> ConfiguredAgent<H> {
    pub fn device_id(&self) -> &str {
        &self.agent.device_id
    }

    /// Minimum time between sync cycles, as declared by the host.
    pub fn polling_interval(&self) -> Duration {
        self.host_config.polling_interval()
    }

    pub fn host_config(&self) -> &HostConfig {
        &self.host_config
    }

    pub fn tick(&self) -> Duration {
        self.agent.tick
    }

    /// False after a failed cycle in [`run()`](Self::run) until the
    /// handshake succeeds again.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Start of the most recent cycle (or construction time if none ran).
    pub fn last_poll(&self) -> Instant {
        self.agent.last_poll
    }

    /// Repeat the handshake, adopting the host's current polling interval.
    ///
    /// On a mismatch the previous host config is kept and the error returned.
    pub async fn reconnect(&mut self) -> Result<(), CoreError> {
        self.host_config = self.agent.handshake().await?;
        self.connected = true;
        info!(
            device_id = %self.agent.device_id,
            polling_interval_ms = self.host_config.polling_interval,
            "handshake refreshed"
        );
        Ok(())
    }

    // ── Cycle ────────────────────────────────────────────────────

    /// Read every sensor, report the batch, and return the host's actions.
    pub async fn sense(&self) -> Result<Vec<ControllerInput>, CoreError> {
        let entries = batch::read_sensors(&self.agent.sensors, self.agent.batch_policy).await?;
        debug!(count = entries.len(), "reporting sensor batch");

        let actions = self
            .agent
            .host
            .report_sense(&self.agent.device_id, &entries)
            .await?;
        debug!(count = actions.len(), "host returned actions");
        Ok(actions)
    }

    /// Apply host actions to the matching controllers and report the outcomes.
    ///
    /// Returns the entries that were posted.
    pub async fn control(
        &self,
        actions: &[ControllerInput],
    ) -> Result<Vec<ReportEntry>, CoreError> {
        if actions.is_empty() {
            debug!("no actions to apply");
        }

        let results =
            batch::apply_actions(&self.agent.controllers, actions, self.agent.batch_policy).await?;
        self.agent
            .host
            .report_control(&self.agent.device_id, &results)
            .await?;
        Ok(results)
    }

    /// Run one sense + control cycle if the polling interval has elapsed.
    ///
    /// `last_poll` moves to the start of the cycle before any I/O, so a
    /// failed cycle still waits a full interval before the next attempt.
    pub async fn sync(&mut self) -> Result<SyncOutcome, CoreError> {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.agent.last_poll);
        let interval = self.polling_interval();

        if elapsed <= interval {
            return Ok(SyncOutcome::Idle {
                remaining: interval - elapsed,
            });
        }

        self.agent.last_poll = now;
        let actions = self.sense().await?;
        let results = self.control(&actions).await?;
        info!(
            device_id = %self.agent.device_id,
            actions = actions.len(),
            "sync cycle complete"
        );

        Ok(SyncOutcome::Cycled { actions, results })
    }

    /// Call [`sync()`](Self::sync) every [`tick()`](Self::tick) until
    /// `cancel` fires.
    ///
    /// A failed cycle is logged and marks the agent disconnected; the next
    /// tick repeats the handshake before syncing. Fatal errors
    /// (configuration mismatch, rejected token) end the loop, including
    /// when they come from that handshake.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), CoreError> {
        if self.agent.tick.is_zero() {
            return Err(CoreError::Config {
                message: "runner tick must be greater than zero".into(),
            });
        }

        let mut interval = tokio::time::interval(self.agent.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => self.run_tick().await?,
            }
        }

        debug!(device_id = %self.agent.device_id, "runner stopped");
        Ok(())
    }

    async fn run_tick(&mut self) -> Result<(), CoreError> {
        if !self.connected {
            match self.reconnect().await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "reconnect failed");
                    return Ok(());
                }
            }
        }

        match self.sync().await {
            Ok(SyncOutcome::Idle { remaining }) => debug!(?remaining, "sync idle"),
            Ok(SyncOutcome::Cycled { .. }) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "sync cycle failed, reconnecting on next tick");
                self.connected = false;
            }
        }
        Ok(())
    }
}
