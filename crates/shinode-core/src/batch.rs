// ── Concurrent batches ──
//
// One sense pass and one control pass are each a batch of independent
// capability calls, issued together and joined. Output order always
// follows input order regardless of completion order.

use std::future::Future;

use futures_util::future::{join_all, try_join_all};
use indexmap::IndexMap;
use tracing::warn;

use shinode_api::{ControllerInput, FailedEntry, Reading, ReportEntry};

use crate::capability::{Controller, Sensor};
use crate::config::BatchPolicy;
use crate::error::CoreError;

/// A batch member that failed, with the identity to report it under.
struct ItemFailure {
    name: String,
    unit: String,
    error: CoreError,
}

impl ItemFailure {
    fn into_entry(self) -> FailedEntry {
        let error = match self.error {
            CoreError::Capability { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        FailedEntry {
            name: self.name,
            unit: self.unit,
            error,
        }
    }
}

/// Read every sensor concurrently.
pub(crate) async fn read_sensors(
    sensors: &[Box<dyn Sensor>],
    policy: BatchPolicy,
) -> Result<Vec<ReportEntry>, CoreError> {
    let jobs = sensors.iter().map(|sensor| async move {
        match sensor.sense().await {
            Ok(measure) => Ok(Reading::new(sensor.name(), sensor.unit(), measure)),
            Err(source) => Err(ItemFailure {
                name: sensor.name().to_owned(),
                unit: sensor.unit().to_owned(),
                error: CoreError::Capability {
                    name: sensor.name().to_owned(),
                    source,
                },
            }),
        }
    });

    collect(policy, jobs).await
}

/// Dispatch each action to the controller registered under its name.
///
/// Under [`BatchPolicy::FailFast`] an unknown name fails the batch before
/// any controller runs.
pub(crate) async fn apply_actions(
    controllers: &IndexMap<String, Box<dyn Controller>>,
    actions: &[ControllerInput],
    policy: BatchPolicy,
) -> Result<Vec<ReportEntry>, CoreError> {
    if policy == BatchPolicy::FailFast {
        if let Some(unknown) = actions.iter().find(|a| !controllers.contains_key(&a.name)) {
            return Err(CoreError::UnknownController {
                name: unknown.name.clone(),
            });
        }
    }

    let jobs = actions.iter().map(|action| async move {
        let Some(controller) = controllers.get(&action.name) else {
            return Err(ItemFailure {
                name: action.name.clone(),
                unit: action.unit.clone(),
                error: CoreError::UnknownController {
                    name: action.name.clone(),
                },
            });
        };

        match controller.control(action).await {
            Ok(measure) => Ok(Reading::new(controller.name(), controller.unit(), measure)),
            Err(source) => Err(ItemFailure {
                name: controller.name().to_owned(),
                unit: controller.unit().to_owned(),
                error: CoreError::Capability {
                    name: controller.name().to_owned(),
                    source,
                },
            }),
        }
    });

    collect(policy, jobs).await
}

async fn collect<I, Fut>(policy: BatchPolicy, jobs: I) -> Result<Vec<ReportEntry>, CoreError>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<Reading, ItemFailure>>,
{
    match policy {
        BatchPolicy::FailFast => {
            let readings = try_join_all(jobs).await.map_err(|failure| failure.error)?;
            Ok(readings.into_iter().map(ReportEntry::Measured).collect())
        }
        BatchPolicy::CollectPartial => Ok(join_all(jobs)
            .await
            .into_iter()
            .map(|outcome| match outcome {
                Ok(reading) => ReportEntry::Measured(reading),
                Err(failure) => {
                    warn!(name = %failure.name, error = %failure.error, "batch item failed");
                    ReportEntry::Failed(failure.into_entry())
                }
            })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use shinode_api::Measure;

    use super::*;
    use crate::error::CapabilityError;

    struct Fixed(&'static str, Option<i64>);

    #[async_trait]
    impl Sensor for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn unit(&self) -> &str {
            "u"
        }
        async fn sense(&self) -> Result<Measure, CapabilityError> {
            self.1.map(Measure::from).ok_or_else(|| CapabilityError::new("no signal"))
        }
    }

    struct Counting {
        name: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Controller for Counting {
        fn name(&self) -> &str {
            self.name
        }
        fn unit(&self) -> &str {
            "state"
        }
        async fn control(&self, input: &ControllerInput) -> Result<Measure, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input.measure.clone())
        }
    }

    fn sensors(values: &[(&'static str, Option<i64>)]) -> Vec<Box<dyn Sensor>> {
        values
            .iter()
            .map(|&(name, value)| Box::new(Fixed(name, value)) as Box<dyn Sensor>)
            .collect()
    }

    #[tokio::test]
    async fn fail_fast_stops_on_first_failure() {
        let sensors = sensors(&[("a", Some(1)), ("b", None), ("c", Some(3))]);
        let err = read_sensors(&sensors, BatchPolicy::FailFast).await.unwrap_err();
        assert!(matches!(err, CoreError::Capability { ref name, .. } if name == "b"));
    }

    #[tokio::test]
    async fn collect_partial_keeps_position_of_failures() {
        let sensors = sensors(&[("a", Some(1)), ("b", None), ("c", Some(3))]);
        let entries = read_sensors(&sensors, BatchPolicy::CollectPartial).await.unwrap();

        let names: Vec<&str> = entries.iter().map(ReportEntry::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(
            entries[1],
            ReportEntry::Failed(FailedEntry {
                name: "b".into(),
                unit: "u".into(),
                error: "no signal".into(),
            })
        );
    }

    #[tokio::test]
    async fn unknown_controller_fails_before_dispatch() {
        let mut controllers: IndexMap<String, Box<dyn Controller>> = IndexMap::new();
        let fan = std::sync::Arc::new(Counting {
            name: "fan",
            calls: AtomicUsize::new(0),
        });
        controllers.insert("fan".into(), Box::new(ArcController(fan.clone())));

        let actions = [
            Reading::new("fan", "state", "on"),
            Reading::new("heater", "state", "on"),
        ];
        let err = apply_actions(&controllers, &actions, BatchPolicy::FailFast)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::UnknownController { ref name } if name == "heater"));
        assert_eq!(fan.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_controller_is_reported_when_collecting() {
        let mut controllers: IndexMap<String, Box<dyn Controller>> = IndexMap::new();
        controllers.insert(
            "fan".into(),
            Box::new(Counting {
                name: "fan",
                calls: AtomicUsize::new(0),
            }),
        );

        let actions = [
            Reading::new("heater", "W", 1500_i64),
            Reading::new("fan", "state", "on"),
        ];
        let entries = apply_actions(&controllers, &actions, BatchPolicy::CollectPartial)
            .await
            .unwrap();

        assert!(entries[0].is_failed());
        assert_eq!(entries[1], ReportEntry::Measured(Reading::new("fan", "state", "on")));
    }

    struct ArcController(std::sync::Arc<Counting>);

    #[async_trait]
    impl Controller for ArcController {
        fn name(&self) -> &str {
            self.0.name
        }
        fn unit(&self) -> &str {
            self.0.unit()
        }
        async fn control(&self, input: &ControllerInput) -> Result<Measure, CapabilityError> {
            self.0.control(input).await
        }
    }
}
