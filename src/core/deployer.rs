use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::ArgValue;
use crate::core::config::{DeployerConfig, UpgradeStage};
use crate::core::error::{DeploymentError, FactoryError};
use crate::core::factory::{Identity, UnitFactory};
use crate::core::plan::{ArgumentRef, DeploymentPlan, DeploymentStep, DeploymentUnit};
use crate::core::telemetry::{now_secs, DeploymentEvent, Telemetry};

/// A confirmed, live unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// Position of the step in the plan.
    pub step: usize,
    pub unit: DeploymentUnit,
    pub identity: Identity,
    /// Opaque confirmation receipt from the factory.
    pub receipt: ArgValue,
    /// Set when the upgrade stage replaced this step's implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_to: Option<DeploymentUnit>,
}

/// Transient state of one execution of a plan.
///
/// Holds the results recorded so far, keyed by step index. Lives only for the
/// duration of [`Deployer::run`].
#[derive(Debug)]
pub struct DeploymentRun<'a> {
    id: Uuid,
    plan: &'a DeploymentPlan,
    current: usize,
    results: BTreeMap<usize, DeploymentResult>,
}

impl<'a> DeploymentRun<'a> {
    pub fn new(plan: &'a DeploymentPlan) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan,
            current: 0,
            results: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn plan(&self) -> &DeploymentPlan {
        self.plan
    }

    /// Index of the step currently executing (or `plan.len()` once every step is done).
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn result(&self, index: usize) -> Option<&DeploymentResult> {
        self.results.get(&index)
    }

    /// Resolves the argument template of the step at `index`.
    ///
    /// Literals pass through; a step reference becomes the identity recorded for
    /// that step. A reference to `index` itself, to a later step, or to a step with
    /// no recorded result fails.
    pub fn resolve(
        &self,
        index: usize,
        step: &DeploymentStep,
    ) -> Result<Vec<ArgValue>, DeploymentError> {
        step.args
            .iter()
            .map(|arg| match arg {
                ArgumentRef::Literal(value) => Ok(value.clone()),
                ArgumentRef::Step(target) => self
                    .results
                    .get(target)
                    .filter(|_| *target < index)
                    .map(|result| ArgValue::from(&result.identity))
                    .ok_or_else(|| DeploymentError::ArgumentResolution {
                        step: index,
                        unit: step.unit.name().to_string(),
                        reference: arg.clone(),
                    }),
            })
            .collect()
    }

    fn record(&mut self, result: DeploymentResult) {
        self.results.insert(result.step, result);
    }

    pub fn into_results(self) -> Vec<DeploymentResult> {
        self.results.into_values().collect()
    }
}

/// Executes a [`DeploymentPlan`] against a [`UnitFactory`], one step at a time.
///
/// For every step the deployer resolves the arguments, submits the unit, awaits its
/// confirmation and records the identity before touching the next step. The first
/// failure ends the run: later steps are never submitted, nothing is retried, and
/// units already confirmed stay live.
#[derive(Clone)]
pub struct Deployer {
    factory: Arc<dyn UnitFactory>,
    config: DeployerConfig,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl Deployer {
    pub fn new(factory: Arc<dyn UnitFactory>) -> Self {
        Self {
            factory,
            config: DeployerConfig::default(),
            telemetry: None,
        }
    }

    pub fn with_config(mut self, config: DeployerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    /// Runs `plan` to completion or to its first failure.
    ///
    /// # Returns
    /// One [`DeploymentResult`] per step, in plan order, or the error of the step
    /// that stopped the run.
    pub async fn run(
        &self,
        plan: &DeploymentPlan,
    ) -> Result<Vec<DeploymentResult>, DeploymentError> {
        let mut run = DeploymentRun::new(plan);
        log::info!("Starting deployment run {} ({} steps)", run.id(), plan.len());

        let outcome = self.execute(&mut run).await;
        if let Some(t) = &self.telemetry {
            if let Err(err) = &outcome {
                t.record(DeploymentEvent::Failed {
                    run_id: run.id(),
                    timestamp: now_secs(),
                    step: err.step(),
                    unit: err.unit().map(str::to_string),
                    error: err.cause(),
                });
            }
            t.flush();
        }

        match outcome {
            Ok(()) => {
                log::debug!(
                    "Deployment run {} finished: {}",
                    run.id(),
                    serde_json::to_string(&run.results).unwrap_or_default()
                );
                Ok(run.into_results())
            }
            Err(err) => {
                log::debug!(
                    "Deployment run {} aborted after {} confirmed step(s): {}",
                    run.id(),
                    run.results.len(),
                    err
                );
                Err(err)
            }
        }
    }

    async fn execute(&self, run: &mut DeploymentRun<'_>) -> Result<(), DeploymentError> {
        if self.config.validate_plan {
            let validation = run.plan().validate(&self.config.upgrade);
            validation.log_summary();
            if !validation.is_safe() {
                return Err(DeploymentError::InvalidPlan(
                    validation.errors().collect::<Vec<_>>().join(" "),
                ));
            }
        }

        let plan = run.plan;
        for (index, step) in plan.iter().enumerate() {
            run.current = index;
            let result = self.deploy_step(run, index, step).await?;
            let event = DeploymentEvent::Deployed {
                run_id: run.id(),
                timestamp: now_secs(),
                step: index,
                unit: result.unit.name().to_string(),
                identity: result.identity.clone(),
            };
            run.record(result);
            self.notify(event);
        }
        run.current = plan.len();

        if let UpgradeStage::Upgrade { step, unit } = &self.config.upgrade {
            self.upgrade(run, *step, unit).await?;
        }
        Ok(())
    }

    async fn deploy_step(
        &self,
        run: &DeploymentRun<'_>,
        index: usize,
        step: &DeploymentStep,
    ) -> Result<DeploymentResult, DeploymentError> {
        let args = run.resolve(index, step)?;
        log::info!("Deploying step {} ({})", index, step.unit);
        log::debug!("Step {} ({}) arguments: {:?}", index, step.unit, args);

        let pending = self
            .factory
            .submit(&step.unit, &args)
            .await
            .map_err(|source| DeploymentError::Submission {
                step: index,
                unit: step.unit.name().to_string(),
                source,
            })?;
        log::debug!("Step {} ({}) submitted as {}", index, step.unit, pending);

        let confirmation = self.factory.confirm(pending).await.map_err(|source| {
            DeploymentError::Confirmation {
                step: index,
                unit: step.unit.name().to_string(),
                source,
            }
        })?;
        log::info!("Step {} ({}) confirmed at {}", index, step.unit, confirmation.identity);

        Ok(DeploymentResult {
            step: index,
            unit: step.unit.clone(),
            identity: confirmation.identity,
            receipt: confirmation.receipt,
            upgraded_to: None,
        })
    }

    async fn upgrade(
        &self,
        run: &mut DeploymentRun<'_>,
        index: usize,
        unit: &DeploymentUnit,
    ) -> Result<(), DeploymentError> {
        let Some(previous) = run.result(index).cloned() else {
            return Err(DeploymentError::InvalidPlan(format!(
                "Upgrade to '{}' targets step {} which has no confirmed result.",
                unit, index
            )));
        };
        let upgrade_error = |source: FactoryError| DeploymentError::Upgrade {
            step: index,
            unit: unit.name().to_string(),
            source,
        };

        log::info!("Upgrading {} at {} to {}", previous.unit, previous.identity, unit);
        let pending = self
            .factory
            .upgrade(&previous.identity, unit)
            .await
            .map_err(upgrade_error)?;
        let confirmation = self.factory.confirm(pending).await.map_err(upgrade_error)?;
        if confirmation.identity != previous.identity {
            log::warn!(
                "Upgrade of {} moved its identity from {} to {}",
                previous.unit,
                previous.identity,
                confirmation.identity
            );
        }

        self.notify(DeploymentEvent::Upgraded {
            run_id: run.id(),
            timestamp: now_secs(),
            step: index,
            unit: previous.unit.name().to_string(),
            identity: confirmation.identity.clone(),
        });
        run.record(DeploymentResult {
            identity: confirmation.identity,
            receipt: confirmation.receipt,
            upgraded_to: Some(unit.clone()),
            ..previous
        });
        Ok(())
    }

    fn notify(&self, event: DeploymentEvent) {
        if let Some(t) = &self.telemetry {
            t.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::factory::{Confirmation, PendingHandle};
    use crate::core::telemetry::MemoryTelemetry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Hands out `0x<unit>` identities and logs every call.
    #[derive(Default)]
    struct EchoFactory {
        calls: Mutex<Vec<String>>,
        fail_confirm: Option<String>,
    }

    #[async_trait]
    impl UnitFactory for EchoFactory {
        async fn submit(
            &self,
            unit: &DeploymentUnit,
            args: &[ArgValue],
        ) -> Result<PendingHandle, FactoryError> {
            tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
            self.calls
                .lock()
                .unwrap()
                .push(format!("submit {} {}", unit, json!(args)));
            Ok(PendingHandle::new(unit.name()))
        }

        async fn confirm(&self, pending: PendingHandle) -> Result<Confirmation, FactoryError> {
            tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
            self.calls
                .lock()
                .unwrap()
                .push(format!("confirm {}", pending));
            if self.fail_confirm.as_deref() == Some(pending.as_str()) {
                return Err(FactoryError::Reverted(pending.to_string()));
            }
            Ok(Confirmation {
                identity: Identity::new(format!("0x{}", pending)),
                receipt: json!({ "status": "0x1" }),
            })
        }

        async fn upgrade(
            &self,
            identity: &Identity,
            unit: &DeploymentUnit,
        ) -> Result<PendingHandle, FactoryError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upgrade {} {}", identity, unit));
            Ok(PendingHandle::new("A"))
        }
    }

    fn chain() -> DeploymentPlan {
        DeploymentPlan::builder()
            .step("A", vec![])
            .step("B", vec![ArgumentRef::step(0)])
            .step("C", vec![ArgumentRef::step(1), ArgumentRef::literal(7)])
            .build()
    }

    #[tokio::test]
    async fn test_run_threads_identities_forward() {
        let factory = Arc::new(EchoFactory::default());
        let deployer = Deployer::new(factory.clone());

        let results = deployer.run(&chain()).await.unwrap();

        let identities: Vec<&str> = results.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["0xA", "0xB", "0xC"]);
        assert_eq!(
            *factory.calls.lock().unwrap(),
            vec![
                "submit A []",
                "confirm A",
                "submit B [\"0xA\"]",
                "confirm B",
                "submit C [\"0xB\",7]",
                "confirm C",
            ]
        );
    }

    #[tokio::test]
    async fn test_confirmation_failure_stops_run() {
        let factory = Arc::new(EchoFactory {
            fail_confirm: Some("B".into()),
            ..Default::default()
        });
        let telemetry = Arc::new(MemoryTelemetry::new());
        let deployer = Deployer::new(factory.clone()).with_telemetry(telemetry.clone());

        let err = deployer.run(&chain()).await.unwrap_err();

        assert!(matches!(err, DeploymentError::Confirmation { step: 1, .. }));
        assert_eq!(err.unit(), Some("B"));
        assert!(!factory
            .calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.starts_with("submit C")));
        let messages = telemetry.messages();
        assert_eq!(messages[0], "A deployed to: 0xA");
        assert_eq!(
            messages[1],
            "Step 1 (B) failed: confirmation failed: Deployment reverted: B"
        );
        assert_eq!(messages.len(), 2);
    }

    struct CapturedLog;

    static CAPTURED: Mutex<Vec<(log::Level, String)>> = Mutex::new(Vec::new());
    static LOGGER: CapturedLog = CapturedLog;

    impl log::Log for CapturedLog {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            CAPTURED
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    #[tokio::test]
    async fn test_abort_is_left_to_the_caller_to_report() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);

        let plan = DeploymentPlan::builder().step("Audited", vec![]).build();
        let factory = Arc::new(EchoFactory {
            fail_confirm: Some("Audited".into()),
            ..Default::default()
        });
        Deployer::new(factory).run(&plan).await.unwrap_err();

        let records = CAPTURED.lock().unwrap().clone();
        let about_failure: Vec<_> = records
            .iter()
            .filter(|(_, msg)| msg.contains("aborted") && msg.contains("Audited"))
            .collect();
        assert_eq!(about_failure.len(), 1);
        assert_eq!(about_failure[0].0, log::Level::Debug);
        assert!(!records
            .iter()
            .any(|(level, msg)| *level <= log::Level::Warn && msg.contains("Audited")));
    }

    #[tokio::test]
    async fn test_runtime_resolution_guards_forward_references() {
        let plan = DeploymentPlan::builder()
            .step("A", vec![ArgumentRef::step(1)])
            .step("B", vec![])
            .build();
        let factory = Arc::new(EchoFactory::default());
        let deployer =
            Deployer::new(factory.clone()).with_config(DeployerConfig::new().without_validation());

        let err = deployer.run(&plan).await.unwrap_err();

        assert!(matches!(
            err,
            DeploymentError::ArgumentResolution { step: 0, reference: ArgumentRef::Step(1), .. }
        ));
        assert!(factory.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_rejects_before_submitting() {
        let plan = DeploymentPlan::builder()
            .step("A", vec![ArgumentRef::step(0)])
            .build();
        let factory = Arc::new(EchoFactory::default());

        let err = Deployer::new(factory.clone()).run(&plan).await.unwrap_err();

        assert!(matches!(err, DeploymentError::InvalidPlan(_)));
        assert!(factory.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_stage_keeps_stable_identity() {
        let factory = Arc::new(EchoFactory::default());
        let telemetry = Arc::new(MemoryTelemetry::new());
        let deployer = Deployer::new(factory.clone())
            .with_config(DeployerConfig::new().with_upgrade(0, "A2"))
            .with_telemetry(telemetry.clone());

        let results = deployer.run(&chain()).await.unwrap();

        assert_eq!(results[0].identity, Identity::new("0xA"));
        assert_eq!(results[0].unit, DeploymentUnit::new("A"));
        assert_eq!(results[0].upgraded_to, Some(DeploymentUnit::new("A2")));
        assert!(factory.calls.lock().unwrap().contains(&"upgrade 0xA A2".to_string()));
        assert_eq!(telemetry.messages().last().unwrap(), "A upgraded to: 0xA");
    }

    #[tokio::test]
    async fn test_empty_plan_yields_no_results() {
        let factory = Arc::new(EchoFactory::default());
        let results = Deployer::new(factory)
            .run(&DeploymentPlan::builder().build())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_resolve_passes_literals_through() {
        let plan = DeploymentPlan::builder()
            .step("A", vec![ArgumentRef::literal("hello"), ArgumentRef::literal(true)])
            .build();
        let run = DeploymentRun::new(&plan);
        let args = run.resolve(0, plan.step(0).unwrap()).unwrap();
        assert_eq!(args, vec![json!("hello"), json!(true)]);
        assert_eq!(run.current(), 0);
        assert!(run.result(0).is_none());
    }
}
