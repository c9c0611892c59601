use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::factory::Identity;

/// A progress notification emitted by a deployment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeploymentEvent {
    Deployed {
        run_id: Uuid,
        timestamp: u64,
        step: usize,
        unit: String,
        identity: Identity,
    },
    Upgraded {
        run_id: Uuid,
        timestamp: u64,
        step: usize,
        unit: String,
        identity: Identity,
    },
    Failed {
        run_id: Uuid,
        timestamp: u64,
        step: Option<usize>,
        unit: Option<String>,
        error: String,
    },
}

impl DeploymentEvent {
    /// The human-readable progress line for this event.
    pub fn message(&self) -> String {
        match self {
            DeploymentEvent::Deployed { unit, identity, .. } => {
                format!("{} deployed to: {}", unit, identity)
            }
            DeploymentEvent::Upgraded { unit, identity, .. } => {
                format!("{} upgraded to: {}", unit, identity)
            }
            DeploymentEvent::Failed {
                step: Some(step),
                unit: Some(unit),
                error,
                ..
            } => format!("Step {} ({}) failed: {}", step, unit, error),
            DeploymentEvent::Failed { error, .. } => format!("Deployment failed: {}", error),
        }
    }
}

pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Trait for receiving deployment progress.
pub trait Telemetry: Send + Sync {
    fn record(&self, event: DeploymentEvent);
    fn flush(&self);
}

/// Simple in-memory collector for events.
#[derive(Default)]
pub struct MemoryTelemetry {
    events: std::sync::Mutex<Vec<DeploymentEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DeploymentEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().iter().map(DeploymentEvent::message).collect()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, event: DeploymentEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}

/// Prints one progress line per completed step to stdout.
///
/// Failures are left to the caller, which reports them once on stderr before exiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTelemetry;

impl ConsoleTelemetry {
    /// The stdout line for `event`; `None` for failures.
    pub fn line(event: &DeploymentEvent) -> Option<String> {
        match event {
            DeploymentEvent::Failed { .. } => None,
            _ => Some(event.message()),
        }
    }
}

impl Telemetry for ConsoleTelemetry {
    fn record(&self, event: DeploymentEvent) {
        if let Some(line) = Self::line(&event) {
            println!("{}", line);
        }
    }

    fn flush(&self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}
