use thiserror::Error;

use crate::core::plan::ArgumentRef;

/// What a [`UnitFactory`](crate::core::factory::UnitFactory) reports when it cannot
/// publish or confirm a unit.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Deployment rejected: {0}")]
    Rejected(String),

    #[error("Deployment reverted: {0}")]
    Reverted(String),

    #[error("Unknown unit definition: {0}")]
    UnknownUnit(String),

    #[error("Upgrades are not supported by this factory")]
    UpgradeUnsupported,

    #[cfg(feature = "rpc")]
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out waiting for {0}")]
    TimedOut(String),

    #[error("Blocking factory call panicked: {0}")]
    Panicked(String),
}

/// The single terminating failure of a deployment run.
///
/// Every variant tied to a step carries the step's position and unit name so the
/// caller can tell exactly where the pipeline stopped.
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Step {step} ({unit}): argument {reference:?} does not point to a completed earlier step")]
    ArgumentResolution {
        step: usize,
        unit: String,
        reference: ArgumentRef,
    },

    #[error("Step {step} ({unit}): submission failed: {source}")]
    Submission {
        step: usize,
        unit: String,
        #[source]
        source: FactoryError,
    },

    #[error("Step {step} ({unit}): confirmation failed: {source}")]
    Confirmation {
        step: usize,
        unit: String,
        #[source]
        source: FactoryError,
    },

    #[error("Upgrade of step {step} to {unit} failed: {source}")]
    Upgrade {
        step: usize,
        unit: String,
        #[source]
        source: FactoryError,
    },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

impl DeploymentError {
    /// Index of the step that stopped the run, if the failure belongs to one.
    pub fn step(&self) -> Option<usize> {
        match self {
            DeploymentError::ArgumentResolution { step, .. }
            | DeploymentError::Submission { step, .. }
            | DeploymentError::Confirmation { step, .. }
            | DeploymentError::Upgrade { step, .. } => Some(*step),
            DeploymentError::InvalidPlan(_) => None,
        }
    }

    /// Unit name of the failing step (for upgrades, the replacement unit).
    pub fn unit(&self) -> Option<&str> {
        match self {
            DeploymentError::ArgumentResolution { unit, .. }
            | DeploymentError::Submission { unit, .. }
            | DeploymentError::Confirmation { unit, .. }
            | DeploymentError::Upgrade { unit, .. } => Some(unit),
            DeploymentError::InvalidPlan(_) => None,
        }
    }

    /// What went wrong, without the step and unit prefix of the full message.
    pub fn cause(&self) -> String {
        match self {
            DeploymentError::ArgumentResolution { reference, .. } => format!(
                "argument {:?} does not point to a completed earlier step",
                reference
            ),
            DeploymentError::Submission { source, .. } => format!("submission failed: {}", source),
            DeploymentError::Confirmation { source, .. } => {
                format!("confirmation failed: {}", source)
            }
            DeploymentError::Upgrade { source, .. } => format!("upgrade failed: {}", source),
            DeploymentError::InvalidPlan(_) => self.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}
