use serde::{Deserialize, Serialize};

use crate::core::plan::DeploymentUnit;

/// The optional stage that runs after every step of the plan has been confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeStage {
    /// No upgrade; the run ends with the last step.
    #[default]
    Skip,
    /// Swap the implementation behind the identity of `step` for `unit`.
    Upgrade { step: usize, unit: DeploymentUnit },
}

impl UpgradeStage {
    pub fn is_enabled(&self) -> bool {
        matches!(self, UpgradeStage::Upgrade { .. })
    }
}

/// Configuration for [`Deployer`](crate::core::deployer::Deployer)
#[derive(Clone, Debug)]
pub struct DeployerConfig {
    /// Post-plan upgrade stage (default: skip)
    pub upgrade: UpgradeStage,
    /// Reject structurally invalid plans before the first submission (default: true)
    pub validate_plan: bool,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            upgrade: UpgradeStage::Skip,
            validate_plan: true,
        }
    }
}

impl DeployerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the upgrade stage for the step at `step`.
    pub fn with_upgrade(mut self, step: usize, unit: impl Into<DeploymentUnit>) -> Self {
        self.upgrade = UpgradeStage::Upgrade {
            step,
            unit: unit.into(),
        };
        self
    }

    /// Skip up-front validation; argument references are still checked as each step runs.
    pub fn without_validation(mut self) -> Self {
        self.validate_plan = false;
        self
    }
}
