use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::core::ArgValue;
use crate::core::config::UpgradeStage;
use crate::core::validation::ValidationResult;

/// A named unit definition the factory knows how to publish (e.g. a compiled contract).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentUnit(String);

impl DeploymentUnit {
    pub fn new(name: impl Into<String>) -> Self {
        DeploymentUnit(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeploymentUnit {
    fn from(name: &str) -> Self {
        DeploymentUnit::new(name)
    }
}

/// One constructor argument of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgumentRef {
    /// Passed to the factory unchanged.
    Literal(ArgValue),
    /// The identity published by the step at this index. Must be an earlier step.
    Step(usize),
}

impl ArgumentRef {
    pub fn literal(value: impl Into<ArgValue>) -> Self {
        ArgumentRef::Literal(value.into())
    }

    pub fn step(index: usize) -> Self {
        ArgumentRef::Step(index)
    }
}

/// A unit paired with its constructor argument template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStep {
    pub unit: DeploymentUnit,
    pub args: Vec<ArgumentRef>,
}

impl DeploymentStep {
    pub fn new(unit: impl Into<DeploymentUnit>, args: Vec<ArgumentRef>) -> Self {
        Self {
            unit: unit.into(),
            args,
        }
    }
}

/// An ordered, immutable sequence of deployment steps.
///
/// The order is the dependency order and the execution order. A plan is built once
/// through [`PlanBuilder`] and never mutated afterwards; a different deployment
/// needs a new plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    steps: Vec<DeploymentStep>,
}

impl DeploymentPlan {
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&DeploymentStep> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeploymentStep> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks the plan's reference structure before anything is submitted.
    ///
    /// Forward and self references are errors, as is an upgrade stage pointing
    /// past the end of the plan. Duplicate and empty unit names only produce
    /// warnings: they are legal but make progress reports ambiguous.
    pub fn validate(&self, upgrade: &UpgradeStage) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut seen = HashSet::new();

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.unit.name();
            if name.trim().is_empty() {
                result.add_warning(format!("Step {} has an empty unit name.", index));
            }
            if !seen.insert(name) {
                result.add_warning(format!(
                    "Unit '{}' is deployed more than once (again at step {}).",
                    name, index
                ));
            }

            for (position, arg) in step.args.iter().enumerate() {
                if let ArgumentRef::Step(target) = arg {
                    if *target == index {
                        result.add_error(format!(
                            "Step {} ('{}') argument {} references itself.",
                            index, name, position
                        ));
                    } else if *target > index {
                        result.add_error(format!(
                            "Step {} ('{}') argument {} references later step {}.",
                            index, name, position, target
                        ));
                    }
                }
            }
        }

        if let UpgradeStage::Upgrade { step, unit } = upgrade {
            if *step >= self.steps.len() {
                result.add_error(format!(
                    "Upgrade to '{}' targets step {} but the plan has {} steps.",
                    unit,
                    step,
                    self.steps.len()
                ));
            }
        }

        result
    }
}

impl<'a> IntoIterator for &'a DeploymentPlan {
    type Item = &'a DeploymentStep;
    type IntoIter = std::slice::Iter<'a, DeploymentStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Accumulates steps in order and freezes them into a [`DeploymentPlan`].
#[derive(Debug, Default)]
pub struct PlanBuilder {
    steps: Vec<DeploymentStep>,
}

impl PlanBuilder {
    /// Appends a step. Its index is the number of steps added before it.
    pub fn step(mut self, unit: impl Into<DeploymentUnit>, args: Vec<ArgumentRef>) -> Self {
        self.steps.push(DeploymentStep::new(unit, args));
        self
    }

    pub fn build(self) -> DeploymentPlan {
        DeploymentPlan { steps: self.steps }
    }
}
