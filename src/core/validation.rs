/// Represents an issue found while validating a deployment plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A hard error: running the plan would fail or misbehave.
    Error(String),
    /// A warning: the plan runs, but something about it looks unintended.
    Warning(String),
}

/// The result of a plan validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Error(msg.into()));
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Warning(msg.into()));
    }

    pub fn is_safe(&self) -> bool {
        !self.issues.iter().any(|i| matches!(i, ValidationIssue::Error(_)))
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| matches!(i, ValidationIssue::Warning(_)))
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().filter_map(|i| match i {
            ValidationIssue::Error(msg) => Some(msg.as_str()),
            ValidationIssue::Warning(_) => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().filter_map(|i| match i {
            ValidationIssue::Warning(msg) => Some(msg.as_str()),
            ValidationIssue::Error(_) => None,
        })
    }

    pub fn log_summary(&self) {
        if self.is_safe() && !self.has_warnings() {
            log::debug!("Plan validation passed: every argument references an earlier step.");
            return;
        }

        for issue in &self.issues {
            match issue {
                ValidationIssue::Error(msg) => log::error!("Plan error: {}", msg),
                ValidationIssue::Warning(msg) => log::warn!("Plan warning: {}", msg),
            }
        }
    }
}
