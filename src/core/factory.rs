use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ArgValue;
use crate::core::error::FactoryError;
use crate::core::plan::DeploymentUnit;

/// The published address/handle of a live unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Identity(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Identity> for ArgValue {
    fn from(identity: &Identity) -> Self {
        ArgValue::String(identity.0.clone())
    }
}

/// Opaque token for a submitted but not yet confirmed deployment
/// (for a ledger, the transaction hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingHandle(String);

impl PendingHandle {
    pub fn new(value: impl Into<String>) -> Self {
        PendingHandle(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PendingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The factory's signal that a unit is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub identity: Identity,
    /// Opaque receipt, kept as-is for the caller.
    pub receipt: ArgValue,
}

/// The external service that actually publishes units.
///
/// `submit` hands a unit and its resolved constructor arguments to the target
/// environment; `confirm` suspends until that submission is live (or has failed).
/// The deployer never calls `confirm` concurrently with another `submit`, and never
/// retries either call.
#[async_trait]
pub trait UnitFactory: Send + Sync {
    async fn submit(
        &self,
        unit: &DeploymentUnit,
        args: &[ArgValue],
    ) -> Result<PendingHandle, FactoryError>;

    async fn confirm(&self, pending: PendingHandle) -> Result<Confirmation, FactoryError>;

    /// Replace the implementation behind `identity` with `unit`, keeping `identity` stable.
    ///
    /// The returned handle is confirmed with [`confirm`](UnitFactory::confirm) like any
    /// other submission. Factories without an upgrade capability keep the default.
    async fn upgrade(
        &self,
        _identity: &Identity,
        _unit: &DeploymentUnit,
    ) -> Result<PendingHandle, FactoryError> {
        Err(FactoryError::UpgradeUnsupported)
    }
}
