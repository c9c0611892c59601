//! A scripted factory for exercising the deployer without a network.

use async_trait::async_trait;
use deployline::prelude::*;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Submit { unit: String, args: Vec<ArgValue> },
    Confirm { unit: String },
    Upgrade { identity: String, unit: String },
}

/// Confirms every unit as `0x<unit name>` unless told to fail it.
#[derive(Default)]
pub struct ScriptedFactory {
    calls: Mutex<Vec<Call>>,
    fail_submit: Option<String>,
    fail_confirm: Option<String>,
}

#[allow(dead_code)]
impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_submit(unit: &str) -> Self {
        Self {
            fail_submit: Some(unit.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_confirm(unit: &str) -> Self {
        Self {
            fail_confirm: Some(unit.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<(String, Vec<ArgValue>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit { unit, args } => Some((unit, args)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl UnitFactory for ScriptedFactory {
    async fn submit(
        &self,
        unit: &DeploymentUnit,
        args: &[ArgValue],
    ) -> Result<PendingHandle, FactoryError> {
        tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
        self.calls.lock().unwrap().push(Call::Submit {
            unit: unit.name().to_string(),
            args: args.to_vec(),
        });
        if self.fail_submit.as_deref() == Some(unit.name()) {
            return Err(FactoryError::Rejected(format!("{} is malformed", unit)));
        }
        Ok(PendingHandle::new(unit.name()))
    }

    async fn confirm(&self, pending: PendingHandle) -> Result<Confirmation, FactoryError> {
        tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
        self.calls.lock().unwrap().push(Call::Confirm {
            unit: pending.to_string(),
        });
        if self.fail_confirm.as_deref() == Some(pending.as_str()) {
            return Err(FactoryError::Reverted(format!("{} reverted", pending)));
        }
        Ok(Confirmation {
            identity: Identity::new(format!("0x{}", pending)),
            receipt: serde_json::json!({ "status": "0x1", "unit": pending.as_str() }),
        })
    }

    async fn upgrade(
        &self,
        identity: &Identity,
        unit: &DeploymentUnit,
    ) -> Result<PendingHandle, FactoryError> {
        self.calls.lock().unwrap().push(Call::Upgrade {
            identity: identity.to_string(),
            unit: unit.name().to_string(),
        });
        // The proxy keeps its address, so confirming reports the original identity.
        Ok(PendingHandle::new(identity.as_str().trim_start_matches("0x")))
    }
}
