use async_trait::async_trait;
use std::sync::Arc;

use crate::core::ArgValue;
use crate::core::error::FactoryError;
use crate::core::factory::{Confirmation, Identity, PendingHandle, UnitFactory};
use crate::core::plan::DeploymentUnit;

/// A factory whose calls block the current thread until they complete.
///
/// This is the synchronous counterpart of [`UnitFactory`]. Wrap it in [`Blocking`]
/// to hand it to a [`Deployer`](crate::core::deployer::Deployer).
pub trait BlockingUnitFactory: Send + Sync + 'static {
    fn submit(
        &self,
        unit: &DeploymentUnit,
        args: &[ArgValue],
    ) -> Result<PendingHandle, FactoryError>;

    fn confirm(&self, pending: PendingHandle) -> Result<Confirmation, FactoryError>;

    fn upgrade(
        &self,
        _identity: &Identity,
        _unit: &DeploymentUnit,
    ) -> Result<PendingHandle, FactoryError> {
        Err(FactoryError::UpgradeUnsupported)
    }
}

/// Runs a [`BlockingUnitFactory`] on tokio's blocking pool.
///
/// Each call is awaited before the deployer moves on, so the blocking factory sees
/// exactly the same sequential call order as an async one.
pub struct Blocking<F> {
    inner: Arc<F>,
}

impl<F> Clone for Blocking<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: BlockingUnitFactory> Blocking<F> {
    pub fn new(factory: F) -> Self {
        Self {
            inner: Arc::new(factory),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    async fn call<T, C>(&self, call: C) -> Result<T, FactoryError>
    where
        T: Send + 'static,
        C: FnOnce(&F) -> Result<T, FactoryError> + Send + 'static,
    {
        let factory = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || call(factory.as_ref())).await {
            Ok(result) => result,
            Err(join_error) => {
                log::error!("A blocking factory call panicked: {:?}", join_error);
                Err(FactoryError::Panicked(join_error.to_string()))
            }
        }
    }
}

#[async_trait]
impl<F: BlockingUnitFactory> UnitFactory for Blocking<F> {
    async fn submit(
        &self,
        unit: &DeploymentUnit,
        args: &[ArgValue],
    ) -> Result<PendingHandle, FactoryError> {
        let unit = unit.clone();
        let args = args.to_vec();
        self.call(move |f| f.submit(&unit, &args)).await
    }

    async fn confirm(&self, pending: PendingHandle) -> Result<Confirmation, FactoryError> {
        self.call(move |f| f.confirm(pending)).await
    }

    async fn upgrade(
        &self,
        identity: &Identity,
        unit: &DeploymentUnit,
    ) -> Result<PendingHandle, FactoryError> {
        let identity = identity.clone();
        let unit = unit.clone();
        self.call(move |f| f.upgrade(&identity, &unit)).await
    }
}
