//! # deployline
//!
//! A sequential deployment orchestrator: it publishes an ordered set of
//! interdependent units (contract instances) and threads the confirmed identity
//! of each one into the constructor arguments of the units that depend on it.
//!
//! ## Features
//!
//! - **Fixed Linear Plans**: A [`DeploymentPlan`] is an ordered, immutable list of steps; arguments may only reference earlier steps
//! - **Fail-Fast Execution**: The [`Deployer`] stops at the first failure, never retries and never rolls back
//! - **Injectable Factory**: Anything implementing [`UnitFactory`] can publish units, so runs are testable without a network
//! - **Sync & Async Factories**: Blocking factories plug in through [`Blocking`]
//! - **Optional JSON-RPC Factory**: Deploys Hardhat artifacts through an Ethereum node (feature `rpc`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deployline::prelude::*;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl UnitFactory for Echo {
//!     async fn submit(&self, unit: &DeploymentUnit, _args: &[ArgValue]) -> Result<PendingHandle, FactoryError> {
//!         Ok(PendingHandle::new(unit.name()))
//!     }
//!
//!     async fn confirm(&self, pending: PendingHandle) -> Result<Confirmation, FactoryError> {
//!         Ok(Confirmation { identity: Identity::new(format!("0x{}", pending)), receipt: ArgValue::Null })
//!     }
//! }
//!
//! # async fn demo() -> Result<(), DeploymentError> {
//! let plan = DeploymentPlan::builder()
//!     .step("MyToken", vec![])
//!     .step("MyContractA", vec![ArgumentRef::step(0)])
//!     .build();
//!
//! let results = Deployer::new(Arc::new(Echo)).run(&plan).await?;
//! assert_eq!(results[1].identity.as_str(), "0xMyContractA");
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - Crate root: plan, deployer, factory boundary, telemetry and errors (re-exported from the internal `core` module)
//! - [`rpc`]: JSON-RPC factory (feature `rpc`)
//! - [`settings`]: environment settings for the binary (feature `rpc`)
//! - [`prelude`]: Commonly used types and traits (import with `use deployline::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use crate::core::ArgValue;
pub use crate::core::blocking::{Blocking, BlockingUnitFactory};
pub use crate::core::config::{DeployerConfig, UpgradeStage};
pub use crate::core::deployer::{DeploymentResult, DeploymentRun, Deployer};
pub use crate::core::error::{ConfigError, DeploymentError, FactoryError};
pub use crate::core::factory::{Confirmation, Identity, PendingHandle, UnitFactory};
pub use crate::core::plan::{ArgumentRef, DeploymentPlan, DeploymentStep, DeploymentUnit, PlanBuilder};
pub use crate::core::telemetry::{ConsoleTelemetry, DeploymentEvent, MemoryTelemetry, Telemetry};
pub use crate::core::validation::{ValidationIssue, ValidationResult};

// ============================================================================
// Prelude Module
// ============================================================================

/// The main prelude: imports everything needed to build and run a plan.
///
/// # Example
/// ```rust
/// use deployline::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        ArgValue,
        ArgumentRef,
        // Factory boundary
        Blocking,
        BlockingUnitFactory,
        Confirmation,
        // Execution
        Deployer,
        DeployerConfig,
        DeploymentError,
        DeploymentEvent,
        // Plan
        DeploymentPlan,
        DeploymentResult,
        DeploymentStep,
        DeploymentUnit,
        FactoryError,
        Identity,
        MemoryTelemetry,
        PendingHandle,
        Telemetry,
        UnitFactory,
        UpgradeStage,
    };
}

// ============================================================================
// RPC Feature
// ============================================================================

#[cfg(feature = "rpc")]
pub mod rpc;

#[cfg(feature = "rpc")]
pub mod settings;

#[cfg(feature = "rpc")]
pub use rpc::{RpcConfig, RpcFactory};

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
