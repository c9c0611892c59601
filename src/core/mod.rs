pub mod blocking;
pub mod config;
pub mod deployer;
pub mod error;
pub mod factory;
pub mod plan;
pub mod telemetry;
pub mod validation;

/// The alias for serde_json::Value, used for constructor arguments and receipts
pub type ArgValue = serde_json::Value;
