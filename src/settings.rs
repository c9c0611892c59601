//! Environment-driven settings for the `deployline` binary.
//!
//! Reads `DEPLOYLINE_*` variables (after loading an optional `.env`) into the
//! [`RpcConfig`] and [`DeployerConfig`] the binary runs with.

use std::time::Duration;

use crate::core::config::DeployerConfig;
use crate::core::error::ConfigError;
use crate::rpc::RpcConfig;

pub const RPC_URL: &str = "DEPLOYLINE_RPC_URL";
pub const ARTIFACTS: &str = "DEPLOYLINE_ARTIFACTS";
pub const FROM: &str = "DEPLOYLINE_FROM";
pub const POLL_MS: &str = "DEPLOYLINE_POLL_MS";
pub const TIMEOUT_SECS: &str = "DEPLOYLINE_TIMEOUT_SECS";
pub const UPGRADE_STEP: &str = "DEPLOYLINE_UPGRADE_STEP";
pub const UPGRADE_UNIT: &str = "DEPLOYLINE_UPGRADE_UNIT";

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub rpc: RpcConfig,
    pub deployer: DeployerConfig,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                log::warn!("Ignoring unreadable .env file: {}", err);
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        if let Some(url) = lookup(RPC_URL) {
            settings.rpc.url = url;
        }
        if let Some(artifacts) = lookup(ARTIFACTS) {
            settings.rpc.artifacts = artifacts;
        }
        settings.rpc.from = lookup(FROM).filter(|from| !from.is_empty());
        if let Some(ms) = lookup(POLL_MS) {
            settings.rpc.poll_interval = Duration::from_millis(parse(POLL_MS, &ms)?);
        }
        if let Some(secs) = lookup(TIMEOUT_SECS) {
            settings.rpc.timeout = Some(Duration::from_secs(parse(TIMEOUT_SECS, &secs)?));
        }

        match (lookup(UPGRADE_STEP), lookup(UPGRADE_UNIT)) {
            (Some(step), Some(unit)) => {
                let step = parse(UPGRADE_STEP, &step)?;
                settings.deployer = settings.deployer.with_upgrade(step, unit.as_str());
            }
            (None, None) => {}
            _ => return Err(ConfigError::Incomplete(UPGRADE_STEP, UPGRADE_UNIT)),
        }

        Ok(settings)
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
