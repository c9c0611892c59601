//! Deploys MyToken, then MyContractA with MyToken's address, then MyContractB
//! with MyContractA's address.
//!
//! Takes no flags. The node, artifacts directory and the optional upgrade stage
//! come from `DEPLOYLINE_*` environment variables (see [`deployline::settings`]).

use std::process::ExitCode;
use std::sync::Arc;

use deployline::prelude::*;
use deployline::settings::Settings;
use deployline::{ConsoleTelemetry, RpcFactory};

fn plan() -> DeploymentPlan {
    DeploymentPlan::builder()
        .step("MyToken", vec![])
        .step("MyContractA", vec![ArgumentRef::step(0)])
        .step("MyContractB", vec![ArgumentRef::step(1)])
        .build()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let factory = Arc::new(RpcFactory::new(settings.rpc));
    let deployer = Deployer::new(factory)
        .with_config(settings.deployer)
        .with_telemetry(Arc::new(ConsoleTelemetry));

    match deployer.run(&plan()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
