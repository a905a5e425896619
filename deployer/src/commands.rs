//! Implementations of the deployer commands

use std::process::Command;

use tracing::{info, warn};

use crate::{
    artifacts::{list_artifacts, ArtifactStore},
    cli::{BuildArgs, DeployArgs},
    errors::DeployError,
    manifest::Manifest,
    orchestrator::Orchestrator,
    plan::load_plan,
    submitter::RpcSubmitter,
    types::{load_flags, DeployerContext, GasConfig},
    utils::run_command,
};

/// Run the external compile pipeline and check that it produced artifacts
pub fn build(args: BuildArgs) -> Result<(), DeployError> {
    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| DeployError::Build("no build command given".to_string()))?;

    let mut cmd = Command::new(program);
    cmd.args(program_args);
    run_command(cmd)?;

    let artifacts = list_artifacts(&args.artifacts)?;
    if artifacts.is_empty() {
        return Err(DeployError::Build(format!(
            "build produced no artifacts in {}",
            args.artifacts.display()
        )));
    }

    info!(count = artifacts.len(), "artifacts available in {}", args.artifacts.display());
    Ok(())
}

/// Deploy the plan to the target network, printing the report table
pub async fn deploy(args: DeployArgs) -> Result<(), DeployError> {
    let flags = load_flags(&args.flags)?;
    let plan = load_plan(&args.plan)?;

    let active = plan.active_flags(&flags)?;
    let mut manifest = Manifest::load(&args.manifest_dir, &args.network, &active)?;
    if args.fresh && manifest.journal().is_some() {
        warn!("discarding the record of an interrupted run on {}", args.network);
        manifest.finish_run();
    }

    let gas = GasConfig::new(args.deploy_gas_limit, args.call_gas_limit, args.gas_price);
    let submitter = RpcSubmitter::connect(&args.rpc_url, &args.priv_key).await?;
    let deployer = DeployerContext {
        address: submitter.address(),
        network: args.network,
        gas,
    };

    info!(
        deployer = %deployer.address,
        deploy_gas_limit = gas.deployment.gas_limit,
        call_gas_limit = gas.method_call.gas_limit,
        gas_price_wei = gas.deployment.gas_price_wei,
        "deploying {} steps to {}", plan.steps().len(), deployer.network
    );

    let orchestrator = Orchestrator::new(submitter, deployer, flags);
    let mut artifacts = ArtifactStore::open(&args.artifacts);

    match orchestrator.execute(&plan, manifest, &mut artifacts).await {
        Ok(deployment) => {
            println!("{}", deployment.report);
            Ok(())
        }
        Err(failed) => {
            println!("{}", failed.report);
            Err(failed.error)
        }
    }
}
