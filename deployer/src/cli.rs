//! Definitions of CLI arguments and commands for the deployer

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{build, deploy},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_CALL_GAS_LIMIT, DEFAULT_DEPLOY_GAS_LIMIT,
        DEFAULT_FLAGS_PATH, DEFAULT_GAS_PRICE_WEI, DEFAULT_MANIFEST_DIR, DEFAULT_PLAN_PATH,
        DEFAULT_RPC_URL,
    },
    errors::DeployError,
};

/// Build and deploy a fixed set of contracts, reusing those already on-chain
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The deployer's commands
#[derive(Subcommand)]
pub enum Command {
    /// Run the external compile pipeline that produces the artifacts
    Build(BuildArgs),
    /// Deploy the contracts of a plan to a network
    Deploy(DeployArgs),
}

impl Command {
    /// Run the command
    pub async fn run(self) -> Result<(), DeployError> {
        match self {
            Command::Build(args) => build(args),
            Command::Deploy(args) => deploy(args).await,
        }
    }
}

/// Run the compile pipeline
#[derive(Args)]
pub struct BuildArgs {
    /// Directory the pipeline writes compiled artifacts to
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// The compile command and its arguments, given after `--`
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Deploy the contracts of a plan.
///
/// Contracts flagged with `deploy: false` reuse the address recorded in the
/// network's manifest; all others are deployed fresh, in plan order. Only one
/// deployment may run against a network's manifest at a time.
#[derive(Args)]
pub struct DeployArgs {
    /// Name of the target network, which selects the manifest file
    #[arg(short, long)]
    pub network: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Private key of the deployer
    #[arg(long, env = "PKEY", hide_env_values = true)]
    pub priv_key: String,

    /// Gas limit for contract creation transactions
    #[arg(long, default_value_t = DEFAULT_DEPLOY_GAS_LIMIT)]
    pub deploy_gas_limit: u64,

    /// Gas limit for method call transactions
    #[arg(long, default_value_t = DEFAULT_CALL_GAS_LIMIT)]
    pub call_gas_limit: u64,

    /// Gas price, in wei
    #[arg(long, default_value_t = DEFAULT_GAS_PRICE_WEI)]
    pub gas_price: u128,

    /// Path to the deployment flag file
    #[arg(long, default_value = DEFAULT_FLAGS_PATH)]
    pub flags: PathBuf,

    /// Path to the deployment plan file
    #[arg(long, default_value = DEFAULT_PLAN_PATH)]
    pub plan: PathBuf,

    /// Directory holding the per-network manifests
    #[arg(long, default_value = DEFAULT_MANIFEST_DIR)]
    pub manifest_dir: PathBuf,

    /// Directory holding the compiled artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Discard the record of an interrupted run and deploy every flagged
    /// contract again
    #[arg(long)]
    pub fresh: bool,
}
