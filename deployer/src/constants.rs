//! Constants used in the deployer

/// The extension of manifest files, one per network
pub const MANIFEST_EXTENSION: &str = "json";

/// The extension of JSON artifact files, containing both ABI and bytecode
pub const ARTIFACT_JSON_EXTENSION: &str = "json";

/// The extension of standalone ABI artifact files
pub const ARTIFACT_ABI_EXTENSION: &str = "abi";

/// The extension of standalone bytecode artifact files
pub const ARTIFACT_BIN_EXTENSION: &str = "bin";

/// The default RPC URL, that of a local devnet node
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// The default gas limit for contract creation transactions
pub const DEFAULT_DEPLOY_GAS_LIMIT: u64 = 6_000_000;

/// The default gas limit for method call transactions
pub const DEFAULT_CALL_GAS_LIMIT: u64 = 300_000;

/// The default gas price, in wei (1 gwei)
pub const DEFAULT_GAS_PRICE_WEI: u128 = 1_000_000_000;

/// The default path of the deployment flag file
pub const DEFAULT_FLAGS_PATH: &str = "deploy-flags.json";

/// The default path of the deployment plan file
pub const DEFAULT_PLAN_PATH: &str = "deploy-plan.json";

/// The default directory holding the per-network manifests
pub const DEFAULT_MANIFEST_DIR: &str = "deployments";

/// The default directory holding the compiled artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
