//! Type definitions used throughout the deployer

use std::{
    borrow::Borrow,
    collections::BTreeMap,
    fmt::{self, Display},
    fs,
    path::Path,
};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::DeployError;

/// The logical name of a deployed contract instance.
///
/// Distinct from the artifact name: a single artifact may back several named
/// instances, e.g. one token contract per currency.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractName(String);

impl ContractName {
    /// Create a contract name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for ContractName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Whether a contract must be freshly deployed, and the artifact backing it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentFlag {
    /// Whether a fresh deployment is required on this run
    pub deploy: bool,
    /// The name of the compiled artifact to deploy
    pub artifact: String,
}

impl DeploymentFlag {
    /// A flag requiring a fresh deployment of the given artifact
    pub fn deploy(artifact: impl Into<String>) -> Self {
        Self {
            deploy: true,
            artifact: artifact.into(),
        }
    }

    /// A flag reusing the recorded address of an instance of the given artifact
    pub fn reuse(artifact: impl Into<String>) -> Self {
        Self {
            deploy: false,
            artifact: artifact.into(),
        }
    }
}

/// The deployment flags for a run, keyed by contract name
pub type DeploymentFlags = BTreeMap<ContractName, DeploymentFlag>;

/// Read the deployment flag file at the given path
pub fn load_flags(path: &Path) -> Result<DeploymentFlags, DeployError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| DeployError::ReadFile(format!("{}: {}", path.display(), e)))?;

    serde_json::from_str(&contents)
        .map_err(|e| DeployError::Parse(format!("{}: {}", path.display(), e)))
}

// -------
// | Gas |
// -------

/// The cost class of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasClass {
    /// A contract creation transaction
    Deployment,
    /// A call to a method of an already deployed contract
    MethodCall,
}

impl Display for GasClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GasClass::Deployment => write!(f, "deployment"),
            GasClass::MethodCall => write!(f, "method-call"),
        }
    }
}

/// The gas parameters attached to a single transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasParams {
    /// The cost class these parameters apply to
    pub class: GasClass,
    /// The gas limit of the transaction
    pub gas_limit: u64,
    /// The gas price, in wei
    pub gas_price_wei: u128,
}

/// The gas parameters for each transaction class, fixed for the duration of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasConfig {
    /// Parameters for contract creation transactions
    pub deployment: GasParams,
    /// Parameters for method call transactions
    pub method_call: GasParams,
}

impl GasConfig {
    /// Build the gas configuration from the limits and the shared gas price
    pub fn new(deploy_gas_limit: u64, call_gas_limit: u64, gas_price_wei: u128) -> Self {
        if call_gas_limit > deploy_gas_limit {
            warn!(
                deploy_gas_limit,
                call_gas_limit, "method-call gas limit exceeds the deployment gas limit"
            );
        }

        Self {
            deployment: GasParams {
                class: GasClass::Deployment,
                gas_limit: deploy_gas_limit,
                gas_price_wei,
            },
            method_call: GasParams {
                class: GasClass::MethodCall,
                gas_limit: call_gas_limit,
                gas_price_wei,
            },
        }
    }

    /// The parameters for the given class
    pub fn params(&self, class: GasClass) -> GasParams {
        match class {
            GasClass::Deployment => self.deployment,
            GasClass::MethodCall => self.method_call,
        }
    }
}

/// The identity and configuration of the account performing a run.
///
/// Passed explicitly to every submission and every argument builder.
#[derive(Clone, Debug)]
pub struct DeployerContext {
    /// The address of the deploying account
    pub address: Address,
    /// The name of the target network
    pub network: String,
    /// The gas configuration for the run
    pub gas: GasConfig,
}
