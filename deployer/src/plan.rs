//! The deployment plan: an ordered list of steps, each building its constructor
//! arguments from the addresses of contracts handled earlier in the run

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Debug},
    fs,
    path::Path,
    sync::Arc,
};

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};

use crate::{
    artifacts::Artifact,
    errors::DeployError,
    manifest::Manifest,
    types::{ContractName, DeployerContext, DeploymentFlags},
};

// -----------
// | Handles |
// -----------

/// How a handle came to exist in this run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleOrigin {
    /// Freshly deployed by this run
    Deployed {
        /// The hash of the deployment transaction
        transaction_hash: TxHash,
    },
    /// Reused from the manifest
    Reused,
    /// Deployed by an earlier, interrupted attempt at this run
    Resumed,
}

/// A contract available to later steps of the run
#[derive(Clone, Debug)]
pub struct DeployedHandle {
    /// The name of the contract
    pub name: ContractName,
    /// The on-chain address of the contract
    pub address: Address,
    /// How the handle was obtained
    pub origin: HandleOrigin,
    /// The artifact backing the contract, if it is available
    artifact: Option<Arc<Artifact>>,
}

impl DeployedHandle {
    /// Create a handle
    pub fn new(
        name: ContractName,
        address: Address,
        origin: HandleOrigin,
        artifact: Option<Arc<Artifact>>,
    ) -> Self {
        Self {
            name,
            address,
            origin,
            artifact,
        }
    }

    /// Encode a call to one of the contract's methods
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, String> {
        let artifact = self
            .artifact
            .as_ref()
            .ok_or_else(|| format!("no artifact available for {}", self.name))?;

        artifact.encode_call(method, args)
    }
}

/// The handles created so far in a run, keyed by contract name
#[derive(Clone, Debug, Default)]
pub struct HandleRegistry {
    /// The registered handles
    handles: BTreeMap<ContractName, DeployedHandle>,
}

impl HandleRegistry {
    /// Register a handle, replacing any previous one of the same name
    pub fn insert(&mut self, handle: DeployedHandle) {
        self.handles.insert(handle.name.clone(), handle);
    }

    /// The handle for the given contract
    pub fn get(&self, name: &str) -> Option<&DeployedHandle> {
        self.handles.get(name)
    }

    /// The number of registered handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no handle is registered
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

// ----------------
// | Step context |
// ----------------

/// Everything an argument builder may consult
pub struct StepContext<'a> {
    /// The step whose arguments are being built
    pub step: &'a ContractName,
    /// The deploying account and run configuration
    pub deployer: &'a DeployerContext,
    /// The deployment flags for the run
    pub flags: &'a DeploymentFlags,
    /// The manifest as of the start of this step
    pub manifest: &'a Manifest,
    /// The handles of steps already executed in this run
    pub handles: &'a HandleRegistry,
    /// The names of every enabled step in the plan
    pub plan_steps: &'a BTreeSet<ContractName>,
}

impl StepContext<'_> {
    /// Resolve the address of a dependency.
    ///
    /// Enabled steps of this plan are only visible once they have executed.
    /// Contracts outside the plan, and those of disabled steps, are looked up
    /// in the manifest.
    pub fn address_of(&self, dependency: &str) -> Result<Address, DeployError> {
        if let Some(handle) = self.handles.get(dependency) {
            return Ok(handle.address);
        }

        if self.plan_steps.contains(dependency) {
            return Err(self.unresolved(dependency));
        }

        self.manifest.get(dependency).ok_or_else(|| self.unresolved(dependency))
    }

    /// The handle of a step already executed in this run
    pub fn handle(&self, dependency: &str) -> Result<&DeployedHandle, DeployError> {
        self.handles.get(dependency).ok_or_else(|| self.unresolved(dependency))
    }

    /// Whether the given contract is flagged for a fresh deployment on this run
    pub fn is_fresh(&self, name: &str) -> bool {
        self.flags.get(name).is_some_and(|flag| flag.deploy)
    }

    /// An error for a constructor argument that could not be built
    pub fn arg_error(&self, reason: impl Into<String>) -> DeployError {
        DeployError::ConstructorArgs {
            contract: self.step.clone(),
            reason: reason.into(),
        }
    }

    /// The error for a dependency without a known address
    fn unresolved(&self, dependency: &str) -> DeployError {
        DeployError::UnresolvedDependency {
            requester: self.step.clone(),
            missing: ContractName::new(dependency),
        }
    }
}

// ---------
// | Steps |
// ---------

/// Builds the constructor arguments of a step
pub type ArgBuilder =
    Box<dyn Fn(&StepContext<'_>) -> Result<Vec<DynSolValue>, DeployError> + Send + Sync>;

/// A single entry of the deployment plan.
///
/// The artifact deployed for a step is the one named by its deployment flag.
pub struct DeploymentStep {
    /// The name of the contract instance
    pub name: ContractName,
    /// Whether the step runs at all; disabled steps are reported but skipped
    pub enabled: bool,
    /// The constructor argument builder
    args: ArgBuilder,
}

impl DeploymentStep {
    /// An enabled step with the given argument builder
    pub fn new<F>(name: impl Into<ContractName>, args: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> Result<Vec<DynSolValue>, DeployError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            enabled: true,
            args: Box::new(args),
        }
    }

    /// An enabled step whose constructor takes no arguments
    pub fn without_args(name: impl Into<ContractName>) -> Self {
        Self::new(name, |_| Ok(Vec::new()))
    }

    /// Set whether the step is enabled
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Run the argument builder
    pub fn build_args(&self, ctx: &StepContext<'_>) -> Result<Vec<DynSolValue>, DeployError> {
        (self.args)(ctx)
    }
}

impl Debug for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentStep")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// The ordered list of deployment steps
#[derive(Debug, Default)]
pub struct Plan {
    /// The steps, in execution order
    steps: Vec<DeploymentStep>,
}

impl Plan {
    /// Build a plan from its steps, rejecting duplicate names
    pub fn new(steps: Vec<DeploymentStep>) -> Result<Self, DeployError> {
        let mut seen = BTreeSet::new();
        for step in &steps {
            if !seen.insert(step.name.clone()) {
                return Err(DeployError::DuplicateStep(step.name.clone()));
            }
        }

        Ok(Self { steps })
    }

    /// The steps, in execution order
    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    /// The names of all enabled steps
    pub fn enabled_names(&self) -> BTreeSet<ContractName> {
        self.steps.iter().filter(|step| step.enabled).map(|step| step.name.clone()).collect()
    }

    /// The flags of every enabled step, failing if one has no flag
    pub fn active_flags(&self, flags: &DeploymentFlags) -> Result<DeploymentFlags, DeployError> {
        self.steps
            .iter()
            .filter(|step| step.enabled)
            .map(|step| {
                flags
                    .get(&step.name)
                    .map(|flag| (step.name.clone(), flag.clone()))
                    .ok_or_else(|| DeployError::FlagMissing(step.name.clone()))
            })
            .collect()
    }
}

// -------------
// | Plan file |
// -------------

/// A declarative constructor argument, as written in a plan file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgSpec {
    /// The deployer's address
    Deployer,
    /// The address of another contract
    AddressOf {
        /// The contract to resolve
        contract: ContractName,
    },
    /// A Solidity value given as text, e.g. `uint256` / `1000`
    Literal {
        /// The Solidity type of the value
        #[serde(rename = "type")]
        ty: String,
        /// The textual value
        value: String,
    },
    /// Calldata for a method of a contract executed earlier in the run
    Calldata {
        /// The contract whose ABI defines the method
        contract: ContractName,
        /// The method name
        method: String,
        /// The method arguments
        #[serde(default)]
        args: Vec<ArgSpec>,
    },
    /// An array of values
    Array {
        /// The array elements
        items: Vec<ArgSpec>,
    },
}

impl ArgSpec {
    /// Resolve the argument against the step context
    pub fn resolve(&self, ctx: &StepContext<'_>) -> Result<DynSolValue, DeployError> {
        match self {
            ArgSpec::Deployer => Ok(DynSolValue::Address(ctx.deployer.address)),
            ArgSpec::AddressOf { contract } => {
                ctx.address_of(contract.as_str()).map(DynSolValue::Address)
            }
            ArgSpec::Literal { ty, value } => {
                let sol_type = DynSolType::parse(ty)
                    .map_err(|e| ctx.arg_error(format!("invalid type `{}`: {}", ty, e)))?;
                sol_type
                    .coerce_str(value)
                    .map_err(|e| ctx.arg_error(format!("invalid {} `{}`: {}", ty, value, e)))
            }
            ArgSpec::Calldata { contract, method, args } => {
                let values = resolve_all(args, ctx)?;
                let calldata = ctx
                    .handle(contract.as_str())?
                    .encode_call(method, &values)
                    .map_err(|e| ctx.arg_error(e))?;

                Ok(DynSolValue::Bytes(calldata.to_vec()))
            }
            ArgSpec::Array { items } => resolve_all(items, ctx).map(DynSolValue::Array),
        }
    }
}

/// Resolve a list of arguments in order
fn resolve_all(specs: &[ArgSpec], ctx: &StepContext<'_>) -> Result<Vec<DynSolValue>, DeployError> {
    specs.iter().map(|spec| spec.resolve(ctx)).collect()
}

/// The default for a step's `enabled` field
fn default_enabled() -> bool {
    true
}

/// A step as written in a plan file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    /// The name of the contract instance
    pub name: ContractName,
    /// Whether the step runs
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// The constructor arguments
    #[serde(default)]
    pub args: Vec<ArgSpec>,
}

impl From<StepSpec> for DeploymentStep {
    fn from(spec: StepSpec) -> Self {
        let StepSpec { name, enabled, args } = spec;
        DeploymentStep::new(name, move |ctx| resolve_all(&args, ctx)).enabled(enabled)
    }
}

/// The layout of a plan file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    /// The steps, in execution order
    pub steps: Vec<StepSpec>,
}

impl PlanFile {
    /// Convert the file into an executable plan
    pub fn into_plan(self) -> Result<Plan, DeployError> {
        Plan::new(self.steps.into_iter().map(DeploymentStep::from).collect())
    }
}

/// Read the plan file at the given path
pub fn load_plan(path: &Path) -> Result<Plan, DeployError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| DeployError::ReadFile(format!("{}: {}", path.display(), e)))?;
    let file: PlanFile = serde_json::from_str(&contents)
        .map_err(|e| DeployError::Parse(format!("{}: {}", path.display(), e)))?;

    file.into_plan()
}
