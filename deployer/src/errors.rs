//! Definitions of errors that can occur during a deployment run

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use itertools::Itertools;

use crate::types::ContractName;

/// Errors that can occur while building, validating, or executing a deployment plan
#[derive(Debug)]
pub enum DeployError {
    /// No manifest file exists for the network, but some contracts are flagged for reuse
    ManifestMissing {
        /// The manifest file that was expected to exist
        path: PathBuf,
    },
    /// Contracts flagged for reuse have no recorded address in the manifest
    ManifestIncomplete {
        /// The contracts lacking an address
        missing: Vec<ContractName>,
        /// The manifest file the addresses were expected in
        path: PathBuf,
    },
    /// The compiled artifact backing a contract could not be found
    ArtifactNotFound {
        /// The contract that needs the artifact
        contract: ContractName,
        /// The name of the missing artifact
        artifact: String,
    },
    /// A plan step references a contract whose address is not yet known
    UnresolvedDependency {
        /// The step whose arguments were being built
        requester: ContractName,
        /// The contract whose address could not be resolved
        missing: ContractName,
    },
    /// A plan step has no entry in the deployment flag file
    FlagMissing(ContractName),
    /// Two plan steps share a contract name
    DuplicateStep(ContractName),
    /// The deployment transaction for a contract failed
    Submission {
        /// The contract being deployed
        contract: ContractName,
        /// The underlying submission failure
        source: SubmissionError,
    },
    /// Error building the constructor arguments or calldata for a contract
    ConstructorArgs {
        /// The contract whose arguments were being built
        contract: ContractName,
        /// A description of the failure
        reason: String,
    },
    /// Error reading a file
    ReadFile(String),
    /// Error writing a file
    WriteFile(String),
    /// Error parsing a flag, plan, manifest, or artifact file
    Parse(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error running the external build pipeline
    Build(String),
}

impl Display for DeployError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::ManifestMissing { path } => write!(
                f,
                "no manifest found at {}, but some contracts are flagged for reuse",
                path.display()
            ),
            DeployError::ManifestIncomplete { missing, path } => write!(
                f,
                "contracts flagged for reuse have no address in {}: {}",
                path.display(),
                missing.iter().join(", ")
            ),
            DeployError::ArtifactNotFound { contract, artifact } => write!(
                f,
                "compiled artifact `{}` for contract {} not found",
                artifact, contract
            ),
            DeployError::UnresolvedDependency { requester, missing } => write!(
                f,
                "contract {} depends on {}, which has no known address at this point in the plan",
                requester, missing
            ),
            DeployError::FlagMissing(name) => {
                write!(f, "contract {} has no entry in the deployment flags", name)
            }
            DeployError::DuplicateStep(name) => {
                write!(f, "contract {} appears more than once in the plan", name)
            }
            DeployError::Submission { contract, source } => {
                write!(f, "error deploying {}: {}", contract, source)
            }
            DeployError::ConstructorArgs { contract, reason } => {
                write!(f, "error constructing arguments for {}: {}", contract, reason)
            }
            DeployError::ReadFile(s) => write!(f, "error reading file: {}", s),
            DeployError::WriteFile(s) => write!(f, "error writing file: {}", s),
            DeployError::Parse(s) => write!(f, "error parsing input: {}", s),
            DeployError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            DeployError::Build(s) => write!(f, "error running build pipeline: {}", s),
        }
    }
}

impl Error for DeployError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DeployError::Submission { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// An opaque failure reported by a transaction submitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionError(pub String);

impl SubmissionError {
    /// Wrap any displayable error as a submission error
    pub fn new(err: impl Display) -> Self {
        Self(err.to_string())
    }
}

impl Display for SubmissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for SubmissionError {}
