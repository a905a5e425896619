//! Shared fixtures for the orchestrator tests: an in-memory submitter and
//! helpers to assemble flags, artifacts, and manifests.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    fs,
    path::Path,
    sync::{
        atomic::{AtomicU8, Ordering},
        Mutex,
    },
};

use alloy_primitives::{Address, Bytes, TxHash};
use deployer::{
    artifacts::{Artifact, ArtifactStore},
    errors::SubmissionError,
    manifest::{manifest_path, Manifest},
    orchestrator::{Deployment, FailedRun, Orchestrator},
    plan::Plan,
    submitter::{DeployedContract, DeploymentRequest, Submitter},
    types::{
        ContractName, DeployerContext, DeploymentFlag, DeploymentFlags, GasClass, GasConfig,
    },
};

/// The network used by every test
pub const NETWORK: &str = "devnet";

/// An ABI with no constructor
pub const NO_ARGS_ABI: &str = "[]";

/// An ABI whose constructor takes a single address
pub const ONE_ADDRESS_ABI: &str = r#"[
    {
        "type": "constructor",
        "inputs": [ { "name": "dependency", "type": "address", "internalType": "address" } ],
        "stateMutability": "nonpayable"
    }
]"#;

/// An ABI with an `initialize(address)` method and no constructor
pub const INITIALIZABLE_ABI: &str = r#"[
    {
        "type": "function",
        "name": "initialize",
        "inputs": [ { "name": "owner", "type": "address", "internalType": "address" } ],
        "outputs": [],
        "stateMutability": "nonpayable"
    }
]"#;

/// An ABI whose constructor takes an implementation address and the calldata
/// to initialize it with
pub const PROXY_ABI: &str = r#"[
    {
        "type": "constructor",
        "inputs": [
            { "name": "implementation", "type": "address", "internalType": "address" },
            { "name": "data", "type": "bytes", "internalType": "bytes" }
        ],
        "stateMutability": "nonpayable"
    }
]"#;

/// The bytecode of every test artifact
pub const BYTECODE: [u8; 2] = [0x60, 0x80];

/// A submission observed by the mock submitter
#[derive(Clone, Debug)]
pub struct Submission {
    /// The contract deployed
    pub contract: ContractName,
    /// The creation code sent
    pub init_code: Bytes,
    /// The gas class requested
    pub gas_class: GasClass,
}

/// A submitter that "deploys" to sequential fake addresses
#[derive(Default)]
pub struct MockSubmitter {
    /// Every submission received, in order
    pub submissions: Mutex<Vec<Submission>>,
    /// Contracts whose deployment should fail
    pub failing: Vec<ContractName>,
    /// Fixed addresses for particular contracts
    pub addresses: BTreeMap<ContractName, Address>,
    /// The byte used for the next generated address
    next_byte: AtomicU8,
}

impl MockSubmitter {
    /// A submitter that fails when deploying the given contract
    pub fn failing_on(name: &str) -> Self {
        Self {
            failing: vec![name.into()],
            ..Default::default()
        }
    }

    /// A submitter that deploys `name` to `address`
    pub fn with_address(name: &str, address: Address) -> Self {
        Self {
            addresses: [(name.into(), address)].into_iter().collect(),
            ..Default::default()
        }
    }

    /// The names of the contracts submitted so far
    pub fn submitted(&self) -> Vec<String> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.contract.to_string())
            .collect()
    }

    /// The creation code submitted for the given contract
    pub fn init_code(&self, name: &str) -> Bytes {
        let submissions = self.submissions.lock().unwrap();
        let submission = submissions
            .iter()
            .find(|s| s.contract.as_str() == name)
            .unwrap();
        submission.init_code.clone()
    }
}

impl Submitter for MockSubmitter {
    async fn submit(
        &self,
        request: DeploymentRequest<'_>,
    ) -> Result<DeployedContract, SubmissionError> {
        self.submissions.lock().unwrap().push(Submission {
            contract: request.contract.clone(),
            init_code: request.init_code.clone(),
            gas_class: request.gas.class,
        });

        if self.failing.contains(request.contract) {
            return Err(SubmissionError("transaction reverted".to_string()));
        }

        let address = match self.addresses.get(request.contract) {
            Some(address) => *address,
            None => Address::repeat_byte(0x10 + self.next_byte.fetch_add(1, Ordering::SeqCst)),
        };
        Ok(DeployedContract {
            address,
            transaction_hash: TxHash::repeat_byte(0x77),
        })
    }
}

/// The deployer context used by every test
pub fn deployer() -> DeployerContext {
    DeployerContext {
        address: Address::repeat_byte(0xde),
        network: NETWORK.to_string(),
        gas: GasConfig::new(6_000_000, 200_000, 1_000_000_000),
    }
}

/// Build a flag map from `(name, deploy, artifact)` triples
pub fn flags(entries: &[(&str, bool, &str)]) -> DeploymentFlags {
    entries
        .iter()
        .map(|(name, deploy, artifact)| {
            let flag = if *deploy {
                DeploymentFlag::deploy(*artifact)
            } else {
                DeploymentFlag::reuse(*artifact)
            };
            (ContractName::from(*name), flag)
        })
        .collect()
}

/// An artifact with the given ABI and the test bytecode
pub fn artifact(name: &str, abi: &str) -> Artifact {
    let abi = serde_json::from_str(abi).unwrap();
    Artifact::new(name, abi, Bytes::from(BYTECODE.to_vec()))
}

/// An artifact store holding every test artifact
pub fn store() -> ArtifactStore {
    ArtifactStore::in_memory([
        artifact("NoArgs", NO_ARGS_ABI),
        artifact("OneAddress", ONE_ADDRESS_ABI),
        artifact("Initializable", INITIALIZABLE_ABI),
        artifact("Proxy", PROXY_ABI),
    ])
}

/// An orchestrator for the given submitter and flags
pub fn orchestrator(
    submitter: MockSubmitter,
    flags: DeploymentFlags,
) -> Orchestrator<MockSubmitter> {
    Orchestrator::new(submitter, deployer(), flags)
}

/// Execute the plan against the test artifact store
pub async fn run(
    orchestrator: &Orchestrator<MockSubmitter>,
    plan: &Plan,
    manifest: Manifest,
) -> Result<Deployment, FailedRun> {
    orchestrator.execute(plan, manifest, &mut store()).await
}

/// An empty manifest for the test network in `dir`
pub fn empty_manifest(dir: &Path) -> Manifest {
    Manifest::empty(manifest_path(dir, NETWORK))
}

/// Write a plain name to address manifest for the test network in `dir`
pub fn write_manifest(dir: &Path, entries: &[(&str, Address)]) {
    let entries: BTreeMap<&str, Address> = entries.iter().copied().collect();
    let contents = serde_json::to_string_pretty(&entries).unwrap();
    fs::write(manifest_path(dir, NETWORK), contents).unwrap();
}

/// Reload the test network's manifest from `dir`
pub fn reload(dir: &Path) -> Manifest {
    Manifest::read(manifest_path(dir, NETWORK)).unwrap()
}

/// The trailing address argument of a creation code
pub fn last_address(init_code: &Bytes) -> Address {
    Address::from_slice(&init_code[init_code.len() - 20..])
}
