//! The per-network deployment manifest, mapping contract names to deployed addresses
//!
//! A manifest lives at `<dir>/<network>.json` and is a flat mapping of contract
//! names to addresses. While a run is in progress the mapping moves under a
//! `deployments` key, next to an `interrupted_run` record of the contracts that
//! run has freshly deployed, so that an interrupted run can be resumed without
//! redeploying them. Both layouts are accepted on load.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    constants::MANIFEST_EXTENSION,
    errors::DeployError,
    types::{ContractName, DeploymentFlags},
};

/// The on-disk representation of a manifest
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    /// A manifest carrying the journal of an in-progress run
    InProgress(InProgressFile),
    /// A plain mapping of contract names to addresses
    Settled(BTreeMap<ContractName, Address>),
}

/// A manifest written while a run is in progress
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct InProgressFile {
    /// The recorded contract addresses
    deployments: BTreeMap<ContractName, Address>,
    /// The journal of the run, if it has not completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interrupted_run: Option<RunJournal>,
}

/// The contracts freshly deployed by a run that has not yet completed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunJournal {
    /// The contracts deployed and persisted so far
    pub completed: BTreeSet<ContractName>,
}

/// The deployed addresses for a single network
#[derive(Clone, Debug)]
pub struct Manifest {
    /// The path the manifest is persisted to
    path: PathBuf,
    /// The recorded contract addresses
    deployments: BTreeMap<ContractName, Address>,
    /// The journal of the in-progress run, if any
    journal: Option<RunJournal>,
    /// Whether the in-memory state differs from the last persisted state
    dirty: bool,
}

/// The path of the manifest for the given network
pub fn manifest_path(dir: &Path, network: &str) -> PathBuf {
    dir.join(format!("{network}.{MANIFEST_EXTENSION}"))
}

/// Return every contract flagged for reuse that has no address in the manifest
pub fn check_completeness(flags: &DeploymentFlags, manifest: &Manifest) -> Vec<ContractName> {
    flags
        .iter()
        .filter(|(name, flag)| !flag.deploy && !manifest.contains(name.as_str()))
        .map(|(name, _)| name.clone())
        .collect()
}

impl Manifest {
    /// An empty manifest that will be persisted to the given path
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            deployments: BTreeMap::new(),
            journal: None,
            dirty: false,
        }
    }

    /// Load the manifest for `network` from `dir`.
    ///
    /// A missing manifest is only acceptable if no contract is flagged for reuse.
    pub fn load(dir: &Path, network: &str, flags: &DeploymentFlags) -> Result<Self, DeployError> {
        let path = manifest_path(dir, network);
        if !path.exists() {
            if flags.values().any(|flag| !flag.deploy) {
                return Err(DeployError::ManifestMissing { path });
            }

            info!("no manifest at {}, starting from an empty one", path.display());
            return Ok(Self::empty(path));
        }

        Self::read(path)
    }

    /// Read a manifest from an existing file
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let path = path.into();
        let contents = fs::read_to_string(&path)
            .map_err(|e| DeployError::ReadFile(format!("{}: {}", path.display(), e)))?;
        let file: ManifestFile = serde_json::from_str(&contents)
            .map_err(|e| DeployError::Parse(format!("{}: {}", path.display(), e)))?;

        let (deployments, journal) = match file {
            ManifestFile::InProgress(InProgressFile { deployments, interrupted_run }) => {
                (deployments, interrupted_run)
            }
            ManifestFile::Settled(deployments) => (deployments, None),
        };
        debug!(entries = deployments.len(), "loaded manifest from {}", path.display());

        Ok(Self {
            path,
            deployments,
            journal,
            dirty: false,
        })
    }

    /// The path this manifest is persisted to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The recorded address of the given contract
    pub fn get(&self, name: &str) -> Option<Address> {
        self.deployments.get(name).copied()
    }

    /// Whether the manifest records an address for the given contract
    pub fn contains(&self, name: &str) -> bool {
        self.deployments.contains_key(name)
    }

    /// All recorded addresses
    pub fn deployments(&self) -> &BTreeMap<ContractName, Address> {
        &self.deployments
    }

    /// Whether the in-memory manifest has changes that are not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Insert or overwrite the address of a contract
    pub fn update(&mut self, name: ContractName, address: Address) {
        self.deployments.insert(name, address);
        self.dirty = true;
    }

    /// The journal of an interrupted run, if the manifest holds one
    pub fn journal(&self) -> Option<&RunJournal> {
        self.journal.as_ref()
    }

    /// Whether an interrupted run already deployed the given contract
    pub fn was_completed(&self, name: &str) -> bool {
        self.journal.as_ref().is_some_and(|journal| journal.completed.contains(name))
    }

    /// Record that the current run has deployed the given contract
    pub fn mark_completed(&mut self, name: ContractName) {
        self.journal.get_or_insert_with(RunJournal::default).completed.insert(name);
        self.dirty = true;
    }

    /// Drop the run journal, marking the run as complete
    pub fn finish_run(&mut self) {
        if self.journal.take().is_some() {
            self.dirty = true;
        }
    }

    /// Atomically write the manifest to its path.
    ///
    /// The contents are written to a temporary sibling file and renamed over the
    /// destination, so a crash leaves either the old or the new manifest.
    pub fn persist(&mut self) -> Result<(), DeployError> {
        let deployments = self.deployments.clone();
        let file = match &self.journal {
            Some(journal) => ManifestFile::InProgress(InProgressFile {
                deployments,
                interrupted_run: Some(journal.clone()),
            }),
            None => ManifestFile::Settled(deployments),
        };
        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| DeployError::WriteFile(e.to_string()))?;

        write_atomic(&self.path, contents.as_bytes())?;
        self.dirty = false;

        debug!(entries = self.deployments.len(), "persisted manifest to {}", self.path.display());
        Ok(())
    }
}

/// Write `contents` to `dest` via a temporary file in the same directory
fn write_atomic(dest: &Path, contents: &[u8]) -> Result<(), DeployError> {
    let write_err =
        |e: std::io::Error| DeployError::WriteFile(format!("{}: {}", dest.display(), e));

    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_err)?;

    let file_name = dest.file_name().and_then(|name| name.to_str()).unwrap_or("manifest");
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    let mut tmp = File::create(&tmp_path).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.sync_all().map_err(write_err)?;
    drop(tmp);

    fs::rename(&tmp_path, dest).map_err(write_err)
}
