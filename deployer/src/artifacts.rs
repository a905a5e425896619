//! Access to the compiled contract artifacts produced by the build pipeline
//!
//! An artifact is looked up by name in the artifacts directory, either as a
//! single `<name>.json` file holding both ABI and bytecode, or as a
//! `<name>.abi` / `<name>.bin` pair.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::JsonAbi,
};
use alloy_primitives::Bytes;
use serde::Deserialize;

use crate::{
    constants::{ARTIFACT_ABI_EXTENSION, ARTIFACT_BIN_EXTENSION, ARTIFACT_JSON_EXTENSION},
    errors::DeployError,
};

/// A compiled contract: its creation bytecode and interface
#[derive(Clone, Debug)]
pub struct Artifact {
    /// The artifact name
    pub name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The contract creation bytecode
    pub bytecode: Bytes,
}

impl Artifact {
    /// Create an artifact from its parts
    pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
        }
    }

    /// The creation code for a deployment: the bytecode followed by the
    /// ABI-encoded constructor arguments
    pub fn deploy_code(&self, args: &[DynSolValue]) -> Result<Bytes, String> {
        let mut code = self.bytecode.to_vec();
        match self.abi.constructor() {
            Some(constructor) => {
                let encoded = constructor.abi_encode_input(args).map_err(|e| e.to_string())?;
                code.extend(encoded);
            }
            None if args.is_empty() => {}
            None => {
                return Err(format!(
                    "artifact {} has no constructor, but {} arguments were given",
                    self.name,
                    args.len()
                ))
            }
        }

        Ok(code.into())
    }

    /// Encode a call to the given method, selecting the overload by argument count
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, String> {
        let function = self
            .abi
            .function(method)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
            .ok_or_else(|| {
                format!(
                    "artifact {} has no method `{}` taking {} arguments",
                    self.name,
                    method,
                    args.len()
                )
            })?;

        function.abi_encode_input(args).map(Bytes::from).map_err(|e| e.to_string())
    }
}

/// The bytecode field of a JSON artifact, either a hex string or an object
/// wrapping one
#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    /// A plain hex string
    Hex(String),
    /// An object with the hex string under `object`
    Object {
        /// The hex-encoded bytecode
        object: String,
    },
}

/// The layout of a `<name>.json` artifact
#[derive(Deserialize)]
struct ArtifactFile {
    /// The contract ABI
    abi: JsonAbi,
    /// The contract creation bytecode
    bytecode: BytecodeField,
}

/// Decode a hex bytecode string, with or without a `0x` prefix
fn parse_bytecode(hex_str: &str, source: &Path) -> Result<Bytes, DeployError> {
    let trimmed = hex_str.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| DeployError::Parse(format!("bytecode in {}: {}", source.display(), e)))
}

/// Read a file to a string, mapping failures to a deploy error
fn read_file(path: &Path) -> Result<String, DeployError> {
    fs::read_to_string(path)
        .map_err(|e| DeployError::ReadFile(format!("{}: {}", path.display(), e)))
}

/// A lazily loaded, cached set of compiled artifacts
#[derive(Debug, Default)]
pub struct ArtifactStore {
    /// The directory artifacts are read from, if any
    dir: Option<PathBuf>,
    /// Artifacts loaded so far
    cache: BTreeMap<String, Arc<Artifact>>,
}

impl ArtifactStore {
    /// A store reading artifacts from the given directory
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            cache: BTreeMap::new(),
        }
    }

    /// A store holding exactly the given artifacts
    pub fn in_memory(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        let cache = artifacts
            .into_iter()
            .map(|artifact| (artifact.name.clone(), Arc::new(artifact)))
            .collect();

        Self { dir: None, cache }
    }

    /// Fetch the named artifact, returning `None` if no such artifact exists
    pub fn get(&mut self, name: &str) -> Result<Option<Arc<Artifact>>, DeployError> {
        if let Some(artifact) = self.cache.get(name) {
            return Ok(Some(artifact.clone()));
        }

        let Some(dir) = &self.dir else {
            return Ok(None);
        };

        let Some(artifact) = Self::read_artifact(dir, name)? else {
            return Ok(None);
        };

        let artifact = Arc::new(artifact);
        self.cache.insert(name.to_string(), artifact.clone());
        Ok(Some(artifact))
    }

    /// Read an artifact from disk, trying the JSON layout first
    fn read_artifact(dir: &Path, name: &str) -> Result<Option<Artifact>, DeployError> {
        let json_path = dir.join(format!("{name}.{ARTIFACT_JSON_EXTENSION}"));
        if json_path.is_file() {
            let file: ArtifactFile = serde_json::from_str(&read_file(&json_path)?)
                .map_err(|e| DeployError::Parse(format!("{}: {}", json_path.display(), e)))?;

            let bytecode = match &file.bytecode {
                BytecodeField::Hex(hex_str) | BytecodeField::Object { object: hex_str } => {
                    parse_bytecode(hex_str, &json_path)?
                }
            };

            return Ok(Some(Artifact::new(name, file.abi, bytecode)));
        }

        let abi_path = dir.join(format!("{name}.{ARTIFACT_ABI_EXTENSION}"));
        let bin_path = dir.join(format!("{name}.{ARTIFACT_BIN_EXTENSION}"));
        if abi_path.is_file() && bin_path.is_file() {
            let abi: JsonAbi = serde_json::from_str(&read_file(&abi_path)?)
                .map_err(|e| DeployError::Parse(format!("{}: {}", abi_path.display(), e)))?;
            let bytecode = parse_bytecode(&read_file(&bin_path)?, &bin_path)?;

            return Ok(Some(Artifact::new(name, abi, bytecode)));
        }

        Ok(None)
    }
}

/// The names of all artifacts present in a directory
pub fn list_artifacts(dir: &Path) -> Result<Vec<String>, DeployError> {
    let entries =
        fs::read_dir(dir).map_err(|e| DeployError::ReadFile(format!("{}: {}", dir.display(), e)))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let ext = path.extension()?.to_str()?;
            (ext == ARTIFACT_JSON_EXTENSION || ext == ARTIFACT_BIN_EXTENSION)
                .then(|| path.file_stem()?.to_str().map(str::to_string))
                .flatten()
        })
        .collect();
    names.sort();
    names.dedup();

    Ok(names)
}
