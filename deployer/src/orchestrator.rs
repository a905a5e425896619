//! The deployment orchestrator: executes a plan step by step against the
//! manifest and a transaction submitter
//!
//! Steps run strictly in plan order, one at a time, since a step's
//! constructor arguments may reference addresses minted by earlier steps. The
//! manifest is persisted after every fresh deployment, so a run halted at any
//! point can be restarted: contracts deployed before the halt are resumed from
//! the manifest rather than deployed again.
//!
//! Only one process may run against a given network's manifest at a time;
//! this is not enforced by locking.

use std::{
    collections::{BTreeMap, BTreeSet},
    error::Error,
    fmt::{self, Display},
    sync::Arc,
};

use alloy_primitives::Address;
use tracing::{error, info, warn};

use crate::{
    artifacts::{Artifact, ArtifactStore},
    errors::DeployError,
    manifest::{check_completeness, Manifest},
    plan::{DeployedHandle, DeploymentStep, HandleOrigin, HandleRegistry, Plan, StepContext},
    report::{DeploymentReport, StepRecord, StepStatus},
    submitter::{DeploymentRequest, Submitter},
    types::{ContractName, DeployerContext, DeploymentFlags, GasClass},
};

/// The result of a run in which every step completed
#[derive(Debug)]
pub struct Deployment {
    /// The final, persisted manifest
    pub manifest: Manifest,
    /// The handles of every executed step
    pub handles: HandleRegistry,
    /// The per-step report
    pub report: DeploymentReport,
}

/// A run halted by a fatal error
#[derive(Debug)]
pub struct FailedRun {
    /// The error that halted the run
    pub error: DeployError,
    /// The per-step report up to the failure
    pub report: DeploymentReport,
    /// The manifest as of the failure; every completed step is already persisted
    pub manifest: Manifest,
}

impl Display for FailedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deployment to {} failed: {}", self.report.network, self.error)
    }
}

impl Error for FailedRun {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Executes deployment plans on behalf of a single deployer
pub struct Orchestrator<S> {
    /// The transaction submitter
    submitter: S,
    /// The deploying account and run configuration
    deployer: DeployerContext,
    /// The deployment flags for the run
    flags: DeploymentFlags,
}

/// The in-progress state of a run
struct Run {
    /// The manifest being updated
    manifest: Manifest,
    /// The handles created so far
    handles: HandleRegistry,
    /// The per-step report
    report: DeploymentReport,
}

impl Run {
    /// Record the outcome of the step at `index`
    fn record(&mut self, index: usize, status: StepStatus, address: Option<Address>) {
        let record = &mut self.report.steps[index];
        record.status = status;
        record.address = address;
    }

    /// Halt the run, marking the step at `index`, if any, as failed
    fn fail(mut self, index: Option<usize>, error: DeployError) -> FailedRun {
        // Keep any address already recorded: the contract may be on-chain even
        // though the step failed afterwards
        if let Some(index) = index {
            self.report.steps[index].status = StepStatus::Failed(error.to_string());
        }

        error!("{}", error);
        FailedRun {
            error,
            report: self.report,
            manifest: self.manifest,
        }
    }
}

impl<S: Submitter> Orchestrator<S> {
    /// Create an orchestrator
    pub fn new(submitter: S, deployer: DeployerContext, flags: DeploymentFlags) -> Self {
        Self {
            submitter,
            deployer,
            flags,
        }
    }

    /// The transaction submitter
    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Execute the plan, starting from the given manifest.
    ///
    /// All validation happens before the first transaction is submitted. A
    /// failure halts the run; steps after the failing one are left pending.
    pub async fn execute(
        &self,
        plan: &Plan,
        manifest: Manifest,
        artifacts: &mut ArtifactStore,
    ) -> Result<Deployment, FailedRun> {
        let report = DeploymentReport {
            network: self.deployer.network.clone(),
            steps: plan
                .steps()
                .iter()
                .map(|step| StepRecord {
                    name: step.name.clone(),
                    artifact: self.flags.get(&step.name).map(|flag| flag.artifact.clone()),
                    status: StepStatus::Pending,
                    address: None,
                })
                .collect(),
        };
        let mut run = Run {
            manifest,
            handles: HandleRegistry::default(),
            report,
        };

        let loaded = match self.preflight(plan, &run.manifest, artifacts) {
            Ok(loaded) => loaded,
            Err(e) => return Err(run.fail(None, e)),
        };

        if let Some(journal) = run.manifest.journal() {
            info!(
                completed = journal.completed.len(),
                "resuming an interrupted run on {}", self.deployer.network
            );
        }

        let plan_steps = plan.enabled_names();
        for (index, step) in plan.steps().iter().enumerate() {
            if let Err(e) = self.execute_step(index, step, &plan_steps, &loaded, &mut run).await {
                return Err(run.fail(Some(index), e));
            }
        }

        run.manifest.finish_run();
        if run.manifest.is_dirty() {
            if let Err(e) = run.manifest.persist() {
                return Err(run.fail(None, e));
            }
        }

        info!(
            deployed = run.report.count("deployed"),
            reused = run.report.count("reused"),
            resumed = run.report.count("resumed"),
            disabled = run.report.count("disabled"),
            "deployment to {} complete", self.deployer.network
        );

        Ok(Deployment {
            manifest: run.manifest,
            handles: run.handles,
            report: run.report,
        })
    }

    /// Validate the plan against the flags, manifest, and artifacts, loading
    /// the artifact of every enabled step
    fn preflight(
        &self,
        plan: &Plan,
        manifest: &Manifest,
        artifacts: &mut ArtifactStore,
    ) -> Result<BTreeMap<ContractName, Arc<Artifact>>, DeployError> {
        let active = plan.active_flags(&self.flags)?;

        let missing = check_completeness(&active, manifest);
        if !missing.is_empty() {
            return Err(DeployError::ManifestIncomplete {
                missing,
                path: manifest.path().to_path_buf(),
            });
        }

        let mut loaded = BTreeMap::new();
        for (name, flag) in &active {
            let needs_artifact = flag.deploy && !self.is_resumed(name, manifest);
            match artifacts.get(&flag.artifact) {
                Ok(Some(artifact)) => {
                    loaded.insert(name.clone(), artifact);
                }
                Ok(None) if needs_artifact => {
                    return Err(DeployError::ArtifactNotFound {
                        contract: name.clone(),
                        artifact: flag.artifact.clone(),
                    })
                }
                Err(e) if needs_artifact => return Err(e),
                // Reused contracts only need their artifact to encode calls
                Ok(None) => {}
                Err(e) => warn!("ignoring unreadable artifact for reused {}: {}", name, e),
            }
        }

        Ok(loaded)
    }

    /// Whether a contract flagged for deployment was already deployed by an
    /// interrupted attempt at this run
    fn is_resumed(&self, name: &ContractName, manifest: &Manifest) -> bool {
        manifest.was_completed(name.as_str()) && manifest.contains(name.as_str())
    }

    /// Execute a single step, recording its outcome in the run
    async fn execute_step(
        &self,
        index: usize,
        step: &DeploymentStep,
        plan_steps: &BTreeSet<ContractName>,
        loaded: &BTreeMap<ContractName, Arc<Artifact>>,
        run: &mut Run,
    ) -> Result<(), DeployError> {
        let name = &step.name;
        if !step.enabled {
            warn!("skipping disabled contract {}", name);
            run.record(index, StepStatus::Disabled, None);
            return Ok(());
        }

        let flag = self.flags.get(name).ok_or_else(|| DeployError::FlagMissing(name.clone()))?;
        let artifact = loaded.get(name).cloned();

        let reuse = if !flag.deploy {
            Some((HandleOrigin::Reused, StepStatus::Reused))
        } else if self.is_resumed(name, &run.manifest) {
            Some((HandleOrigin::Resumed, StepStatus::Resumed))
        } else {
            None
        };

        if let Some((origin, status)) = reuse {
            let address = run.manifest.get(name.as_str()).ok_or_else(|| {
                DeployError::ManifestIncomplete {
                    missing: vec![name.clone()],
                    path: run.manifest.path().to_path_buf(),
                }
            })?;

            info!(%address, "{} {}", status.label(), name);
            run.handles.insert(DeployedHandle::new(name.clone(), address, origin, artifact));
            run.record(index, status, Some(address));
            return Ok(());
        }

        let artifact = artifact.ok_or_else(|| DeployError::ArtifactNotFound {
            contract: name.clone(),
            artifact: flag.artifact.clone(),
        })?;

        let args = {
            let ctx = StepContext {
                step: name,
                deployer: &self.deployer,
                flags: &self.flags,
                manifest: &run.manifest,
                handles: &run.handles,
                plan_steps,
            };
            step.build_args(&ctx)?
        };
        let init_code = artifact
            .deploy_code(&args)
            .map_err(|reason| DeployError::ConstructorArgs {
                contract: name.clone(),
                reason,
            })?;

        info!(artifact = %artifact.name, "deploying {}", name);
        let request = DeploymentRequest {
            contract: name,
            artifact: &artifact,
            args: &args,
            init_code,
            gas: self.deployer.gas.params(GasClass::Deployment),
            deployer: &self.deployer,
        };
        let deployed = self
            .submitter
            .submit(request)
            .await
            .map_err(|source| DeployError::Submission {
                contract: name.clone(),
                source,
            })?;

        let address = deployed.address;
        info!(%address, tx = %deployed.transaction_hash, "deployed {}", name);

        run.handles.insert(DeployedHandle::new(
            name.clone(),
            address,
            HandleOrigin::Deployed {
                transaction_hash: deployed.transaction_hash,
            },
            Some(artifact),
        ));
        run.manifest.update(name.clone(), address);
        run.manifest.mark_completed(name.clone());
        run.record(
            index,
            StepStatus::Deployed {
                transaction_hash: deployed.transaction_hash,
            },
            Some(address),
        );

        run.manifest.persist().inspect_err(|e| {
            error!(%address, "{} is deployed but could not be recorded: {}", name, e);
        })
    }
}
