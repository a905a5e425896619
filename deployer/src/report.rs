//! The human-readable summary of a deployment run

use std::fmt::{self, Display};

use alloy_primitives::{Address, TxHash};
use colored::Colorize;

use crate::types::ContractName;

/// The outcome of a single step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// Not attempted
    Pending,
    /// Disabled in the plan
    Disabled,
    /// Reused from the manifest
    Reused,
    /// Deployed by an interrupted earlier attempt at this run
    Resumed,
    /// Freshly deployed
    Deployed {
        /// The hash of the deployment transaction
        transaction_hash: TxHash,
    },
    /// Failed, halting the run
    Failed(String),
}

impl StepStatus {
    /// The short label shown in the report table
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pending => "not attempted",
            StepStatus::Disabled => "disabled",
            StepStatus::Reused => "reused",
            StepStatus::Resumed => "resumed",
            StepStatus::Deployed { .. } => "deployed",
            StepStatus::Failed(_) => "failed",
        }
    }
}

/// The report line for one plan step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRecord {
    /// The contract name
    pub name: ContractName,
    /// The artifact backing the contract, if the step has a flag
    pub artifact: Option<String>,
    /// What happened to the step
    pub status: StepStatus,
    /// The final address of the contract, if known
    pub address: Option<Address>,
}

/// The per-step outcome of a deployment run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentReport {
    /// The target network
    pub network: String,
    /// One record per plan step, in plan order
    pub steps: Vec<StepRecord>,
}

impl DeploymentReport {
    /// The record for the given contract
    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.name.as_str() == name)
    }

    /// The number of steps with the given status label
    pub fn count(&self, label: &str) -> usize {
        self.steps.iter().filter(|record| record.status.label() == label).count()
    }
}

impl Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .steps
            .iter()
            .map(|r| r.name.as_str().len())
            .chain([8])
            .max()
            .unwrap_or(8);
        let artifact_width = self
            .steps
            .iter()
            .map(|r| r.artifact.as_deref().unwrap_or("-").len())
            .chain([8])
            .max()
            .unwrap_or(8);
        let status_width = "not attempted".len();

        writeln!(f, "Deployments on {}", self.network.bold())?;
        writeln!(
            f,
            "{:<name_width$}  {:<artifact_width$}  {:<status_width$}  address",
            "contract", "artifact", "status"
        )?;

        for record in &self.steps {
            let padded = format!("{:<status_width$}", record.status.label());
            let status = match record.status {
                StepStatus::Deployed { .. } => padded.green(),
                StepStatus::Reused | StepStatus::Resumed => padded.cyan(),
                StepStatus::Disabled | StepStatus::Pending => padded.yellow(),
                StepStatus::Failed(_) => padded.red(),
            };
            let address = match record.address {
                Some(address) => address.to_string(),
                None => "-".to_string(),
            };

            writeln!(
                f,
                "{:<name_width$}  {:<artifact_width$}  {}  {}",
                record.name.as_str(),
                record.artifact.as_deref().unwrap_or("-"),
                status,
                address
            )?;
        }

        for record in &self.steps {
            if let StepStatus::Failed(reason) = &record.status {
                writeln!(f, "{} failed: {}", record.name, reason)?;
            }
        }

        Ok(())
    }
}
