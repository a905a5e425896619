//! Deploys a fixed set of contracts to an EVM network, recording their
//! addresses in a per-network manifest so re-runs only deploy what changed.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
mod commands;
pub mod constants;
pub mod errors;
pub mod manifest;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod submitter;
pub mod types;
mod utils;
