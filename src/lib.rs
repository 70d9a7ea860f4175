//! Slurm-K8s Handoff: move a compute node between Slurm and Kubernetes
//!
//! Drains a node from the scheduler that currently owns it, activates it on
//! the other one, waits for Kueue when Kubernetes is the target, and submits a
//! confirmation workload.

pub mod cluster;
pub mod controller;
pub mod error;
pub mod exec;
pub mod slurm;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::error::{Error, Result};
