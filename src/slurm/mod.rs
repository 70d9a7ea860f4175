//! Slurm integration: node status probing and the command lines this tool
//! issues against `scontrol`, `sinfo`, `srun`, `sbatch` and `squeue`.

pub mod commands;
pub mod prober;

pub use prober::{classify_state, NodeState, NodeStateProber};
