//! Command templates
//!
//! These strings are the exact contract with the scheduler CLIs and are run
//! through `bash -c`, so node names must be validated before they get here.

use crate::error::{Error, Result};

/// Informational and submission sequence used to confirm Slurm owns the node
pub const BATCH_CONFIRMATION_SEQUENCE: [&str; 4] = [
    "sinfo",
    "srun hostname",
    "sbatch --wrap='echo $SLURM_JOB_ID; sleep 60'",
    "squeue",
];

/// Reason recorded on nodes drained for Kubernetes
pub const DRAIN_REASON: &str = "k8s";

pub fn show_node_state(node: &str) -> String {
    format!("scontrol show node {node} | grep State")
}

pub fn resume_node(node: &str) -> String {
    format!("scontrol update NodeName={node} state=RESUME")
}

pub fn drain_node(node: &str) -> String {
    format!("scontrol update NodeName={node} state=DRAIN reason=\"{DRAIN_REASON}\"")
}

pub fn kubectl_drain(node: &str) -> String {
    format!("kubectl drain {node} --ignore-daemonsets --delete-emptydir-data")
}

pub fn kubectl_uncordon(node: &str) -> String {
    format!("kubectl uncordon {node}")
}

/// Reject names that would change the meaning of a shell command line
pub fn validate_node_name(node: &str) -> Result<()> {
    if node.is_empty() {
        return Err(Error::ValidationError("node name is empty".to_string()));
    }
    let valid = node
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(Error::ValidationError(format!(
            "invalid node name: {node:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_templates() {
        assert_eq!(show_node_state("n1"), "scontrol show node n1 | grep State");
        assert_eq!(resume_node("n1"), "scontrol update NodeName=n1 state=RESUME");
        assert_eq!(
            drain_node("n1"),
            "scontrol update NodeName=n1 state=DRAIN reason=\"k8s\""
        );
        assert_eq!(
            kubectl_drain("n1"),
            "kubectl drain n1 --ignore-daemonsets --delete-emptydir-data"
        );
        assert_eq!(kubectl_uncordon("n1"), "kubectl uncordon n1");
    }

    #[test]
    fn test_validate_node_name() {
        assert!(validate_node_name("srv697719").is_ok());
        assert!(validate_node_name("gpu-node_01.cluster").is_ok());
        assert!(validate_node_name("").is_err());
        assert!(validate_node_name("n1; reboot").is_err());
        assert!(validate_node_name("n1 n2").is_err());
        assert!(validate_node_name("$(id)").is_err());
    }
}
