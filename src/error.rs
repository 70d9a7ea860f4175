//! Error types for the node handoff workflow
//!
//! Every variant is terminal for the current workflow run. The only recovery
//! inside the crate is the idempotence skip in the lifecycle controller and the
//! bounded retry loop of the readiness waiter.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any external command was issued
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The Slurm status query could not run or exited non-zero
    #[error("Failed to get status of node {node}: {reason}")]
    QueryError { node: String, reason: String },

    /// An external command ran and reported failure
    #[error("Failed to execute command '{command}': {reason}")]
    CommandError { command: String, reason: String },

    /// Job creation was rejected by the Kubernetes API
    #[error("Failed to submit Job in namespace {namespace}: {source}")]
    SubmissionError {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    /// Readiness polling exhausted its attempt budget
    #[error("Timed out waiting for service {namespace}/{service} after {attempts} attempt(s)")]
    TimeoutError {
        service: String,
        namespace: String,
        attempts: u32,
    },

    /// Startup configuration is missing or unusable
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Kubernetes client could not be constructed
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Job manifest could not be rendered
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CommandError {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_names_command() {
        let err = Error::command("squeue", "exit status: 1");
        assert_eq!(
            err.to_string(),
            "Failed to execute command 'squeue': exit status: 1"
        );
    }

    #[test]
    fn test_timeout_error_message() {
        let err = Error::TimeoutError {
            service: "kueue-webhook-service".to_string(),
            namespace: "kueue-system".to_string(),
            attempts: 10,
        };
        assert!(err.to_string().contains("kueue-system/kueue-webhook-service"));
        assert!(err.to_string().contains("10 attempt(s)"));
    }
}
