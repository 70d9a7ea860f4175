//! Node status probing via `scontrol`

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::commands;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, Streams};

/// Canonical node state as far as the handoff is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Resume,
    Drain,
    Idle,
    Unknown,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Resume => "RESUME",
            NodeState::Drain => "DRAIN",
            NodeState::Idle => "IDLE",
            NodeState::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Map `scontrol show node` output to a [`NodeState`].
///
/// Precedence is RESUME > DRAIN > IDLE; the first substring found wins and
/// anything else is `Unknown`. Compound states such as `IDLE+DRAIN` therefore
/// classify as `Drain`.
pub fn classify_state(output: &str) -> NodeState {
    if output.contains("RESUME") {
        NodeState::Resume
    } else if output.contains("DRAIN") {
        NodeState::Drain
    } else if output.contains("IDLE") {
        NodeState::Idle
    } else {
        NodeState::Unknown
    }
}

pub struct NodeStateProber {
    runner: Arc<dyn CommandRunner>,
}

impl NodeStateProber {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Query Slurm for the node's current state.
    ///
    /// Fails with [`Error::QueryError`] when the query cannot run or exits
    /// non-zero. Output that runs fine but matches nothing is `Unknown`.
    pub async fn probe(&self, node: &str) -> Result<NodeState> {
        commands::validate_node_name(node)?;
        let command = commands::show_node_state(node);

        let output = self
            .runner
            .run(&command, Streams::Capture)
            .await
            .map_err(|e| Error::QueryError {
                node: node.to_string(),
                reason: e.to_string(),
            })?;

        if !output.success() {
            return Err(Error::QueryError {
                node: node.to_string(),
                reason: output.failure_reason(),
            });
        }

        debug!("scontrol output for {}: {}", node, output.stdout.trim());
        let state = classify_state(&output.stdout);
        debug!("Node {} classified as {}", node, state);
        Ok(state)
    }
}
