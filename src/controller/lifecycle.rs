//! Node lifecycle transitions across Slurm and Kubernetes
//!
//! Slurm-side transitions are idempotent: the node is probed first and the
//! state change is skipped when the node is already where it should be.
//! Kubernetes-side transitions (drain, uncordon) are always issued; the
//! node's cordon state is not consulted.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::exec::{self, CommandRunner};
use crate::slurm::commands;
use crate::slurm::{NodeState, NodeStateProber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `scontrol update ... state=RESUME`
    Resume,
    /// `scontrol update ... state=DRAIN`
    Drain,
    /// `kubectl drain`
    DrainFromOrchestrator,
    /// `kubectl uncordon`
    UncordonInOrchestrator,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Resume,
        Action::Drain,
        Action::DrainFromOrchestrator,
        Action::UncordonInOrchestrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Resume => "resume",
            Action::Drain => "drain",
            Action::DrainFromOrchestrator => "drain-k8s",
            Action::UncordonInOrchestrator => "uncordon-k8s",
        }
    }

    /// Whether the action is checked against the probed Slurm state
    pub fn is_probed(&self) -> bool {
        matches!(self, Action::Resume | Action::Drain)
    }

    /// Whether a node observed in `state` already satisfies this action
    pub fn satisfied_by(&self, state: NodeState) -> bool {
        match self {
            Action::Resume => matches!(state, NodeState::Resume | NodeState::Idle),
            Action::Drain => state == NodeState::Drain,
            Action::DrainFromOrchestrator | Action::UncordonInOrchestrator => false,
        }
    }

    pub fn command(&self, node: &str) -> String {
        match self {
            Action::Resume => commands::resume_node(node),
            Action::Drain => commands::drain_node(node),
            Action::DrainFromOrchestrator => commands::kubectl_drain(node),
            Action::UncordonInOrchestrator => commands::kubectl_uncordon(node),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| Error::ValidationError(format!("invalid action: {s}")))
    }
}

/// What a transition did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub node: String,
    pub action: Action,
    /// True when the node was already in the target state and nothing ran
    pub skipped: bool,
    /// State seen by the probe, for probed actions
    pub observed_state: Option<NodeState>,
    /// Command that ran, if any
    pub command: Option<String>,
}

pub struct NodeLifecycleController {
    runner: Arc<dyn CommandRunner>,
    prober: NodeStateProber,
}

impl NodeLifecycleController {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            prober: NodeStateProber::new(runner.clone()),
            runner,
        }
    }

    /// Parse an operator-facing action name (`resume`, `drain`, `drain-k8s`,
    /// `uncordon-k8s`) and apply it.
    pub async fn transition_named(&self, node: &str, action: &str) -> Result<TransitionOutcome> {
        let action = action.parse::<Action>()?;
        self.transition(node, action).await
    }

    #[instrument(skip(self))]
    pub async fn transition(&self, node: &str, action: Action) -> Result<TransitionOutcome> {
        commands::validate_node_name(node)?;

        let observed_state = if action.is_probed() {
            Some(self.prober.probe(node).await?)
        } else {
            None
        };

        if let Some(state) = observed_state.filter(|s| action.satisfied_by(*s)) {
            println!("Node {node} is already in {state} state, skipping.");
            info!("Node {} already {}, skipping {}", node, state, action);
            return Ok(TransitionOutcome {
                node: node.to_string(),
                action,
                skipped: true,
                observed_state,
                command: None,
            });
        }

        let command = action.command(node);
        exec::execute(self.runner.as_ref(), &command).await?;
        info!("Applied {} to node {}", action, node);

        Ok(TransitionOutcome {
            node: node.to_string(),
            action,
            skipped: false,
            observed_state,
            command: Some(command),
        })
    }
}
