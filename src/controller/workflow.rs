//! One node handoff, end to end
//!
//! Release the node from its current scheduler, activate it on the target,
//! wait for Kueue when Kubernetes is the target, then submit the
//! confirmation workload. Every step is awaited in order and the first error
//! ends the run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use super::dispatch::{JobHandle, SchedulerTarget, WorkloadDispatcher, WorkloadRequest};
use super::lifecycle::{Action, NodeLifecycleController, TransitionOutcome};
use super::readiness::{ReadinessTarget, ServiceReadinessWaiter, Sleeper, DEFAULT_MAX_ATTEMPTS};
use crate::cluster::ClusterApi;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;

/// Inputs of a single workflow run
#[derive(Debug, Clone)]
pub struct HandoffParams {
    pub node: String,
    /// Namespace the confirmation Job is created in
    pub namespace: String,
    pub target: SchedulerTarget,
    pub readiness: ReadinessTarget,
    pub max_attempts: u32,
    pub workload: WorkloadRequest,
}

impl HandoffParams {
    pub fn new(
        node: impl Into<String>,
        namespace: impl Into<String>,
        target: SchedulerTarget,
    ) -> Self {
        Self {
            node: node.into(),
            namespace: namespace.into(),
            target,
            readiness: ReadinessTarget::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            workload: WorkloadRequest::default(),
        }
    }
}

/// What a completed run did
#[derive(Debug, Clone)]
pub struct HandoffReport {
    pub target: SchedulerTarget,
    pub released: TransitionOutcome,
    pub activated: TransitionOutcome,
    pub job: JobHandle,
}

/// Release and activation actions for handing a node to `target`
pub fn transitions_for(target: SchedulerTarget) -> (Action, Action) {
    match target {
        SchedulerTarget::BatchScheduler => (Action::DrainFromOrchestrator, Action::Resume),
        SchedulerTarget::Orchestrator => (Action::Drain, Action::UncordonInOrchestrator),
    }
}

pub struct Handoff {
    controller: NodeLifecycleController,
    waiter: ServiceReadinessWaiter,
    dispatcher: WorkloadDispatcher,
}

impl Handoff {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        api: Arc<dyn ClusterApi>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            controller: NodeLifecycleController::new(runner.clone()),
            waiter: ServiceReadinessWaiter::new(api.clone(), sleeper),
            dispatcher: WorkloadDispatcher::new(runner, api),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.waiter = self.waiter.with_interval(interval);
        self
    }

    pub fn with_print_manifest(mut self, print_manifest: bool) -> Self {
        self.dispatcher = self.dispatcher.with_print_manifest(print_manifest);
        self
    }

    #[instrument(skip(self, params), fields(node = %params.node, target = %params.target))]
    pub async fn run(&self, params: &HandoffParams) -> Result<HandoffReport> {
        // A Kubernetes handoff that can never see Kueue ready must not start
        if params.target == SchedulerTarget::Orchestrator && params.max_attempts == 0 {
            return Err(Error::ValidationError(
                "readiness wait needs at least one attempt".to_string(),
            ));
        }

        let (release, activate) = transitions_for(params.target);
        info!("Handing node {} over to {}", params.node, params.target);

        let released = self.controller.transition(&params.node, release).await?;
        let activated = self.controller.transition(&params.node, activate).await?;

        if params.target == SchedulerTarget::Orchestrator {
            self.waiter
                .wait_ready(&params.readiness, params.max_attempts)
                .await?;
        }

        let job = self
            .dispatcher
            .dispatch(params.target, &params.namespace, &params.workload)
            .await?;

        info!("Handoff of {} to {} complete: {}", params.node, params.target, job);
        Ok(HandoffReport {
            target: params.target,
            released,
            activated,
            job,
        })
    }
}
