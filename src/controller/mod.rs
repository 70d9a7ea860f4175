//! Handoff controller
//! This module contains the node lifecycle transitions, the readiness gate
//! for Kueue, the confirmation workload dispatcher and the workflow that
//! strings them together.

pub mod dispatch;
pub mod lifecycle;
pub mod readiness;
mod workflow;

pub use dispatch::{
    JobHandle, SchedulerTarget, WorkloadDispatcher, WorkloadRequest, QUEUE_NAME_LABEL,
};
pub use lifecycle::{Action, NodeLifecycleController, TransitionOutcome};
pub use readiness::{
    ReadinessTarget, ServiceReadinessWaiter, Sleeper, TokioSleeper, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_POLL_INTERVAL,
};
pub use workflow::{transitions_for, Handoff, HandoffParams, HandoffReport};
