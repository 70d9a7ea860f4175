//! Bounded wait for a control-plane Service to become routable
//!
//! Kueue's admission webhook must be reachable before a queued Job is
//! submitted, otherwise the API server rejects the create call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Endpoints;
use tracing::{debug, info, warn};

use crate::cluster::ClusterApi;
use crate::error::{Error, Result};

/// Fixed delay between unsuccessful readiness polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls allowed before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

pub const KUEUE_WEBHOOK_SERVICE: &str = "kueue-webhook-service";
pub const KUEUE_SYSTEM_NAMESPACE: &str = "kueue-system";

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleep on the tokio timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The Service (and its same-named Endpoints) being waited on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessTarget {
    pub service: String,
    pub namespace: String,
}

impl ReadinessTarget {
    pub fn new(service: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            namespace: namespace.into(),
        }
    }
}

impl Default for ReadinessTarget {
    fn default() -> Self {
        Self::new(KUEUE_WEBHOOK_SERVICE, KUEUE_SYSTEM_NAMESPACE)
    }
}

/// True if any subset lists at least one ready address
pub fn has_ready_address(endpoints: &Endpoints) -> bool {
    endpoints
        .subsets
        .iter()
        .flatten()
        .any(|subset| subset.addresses.as_ref().is_some_and(|a| !a.is_empty()))
}

pub struct ServiceReadinessWaiter {
    api: Arc<dyn ClusterApi>,
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
}

impl ServiceReadinessWaiter {
    pub fn new(api: Arc<dyn ClusterApi>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            api,
            sleeper,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Single readiness poll. Errors from either lookup are returned so the
    /// caller can log them; they never abort the wait.
    pub async fn check(&self, target: &ReadinessTarget) -> Result<bool, kube::Error> {
        self.api
            .get_service(&target.namespace, &target.service)
            .await?;
        let endpoints = self
            .api
            .get_endpoints(&target.namespace, &target.service)
            .await?;
        Ok(has_ready_address(&endpoints))
    }

    /// Poll until `target` has a ready endpoint address.
    ///
    /// The first poll is immediate. After each unsuccessful poll except the
    /// last, sleeps for the configured interval. Returns
    /// [`Error::TimeoutError`] after `max_attempts` unsuccessful polls.
    pub async fn wait_ready(&self, target: &ReadinessTarget, max_attempts: u32) -> Result<()> {
        if max_attempts == 0 {
            return Err(Error::ValidationError(
                "readiness wait needs at least one attempt".to_string(),
            ));
        }

        for attempt in 1..=max_attempts {
            match self.check(target).await {
                Ok(true) => {
                    info!(
                        "Service {}/{} is available",
                        target.namespace, target.service
                    );
                    return Ok(());
                }
                Ok(false) => {
                    debug!(
                        "Service {}/{} endpoints are not ready yet",
                        target.namespace, target.service
                    );
                }
                Err(e) => {
                    warn!(
                        "Readiness check for {}/{} failed: {}",
                        target.namespace, target.service, e
                    );
                }
            }

            if attempt < max_attempts {
                info!(
                    "Waiting for {} to become available... ({}/{})",
                    target.service, attempt, max_attempts
                );
                self.sleeper.sleep(self.interval).await;
            }
        }

        Err(Error::TimeoutError {
            service: target.service.clone(),
            namespace: target.namespace.clone(),
            attempts: max_attempts,
        })
    }
}
