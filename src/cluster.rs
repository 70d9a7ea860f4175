//! Kubernetes API access
//!
//! The readiness waiter and the workload dispatcher only need three calls
//! against the cluster, collected behind [`ClusterApi`].

use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Endpoints, Service};
use kube::api::{Api, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Field manager recorded on objects this tool creates
pub const FIELD_MANAGER: &str = "slurm-k8s-handoff";

#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, kube::Error>;

    async fn get_endpoints(&self, namespace: &str, name: &str)
        -> Result<Endpoints, kube::Error>;

    /// Returns the object as persisted by the API server, including the
    /// generated name.
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error>;
}

/// [`ClusterApi`] backed by a live `kube::Client`
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
    dry_run: bool,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            dry_run: false,
        }
    }

    /// Submit Jobs with server-side dry run: validated and admitted, never
    /// persisted.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, kube::Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }

    async fn get_endpoints(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Endpoints, kube::Error> {
        let api: Api<Endpoints> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let params = PostParams {
            dry_run: self.dry_run,
            field_manager: Some(FIELD_MANAGER.to_string()),
        };
        api.create(&params, job).await
    }
}

/// Build a client from an explicit kubeconfig path.
///
/// A missing path is a startup failure: the workflow must not begin draining
/// nodes with no way to reach the cluster afterwards.
pub async fn client_from_kubeconfig(path: Option<&Path>) -> Result<Client> {
    let path = path.ok_or_else(|| {
        Error::ConfigError("KUBECONFIG environment variable not set".to_string())
    })?;

    debug!("Loading kubeconfig from {}", path.display());
    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read kubeconfig {}: {}",
            path.display(),
            e
        ))
    })?;

    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to build Kubernetes config: {e}")))?;

    info!("Using Kubernetes API server {}", config.cluster_url);
    Ok(Client::try_from(config)?)
}
