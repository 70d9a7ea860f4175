//! Confirmation workload submission
//!
//! After a handoff, a small workload is sent to whichever scheduler now owns
//! the node. Submission is fire-and-forget: completion is never awaited.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use tracing::{info, instrument, warn};

use crate::cluster::ClusterApi;
use crate::error::{Error, Result};
use crate::exec::{self, CommandRunner};
use crate::slurm::commands::BATCH_CONFIRMATION_SEQUENCE;

/// Label Kueue uses to route a Job to a LocalQueue
pub const QUEUE_NAME_LABEL: &str = "kueue.x-k8s.io/queue-name";

/// Scheduler a handoff gives the node to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulerTarget {
    /// Slurm
    #[value(name = "slurm")]
    BatchScheduler,
    /// Kubernetes with Kueue
    #[value(name = "k8s")]
    Orchestrator,
}

impl fmt::Display for SchedulerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerTarget::BatchScheduler => f.write_str("slurm"),
            SchedulerTarget::Orchestrator => f.write_str("k8s"),
        }
    }
}

/// Shape of the confirmation Job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRequest {
    pub name_prefix: String,
    pub container_name: String,
    pub image: String,
    pub command: Vec<String>,
    /// Used for both request and limit
    pub cpu: String,
    /// Used for both request and limit
    pub memory: String,
    pub restart_policy: String,
    pub queue_name: String,
}

impl Default for WorkloadRequest {
    fn default() -> Self {
        Self {
            name_prefix: "sample-job-kueue".to_string(),
            container_name: "sleep-count-container".to_string(),
            image: "busybox".to_string(),
            command: vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "for i in $(seq 1 10); do echo \"Sleeping for $i seconds...\"; sleep 1; done; echo \"Job completed!\"".to_string(),
            ],
            cpu: "1".to_string(),
            memory: "200Mi".to_string(),
            restart_policy: "Never".to_string(),
            queue_name: "user-queue".to_string(),
        }
    }
}

impl WorkloadRequest {
    fn resources(&self) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(self.cpu.clone())),
            ("memory".to_string(), Quantity(self.memory.clone())),
        ])
    }

    /// Single-container, single-completion Job with requests equal to limits
    pub fn build_job(&self, namespace: &str) -> Job {
        Job {
            metadata: ObjectMeta {
                generate_name: Some(self.name_prefix.clone()),
                namespace: Some(namespace.to_string()),
                labels: Some(BTreeMap::from([(
                    QUEUE_NAME_LABEL.to_string(),
                    self.queue_name.clone(),
                )])),
                ..Default::default()
            },
            spec: Some(JobSpec {
                parallelism: Some(1),
                completions: Some(1),
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: self.container_name.clone(),
                            image: Some(self.image.clone()),
                            command: Some(self.command.clone()),
                            resources: Some(ResourceRequirements {
                                requests: Some(self.resources()),
                                limits: Some(self.resources()),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        restart_policy: Some(self.restart_policy.clone()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Reference to a submitted confirmation workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobHandle {
    /// Job created in Kubernetes; `name` is the server-generated name, absent
    /// when the API response did not carry one
    Kubernetes {
        namespace: String,
        name: Option<String>,
    },
    /// Slurm sequence ran to the end
    Slurm { commands_run: usize },
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobHandle::Kubernetes {
                namespace,
                name: Some(name),
            } => write!(f, "job/{name} in {namespace}"),
            JobHandle::Kubernetes {
                namespace,
                name: None,
            } => write!(f, "job (name not returned) in {namespace}"),
            JobHandle::Slurm { commands_run } => {
                write!(f, "slurm sequence ({commands_run} commands)")
            }
        }
    }
}

pub struct WorkloadDispatcher {
    runner: Arc<dyn CommandRunner>,
    api: Arc<dyn ClusterApi>,
    print_manifest: bool,
}

impl WorkloadDispatcher {
    pub fn new(runner: Arc<dyn CommandRunner>, api: Arc<dyn ClusterApi>) -> Self {
        Self {
            runner,
            api,
            print_manifest: false,
        }
    }

    /// Print the Job manifest as YAML before submitting it
    pub fn with_print_manifest(mut self, print_manifest: bool) -> Self {
        self.print_manifest = print_manifest;
        self
    }

    #[instrument(skip(self, request))]
    pub async fn dispatch(
        &self,
        target: SchedulerTarget,
        namespace: &str,
        request: &WorkloadRequest,
    ) -> Result<JobHandle> {
        match target {
            SchedulerTarget::Orchestrator => self.submit_job(namespace, request).await,
            SchedulerTarget::BatchScheduler => self.run_batch_sequence().await,
        }
    }

    async fn submit_job(&self, namespace: &str, request: &WorkloadRequest) -> Result<JobHandle> {
        let job = request.build_job(namespace);
        if self.print_manifest {
            println!("{}", serde_yaml::to_string(&job)?);
        }

        let created = self
            .api
            .create_job(namespace, &job)
            .await
            .map_err(|source| Error::SubmissionError {
                namespace: namespace.to_string(),
                source,
            })?;

        let name = created.metadata.name;
        match &name {
            Some(name) => info!("Created Job {} in namespace {}", name, namespace),
            None => warn!(
                "Created Job in namespace {} but the API server returned no name",
                namespace
            ),
        }

        Ok(JobHandle::Kubernetes {
            namespace: namespace.to_string(),
            name,
        })
    }

    async fn run_batch_sequence(&self) -> Result<JobHandle> {
        for command in BATCH_CONFIRMATION_SEQUENCE {
            exec::execute(self.runner.as_ref(), command).await?;
        }

        println!("Slurm resource allocation completed successfully.");
        info!("Slurm resource allocation completed successfully");
        Ok(JobHandle::Slurm {
            commands_run: BATCH_CONFIRMATION_SEQUENCE.len(),
        })
    }
}
