//! In-memory fakes shared by the unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{EndpointAddress, EndpointSubset, Endpoints, Service};
use kube::core::ErrorResponse;

use crate::cluster::ClusterApi;
use crate::controller::readiness::Sleeper;
use crate::exec::{CommandOutput, CommandRunner, Streams};

/// Records every command and answers from a list of prefix-matched responses.
/// Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    responses: Vec<(String, CommandOutput)>,
    spawn_failures: Vec<String>,
    calls: Mutex<Vec<(String, Streams)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.responses.push((prefix.to_string(), output));
        self
    }

    /// Answer `scontrol show node` probes with the given status line
    pub fn with_node_state(self, state_line: &str) -> Self {
        self.respond("scontrol show node", CommandOutput::ok(state_line))
    }

    pub fn fail_spawn(mut self, prefix: &str) -> Self {
        self.spawn_failures.push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Streams)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|(cmd, _)| cmd).collect()
    }

    /// Commands run with forwarded streams, i.e. everything except probes
    pub fn forwarded(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(_, streams)| *streams == Streams::Forward)
            .map(|(cmd, _)| cmd)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, streams: Streams) -> std::io::Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), streams));

        if self.spawn_failures.iter().any(|p| command.starts_with(p)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            ));
        }

        Ok(self
            .responses
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix))
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

/// Counts sleeps without waiting
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} (fake)"),
        reason: reason.to_string(),
        code,
    })
}

pub fn endpoints_with_addresses(count: usize) -> Endpoints {
    let addresses = (0..count)
        .map(|i| EndpointAddress {
            ip: format!("10.0.0.{}", i + 1),
            ..Default::default()
        })
        .collect();
    Endpoints {
        subsets: Some(vec![EndpointSubset {
            addresses: Some(addresses),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// One scripted answer per readiness poll
pub enum Poll {
    Ready,
    MissingService,
    NoAddresses,
    EndpointsError,
}

/// Scripted cluster: readiness answers are consumed one per poll (the last
/// one repeats), created Jobs are recorded.
#[derive(Default)]
pub struct FakeCluster {
    polls: Mutex<VecDeque<Poll>>,
    current: Mutex<Option<Poll>>,
    create_error: Option<u16>,
    omit_name: bool,
    created: Mutex<Vec<(String, Job)>>,
    service_gets: Mutex<u32>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_polls(self, polls: Vec<Poll>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn failing_create(mut self, code: u16) -> Self {
        self.create_error = Some(code);
        self
    }

    /// Persisted Jobs come back with no `metadata.name`
    pub fn without_generated_name(mut self) -> Self {
        self.omit_name = true;
        self
    }

    pub fn created(&self) -> Vec<(String, Job)> {
        self.created.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        *self.service_gets.lock().unwrap()
    }

    fn current_matches(&self, f: impl Fn(&Poll) -> bool) -> bool {
        self.current.lock().unwrap().as_ref().map(f).unwrap_or(false)
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get_service(&self, _namespace: &str, _name: &str) -> Result<Service, kube::Error> {
        *self.service_gets.lock().unwrap() += 1;
        {
            let mut polls = self.polls.lock().unwrap();
            let mut current = self.current.lock().unwrap();
            if let Some(next) = polls.pop_front() {
                *current = Some(next);
            }
        }
        if self.current_matches(|p| matches!(p, Poll::MissingService)) {
            return Err(api_error(404, "NotFound"));
        }
        Ok(Service::default())
    }

    async fn get_endpoints(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Endpoints, kube::Error> {
        let current = self.current.lock().unwrap();
        match current.as_ref() {
            Some(Poll::Ready) | None => Ok(endpoints_with_addresses(1)),
            Some(Poll::NoAddresses) => Ok(Endpoints {
                subsets: Some(vec![EndpointSubset::default()]),
                ..Default::default()
            }),
            Some(Poll::EndpointsError) => Err(api_error(500, "InternalError")),
            Some(Poll::MissingService) => Err(api_error(404, "NotFound")),
        }
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error> {
        if let Some(code) = self.create_error {
            return Err(api_error(code, "Forbidden"));
        }
        self.created
            .lock()
            .unwrap()
            .push((namespace.to_string(), job.clone()));

        let mut persisted = job.clone();
        if self.omit_name {
            return Ok(persisted);
        }
        let prefix = job.metadata.generate_name.clone().unwrap_or_default();
        persisted.metadata.name = Some(format!("{prefix}abcde"));
        Ok(persisted)
    }
}
