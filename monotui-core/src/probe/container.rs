//! Container-side runtime detection for compose services

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{ContainerInfo, ContainerRuntime, PortChecker};
use crate::model::{ComposeService, FacetKind};
use crate::patterns::RE_DOCKER_HOST_PORT;
use crate::runtime::{RunKind, RunState, RuntimeStatus};

/// Container states reported as a service still coming up
const STARTING_STATES: &[&str] = &["restarting", "created", "starting"];

/// Host ports from a `docker ps` ports column, unique, in order of appearance.
pub fn parse_docker_ports(ports: &str) -> Vec<u16> {
    let mut out = Vec::new();
    for cap in RE_DOCKER_HOST_PORT.captures_iter(ports) {
        if let Ok(port) = cap[1].parse::<u16>()
            && !out.contains(&port)
        {
            out.push(port);
        }
    }
    out
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsRecord {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(default)]
    names: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    ports: String,
}

/// Decodes one line of `docker ps --format '{{json .}}'`.
pub fn parse_docker_ps_line(line: &str) -> Option<ContainerInfo> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<PsRecord>(line) {
        Ok(r) => Some(ContainerInfo {
            ports: parse_docker_ports(&r.ports),
            id: r.id,
            names: r.names,
            image: r.image,
            state: r.state,
            status: r.status,
        }),
        Err(e) => {
            debug!(error = %e, "skipping malformed docker ps line");
            None
        }
    }
}

fn conflict_with(container: &ContainerInfo) -> Option<String> {
    Some(format!("Conflict with running container: {}", container.names))
}

pub struct ContainerProbe {
    runtime: Arc<dyn ContainerRuntime>,
    ports: Arc<dyn PortChecker>,
}

impl ContainerProbe {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, ports: Arc<dyn PortChecker>) -> Self {
        Self { runtime, ports }
    }

    /// One run state per service, in input order. Never fails: an unreachable
    /// container runtime is treated as an empty container list.
    pub async fn probe_services(
        &self,
        project_path: &str,
        services: &[Arc<ComposeService>],
    ) -> Vec<RunState> {
        if services.is_empty() {
            return Vec::new();
        }

        let containers = match self.runtime.containers().await {
            Ok(c) => c,
            Err(e) => {
                debug!(project = %project_path, error = %e, "container runtime unavailable");
                Vec::new()
            }
        };

        let mut states = Vec::with_capacity(services.len());
        for service in services {
            let state = self.probe_service(project_path, service, &containers).await;
            debug!(
                project = %project_path,
                service = %service.name,
                status = state.status.label(),
                "service probed"
            );
            states.push(state);
        }
        states
    }

    async fn probe_service(
        &self,
        project_path: &str,
        service: &ComposeService,
        containers: &[ContainerInfo],
    ) -> RunState {
        let base = RunState::new(
            project_path,
            FacetKind::Compose,
            RunKind::Service,
            &service.name,
            format!("docker compose up {}", service.name),
        );
        let declared_port = service.ports.first().copied();
        let explicit = service.container_name.as_deref();

        // (a) running container named after the service
        if let Some(c) = containers
            .iter()
            .find(|c| c.is_running() && c.names_contain(&service.name))
        {
            if let Some(name) = explicit
                && !c.names_contain(name)
            {
                return base
                    .with_status(RuntimeStatus::Conflict, conflict_with(c))
                    .with_port(declared_port);
            }
            let port = c.ports.first().copied().or(declared_port);
            return base.with_status(RuntimeStatus::Running, None).with_port(port);
        }

        // (b) explicit container_name taken by some other running container
        if let Some(name) = explicit
            && let Some(c) = containers
                .iter()
                .find(|c| c.is_running() && c.names_contain(name))
        {
            return base
                .with_status(RuntimeStatus::Conflict, conflict_with(c))
                .with_port(declared_port);
        }

        // (c) a matching container that is still coming up
        if let Some(c) = containers.iter().find(|c| {
            !c.is_running()
                && (c.names_contain(&service.name) || explicit.is_some_and(|n| c.names_contain(n)))
                && STARTING_STATES
                    .iter()
                    .any(|s| c.state.eq_ignore_ascii_case(s))
        }) {
            return base
                .with_status(RuntimeStatus::Starting, Some(c.status.clone()))
                .with_port(declared_port);
        }

        // (d) declared port squatted by something else
        let Some(port) = declared_port else {
            return base;
        };

        if let Some(c) = containers
            .iter()
            .find(|c| c.is_running() && c.ports.contains(&port))
        {
            return base
                .with_status(RuntimeStatus::Conflict, conflict_with(c))
                .with_port(Some(port));
        }

        if self.ports.is_in_use(port).await {
            return base
                .with_status(
                    RuntimeStatus::Conflict,
                    Some(format!("Port {} is already in use", port)),
                )
                .with_port(Some(port));
        }

        base.with_port(Some(port))
    }
}
