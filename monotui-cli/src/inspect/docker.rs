//! Container listing through the docker CLI

use async_trait::async_trait;
use tracing::debug;

use monotui_core::probe::{ContainerInfo, ContainerRuntime, ProbeError, parse_docker_ps_line};

use super::run_tool;

const PS_ARGS: &[&str] = &["ps", "-a", "--no-trunc", "--format", "{{json .}}"];

#[derive(Clone, Debug, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }
}

/// One container per line; malformed lines are dropped.
pub fn parse_docker_ps(output: &str) -> Vec<ContainerInfo> {
    output.lines().filter_map(parse_docker_ps_line).collect()
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn containers(&self) -> Result<Vec<ContainerInfo>, ProbeError> {
        let output = run_tool("docker", PS_ARGS).await?;
        let containers = parse_docker_ps(&output);
        debug!(count = containers.len(), "docker ps");
        Ok(containers)
    }
}
