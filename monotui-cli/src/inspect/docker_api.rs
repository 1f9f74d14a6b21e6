#![cfg(feature = "docker")]

//! Container listing through the Docker Engine API

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::ListContainersOptions;
use bollard::models::ContainerSummary;

use monotui_core::probe::{ContainerInfo, ContainerRuntime, ProbeError};

pub struct BollardRuntime {
    client: Docker,
}

impl BollardRuntime {
    pub fn connect() -> Result<Self, ProbeError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| ProbeError::Runtime(format!("failed to connect to Docker: {}", e)))?;
        Ok(Self { client })
    }
}

fn to_info(summary: ContainerSummary) -> ContainerInfo {
    let names = summary
        .names
        .unwrap_or_default()
        .iter()
        .map(|n| n.trim_start_matches('/').to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut ports = Vec::new();
    for port in summary.ports.unwrap_or_default() {
        if let Some(public) = port.public_port
            && !ports.contains(&public)
        {
            ports.push(public);
        }
    }

    ContainerInfo {
        id: summary.id.unwrap_or_default(),
        names,
        image: summary.image.unwrap_or_default(),
        state: summary.state.unwrap_or_default(),
        status: summary.status.unwrap_or_default(),
        ports,
    }
}

#[async_trait]
impl ContainerRuntime for BollardRuntime {
    async fn containers(&self) -> Result<Vec<ContainerInfo>, ProbeError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let summaries = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(|e| ProbeError::Runtime(e.to_string()))?;

        Ok(summaries.into_iter().map(to_info).collect())
    }
}
