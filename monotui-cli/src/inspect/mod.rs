//! OS-backed implementations of the probe traits

mod docker;
mod ports;
mod process;

#[cfg(feature = "docker")]
mod docker_api;

use std::sync::Arc;

use tokio::process::Command;

use monotui_core::poller::Probes;
use monotui_core::probe::{ContainerProbe, ContainerRuntime, ProbeError, ProcessProbe};

pub use docker::DockerCli;
pub use ports::LocalPortChecker;
pub use process::SysinfoInspector;

#[cfg(feature = "docker")]
pub use docker_api::BollardRuntime;

/// Runs an external tool and returns its stdout.
///
/// A missing binary maps to `Unavailable`, a non-zero exit to `CommandFailed`.
pub(crate) async fn run_tool(tool: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(tool)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ProbeError::Unavailable {
            tool: tool.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            tool: tool.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(feature = "docker")]
fn container_runtime() -> Arc<dyn ContainerRuntime> {
    match BollardRuntime::connect() {
        Ok(runtime) => Arc::new(runtime),
        Err(e) => {
            tracing::debug!(error = %e, "docker API unavailable, using the docker CLI");
            Arc::new(DockerCli::new())
        }
    }
}

#[cfg(not(feature = "docker"))]
fn container_runtime() -> Arc<dyn ContainerRuntime> {
    Arc::new(DockerCli::new())
}

/// Probes wired to the local machine
pub fn local_probes() -> Probes {
    Probes {
        process: Arc::new(ProcessProbe::new(Arc::new(SysinfoInspector::new()))),
        container: Arc::new(ContainerProbe::new(
            container_runtime(),
            Arc::new(LocalPortChecker),
        )),
    }
}
