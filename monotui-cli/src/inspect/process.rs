//! Process table via sysinfo, listening sockets via `ss`

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

use monotui_core::probe::{Listener, ProbeError, ProcessInfo, ProcessInspector, parse_ss_listeners};

use super::run_tool;

pub struct SysinfoInspector {
    sys: Arc<Mutex<System>>,
}

impl SysinfoInspector {
    pub fn new() -> Self {
        Self {
            sys: Arc::new(Mutex::new(System::new())),
        }
    }
}

fn snapshot(sys: &mut System) -> Vec<ProcessInfo> {
    sys.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::new()
            .with_cmd(UpdateKind::Always)
            .with_cwd(UpdateKind::Always),
    );

    sys.processes()
        .values()
        .map(|p| {
            let command_line = if p.cmd().is_empty() {
                p.name().to_string_lossy().into_owned()
            } else {
                p.cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            ProcessInfo {
                pid: p.pid().as_u32(),
                parent: p.parent().map(|pid| pid.as_u32()),
                command_line,
                cwd: p.cwd().map(|c| c.to_path_buf()),
            }
        })
        .collect()
}

#[async_trait]
impl ProcessInspector for SysinfoInspector {
    async fn processes(&self) -> Result<Vec<ProcessInfo>, ProbeError> {
        let sys = Arc::clone(&self.sys);
        let processes = tokio::task::spawn_blocking(move || {
            let mut sys = sys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            snapshot(&mut sys)
        })
        .await
        .map_err(|e| ProbeError::Runtime(format!("process snapshot task failed: {}", e)))?;

        debug!(count = processes.len(), "process snapshot");
        Ok(processes)
    }

    async fn listeners(&self) -> Result<Vec<Listener>, ProbeError> {
        let output = run_tool("ss", &["-lptnH"]).await?;
        Ok(parse_ss_listeners(&output))
    }
}
