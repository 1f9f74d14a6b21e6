//! Turns grid intents into OS actions
//!
//! Commands run through `sh -c` in the project directory. Detached commands
//! get their own session and are never tracked; attached commands borrow the
//! terminal until they exit.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use monotui_core::config::ExecutionConfig;
use monotui_core::model::{FacetKind, Project};
use monotui_core::runtime::{RunKind, RunState, RunStateId, RuntimeStatus, run_state_id};

static RE_DOCKER_COMPOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdocker(?:\s+compose|\s*-compose)\b").unwrap());
static RE_UP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bup\b").unwrap());
static RE_DOWN_OR_STOP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(down|stop)\b").unwrap());
static RE_DETACH_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)(-d|--detach)(\s|$)").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("no port known for {name}, cannot stop it")]
    NoPort { name: String },

    #[error("`{command}` exited with status {status}")]
    Failed { command: String, status: i32 },
}

/// How a command is run relative to the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// Fire and forget, the dashboard stays up
    Detached,
    /// The command takes over the terminal until it exits
    Attached,
    /// Attached, but in a new tmux window
    TmuxWindow,
}

/// True for compose commands that return on their own: `up` with
/// `-d`/`--detach`, `down` and `stop`.
pub fn should_keep_tui_open(exec: &str) -> bool {
    let normalized = exec.trim().to_lowercase();
    if normalized.is_empty() || !RE_DOCKER_COMPOSE.is_match(&normalized) {
        return false;
    }

    let detached_up = RE_UP.is_match(&normalized) && RE_DETACH_FLAG.is_match(&normalized);
    detached_up || RE_DOWN_OR_STOP.is_match(&normalized)
}

fn shell(command: &str, cwd: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(cwd);
    cmd
}

fn spawn_error(command: &str) -> impl FnOnce(io::Error) -> DispatchError + '_ {
    move |source| DispatchError::Spawn {
        command: command.to_string(),
        source,
    }
}

fn check(command: &str, status: ExitStatus) -> Result<(), DispatchError> {
    if status.success() {
        debug!(command, "command finished");
        Ok(())
    } else {
        let status = status.code().unwrap_or(-1);
        warn!(command, status, "command failed");
        Err(DispatchError::Failed {
            command: command.to_string(),
            status,
        })
    }
}

/// What a stop request will run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopPlan {
    pub id: RunStateId,
    pub command: String,
    pub cwd: PathBuf,
}

#[derive(Clone, Debug)]
pub struct Dispatcher {
    use_tmux: bool,
    in_tmux: bool,
}

impl Dispatcher {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            use_tmux: config.use_tmux,
            in_tmux: std::env::var_os("TMUX").is_some(),
        }
    }

    pub fn mode_for(&self, exec: &str) -> ExecMode {
        if should_keep_tui_open(exec) {
            ExecMode::Detached
        } else if self.use_tmux && self.in_tmux {
            ExecMode::TmuxWindow
        } else {
            ExecMode::Attached
        }
    }

    /// Runs `command` in `cwd`.
    ///
    /// `Attached` inherits stdio and waits; the caller must release the
    /// terminal first. The other modes return as soon as the process exists.
    pub async fn run_command(&self, command: &str, cwd: &Path, mode: ExecMode) -> Result<(), DispatchError> {
        debug!(command, cwd = %cwd.display(), ?mode, "dispatching");

        match mode {
            ExecMode::Detached => {
                let mut cmd = shell(command, cwd);
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());

                #[cfg(unix)]
                unsafe {
                    cmd.pre_exec(|| {
                        libc::setsid();
                        Ok(())
                    });
                }

                // dropping the handle leaves the process running
                cmd.spawn().map_err(spawn_error(command))?;
                Ok(())
            }
            ExecMode::TmuxWindow => {
                let status = Command::new("tmux")
                    .arg("new-window")
                    .arg("-c")
                    .arg(cwd)
                    .arg(command)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map_err(spawn_error(command))?;
                check("tmux new-window", status)
            }
            ExecMode::Attached => {
                let mut child = shell(command, cwd)
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .spawn()
                    .map_err(spawn_error(command))?;

                // Ctrl+C belongs to the child while it owns the terminal
                let status = loop {
                    tokio::select! {
                        status = child.wait() => break status.map_err(spawn_error(command))?,
                        _ = tokio::signal::ctrl_c() => debug!(command, "interrupt passed to attached command"),
                    }
                };
                check(command, status)
            }
        }
    }

    /// Scripts are killed by port, services through compose.
    pub fn stop_plan(&self, run_state: &RunState, project: &Project) -> Result<StopPlan, DispatchError> {
        let command = match run_state.kind {
            RunKind::Script => {
                let port = run_state.port.ok_or_else(|| DispatchError::NoPort {
                    name: run_state.name.clone(),
                })?;
                format!("fuser -k {}/tcp", port)
            }
            RunKind::Service => format!("docker compose stop {}", run_state.name),
        };

        Ok(StopPlan {
            id: run_state.id.clone(),
            command,
            cwd: project.absolute_path.clone(),
        })
    }

    pub async fn stop(&self, plan: &StopPlan) -> Result<(), DispatchError> {
        let output = shell(&plan.command, &plan.cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(spawn_error(&plan.command))?;
        check(&plan.command, output.status)
    }
}

/// Statuses to show ahead of the next poll after a detached compose command
pub fn optimistic_overrides(project: &Project, command: &str) -> Vec<(RunStateId, RuntimeStatus)> {
    let normalized = command.to_lowercase();
    if !RE_DOCKER_COMPOSE.is_match(&normalized) {
        return Vec::new();
    }

    let status = if RE_DOWN_OR_STOP.is_match(&normalized) {
        RuntimeStatus::Stopping
    } else if RE_UP.is_match(&normalized) {
        RuntimeStatus::Starting
    } else {
        return Vec::new();
    };

    project
        .services()
        .iter()
        .map(|s| (run_state_id(&project.path, FacetKind::Compose, &s.name), status))
        .collect()
}
