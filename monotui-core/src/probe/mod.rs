//! Probe facilities for live runtime detection
//!
//! The probes never touch the OS directly. They read process tables,
//! listening sockets and container lists through the traits below, which the
//! binary implements on top of sysinfo, `ss` and the docker CLI.

use std::io;

use async_trait::async_trait;

pub mod container;
pub mod process;

pub use container::{ContainerProbe, parse_docker_ports, parse_docker_ps_line};
pub use process::{ProcessProbe, extract_core_command, parse_ss_listeners};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{tool} is not available: {source}")]
    Unavailable {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    CommandFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("could not parse {tool} output: {detail}")]
    Parse { tool: String, detail: String },

    #[error("container runtime error: {0}")]
    Runtime(String),
}

/// One row of the process table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent: Option<u32>,
    /// Full command line, arguments joined by spaces
    pub command_line: String,
    pub cwd: Option<std::path::PathBuf>,
}

/// A TCP socket in LISTEN state and its owning process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Listener {
    pub pid: u32,
    pub port: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    /// Comma-separated container names as reported by the runtime
    pub names: String,
    pub image: String,
    /// e.g. "running", "exited", "restarting"
    pub state: String,
    /// Human status text, e.g. "Up 3 minutes"
    pub status: String,
    /// Published host ports
    pub ports: Vec<u16>,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }

    pub fn names_contain(&self, needle: &str) -> bool {
        self.names
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

#[async_trait]
pub trait ProcessInspector: Send + Sync {
    async fn processes(&self) -> Result<Vec<ProcessInfo>, ProbeError>;

    async fn listeners(&self) -> Result<Vec<Listener>, ProbeError>;
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// All containers, running or not
    async fn containers(&self) -> Result<Vec<ContainerInfo>, ProbeError>;
}

#[async_trait]
pub trait PortChecker: Send + Sync {
    async fn is_in_use(&self, port: u16) -> bool;
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct FakeInspector {
        pub processes: Vec<ProcessInfo>,
        pub listeners: Vec<Listener>,
        pub fail: bool,
        pub listener_calls: AtomicUsize,
    }

    #[async_trait]
    impl ProcessInspector for FakeInspector {
        async fn processes(&self) -> Result<Vec<ProcessInfo>, ProbeError> {
            if self.fail {
                return Err(ProbeError::Unavailable {
                    tool: "ps".into(),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                });
            }
            Ok(self.processes.clone())
        }

        async fn listeners(&self) -> Result<Vec<Listener>, ProbeError> {
            self.listener_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.listeners.clone())
        }
    }

    #[derive(Default)]
    pub struct FakeRuntime {
        pub containers: Vec<ContainerInfo>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn containers(&self) -> Result<Vec<ContainerInfo>, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProbeError::Runtime("daemon not running".into()));
            }
            Ok(self.containers.clone())
        }
    }

    #[derive(Default)]
    pub struct FakePorts {
        pub busy: Mutex<HashSet<u16>>,
    }

    impl FakePorts {
        pub fn busy(ports: &[u16]) -> Self {
            Self {
                busy: Mutex::new(ports.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl PortChecker for FakePorts {
        async fn is_in_use(&self, port: u16) -> bool {
            self.busy.lock().unwrap().contains(&port)
        }
    }

    pub fn proc(pid: u32, parent: Option<u32>, cmd: &str, cwd: Option<&str>) -> ProcessInfo {
        ProcessInfo {
            pid,
            parent,
            command_line: cmd.to_string(),
            cwd: cwd.map(std::path::PathBuf::from),
        }
    }

    pub fn container(names: &str, state: &str, status: &str, ports: &[u16]) -> ContainerInfo {
        ContainerInfo {
            id: format!("id-{}", names),
            names: names.to_string(),
            image: "image".to_string(),
            state: state.to_string(),
            status: status.to_string(),
            ports: ports.to_vec(),
        }
    }
}
