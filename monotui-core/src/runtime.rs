use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{FacetKind, ProjectPath};

/// Deterministic id, e.g. "apps/api::packageJson::dev"
pub type RunStateId = String;

/// A published poll result: one entry per project, in project order
pub type RuntimeSnapshot = Arc<Vec<WorkspaceRuntimeState>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
    Conflict,
}

impl RuntimeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RuntimeStatus::Stopped => "stopped",
            RuntimeStatus::Starting => "starting",
            RuntimeStatus::Running => "running",
            RuntimeStatus::Stopping => "stopping",
            RuntimeStatus::Failed => "failed",
            RuntimeStatus::Conflict => "conflict",
        }
    }

    /// Optimistic statuses set by the control path ahead of a probe
    pub fn is_transient(&self) -> bool {
        matches!(self, RuntimeStatus::Starting | RuntimeStatus::Stopping)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Script,
    Service,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub id: RunStateId,
    pub name: String,
    pub kind: RunKind,
    pub status: RuntimeStatus,
    pub status_message: Option<String>,
    /// Shell command that would (re)start it
    pub command: String,
    pub port: Option<u16>,
}

impl RunState {
    pub fn new(
        project_path: &str,
        facet: FacetKind,
        kind: RunKind,
        name: &str,
        command: impl Into<String>,
    ) -> Self {
        Self {
            id: run_state_id(project_path, facet, name),
            name: name.to_string(),
            kind,
            status: RuntimeStatus::Stopped,
            status_message: None,
            command: command.into(),
            port: None,
        }
    }

    pub fn with_status(mut self, status: RuntimeStatus, message: Option<String>) -> Self {
        self.status = status;
        self.status_message = message;
        self
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Only live entries can be stopped from the grid
    pub fn can_stop(&self) -> bool {
        matches!(self.status, RuntimeStatus::Running | RuntimeStatus::Conflict)
    }
}

pub fn run_state_id(project_path: &str, facet: FacetKind, name: &str) -> RunStateId {
    format!("{}::{}::{}", project_path, facet.tag(), name)
}

/// Project path encoded in a run-state id
pub fn project_path_of(id: &str) -> Option<&str> {
    id.split("::").next().filter(|p| !p.is_empty() && *p != id)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRuntimeState {
    pub project_path: ProjectPath,
    pub run_states: Vec<Arc<RunState>>,
}

impl WorkspaceRuntimeState {
    pub fn new(project_path: impl Into<ProjectPath>, run_states: Vec<RunState>) -> Self {
        Self {
            project_path: project_path.into(),
            run_states: run_states.into_iter().map(Arc::new).collect(),
        }
    }

    /// Entries worth a cell in the workspace grid
    pub fn active(&self) -> impl Iterator<Item = &Arc<RunState>> {
        self.run_states
            .iter()
            .filter(|rs| rs.status != RuntimeStatus::Stopped)
    }
}

pub fn runtime_for<'a>(
    states: &'a [WorkspaceRuntimeState],
    project_path: &str,
) -> Option<&'a WorkspaceRuntimeState> {
    states.iter().find(|s| s.project_path == project_path)
}
