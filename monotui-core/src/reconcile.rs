//! Reconciliation of process and container probe results
//!
//! Two independent probes can both claim the same logical thing (a dev server
//! started from a script and the compose service for it). Conflicts that are
//! explained by the other source running are demoted to stopped, and
//! optimistic statuses set by the control path are held for one extra cycle
//! so the UI does not flicker between "starting" and "running".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::runtime::{
    RunState, RunStateId, RuntimeSnapshot, RuntimeStatus, WorkspaceRuntimeState,
};

pub const OTHER_RUNTIME_MESSAGE: &str = "Stopped due to other runtime running";

fn explained_by(entry: &RunState, other: &[RunState]) -> bool {
    other.iter().any(|o| {
        o.status == RuntimeStatus::Running
            && (o.name == entry.name || (entry.port.is_some() && o.port == entry.port))
    })
}

fn demote(states: &[RunState], other: &[RunState]) -> Vec<RunState> {
    states
        .iter()
        .map(|s| {
            if s.status == RuntimeStatus::Conflict && explained_by(s, other) {
                s.clone()
                    .with_status(RuntimeStatus::Stopped, Some(OTHER_RUNTIME_MESSAGE.into()))
            } else {
                s.clone()
            }
        })
        .collect()
}

/// Demotes conflicts that the other source explains.
///
/// Both directions are checked against the unresolved lists, so a demotion in
/// one list never feeds back into the other.
pub fn resolve_runtime_conflicts(
    process_states: &[RunState],
    container_states: &[RunState],
) -> (Vec<RunState>, Vec<RunState>) {
    (
        demote(process_states, container_states),
        demote(container_states, process_states),
    )
}

/// Resolves one project's probe output into its workspace runtime state,
/// process entries first.
pub fn combine_project(
    project_path: &str,
    process_states: Vec<RunState>,
    container_states: Vec<RunState>,
) -> WorkspaceRuntimeState {
    let (process, container) = resolve_runtime_conflicts(&process_states, &container_states);
    WorkspaceRuntimeState::new(project_path, process.into_iter().chain(container).collect())
}

/// Holds optimistic `Starting`/`Stopping` statuses over a fresh `Running`.
///
/// `carried` holds the ids held over in the previous cycle on input and the
/// ids held over in this cycle on output. An id is never held twice in a row.
/// Unchanged entries keep their previous `Arc`.
pub fn merge_transient_statuses(
    previous: &[WorkspaceRuntimeState],
    next: Vec<WorkspaceRuntimeState>,
    carried: &mut HashSet<RunStateId>,
) -> Vec<WorkspaceRuntimeState> {
    let prev_by_id: HashMap<&str, &Arc<RunState>> = previous
        .iter()
        .flat_map(|ws| ws.run_states.iter())
        .map(|rs| (rs.id.as_str(), rs))
        .collect();

    let mut carried_now = HashSet::new();

    let merged = next
        .into_iter()
        .map(|ws| {
            let run_states = ws
                .run_states
                .into_iter()
                .map(|fresh| {
                    let Some(prev) = prev_by_id.get(fresh.id.as_str()) else {
                        return fresh;
                    };

                    if prev.status.is_transient()
                        && fresh.status == RuntimeStatus::Running
                        && !carried.contains(&fresh.id)
                    {
                        debug!(id = %fresh.id, status = prev.status.label(), "holding transient status");
                        carried_now.insert(fresh.id.clone());
                        let mut held = (*fresh).clone();
                        held.status = prev.status;
                        held.status_message = prev.status_message.clone();
                        return Arc::new(held);
                    }

                    if **prev == fresh {
                        Arc::clone(prev)
                    } else {
                        fresh
                    }
                })
                .collect();

            WorkspaceRuntimeState {
                project_path: ws.project_path,
                run_states,
            }
        })
        .collect();

    *carried = carried_now;
    merged
}

/// Owns the previous cycle's snapshot. Lives inside the poller task.
#[derive(Debug, Default)]
pub struct RuntimeReconciler {
    previous: RuntimeSnapshot,
    carried: HashSet<RunStateId>,
}

impl RuntimeReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> &RuntimeSnapshot {
        &self.previous
    }

    pub fn reconcile(&mut self, fresh: Vec<WorkspaceRuntimeState>) -> RuntimeSnapshot {
        let merged = merge_transient_statuses(&self.previous, fresh, &mut self.carried);
        self.previous = Arc::new(merged);
        Arc::clone(&self.previous)
    }

    /// Records an optimistic status for `id`, giving it a fresh grace cycle.
    ///
    /// Returns the updated snapshot, or `None` when no entry has that id.
    pub fn apply_override(&mut self, id: &str, status: RuntimeStatus) -> Option<RuntimeSnapshot> {
        let mut found = false;
        let updated: Vec<WorkspaceRuntimeState> = self
            .previous
            .iter()
            .map(|ws| WorkspaceRuntimeState {
                project_path: ws.project_path.clone(),
                run_states: ws
                    .run_states
                    .iter()
                    .map(|rs| {
                        if rs.id == id {
                            found = true;
                            Arc::new((**rs).clone().with_status(status, None))
                        } else {
                            Arc::clone(rs)
                        }
                    })
                    .collect(),
            })
            .collect();

        if !found {
            return None;
        }

        self.carried.remove(id);
        self.previous = Arc::new(updated);
        Some(Arc::clone(&self.previous))
    }

    /// Lets the next fresh status for `id` win outright.
    pub fn clear_override(&mut self, id: &str) {
        self.carried.insert(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FacetKind;
    use crate::runtime::RunKind;

    fn script(name: &str, status: RuntimeStatus, port: Option<u16>) -> RunState {
        RunState::new(".", FacetKind::PackageJson, RunKind::Script, name, "pnpm run x")
            .with_status(status, None)
            .with_port(port)
    }

    fn svc(name: &str, status: RuntimeStatus, port: Option<u16>) -> RunState {
        RunState::new(".", FacetKind::Compose, RunKind::Service, name, "docker compose up x")
            .with_status(status, None)
            .with_port(port)
    }

    fn ws(states: Vec<RunState>) -> Vec<WorkspaceRuntimeState> {
        vec![WorkspaceRuntimeState::new(".", states)]
    }

    #[test]
    fn test_container_conflict_explained_by_running_script() {
        let process = vec![script("web", RuntimeStatus::Running, Some(3000))];
        let container = vec![
            svc("web", RuntimeStatus::Conflict, Some(3000)),
            svc("db", RuntimeStatus::Conflict, Some(5432)),
        ];

        let (p, c) = resolve_runtime_conflicts(&process, &container);
        assert_eq!(p[0].status, RuntimeStatus::Running);
        assert_eq!(c[0].status, RuntimeStatus::Stopped);
        assert_eq!(c[0].status_message.as_deref(), Some(OTHER_RUNTIME_MESSAGE));
        assert_eq!(c[1].status, RuntimeStatus::Conflict);
    }

    #[test]
    fn test_conflicts_resolve_against_unresolved_lists() {
        // each side only has a conflict; neither is running so nothing changes
        let process = vec![script("api", RuntimeStatus::Conflict, Some(8080))];
        let container = vec![svc("api", RuntimeStatus::Conflict, Some(8080))];

        let (p, c) = resolve_runtime_conflicts(&process, &container);
        assert_eq!(p[0].status, RuntimeStatus::Conflict);
        assert_eq!(c[0].status, RuntimeStatus::Conflict);
    }

    #[test]
    fn test_port_match_demotes_process_conflict() {
        let process = vec![script("dev", RuntimeStatus::Conflict, Some(5432))];
        let container = vec![svc("db", RuntimeStatus::Running, Some(5432))];

        let (p, _) = resolve_runtime_conflicts(&process, &container);
        assert_eq!(p[0].status, RuntimeStatus::Stopped);
    }

    #[test]
    fn test_name_match_alone_demotes_process_conflict() {
        let process = vec![script("db", RuntimeStatus::Conflict, None)];
        let container = vec![svc("db", RuntimeStatus::Running, Some(5432))];

        let (p, c) = resolve_runtime_conflicts(&process, &container);
        assert_eq!(p[0].status, RuntimeStatus::Stopped);
        assert_eq!(p[0].status_message.as_deref(), Some(OTHER_RUNTIME_MESSAGE));
        assert_eq!(c[0].status, RuntimeStatus::Running);

        let process = vec![script("db", RuntimeStatus::Conflict, Some(15432))];
        let (p, _) = resolve_runtime_conflicts(&process, &container);
        assert_eq!(p[0].status, RuntimeStatus::Stopped);
    }

    #[test]
    fn test_combine_orders_process_first() {
        let state = combine_project(
            "apps/api",
            vec![script("dev", RuntimeStatus::Stopped, None)],
            vec![svc("db", RuntimeStatus::Running, Some(5432))],
        );
        assert_eq!(state.project_path, "apps/api");
        assert_eq!(state.run_states[0].name, "dev");
        assert_eq!(state.run_states[1].name, "db");
    }

    #[test]
    fn test_transient_held_for_one_cycle() {
        let mut reconciler = RuntimeReconciler::new();
        reconciler.reconcile(ws(vec![script("dev", RuntimeStatus::Stopped, None)]));

        let id = ".::packageJson::dev";
        reconciler.apply_override(id, RuntimeStatus::Starting).unwrap();

        let first = reconciler.reconcile(ws(vec![script("dev", RuntimeStatus::Running, Some(3000))]));
        assert_eq!(first[0].run_states[0].status, RuntimeStatus::Starting);
        assert_eq!(first[0].run_states[0].port, Some(3000));

        let second = reconciler.reconcile(ws(vec![script("dev", RuntimeStatus::Running, Some(3000))]));
        assert_eq!(second[0].run_states[0].status, RuntimeStatus::Running);
    }

    #[test]
    fn test_transient_yields_to_non_running() {
        let mut reconciler = RuntimeReconciler::new();
        reconciler.reconcile(ws(vec![script("dev", RuntimeStatus::Running, Some(3000))]));
        reconciler.apply_override(".::packageJson::dev", RuntimeStatus::Stopping);

        let next = reconciler.reconcile(ws(vec![script("dev", RuntimeStatus::Stopped, None)]));
        assert_eq!(next[0].run_states[0].status, RuntimeStatus::Stopped);
    }

    #[test]
    fn test_clear_override_lets_fresh_win() {
        let mut reconciler = RuntimeReconciler::new();
        reconciler.reconcile(ws(vec![svc("db", RuntimeStatus::Stopped, None)]));
        reconciler.apply_override(".::compose::db", RuntimeStatus::Starting);
        reconciler.clear_override(".::compose::db");

        let next = reconciler.reconcile(ws(vec![svc("db", RuntimeStatus::Running, Some(5432))]));
        assert_eq!(next[0].run_states[0].status, RuntimeStatus::Running);
    }

    #[test]
    fn test_unknown_override_is_ignored() {
        let mut reconciler = RuntimeReconciler::new();
        assert!(reconciler.apply_override("nope::compose::x", RuntimeStatus::Starting).is_none());
    }

    #[test]
    fn test_unchanged_entries_keep_identity() {
        let mut reconciler = RuntimeReconciler::new();
        let a = reconciler.reconcile(ws(vec![svc("db", RuntimeStatus::Running, Some(5432))]));
        let b = reconciler.reconcile(ws(vec![svc("db", RuntimeStatus::Running, Some(5432))]));
        assert!(Arc::ptr_eq(&a[0].run_states[0], &b[0].run_states[0]));
    }
}
