//! Background polling of runtime state
//!
//! The poller owns the schedule, the current project list and the reconciler.
//! Consumers read the newest snapshot from a `watch` channel and steer the
//! poller with [`PollerCommand`]s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::model::{FacetKind, Project};
use crate::probe::{ContainerProbe, ProcessProbe};
use crate::reconcile::{RuntimeReconciler, combine_project};
use crate::runtime::{
    RunKind, RunState, RunStateId, RuntimeSnapshot, RuntimeStatus, WorkspaceRuntimeState,
};

const COMMAND_BUFFER: usize = 64;

/// Commands accepted by the poller task
#[derive(Clone, Debug)]
pub enum PollerCommand {
    /// Replace the project list and poll immediately
    SetProjects(Vec<Arc<Project>>),
    PollNow,
    /// Optimistic status from the control path
    Override { id: RunStateId, status: RuntimeStatus },
    ClearOverride { id: RunStateId },
    Shutdown,
}

/// Both probes, shared by every per-project task
#[derive(Clone)]
pub struct Probes {
    pub process: Arc<ProcessProbe>,
    pub container: Arc<ContainerProbe>,
}

pub struct PollerHandle {
    commands: mpsc::Sender<PollerCommand>,
    snapshots: watch::Receiver<RuntimeSnapshot>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> watch::Receiver<RuntimeSnapshot> {
        self.snapshots.clone()
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> RuntimeSnapshot {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn sender(&self) -> mpsc::Sender<PollerCommand> {
        self.commands.clone()
    }

    /// Returns false once the poller has stopped
    pub async fn send(&self, command: PollerCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Non-blocking variant for the UI thread
    pub fn try_send(&self, command: PollerCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "poller command dropped");
                false
            }
        }
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(PollerCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "poller task ended abnormally");
        }
    }
}

pub struct RuntimePoller {
    probes: Probes,
    poll_interval: Duration,
    probe_timeout: Duration,
    projects: Vec<Arc<Project>>,
    reconciler: RuntimeReconciler,
    publisher: watch::Sender<RuntimeSnapshot>,
}

impl RuntimePoller {
    /// Starts the poller on the current tokio runtime.
    pub fn spawn(probes: Probes, config: &RuntimeConfig) -> PollerHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (publisher, snapshots) = watch::channel(RuntimeSnapshot::default());

        let poller = RuntimePoller {
            probes,
            poll_interval: config.poll_interval(),
            probe_timeout: config.probe_timeout(),
            projects: Vec::new(),
            reconciler: RuntimeReconciler::new(),
            publisher,
        };

        let task = tokio::spawn(poller.run(command_rx));

        PollerHandle {
            commands: command_tx,
            snapshots,
            task,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<PollerCommand>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_ms = self.poll_interval.as_millis() as u64, "runtime poller started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll_cycle().await;
                }
                command = commands.recv() => {
                    match command {
                        Some(PollerCommand::SetProjects(projects)) => {
                            debug!(count = projects.len(), "projects replaced");
                            self.projects = projects;
                            if self.projects.is_empty() {
                                self.reconciler = RuntimeReconciler::new();
                                self.publish(RuntimeSnapshot::default());
                            } else {
                                self.poll_cycle().await;
                                interval.reset();
                            }
                        }
                        Some(PollerCommand::PollNow) => {
                            self.poll_cycle().await;
                            interval.reset();
                        }
                        Some(PollerCommand::Override { id, status }) => {
                            match self.reconciler.apply_override(&id, status) {
                                Some(snapshot) => self.publish(snapshot),
                                None => debug!(id = %id, "override for unknown run state"),
                            }
                        }
                        Some(PollerCommand::ClearOverride { id }) => {
                            self.reconciler.clear_override(&id);
                        }
                        Some(PollerCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        info!("runtime poller stopped");
    }

    async fn poll_cycle(&mut self) {
        if self.projects.is_empty() {
            return;
        }

        let mut tasks = JoinSet::new();
        for (index, project) in self.projects.iter().enumerate() {
            let probes = self.probes.clone();
            let project = Arc::clone(project);
            let limit = self.probe_timeout;
            tasks.spawn(async move { (index, probe_project(&probes, &project, limit).await) });
        }

        let mut results: Vec<Option<WorkspaceRuntimeState>> = vec![None; self.projects.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, state)) => results[index] = Some(state),
                Err(e) => warn!(error = %e, "project probe task failed"),
            }
        }

        let fresh: Vec<WorkspaceRuntimeState> = results
            .into_iter()
            .zip(&self.projects)
            .map(|(state, project)| {
                state.unwrap_or_else(|| {
                    let mut stopped = all_stopped(project, RunKind::Script);
                    stopped.extend(all_stopped(project, RunKind::Service));
                    WorkspaceRuntimeState::new(project.path.clone(), stopped)
                })
            })
            .collect();

        let snapshot = self.reconciler.reconcile(fresh);
        self.publish(snapshot);
    }

    fn publish(&self, snapshot: RuntimeSnapshot) {
        let changed = self.publisher.send_if_modified(|current| {
            if **current == *snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        if changed {
            debug!("runtime snapshot published");
        }
    }
}

/// Stopped entries for every declared script target or service, used when a
/// probe times out or its task dies.
fn all_stopped(project: &Project, kind: RunKind) -> Vec<RunState> {
    match kind {
        RunKind::Script => project
            .script_targets()
            .into_iter()
            .map(|t| RunState::new(&project.path, t.facet, RunKind::Script, t.name, t.command))
            .collect(),
        RunKind::Service => project
            .services()
            .iter()
            .map(|s| {
                RunState::new(
                    &project.path,
                    FacetKind::Compose,
                    RunKind::Service,
                    &s.name,
                    format!("docker compose up {}", s.name),
                )
            })
            .collect(),
    }
}

async fn probe_project(probes: &Probes, project: &Project, limit: Duration) -> WorkspaceRuntimeState {
    let targets = project.script_targets();
    let (process, container) = tokio::join!(
        timeout(
            limit,
            probes
                .process
                .probe_scripts(&project.absolute_path, &project.path, &targets),
        ),
        timeout(
            limit,
            probes.container.probe_services(&project.path, project.services()),
        ),
    );

    let process = process.unwrap_or_else(|_| {
        warn!(project = %project.path, "process probe timed out");
        all_stopped(project, RunKind::Script)
    });
    let container = container.unwrap_or_else(|_| {
        warn!(project = %project.path, "container probe timed out");
        all_stopped(project, RunKind::Service)
    });

    debug!(
        project = %project.path,
        scripts = process.len(),
        services = container.len(),
        "project probed"
    );

    combine_project(&project.path, process, container)
}
