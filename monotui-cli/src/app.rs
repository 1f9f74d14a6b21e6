//! Dashboard state and key handling
//!
//! `App` owns both pages, their cursors and the latest runtime snapshot. Work
//! that needs the terminal or an await point is handed back to the main loop
//! as an [`Action`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use monotui_core::config::DiscoveryConfig;
use monotui_core::grid::{Cell, NavigationGrid, build_workspace_grid};
use monotui_core::model::Project;
use monotui_core::navigation::{
    CursorPosition, Direction, NavIntent, NavKey, NavigationMode, Navigator,
};
use monotui_core::poller::PollerCommand;
use monotui_core::project_grid::{
    ProjectCell, ProjectGrid, build_project_grid, command_for_cell, exec_for_cell,
};
use monotui_core::quick_actions::{WorkspaceQuickActions, derive_quick_actions};
use monotui_core::runtime::{RunState, RuntimeSnapshot, RuntimeStatus};

use crate::discovery::{self, DiscoveryError};
use crate::dispatch::{DispatchError, Dispatcher, ExecMode, optimistic_overrides};

const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub level: Level,
    pub text: String,
    at: Instant,
}

impl Notification {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            at: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.at.elapsed() >= NOTIFICATION_TTL
    }
}

#[derive(Clone, Debug)]
pub enum Page {
    Workspace,
    Project { grid: ProjectGrid, nav: Navigator },
}

/// Follow-up the main loop performs after a key press
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Release the terminal and run the command in the foreground
    RunAttached { command: String, cwd: PathBuf },
    Rediscover,
}

pub struct App {
    root: PathBuf,
    discovery: DiscoveryConfig,
    dispatcher: Dispatcher,
    poller: mpsc::Sender<PollerCommand>,
    snapshots: watch::Receiver<RuntimeSnapshot>,
    notices_tx: mpsc::UnboundedSender<Notification>,
    notices_rx: mpsc::UnboundedReceiver<Notification>,

    pub projects: Vec<Arc<Project>>,
    pub quick_actions: Vec<WorkspaceQuickActions>,
    pub snapshot: RuntimeSnapshot,
    pub grid: NavigationGrid,
    pub nav: Navigator,
    pub page: Page,
    pub notification: Option<Notification>,
}

impl App {
    pub fn new(
        root: PathBuf,
        discovery: DiscoveryConfig,
        dispatcher: Dispatcher,
        poller: mpsc::Sender<PollerCommand>,
        snapshots: watch::Receiver<RuntimeSnapshot>,
    ) -> Self {
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let snapshot = Arc::clone(&snapshots.borrow());
        Self {
            root,
            discovery,
            dispatcher,
            poller,
            snapshots,
            notices_tx,
            notices_rx,
            projects: Vec::new(),
            quick_actions: Vec::new(),
            snapshot,
            grid: NavigationGrid::default(),
            nav: Navigator::new(NavigationMode::Free),
            page: Page::Workspace,
            notification: None,
        }
    }

    /// Last path component of the workspace root
    pub fn workspace_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn notify(&mut self, level: Level, text: impl Into<String>) {
        self.notification = Some(Notification::new(level, text));
    }

    fn send(&self, command: PollerCommand) {
        if let Err(e) = self.poller.try_send(command) {
            warn!(error = %e, "poller command dropped");
        }
    }

    /// Installs a fresh project list and hands it to the poller.
    pub fn set_projects(&mut self, projects: Vec<Arc<Project>>) {
        info!(count = projects.len(), "projects loaded");
        self.quick_actions = derive_quick_actions(&projects);
        self.projects = projects;
        self.send(PollerCommand::SetProjects(self.projects.clone()));
        self.rebuild();

        // the open project may have moved or vanished
        let open = match &self.page {
            Page::Project { grid, .. } => Some(grid.project().path.clone()),
            Page::Workspace => None,
        };
        if let Some(path) = open {
            match self.projects.iter().find(|p| p.path == path).cloned() {
                Some(project) => {
                    if let Page::Project { grid, nav } = &mut self.page {
                        *grid = build_project_grid(project);
                        nav.on_rebuild(grid, None);
                    }
                }
                None => self.page = Page::Workspace,
            }
        }
    }

    pub async fn rediscover(&mut self) {
        match discovery::discover_shared(self.root.clone(), self.discovery.clone()).await {
            Ok(projects) => {
                let count = projects.len();
                self.set_projects(projects);
                self.notify(Level::Info, format!("Found {} projects", count));
            }
            Err(e) => self.discovery_failed(e),
        }
    }

    fn discovery_failed(&mut self, e: DiscoveryError) {
        warn!(error = %e, "rediscovery failed");
        self.notify(Level::Error, format!("Discovery failed: {}", e));
    }

    /// Rebuilds the workspace grid, keeping the cursor on the same project
    /// when it still exists.
    fn rebuild(&mut self) {
        let previous = self.nav.position();
        let anchored = previous.and_then(|pos| {
            let project = self.grid.project_at(pos.row)?;
            Some((pos, project.path.clone()))
        });

        self.grid = build_workspace_grid(&self.projects, &self.quick_actions, &self.snapshot);

        let preferred = match anchored {
            Some((pos, path)) => self
                .grid
                .row_of(&path)
                .map(|row| CursorPosition::new(row, pos.col))
                .or(Some(pos)),
            None => previous,
        };
        self.nav.on_rebuild(&self.grid, preferred);
    }

    /// Pulls pending snapshots and notifications; returns true when the
    /// screen needs a redraw.
    pub fn tick(&mut self) -> bool {
        let mut dirty = false;

        if self.snapshots.has_changed().unwrap_or(false) {
            self.snapshot = Arc::clone(&self.snapshots.borrow_and_update());
            self.rebuild();
            dirty = true;
        }

        while let Ok(notice) = self.notices_rx.try_recv() {
            self.notification = Some(notice);
            dirty = true;
        }

        if self.notification.as_ref().is_some_and(Notification::expired) {
            self.notification = None;
            dirty = true;
        }

        dirty
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Action {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            return Action::Quit;
        }

        let key = match code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Esc => {
                return match self.page {
                    Page::Workspace => Action::Quit,
                    Page::Project { .. } => {
                        self.back();
                        Action::None
                    }
                };
            }
            KeyCode::Char('r') => return Action::Rediscover,
            KeyCode::Up | KeyCode::Char('k') => NavKey::Move(Direction::Up),
            KeyCode::Down | KeyCode::Char('j') => NavKey::Move(Direction::Down),
            KeyCode::Left | KeyCode::Char('h') => NavKey::Move(Direction::Left),
            KeyCode::Right | KeyCode::Char('l') => NavKey::Move(Direction::Right),
            KeyCode::Enter => NavKey::Enter,
            KeyCode::Char('s') => NavKey::Stop,
            _ => return Action::None,
        };

        match &mut self.page {
            Page::Workspace => match self.nav.handle_key(&self.grid, key) {
                Some(intent) => self.on_workspace_intent(intent),
                None => Action::None,
            },
            Page::Project { grid, nav } => match nav.handle_key(grid, key) {
                Some(NavIntent::Select(pos)) => {
                    let cell = grid.cell_at(pos.row, pos.col).cloned();
                    let project = Arc::clone(grid.project());
                    match cell {
                        Some(cell) => self.on_project_cell(&project, &cell),
                        None => Action::None,
                    }
                }
                Some(NavIntent::Back) => {
                    self.back();
                    Action::None
                }
                Some(NavIntent::Stop(_)) | None => Action::None,
            },
        }
    }

    fn back(&mut self) {
        self.page = Page::Workspace;
    }

    fn open_project(&mut self, project: Arc<Project>) {
        debug!(project = %project.path, "opening project");
        let grid = build_project_grid(project);
        let mut nav = Navigator::new(NavigationMode::Columns);
        nav.on_rebuild(&grid, None);
        self.page = Page::Project { grid, nav };
    }

    fn on_workspace_intent(&mut self, intent: NavIntent) -> Action {
        match intent {
            NavIntent::Select(pos) => match self.grid.cell_at(pos.row, pos.col).cloned() {
                Some(Cell::Workspace { project, .. }) => {
                    self.open_project(project);
                    Action::None
                }
                Some(Cell::QuickAction { row, action, .. }) => {
                    let Some(project) = self.grid.project_at(row).cloned() else {
                        return Action::None;
                    };
                    self.launch(&project, &action.command, &action.exec)
                }
                Some(Cell::Runtime { run_state, .. }) => {
                    self.notify(Level::Info, format!("{} is {}", run_state.name, run_state.status.label()));
                    Action::None
                }
                None => Action::None,
            },
            NavIntent::Stop(pos) => {
                let target = self.grid.cell_at(pos.row, pos.col).and_then(Cell::run_state).cloned();
                let project = self.grid.project_at(pos.row).cloned();
                if let (Some(run_state), Some(project)) = (target, project) {
                    self.stop(&run_state, &project);
                }
                Action::None
            }
            NavIntent::Back => Action::None,
        }
    }

    fn on_project_cell(&mut self, project: &Arc<Project>, cell: &ProjectCell) -> Action {
        match (command_for_cell(cell), exec_for_cell(cell)) {
            (Some(command), Some(exec)) => {
                let (command, exec) = (command.to_string(), exec.to_string());
                self.launch(project, &command, &exec)
            }
            _ => {
                self.notify(Level::Info, format!("{} is controlled from the compose menu", cell.title()));
                Action::None
            }
        }
    }

    /// Routes a command to the right execution mode.
    fn launch(&mut self, project: &Project, command: &str, exec: &str) -> Action {
        let mode = self.dispatcher.mode_for(exec);
        info!(project = %project.path, command, ?mode, "launching");

        match mode {
            ExecMode::Attached => Action::RunAttached {
                command: command.to_string(),
                cwd: project.absolute_path.clone(),
            },
            ExecMode::Detached | ExecMode::TmuxWindow => {
                if mode == ExecMode::Detached {
                    for (id, status) in optimistic_overrides(project, exec) {
                        self.send(PollerCommand::Override { id, status });
                    }
                }

                let dispatcher = self.dispatcher.clone();
                let poller = self.poller.clone();
                let notices = self.notices_tx.clone();
                let command = command.to_string();
                let cwd = project.absolute_path.clone();
                tokio::spawn(async move {
                    let notice = match dispatcher.run_command(&command, &cwd, mode).await {
                        Ok(()) => Notification::new(Level::Info, format!("Started: {}", command)),
                        Err(e) => Notification::new(Level::Error, e.to_string()),
                    };
                    let _ = notices.send(notice);
                    let _ = poller.send(PollerCommand::PollNow).await;
                });
                Action::None
            }
        }
    }

    fn stop(&mut self, run_state: &RunState, project: &Project) {
        let plan = match self.dispatcher.stop_plan(run_state, project) {
            Ok(plan) => plan,
            Err(e) => {
                self.notify(Level::Warn, e.to_string());
                return;
            }
        };

        info!(id = %plan.id, command = %plan.command, "stopping");
        self.send(PollerCommand::Override {
            id: plan.id.clone(),
            status: RuntimeStatus::Stopping,
        });

        let dispatcher = self.dispatcher.clone();
        let poller = self.poller.clone();
        let notices = self.notices_tx.clone();
        let name = run_state.name.clone();
        tokio::spawn(async move {
            match dispatcher.stop(&plan).await {
                Ok(()) => {
                    let _ = notices.send(Notification::new(Level::Info, format!("Stopped {}", name)));
                    let _ = poller.send(PollerCommand::PollNow).await;
                }
                Err(e) => {
                    let _ = notices.send(Notification::new(Level::Error, e.to_string()));
                    let _ = poller.send(PollerCommand::ClearOverride { id: plan.id }).await;
                }
            }
        });
    }

    /// Called once an attached command gave the terminal back.
    pub fn attached_finished(&mut self, command: &str, result: Result<(), DispatchError>) {
        match result {
            Ok(()) => self.notify(Level::Info, format!("Finished: {}", command)),
            Err(e) => self.notify(Level::Error, e.to_string()),
        }
        self.send(PollerCommand::PollNow);
    }
}
