//! The workspace grid: one row per project
//!
//! Column 0 holds the project, the next band its quick actions, the last band
//! its live run states. Bands are padded with gaps so every row has the same
//! width.

use std::sync::Arc;

use crate::model::{Project, ProjectPath};
use crate::navigation::{CursorPosition, NavigableGrid};
use crate::quick_actions::{QuickAction, WorkspaceQuickActions, quick_actions_for};
use crate::runtime::{RunState, WorkspaceRuntimeState, runtime_for};

#[derive(Clone, Debug)]
pub enum Cell {
    Workspace {
        row: usize,
        col: usize,
        project: Arc<Project>,
    },
    QuickAction {
        row: usize,
        col: usize,
        action: Arc<QuickAction>,
    },
    Runtime {
        row: usize,
        col: usize,
        run_state: Arc<RunState>,
    },
}

impl Cell {
    pub fn position(&self) -> CursorPosition {
        match self {
            Cell::Workspace { row, col, .. }
            | Cell::QuickAction { row, col, .. }
            | Cell::Runtime { row, col, .. } => CursorPosition::new(*row, *col),
        }
    }

    pub fn run_state(&self) -> Option<&Arc<RunState>> {
        match self {
            Cell::Runtime { run_state, .. } => Some(run_state),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GridRow {
    /// Project path
    pub id: ProjectPath,
    pub cells: Vec<Option<Cell>>,
}

#[derive(Clone, Debug, Default)]
pub struct NavigationGrid {
    rows: Vec<GridRow>,
    quick_action_cols: usize,
    runtime_cols: usize,
}

/// Band widths are measured over `projects` only, so entries left over from
/// a previous discovery never widen the grid.
pub fn build_workspace_grid(
    projects: &[Arc<Project>],
    quick_actions: &[WorkspaceQuickActions],
    runtime_states: &[WorkspaceRuntimeState],
) -> NavigationGrid {
    let bands: Vec<(&[Arc<QuickAction>], Vec<&Arc<RunState>>)> = projects
        .iter()
        .map(|project| {
            let actions = quick_actions_for(quick_actions, &project.path)
                .map(|q| q.actions.as_slice())
                .unwrap_or_default();
            let active = runtime_for(runtime_states, &project.path)
                .map(|s| s.active().collect())
                .unwrap_or_default();
            (actions, active)
        })
        .collect();

    let quick_action_cols = bands.iter().map(|(a, _)| a.len()).max().unwrap_or(0);
    let runtime_cols = bands.iter().map(|(_, r)| r.len()).max().unwrap_or(0);

    let rows = projects
        .iter()
        .zip(&bands)
        .enumerate()
        .map(|(row, (project, (actions, active)))| {
            let mut cells = Vec::with_capacity(1 + quick_action_cols + runtime_cols);
            cells.push(Some(Cell::Workspace {
                row,
                col: 0,
                project: Arc::clone(project),
            }));

            for i in 0..quick_action_cols {
                cells.push(actions.get(i).map(|action| Cell::QuickAction {
                    row,
                    col: 1 + i,
                    action: Arc::clone(action),
                }));
            }

            for i in 0..runtime_cols {
                cells.push(active.get(i).map(|run_state| Cell::Runtime {
                    row,
                    col: 1 + quick_action_cols + i,
                    run_state: Arc::clone(run_state),
                }));
            }

            GridRow {
                id: project.path.clone(),
                cells,
            }
        })
        .collect();

    NavigationGrid {
        rows,
        quick_action_cols,
        runtime_cols,
    }
}

impl NavigationGrid {
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn quick_action_cols(&self) -> usize {
        self.quick_action_cols
    }

    pub fn runtime_cols(&self) -> usize {
        self.runtime_cols
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.cells.get(col)?.as_ref()
    }

    pub fn cells_in_column(&self, col: usize) -> Vec<&Cell> {
        self.rows
            .iter()
            .filter_map(|r| r.cells.get(col).and_then(|c| c.as_ref()))
            .collect()
    }

    pub fn max_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row_of(&self, project_path: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id == project_path)
    }

    pub fn project_at(&self, row: usize) -> Option<&Arc<Project>> {
        match self.cell_at(row, 0)? {
            Cell::Workspace { project, .. } => Some(project),
            _ => None,
        }
    }
}

impl NavigableGrid for NavigationGrid {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn col_count(&self) -> usize {
        1 + self.quick_action_cols + self.runtime_cols
    }

    fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.cell_at(row, col).is_some()
    }

    fn can_stop(&self, row: usize, col: usize) -> bool {
        self.cell_at(row, col)
            .and_then(Cell::run_state)
            .is_some_and(|rs| rs.can_stop())
    }
}
