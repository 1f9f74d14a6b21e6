//! The detail grid for a single project
//!
//! One column per non-empty facet, in the order Makefile, package.json,
//! compose. The compose column starts with a fixed control menu followed by
//! one cell per service. Cells share the project's records instead of
//! copying them.

use std::sync::Arc;

use crate::model::{ComposeService, MakefileCommand, PackageJsonScript, Project};
use crate::navigation::NavigableGrid;

/// Control menu at the top of the compose column
pub const COMPOSE_COMMANDS: &[&str] = &["up", "up -d", "down", "build", "stop", "logs"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposeAction {
    pub name: String,
    pub command: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectCell {
    Makefile {
        row: usize,
        col: usize,
        filepath: String,
        command: Arc<MakefileCommand>,
    },
    PackageJson {
        row: usize,
        col: usize,
        filepath: String,
        script: Arc<PackageJsonScript>,
    },
    ComposeCommand {
        row: usize,
        col: usize,
        filepath: String,
        action: ComposeAction,
    },
    ComposeService {
        row: usize,
        col: usize,
        filepath: String,
        service: Arc<ComposeService>,
    },
}

impl ProjectCell {
    pub fn row(&self) -> usize {
        match self {
            ProjectCell::Makefile { row, .. }
            | ProjectCell::PackageJson { row, .. }
            | ProjectCell::ComposeCommand { row, .. }
            | ProjectCell::ComposeService { row, .. } => *row,
        }
    }

    pub fn col(&self) -> usize {
        match self {
            ProjectCell::Makefile { col, .. }
            | ProjectCell::PackageJson { col, .. }
            | ProjectCell::ComposeCommand { col, .. }
            | ProjectCell::ComposeService { col, .. } => *col,
        }
    }

    pub fn filepath(&self) -> &str {
        match self {
            ProjectCell::Makefile { filepath, .. }
            | ProjectCell::PackageJson { filepath, .. }
            | ProjectCell::ComposeCommand { filepath, .. }
            | ProjectCell::ComposeService { filepath, .. } => filepath,
        }
    }

    /// Short text shown inside the cell
    pub fn title(&self) -> &str {
        match self {
            ProjectCell::Makefile { command, .. } => &command.name,
            ProjectCell::PackageJson { script, .. } => &script.name,
            ProjectCell::ComposeCommand { action, .. } => &action.name,
            ProjectCell::ComposeService { service, .. } => &service.name,
        }
    }
}

/// e.g. "Makefile - apps/api/Makefile"
pub fn cell_label(cell: &ProjectCell) -> String {
    let kind = match cell {
        ProjectCell::Makefile { .. } => "Makefile",
        ProjectCell::PackageJson { .. } => "Package.json",
        ProjectCell::ComposeCommand { .. } => "Docker Compose",
        ProjectCell::ComposeService { .. } => "Docker Service",
    };
    format!("{} - {}", kind, cell.filepath())
}

/// Command dispatched when the cell is selected; services have none
pub fn command_for_cell(cell: &ProjectCell) -> Option<&str> {
    match cell {
        ProjectCell::Makefile { command, .. } => Some(&command.command),
        ProjectCell::PackageJson { script, .. } => Some(&script.command),
        ProjectCell::ComposeCommand { action, .. } => Some(&action.command),
        ProjectCell::ComposeService { .. } => None,
    }
}

/// What the command ultimately runs, used to pick attached or detached mode
pub fn exec_for_cell(cell: &ProjectCell) -> Option<&str> {
    match cell {
        ProjectCell::Makefile { command, .. } => Some(&command.exec),
        ProjectCell::PackageJson { script, .. } => Some(&script.exec),
        ProjectCell::ComposeCommand { action, .. } => Some(&action.command),
        ProjectCell::ComposeService { .. } => None,
    }
}

#[derive(Clone, Debug)]
pub struct ProjectGrid {
    project: Arc<Project>,
    cells: Vec<ProjectCell>,
    max_col: usize,
}

fn facet_file(project: &Project, filename: &str) -> String {
    if project.path == "." {
        filename.to_string()
    } else {
        format!("{}/{}", project.path, filename)
    }
}

pub fn build_project_grid(project: Arc<Project>) -> ProjectGrid {
    let mut cells = Vec::new();
    let mut next_col = 0;

    if let Some(makefile) = project.facets.makefile.as_ref().filter(|m| !m.commands.is_empty()) {
        let col = next_col;
        next_col += 1;
        let filepath = facet_file(&project, &makefile.filename);
        cells.extend(makefile.commands.iter().enumerate().map(|(row, c)| {
            ProjectCell::Makefile {
                row,
                col,
                filepath: filepath.clone(),
                command: Arc::clone(c),
            }
        }));
    }

    if let Some(pkg) = project.facets.package_json.as_ref().filter(|p| !p.scripts.is_empty()) {
        let col = next_col;
        next_col += 1;
        let filepath = facet_file(&project, &pkg.filename);
        cells.extend(pkg.scripts.iter().enumerate().map(|(row, s)| {
            ProjectCell::PackageJson {
                row,
                col,
                filepath: filepath.clone(),
                script: Arc::clone(s),
            }
        }));
    }

    if let Some(compose) = project.facets.compose.as_ref().filter(|c| !c.services.is_empty()) {
        let col = next_col;
        next_col += 1;
        let filepath = facet_file(&project, &compose.filename);

        cells.extend(COMPOSE_COMMANDS.iter().enumerate().map(|(row, name)| {
            ProjectCell::ComposeCommand {
                row,
                col,
                filepath: filepath.clone(),
                action: ComposeAction {
                    name: name.to_string(),
                    command: format!("docker compose {}", name),
                },
            }
        }));

        let offset = COMPOSE_COMMANDS.len();
        cells.extend(compose.services.iter().enumerate().map(|(i, s)| {
            ProjectCell::ComposeService {
                row: offset + i,
                col,
                filepath: filepath.clone(),
                service: Arc::clone(s),
            }
        }));
    }

    ProjectGrid {
        project,
        cells,
        max_col: next_col.saturating_sub(1),
    }
}

impl ProjectGrid {
    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn cells(&self) -> &[ProjectCell] {
        &self.cells
    }

    pub fn max_col(&self) -> usize {
        self.max_col
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<&ProjectCell> {
        self.cells.iter().find(|c| c.row() == row && c.col() == col)
    }

    pub fn cells_in_column(&self, col: usize) -> Vec<&ProjectCell> {
        self.cells.iter().filter(|c| c.col() == col).collect()
    }

    /// Height of the tallest column
    pub fn max_rows(&self) -> usize {
        (0..=self.max_col)
            .map(|col| self.cells_in_column(col).len())
            .max()
            .unwrap_or(0)
    }
}

impl NavigableGrid for ProjectGrid {
    fn row_count(&self) -> usize {
        self.max_rows()
    }

    fn col_count(&self) -> usize {
        if self.cells.is_empty() {
            0
        } else {
            self.max_col + 1
        }
    }

    fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.cell_at(row, col).is_some()
    }

    fn column_len(&self, col: usize) -> usize {
        self.cells.iter().filter(|c| c.col() == col).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;
    use crate::navigation::{ColumnMove, CursorPosition, Direction, move_in_columns};

    #[test]
    fn test_columns_compact_over_missing_facets() {
        let p = with_services(
            with_scripts(project("apps/web"), vec![script("dev", "vite"), script("build", "vite build")]),
            vec![service("db", &[5432]), service("cache", &[6379])],
        );
        let grid = build_project_grid(Arc::new(p));

        assert_eq!(grid.max_col(), 1);
        assert_eq!(grid.cells_in_column(0).len(), 2);
        assert_eq!(grid.cells_in_column(1).len(), COMPOSE_COMMANDS.len() + 2);
        assert_eq!(grid.max_rows(), 8);

        match grid.cell_at(0, 0) {
            Some(cell @ ProjectCell::PackageJson { script, .. }) => {
                assert_eq!(script.name, "dev");
                assert_eq!(cell_label(cell), "Package.json - apps/web/package.json");
                assert_eq!(command_for_cell(cell), Some("pnpm run dev"));
                assert_eq!(exec_for_cell(cell), Some("vite"));
            }
            other => panic!("unexpected cell {other:?}"),
        }

        let up_d = grid.cell_at(1, 1).unwrap();
        assert_eq!(up_d.title(), "up -d");
        assert_eq!(command_for_cell(up_d), Some("docker compose up -d"));
        assert_eq!(cell_label(up_d), "Docker Compose - apps/web/docker-compose.yml");

        let db = grid.cell_at(6, 1).unwrap();
        assert!(matches!(db, ProjectCell::ComposeService { service, .. } if service.name == "db"));
        assert_eq!(command_for_cell(db), None);
        assert_eq!(cell_label(db), "Docker Service - apps/web/docker-compose.yml");
    }

    #[test]
    fn test_cells_share_project_records() {
        let p = Arc::new(with_services(
            with_makefile(project("apps/api"), vec![make_target("dev", "cargo run")]),
            vec![service("db", &[5432])],
        ));
        let grid = build_project_grid(Arc::clone(&p));

        assert!(Arc::ptr_eq(grid.project(), &p));
        match grid.cell_at(0, 0) {
            Some(ProjectCell::Makefile { command, .. }) => {
                assert!(Arc::ptr_eq(command, &p.makefile_commands()[0]));
            }
            other => panic!("unexpected cell {other:?}"),
        }
        match grid.cell_at(COMPOSE_COMMANDS.len(), 1) {
            Some(ProjectCell::ComposeService { service, .. }) => {
                assert!(Arc::ptr_eq(service, &p.services()[0]));
            }
            other => panic!("unexpected cell {other:?}"),
        }
    }

    #[test]
    fn test_all_three_facets() {
        let p = with_services(
            with_scripts(
                with_makefile(project("apps/api"), vec![make_target("dev", "cargo run")]),
                vec![script("test", "vitest")],
            ),
            vec![service("db", &[5432])],
        );
        let grid = build_project_grid(Arc::new(p));

        assert_eq!(grid.max_col(), 2);
        assert!(matches!(grid.cell_at(0, 0), Some(ProjectCell::Makefile { .. })));
        assert!(matches!(grid.cell_at(0, 1), Some(ProjectCell::PackageJson { .. })));
        assert!(matches!(grid.cell_at(0, 2), Some(ProjectCell::ComposeCommand { .. })));
        assert_eq!(grid.col_count(), 3);
    }

    #[test]
    fn test_compose_without_services_has_no_column() {
        let p = with_services(
            with_makefile(project("infra"), vec![make_target("up", "docker compose up")]),
            vec![],
        );
        let grid = build_project_grid(Arc::new(p));
        assert_eq!(grid.max_col(), 0);
        assert_eq!(grid.cells().len(), 1);
    }

    #[test]
    fn test_empty_project() {
        let grid = build_project_grid(Arc::new(project("apps/empty")));
        assert_eq!(grid.max_col(), 0);
        assert_eq!(grid.max_rows(), 0);
        assert_eq!(grid.col_count(), 0);
    }

    #[test]
    fn test_root_project_filepath() {
        let p = with_makefile(project("."), vec![make_target("dev", "x")]);
        let grid = build_project_grid(Arc::new(p));
        assert_eq!(cell_label(&grid.cells()[0]), "Makefile - Makefile");
    }

    #[test]
    fn test_column_moves_clamp_row() {
        let p = with_services(
            with_makefile(
                project("apps/api"),
                vec![make_target("dev", "a"), make_target("up", "b")],
            ),
            vec![service("db", &[5432])],
        );
        let grid = build_project_grid(Arc::new(p));

        // compose column is taller; moving back left clamps into the makefile column
        assert_eq!(
            move_in_columns(&grid, CursorPosition::new(6, 1), Direction::Left),
            ColumnMove::Moved(CursorPosition::new(1, 0))
        );
        assert_eq!(
            move_in_columns(&grid, CursorPosition::new(1, 0), Direction::Right),
            ColumnMove::Moved(CursorPosition::new(1, 1))
        );
    }
}
