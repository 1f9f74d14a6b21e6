//! Rendering for both dashboard pages

pub mod theme;

pub use theme::styles;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell as TableCell, Paragraph, Row, Table, TableState},
};

use monotui_core::grid::Cell;
use monotui_core::model::{FacetKind, Project};
use monotui_core::navigation::CursorPosition;
use monotui_core::project_grid::{ProjectCell, ProjectGrid, cell_label, command_for_cell};
use monotui_core::runtime::{RunState, RuntimeSnapshot, RuntimeStatus, run_state_id, runtime_for};

use crate::app::{App, Level, Page};

const PROJECT_COL_WIDTH: u16 = 30;
const ACTION_COL_WIDTH: u16 = 12;
const RUNTIME_COL_WIDTH: u16 = 22;

/// Truncates to fit inside a bordered area of `width`
pub fn fit_title(s: &str, width: u16) -> String {
    let max = width.saturating_sub(4) as usize;
    if max == 0 {
        return "".into();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".into();
    }
    let mut out: String = chars.into_iter().take(max - 1).collect();
    out.push('…');
    out
}

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);
    match &app.page {
        Page::Workspace => draw_workspace(f, chunks[1], app),
        Page::Project { grid, nav } => draw_project(f, chunks[1], grid, nav.position(), &app.snapshot),
    }
    draw_info(f, chunks[2], app);
    draw_footer(f, chunks[3], app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let (active, total) = app
        .snapshot
        .iter()
        .flat_map(|w| w.run_states.iter())
        .fold((0, 0), |(active, total), rs| {
            (active + usize::from(rs.status != RuntimeStatus::Stopped), total + 1)
        });

    let mut spans = vec![
        Span::styled(" monotui ", styles::accent_bold()),
        Span::styled(app.workspace_name(), styles::text()),
        Span::styled(format!("  {} projects", app.projects.len()), styles::text_dim()),
        Span::styled(format!("  {}/{} active", active, total), styles::text_dim()),
    ];
    if let Page::Project { grid, .. } = &app.page {
        spans.push(Span::styled("  › ", styles::text_muted()));
        spans.push(Span::styled(grid.project().name.clone(), styles::accent_bold()));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn selected_style(selected: bool, base: Style) -> Style {
    if selected { styles::selection() } else { base }
}

fn runtime_badge(rs: &RunState) -> String {
    match rs.port {
        Some(port) => format!("{} {}:{}", styles::status_icon(rs.status), rs.name, port),
        None => format!("{} {}", styles::status_icon(rs.status), rs.name),
    }
}

fn draw_workspace(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border(true))
        .title(Span::styled(" Workspace ", styles::text()));

    if app.grid.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No projects found. Press r to rescan.",
            styles::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let cursor = app.nav.position();
    let is_selected = |row: usize, col: usize| cursor == Some(CursorPosition::new(row, col));

    let rows: Vec<Row> = app
        .grid
        .rows()
        .iter()
        .enumerate()
        .map(|(row, grid_row)| {
            let cells: Vec<TableCell> = grid_row
                .cells
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    let selected = is_selected(row, col);
                    match cell {
                        Some(Cell::Workspace { project, .. }) => TableCell::from(Line::from(vec![
                            Span::styled(
                                fit_title(&project.name, PROJECT_COL_WIDTH - 8),
                                selected_style(selected, styles::text()),
                            ),
                            Span::raw(" "),
                            Span::styled(project.project_type.label(), styles::project_type(project.project_type)),
                        ])),
                        Some(Cell::QuickAction { action, .. }) => TableCell::from(Span::styled(
                            format!("▶ {}", action.name),
                            selected_style(selected, styles::facet(action.facet)),
                        )),
                        Some(Cell::Runtime { run_state, .. }) => TableCell::from(Span::styled(
                            fit_title(&runtime_badge(run_state), RUNTIME_COL_WIDTH + 2),
                            selected_style(selected, styles::status(run_state.status)),
                        )),
                        None => TableCell::from(""),
                    }
                })
                .collect();
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(PROJECT_COL_WIDTH)];
    widths.extend((0..app.grid.quick_action_cols()).map(|_| Constraint::Length(ACTION_COL_WIDTH)));
    widths.extend((0..app.grid.runtime_cols()).map(|_| Constraint::Length(RUNTIME_COL_WIDTH)));

    // the table scrolls to keep the selected row in view
    let mut state = TableState::default().with_selected(cursor.map(|p| p.row));
    let table = Table::new(rows, widths).block(block).column_spacing(1);
    f.render_stateful_widget(table, area, &mut state);
}

fn compose_status(snapshot: &RuntimeSnapshot, project: &Project, service: &str) -> Option<RuntimeStatus> {
    let id = run_state_id(&project.path, FacetKind::Compose, service);
    runtime_for(snapshot, &project.path)?
        .run_states
        .iter()
        .find(|rs| rs.id == id)
        .map(|rs| rs.status)
}

fn project_cell_line(cell: &ProjectCell, selected: bool, snapshot: &RuntimeSnapshot, project: &Project) -> Line<'static> {
    let (text, base) = match cell {
        ProjectCell::Makefile { command, .. } => (command.name.clone(), styles::facet(FacetKind::Makefile)),
        ProjectCell::PackageJson { script, .. } => (script.name.clone(), styles::facet(FacetKind::PackageJson)),
        ProjectCell::ComposeCommand { action, .. } => (action.name.clone(), styles::facet(FacetKind::Compose)),
        ProjectCell::ComposeService { service, .. } => {
            let status = compose_status(snapshot, project, &service.name).unwrap_or(RuntimeStatus::Stopped);
            (
                format!("{} {}", styles::status_icon(status), service.name),
                styles::status(status),
            )
        }
    };
    Line::from(Span::styled(format!(" {} ", text), selected_style(selected, base)))
}

fn draw_project(f: &mut Frame, area: Rect, grid: &ProjectGrid, cursor: Option<CursorPosition>, snapshot: &RuntimeSnapshot) {
    let project = grid.project();
    if grid.cells().is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border(true))
            .title(Span::styled(format!(" {} ", project.name), styles::text()));
        let empty = Paragraph::new(Line::from(Span::styled(
            "Nothing to run here. Press Esc to go back.",
            styles::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let columns = grid.max_col() + 1;
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints((0..columns).map(|_| Constraint::Ratio(1, columns as u32)))
        .split(area);

    // rows of every column scroll together
    let height = area.height.saturating_sub(2) as usize;
    let offset = cursor.map_or(0, |p| (p.row + 1).saturating_sub(height));

    for (col, col_area) in areas.iter().enumerate() {
        let cells = grid.cells_in_column(col);
        let focused = cursor.is_some_and(|p| p.col == col);
        let title = cells.first().map(|c| c.filepath().to_string()).unwrap_or_default();

        let lines: Vec<Line> = cells
            .iter()
            .skip(offset)
            .take(height)
            .map(|cell| {
                let selected = cursor == Some(CursorPosition::new(cell.row(), cell.col()));
                project_cell_line(cell, selected, snapshot, project)
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border(focused))
            .title(Span::styled(format!(" {} ", fit_title(&title, col_area.width)), styles::text()));
        f.render_widget(Paragraph::new(lines).block(block), *col_area);
    }
}

fn info_lines(app: &App) -> Vec<Line<'static>> {
    match &app.page {
        Page::Workspace => {
            let Some(pos) = app.nav.position() else {
                return vec![];
            };
            match app.grid.cell_at(pos.row, pos.col) {
                Some(Cell::Workspace { project, .. }) => vec![
                    Line::from(vec![
                        Span::styled(project.name.clone(), styles::accent_bold()),
                        Span::styled(format!("  {}", project.path), styles::info()),
                    ]),
                    Line::from(Span::styled(
                        format!(
                            "makefile commands: {}  package.json scripts: {}  compose services: {}",
                            project.makefile_commands().len(),
                            project.scripts().len(),
                            project.services().len(),
                        ),
                        styles::text_dim(),
                    )),
                ],
                Some(Cell::QuickAction { action, .. }) => vec![
                    Line::from(Span::styled(action.facet_path.clone(), styles::info())),
                    Line::from(vec![
                        Span::styled(action.name.clone(), styles::facet(action.facet)),
                        Span::styled(" → ", styles::text_muted()),
                        Span::styled(action.command.clone(), styles::text()),
                    ]),
                    Line::from(Span::styled(action.exec.clone(), styles::text_dim())),
                ],
                Some(Cell::Runtime { run_state, .. }) => {
                    let mut lines = vec![
                        Line::from(vec![
                            Span::styled(run_state.name.clone(), styles::accent_bold()),
                            Span::raw("  "),
                            Span::styled(
                                format!("{} {}", styles::status_icon(run_state.status), run_state.status.label()),
                                styles::status(run_state.status),
                            ),
                            Span::styled(
                                run_state.port.map(|p| format!("  port {}", p)).unwrap_or_default(),
                                styles::text_dim(),
                            ),
                        ]),
                        Line::from(Span::styled(run_state.command.clone(), styles::text_dim())),
                    ];
                    if let Some(message) = &run_state.status_message {
                        lines.push(Line::from(Span::styled(message.clone(), styles::error())));
                    }
                    lines
                }
                None => vec![],
            }
        }
        Page::Project { grid, nav } => {
            let Some(cell) = nav.position().and_then(|p| grid.cell_at(p.row, p.col)) else {
                return vec![];
            };
            let mut lines = vec![Line::from(Span::styled(cell_label(cell), styles::info()))];
            match cell {
                ProjectCell::Makefile { command, .. } => {
                    lines.push(Line::from(Span::styled(format!("→ {}", command.command), styles::text())));
                    if let Some(desc) = &command.description {
                        lines.push(Line::from(Span::styled(desc.clone(), styles::text_dim())));
                    }
                    lines.push(Line::from(Span::styled(command.exec.clone(), styles::text_dim())));
                }
                ProjectCell::PackageJson { script, .. } => {
                    lines.push(Line::from(Span::styled(format!("→ {}", script.command), styles::text())));
                    lines.push(Line::from(Span::styled(script.exec.clone(), styles::text_dim())));
                }
                ProjectCell::ComposeCommand { .. } => {
                    if let Some(command) = command_for_cell(cell) {
                        lines.push(Line::from(Span::styled(format!("→ {}", command), styles::text())));
                    }
                }
                ProjectCell::ComposeService { service, .. } => {
                    let ports: Vec<String> = service.ports.iter().map(u16::to_string).collect();
                    lines.push(Line::from(Span::styled(
                        format!(
                            "image: {}  ports: {}",
                            service.image.as_deref().unwrap_or("-"),
                            if ports.is_empty() { "-".to_string() } else { ports.join(", ") },
                        ),
                        styles::text_dim(),
                    )));
                    if let Some(name) = &service.container_name {
                        lines.push(Line::from(Span::styled(format!("container: {}", name), styles::text_dim())));
                    }
                }
            }
            lines
        }
    }
}

fn draw_info(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(styles::border(false));
    f.render_widget(Paragraph::new(info_lines(app)).block(block), area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    if let Some(notice) = &app.notification {
        let style = match notice.level {
            Level::Info => styles::success(),
            Level::Warn => styles::warn(),
            Level::Error => styles::error(),
        };
        let text = fit_title(&notice.text, area.width.saturating_add(3));
        f.render_widget(Paragraph::new(Line::from(Span::styled(format!(" {}", text), style))), area);
        return;
    }

    let back = match app.page {
        Page::Workspace => " quit",
        Page::Project { .. } => " back",
    };
    let hints = Line::from(vec![
        Span::styled(" ←↑↓→/hjkl", styles::key_hint()),
        Span::styled(" move  ", styles::text_dim()),
        Span::styled("Enter", styles::key_hint()),
        Span::styled(" select  ", styles::text_dim()),
        Span::styled("s", styles::key_hint()),
        Span::styled(" stop  ", styles::text_dim()),
        Span::styled("r", styles::key_hint()),
        Span::styled(" rescan  ", styles::text_dim()),
        Span::styled("Esc", styles::key_hint()),
        Span::styled(back, styles::text_dim()),
        Span::styled("  q", styles::key_hint()),
        Span::styled(" quit", styles::text_dim()),
    ]);
    f.render_widget(Paragraph::new(hints), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_title() {
        assert_eq!(fit_title("short", 20), "short");
        assert_eq!(fit_title("abcdefghij", 10), "abcde…");
        assert_eq!(fit_title("abc", 4), "");
        assert_eq!(fit_title("abc", 5), "…");
    }
}
