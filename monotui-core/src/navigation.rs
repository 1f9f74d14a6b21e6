//! Cursor movement over sparse grids
//!
//! Grids are ragged: a row may have fewer occupied cells than the widest row,
//! and columns may have gaps. The cursor only ever rests on an occupied cell.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorPosition {
    pub row: usize,
    pub col: usize,
}

impl CursorPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Anything the cursor can move over
pub trait NavigableGrid {
    fn row_count(&self) -> usize;

    fn col_count(&self) -> usize;

    /// Out-of-range positions are never occupied
    fn is_occupied(&self, row: usize, col: usize) -> bool;

    /// Whether the cell supports a stop action
    fn can_stop(&self, _row: usize, _col: usize) -> bool {
        false
    }

    /// Number of occupied cells in a column
    fn column_len(&self, col: usize) -> usize {
        (0..self.row_count())
            .filter(|&row| self.is_occupied(row, col))
            .count()
    }

    fn has_cells(&self) -> bool {
        (0..self.row_count()).any(|row| (0..self.col_count()).any(|col| self.is_occupied(row, col)))
    }
}

fn step(index: usize, len: usize, forward: bool) -> usize {
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

/// Next occupied cell from `position` in `direction`, wrapping around.
///
/// Movement stays on the current row (left/right) or column (up/down). When
/// nothing else is occupied on that axis the position is returned unchanged.
pub fn find_next_position<G: NavigableGrid + ?Sized>(
    grid: &G,
    position: CursorPosition,
    direction: Direction,
) -> CursorPosition {
    let rows = grid.row_count();
    let cols = grid.col_count();
    if rows == 0 || cols == 0 {
        return position;
    }

    let horizontal = matches!(direction, Direction::Left | Direction::Right);
    let forward = matches!(direction, Direction::Right | Direction::Down);

    let (len, start) = if horizontal {
        (cols, position.col.min(cols - 1))
    } else {
        (rows, position.row.min(rows - 1))
    };

    let mut index = start;
    for _ in 0..rows * cols {
        index = step(index, len, forward);
        if index == start {
            break;
        }

        let candidate = if horizontal {
            CursorPosition::new(position.row, index)
        } else {
            CursorPosition::new(index, position.col)
        };
        if grid.is_occupied(candidate.row, candidate.col) {
            return candidate;
        }
    }

    position
}

/// Heals a cursor after a rebuild.
///
/// Keeps `preferred` when it is still occupied. Otherwise clamps it into range
/// and searches the row (rightwards, wrapping), then the column (downwards,
/// wrapping), then the whole grid from the origin. `None` only when the grid
/// has no cells.
pub fn resolve_position<G: NavigableGrid + ?Sized>(
    grid: &G,
    preferred: CursorPosition,
) -> Option<CursorPosition> {
    let rows = grid.row_count();
    let cols = grid.col_count();
    if rows == 0 || cols == 0 {
        return None;
    }

    if grid.is_occupied(preferred.row, preferred.col) {
        return Some(preferred);
    }

    let row = preferred.row.min(rows - 1);
    let col = preferred.col.min(cols - 1);

    let along_row = (0..cols)
        .map(|offset| CursorPosition::new(row, (col + offset) % cols))
        .find(|p| grid.is_occupied(p.row, p.col));
    if along_row.is_some() {
        return along_row;
    }

    let along_col = (0..rows)
        .map(|offset| CursorPosition::new((row + offset) % rows, col))
        .find(|p| grid.is_occupied(p.row, p.col));
    if along_col.is_some() {
        return along_col;
    }

    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| CursorPosition::new(r, c)))
        .find(|p| grid.is_occupied(p.row, p.col))
}

/// Result of moving within a column-oriented grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnMove {
    Moved(CursorPosition),
    /// Left from the first column
    Exit,
}

/// Column-wise movement used on the project page.
///
/// Cells of a column are contiguous from row 0. Up/down wrap within the
/// column; left from column 0 exits; right stops at the last column. The row
/// is clamped to the target column's last cell.
pub fn move_in_columns<G: NavigableGrid + ?Sized>(
    grid: &G,
    position: CursorPosition,
    direction: Direction,
) -> ColumnMove {
    let cols = grid.col_count();
    if cols == 0 {
        return match direction {
            Direction::Left => ColumnMove::Exit,
            _ => ColumnMove::Moved(position),
        };
    }

    let clamp_to = |col: usize, row: usize| {
        let len = grid.column_len(col);
        CursorPosition::new(row.min(len.saturating_sub(1)), col)
    };

    match direction {
        Direction::Up | Direction::Down => {
            let len = grid.column_len(position.col);
            if len == 0 {
                return ColumnMove::Moved(position);
            }
            let row = step(position.row.min(len - 1), len, direction == Direction::Down);
            ColumnMove::Moved(CursorPosition::new(row, position.col))
        }
        Direction::Left => {
            if position.col == 0 {
                ColumnMove::Exit
            } else {
                ColumnMove::Moved(clamp_to(position.col - 1, position.row))
            }
        }
        Direction::Right => {
            if position.col + 1 >= cols {
                ColumnMove::Moved(position)
            } else {
                ColumnMove::Moved(clamp_to(position.col + 1, position.row))
            }
        }
    }
}

/// How a page moves its cursor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NavigationMode {
    /// Wrap-around search over a ragged grid (workspace page)
    #[default]
    Free,
    /// Column-wise movement with an exit on the left edge (project page)
    Columns,
}

/// Keyboard input relevant to the navigator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    Move(Direction),
    Enter,
    Stop,
}

/// Edge-triggered events returned to the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavIntent {
    Select(CursorPosition),
    Stop(CursorPosition),
    Back,
}

/// Per-page cursor state
#[derive(Clone, Debug, Default)]
pub struct Navigator {
    mode: NavigationMode,
    position: Option<CursorPosition>,
}

impl Navigator {
    pub fn new(mode: NavigationMode) -> Self {
        Self {
            mode,
            position: None,
        }
    }

    /// `None` while the grid has no cells
    pub fn position(&self) -> Option<CursorPosition> {
        self.position
    }

    pub fn move_cursor<G: NavigableGrid + ?Sized>(
        &mut self,
        grid: &G,
        direction: Direction,
    ) -> Option<NavIntent> {
        let current = self.position?;

        match self.mode {
            NavigationMode::Free => {
                self.position = Some(find_next_position(grid, current, direction));
                None
            }
            NavigationMode::Columns => match move_in_columns(grid, current, direction) {
                ColumnMove::Moved(next) => {
                    self.position = Some(next);
                    None
                }
                ColumnMove::Exit => Some(NavIntent::Back),
            },
        }
    }

    /// Re-anchors the cursor after the grid changed shape.
    ///
    /// `preferred` defaults to the current position.
    pub fn on_rebuild<G: NavigableGrid + ?Sized>(
        &mut self,
        grid: &G,
        preferred: Option<CursorPosition>,
    ) -> Option<CursorPosition> {
        let wanted = preferred.or(self.position).unwrap_or_default();
        self.position = resolve_position(grid, wanted);
        self.position
    }

    pub fn handle_key<G: NavigableGrid + ?Sized>(
        &mut self,
        grid: &G,
        key: NavKey,
    ) -> Option<NavIntent> {
        match key {
            NavKey::Move(direction) => self.move_cursor(grid, direction),
            NavKey::Enter => {
                let pos = self.position?;
                grid.is_occupied(pos.row, pos.col)
                    .then_some(NavIntent::Select(pos))
            }
            NavKey::Stop => {
                let pos = self.position?;
                grid.can_stop(pos.row, pos.col)
                    .then_some(NavIntent::Stop(pos))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Occupancy map for tests; `#` is a cell, `.` is a gap
    struct Sketch(Vec<Vec<bool>>, Vec<(usize, usize)>);

    impl Sketch {
        fn new(rows: &[&str]) -> Self {
            Sketch(
                rows.iter()
                    .map(|r| r.chars().map(|c| c != '.').collect())
                    .collect(),
                rows.iter()
                    .enumerate()
                    .flat_map(|(r, line)| {
                        line.chars()
                            .enumerate()
                            .filter(|(_, c)| *c == 'S')
                            .map(move |(c, _)| (r, c))
                    })
                    .collect(),
            )
        }
    }

    impl NavigableGrid for Sketch {
        fn row_count(&self) -> usize {
            self.0.len()
        }

        fn col_count(&self) -> usize {
            self.0.iter().map(|r| r.len()).max().unwrap_or(0)
        }

        fn is_occupied(&self, row: usize, col: usize) -> bool {
            self.0
                .get(row)
                .and_then(|r| r.get(col))
                .copied()
                .unwrap_or(false)
        }

        fn can_stop(&self, row: usize, col: usize) -> bool {
            self.1.contains(&(row, col))
        }
    }

    fn pos(row: usize, col: usize) -> CursorPosition {
        CursorPosition::new(row, col)
    }

    #[test]
    fn test_moves_wrap_around() {
        let grid = Sketch::new(&["###", "###"]);
        assert_eq!(find_next_position(&grid, pos(0, 2), Direction::Right), pos(0, 0));
        assert_eq!(find_next_position(&grid, pos(0, 0), Direction::Left), pos(0, 2));
        assert_eq!(find_next_position(&grid, pos(1, 1), Direction::Down), pos(0, 1));
        assert_eq!(find_next_position(&grid, pos(0, 1), Direction::Up), pos(1, 1));
    }

    #[test]
    fn test_skips_gaps() {
        let grid = Sketch::new(&["#..#", "#...", "##.#"]);
        assert_eq!(find_next_position(&grid, pos(0, 0), Direction::Right), pos(0, 3));
        assert_eq!(find_next_position(&grid, pos(0, 3), Direction::Down), pos(2, 3));
        assert_eq!(find_next_position(&grid, pos(2, 3), Direction::Down), pos(0, 3));
    }

    #[test]
    fn test_stays_put_on_lonely_axis() {
        let grid = Sketch::new(&["#..", "##."]);
        assert_eq!(find_next_position(&grid, pos(0, 0), Direction::Right), pos(0, 0));
        assert_eq!(find_next_position(&grid, pos(1, 1), Direction::Up), pos(1, 1));
    }

    #[test]
    fn test_ragged_rows_are_gaps() {
        let grid = Sketch::new(&["####", "#"]);
        assert_eq!(find_next_position(&grid, pos(0, 3), Direction::Down), pos(0, 3));
        assert_eq!(find_next_position(&grid, pos(1, 0), Direction::Left), pos(1, 0));
    }

    #[test]
    fn test_empty_grid() {
        let grid = Sketch::new(&[]);
        assert_eq!(find_next_position(&grid, pos(3, 3), Direction::Up), pos(3, 3));
        assert_eq!(resolve_position(&grid, pos(0, 0)), None);
        assert!(!grid.has_cells());
    }

    #[test]
    fn test_resolve_position_heals() {
        let grid = Sketch::new(&["#.#", "#..", "..#"]);
        // still valid
        assert_eq!(resolve_position(&grid, pos(0, 2)), Some(pos(0, 2)));
        // gap: search rightwards along the row, wrapping
        assert_eq!(resolve_position(&grid, pos(0, 1)), Some(pos(0, 2)));
        assert_eq!(resolve_position(&grid, pos(1, 1)), Some(pos(1, 0)));
        // out of range rows and columns are clamped first
        assert_eq!(resolve_position(&grid, pos(9, 9)), Some(pos(2, 2)));
        assert_eq!(resolve_position(&grid, pos(9, 0)), Some(pos(2, 2)));
    }

    #[test]
    fn test_resolve_falls_back_to_column_then_grid() {
        let grid = Sketch::new(&["..", ".#"]);
        assert_eq!(resolve_position(&grid, pos(0, 0)), Some(pos(1, 1)));
        let grid = Sketch::new(&["...", "#.."]);
        assert_eq!(resolve_position(&grid, pos(0, 2)), Some(pos(1, 0)));
    }

    #[test]
    fn test_column_moves() {
        // column 0 has 3 cells, column 1 has 1, column 2 has 2
        let grid = Sketch::new(&["###", "#.#", "#.."]);
        assert_eq!(move_in_columns(&grid, pos(2, 0), Direction::Down), ColumnMove::Moved(pos(0, 0)));
        assert_eq!(move_in_columns(&grid, pos(0, 0), Direction::Up), ColumnMove::Moved(pos(2, 0)));
        assert_eq!(move_in_columns(&grid, pos(2, 0), Direction::Right), ColumnMove::Moved(pos(0, 1)));
        assert_eq!(move_in_columns(&grid, pos(0, 1), Direction::Right), ColumnMove::Moved(pos(0, 2)));
        assert_eq!(move_in_columns(&grid, pos(1, 2), Direction::Right), ColumnMove::Moved(pos(1, 2)));
        assert_eq!(move_in_columns(&grid, pos(1, 2), Direction::Left), ColumnMove::Moved(pos(0, 1)));
        assert_eq!(move_in_columns(&grid, pos(1, 0), Direction::Left), ColumnMove::Exit);
    }

    #[test]
    fn test_navigator_intents() {
        let grid = Sketch::new(&["##S", "#.#"]);
        let mut nav = Navigator::new(NavigationMode::Free);
        assert_eq!(nav.handle_key(&grid, NavKey::Enter), None);

        assert_eq!(nav.on_rebuild(&grid, None), Some(pos(0, 0)));
        assert_eq!(nav.handle_key(&grid, NavKey::Enter), Some(NavIntent::Select(pos(0, 0))));
        assert_eq!(nav.handle_key(&grid, NavKey::Stop), None);

        nav.handle_key(&grid, NavKey::Move(Direction::Left));
        assert_eq!(nav.position(), Some(pos(0, 2)));
        assert_eq!(nav.handle_key(&grid, NavKey::Stop), Some(NavIntent::Stop(pos(0, 2))));
    }

    #[test]
    fn test_navigator_survives_rebuild() {
        let mut nav = Navigator::new(NavigationMode::Free);
        let wide = Sketch::new(&["####", "####"]);
        nav.on_rebuild(&wide, Some(pos(1, 3)));

        let narrow = Sketch::new(&["##"]);
        assert_eq!(nav.on_rebuild(&narrow, None), Some(pos(0, 1)));

        let empty = Sketch::new(&[]);
        assert_eq!(nav.on_rebuild(&empty, None), None);
        assert_eq!(nav.handle_key(&empty, NavKey::Move(Direction::Down)), None);
    }

    #[test]
    fn test_columns_navigator_exits_left() {
        let grid = Sketch::new(&["##"]);
        let mut nav = Navigator::new(NavigationMode::Columns);
        nav.on_rebuild(&grid, None);
        assert_eq!(nav.handle_key(&grid, NavKey::Move(Direction::Left)), Some(NavIntent::Back));
    }
}
