use crate::spreadsheet::cell::Cell;
use std::collections::HashMap;
use std::collections::HashSet;

/// Structural view of a sheet: extent, visibility, and stored print area.
///
/// Rows and columns are addressed 1-based, matching cell references.
pub trait SheetStructure {
    /// Largest row number in use (at least 1).
    fn max_row(&self) -> usize;

    /// Largest column number in use (at least 1).
    fn max_col(&self) -> usize;

    /// Stored print-area reference, e.g. `'Sheet 1'!$A$1:$C$3`.
    fn print_area(&self) -> Option<&str>;

    fn is_hidden_row(&self, row: usize) -> bool;

    fn is_hidden_col(&self, col: usize) -> bool;
}

/// Tabular view of a sheet: a grid anchored at `A1`, addressed 0-based.
pub trait CellValues {
    fn row_count(&self) -> usize;

    fn col_count(&self) -> usize;

    /// Canonical text of the value at `(row, col)`, `None` when the cell holds no value
    /// or lies outside the grid.
    fn value_at(&self, row: usize, col: usize) -> Option<String>;

    /// Whether the grid has no rows or no columns.
    fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.col_count() == 0
    }
}

/// Structural metadata read from a worksheet part.
#[derive(Clone, Debug, Default)]
pub struct SheetLayout {
    /// Largest 1-based row of any cell element, 0 until a cell is seen
    max_row: usize,
    /// Largest 1-based column of any cell element, 0 until a cell is seen
    max_col: usize,
    /// Stored print-area reference from the workbook's defined names
    print_area: Option<String>,
    /// Hidden 1-based rows
    hidden_rows: HashSet<usize>,
    /// Hidden 1-based column spans, inclusive
    hidden_cols: Vec<(usize, usize)>,
}

impl SheetLayout {
    pub(crate) fn new(print_area: Option<String>) -> Self {
        Self {
            print_area,
            ..Self::default()
        }
    }

    /// Records a cell element at a 1-based position, valued or not.
    pub(crate) fn touch(&mut self, row: usize, col: usize) {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    pub(crate) fn hide_row(&mut self, row: usize) {
        self.hidden_rows.insert(row);
    }

    /// Hides the 1-based columns `min..=max`.
    pub(crate) fn hide_cols(&mut self, min: usize, max: usize) {
        if min <= max {
            self.hidden_cols.push((min, max));
        }
    }
}

impl SheetStructure for SheetLayout {
    fn max_row(&self) -> usize {
        self.max_row.max(1)
    }

    fn max_col(&self) -> usize {
        self.max_col.max(1)
    }

    fn print_area(&self) -> Option<&str> {
        self.print_area.as_deref()
    }

    fn is_hidden_row(&self, row: usize) -> bool {
        self.hidden_rows.contains(&row)
    }

    fn is_hidden_col(&self, col: usize) -> bool {
        self.hidden_cols.iter().any(|(min, max)| (*min..=*max).contains(&col))
    }
}

/// Valued cells of a worksheet with an index for positional lookup.
#[derive(Clone, Debug, Default)]
pub struct CellGrid {
    /// All valued cells in document order
    cells: Vec<Cell>,
    /// Index mapping from (row, col) to cell vector position
    indexes: HashMap<(usize, usize), usize>,
    /// Number of rows, i.e. last valued row + 1
    rows: usize,
    /// Number of columns, i.e. last valued column + 1
    cols: usize,
}

impl CellGrid {
    /// Adds a valued cell, replacing any earlier cell at the same position.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.rows = self.rows.max(cell.row + 1);
        self.cols = self.cols.max(cell.col + 1);
        match self.indexes.get(&(cell.row, cell.col)) {
            Some(index) => self.cells[*index] = cell,
            None => {
                self.indexes.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    pub(crate) fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes.get(&(row, col)).and_then(|index| self.cells.get(*index))
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

impl CellValues for CellGrid {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn value_at(&self, row: usize, col: usize) -> Option<String> {
        self.get(row, col).map(|cell| cell.to_string())
    }
}

/// One worksheet as read from a workbook: its name, layout, and values.
#[derive(Clone, Debug)]
pub struct Worksheet {
    pub name: String,
    pub layout: SheetLayout,
    pub grid: CellGrid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(grid: &mut CellGrid, row: usize, col: usize, value: &str) {
        grid.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        });
    }

    #[test]
    fn layout_initial() {
        let layout = SheetLayout::new(None);

        assert_eq!(layout.max_row(), 1);
        assert_eq!(layout.max_col(), 1);
        assert_eq!(layout.print_area(), None);
        assert!(!layout.is_hidden_row(1));
        assert!(!layout.is_hidden_col(1));
    }

    #[test]
    fn layout_update() {
        let mut layout = SheetLayout::new(Some("$A$1:$B$2".to_owned()));
        layout.touch(3, 1);
        layout.touch(1, 5);
        layout.hide_row(2);
        layout.hide_cols(2, 3);
        layout.hide_cols(9, 8);

        assert_eq!(layout.max_row(), 3);
        assert_eq!(layout.max_col(), 5);
        assert_eq!(layout.print_area(), Some("$A$1:$B$2"));
        assert!(layout.is_hidden_row(2));
        assert!(!layout.is_hidden_row(3));
        assert!(!layout.is_hidden_col(1));
        assert!(layout.is_hidden_col(2));
        assert!(layout.is_hidden_col(3));
        assert!(!layout.is_hidden_col(4));
        assert!(!layout.is_hidden_col(8));
    }

    #[test]
    fn grid_initial() {
        let grid = CellGrid::default();

        assert_eq!(grid.row_count(), 0);
        assert_eq!(grid.col_count(), 0);
        assert!(grid.is_empty());
        assert_eq!(grid.value_at(0, 0), None);
    }

    #[test]
    fn grid_update() {
        let mut grid = CellGrid::default();
        push(&mut grid, 1, 1, "b2");
        push(&mut grid, 1, 3, "d2");
        push(&mut grid, 3, 1, "b4");
        push(&mut grid, 3, 1, "B4");

        assert_eq!(grid.len(), 3);
        assert_eq!(grid.row_count(), 4);
        assert_eq!(grid.col_count(), 4);
        assert!(!grid.is_empty());
        assert_eq!(grid.value_at(1, 3), Some("d2".to_owned()));
        assert_eq!(grid.value_at(3, 1), Some("B4".to_owned()));
        assert_eq!(grid.value_at(0, 0), None);
        assert_eq!(grid.value_at(10, 10), None);
    }
}
