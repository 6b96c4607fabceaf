//! Visible-cell extraction.
use crate::error::PrintAreaCsvError;
use crate::range::resolve_range;
use crate::range::RangeBounds;
use crate::spreadsheet::sheet::CellValues;
use crate::spreadsheet::sheet::SheetStructure;

/// Rows of rendered cell text, top to bottom, each left to right.
pub type ExtractedTable = Vec<Vec<String>>;

/// Copies the visible cells inside `bounds` into a table.
///
/// Hidden rows and hidden columns are omitted entirely, not blanked. Cells that hold no
/// value or lie outside the value grid render as empty strings. A row whose columns are
/// all hidden still yields an empty row.
pub fn extract_visible<S, V>(bounds: &RangeBounds, structure: &S, values: &V) -> ExtractedTable
where
    S: SheetStructure + ?Sized,
    V: CellValues + ?Sized,
{
    let mut table = ExtractedTable::new();
    for row in bounds.first_row..=bounds.last_row {
        if structure.is_hidden_row(row) {
            continue;
        }
        let cells = (bounds.first_col..=bounds.last_col)
            .filter(|col| !structure.is_hidden_col(*col))
            .map(|col| values.value_at(row - 1, col - 1).unwrap_or_default())
            .collect();
        table.push(cells);
    }
    table
}

/// Extracts the visible print area of a sheet.
///
/// A sheet without values yields an empty table before its print area is examined, so a
/// malformed reference on an empty sheet is not an error.
///
/// # Errors
/// `RangeError::MalformedRange` when the stored print area cannot be parsed.
pub fn extract_sheet<S, V>(structure: &S, values: &V) -> Result<ExtractedTable, PrintAreaCsvError>
where
    S: SheetStructure + ?Sized,
    V: CellValues + ?Sized,
{
    if values.is_empty() {
        return Ok(ExtractedTable::new());
    }
    let bounds = resolve_range(structure.print_area(), structure.max_col(), structure.max_row())?;
    Ok(extract_visible(&bounds, structure, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeError;
    use std::collections::HashMap;

    /// In-memory sheet, 1-based structure and 0-based values
    #[derive(Default)]
    struct Fixture {
        max_row: usize,
        max_col: usize,
        print_area: Option<String>,
        hidden_rows: Vec<usize>,
        hidden_cols: Vec<usize>,
        values: HashMap<(usize, usize), String>,
    }

    impl Fixture {
        fn grid(rows: &[&[&str]]) -> Self {
            let mut fixture = Fixture {
                max_row: rows.len(),
                max_col: rows.iter().map(|row| row.len()).max().unwrap_or(0),
                ..Fixture::default()
            };
            for (row, cells) in rows.iter().enumerate() {
                for (col, value) in cells.iter().enumerate() {
                    if !value.is_empty() {
                        fixture.values.insert((row, col), value.to_string());
                    }
                }
            }
            fixture
        }
    }

    impl SheetStructure for Fixture {
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
            self.hidden_cols.contains(&col)
        }
    }

    impl CellValues for Fixture {
        fn row_count(&self) -> usize {
            self.values.keys().map(|(row, _)| row + 1).max().unwrap_or(0)
        }

        fn col_count(&self) -> usize {
            self.values.keys().map(|(_, col)| col + 1).max().unwrap_or(0)
        }

        fn value_at(&self, row: usize, col: usize) -> Option<String> {
            self.values.get(&(row, col)).cloned()
        }
    }

    fn numbered(rows: usize, cols: usize) -> Fixture {
        let mut fixture = Fixture {
            max_row: rows,
            max_col: cols,
            ..Fixture::default()
        };
        for row in 0..rows {
            for col in 0..cols {
                fixture.values.insert((row, col), format!("r{}c{}", row + 1, col + 1));
            }
        }
        fixture
    }

    #[test]
    fn hidden_rows_are_omitted_in_order() {
        let mut sheet = numbered(5, 1);
        sheet.hidden_rows = vec![3];

        let table = extract_sheet(&sheet, &sheet).unwrap();
        assert_eq!(table, vec![vec!["r1c1"], vec!["r2c1"], vec!["r4c1"], vec!["r5c1"]]);
    }

    #[test]
    fn hidden_columns_are_omitted_in_order() {
        let mut sheet = numbered(1, 5);
        sheet.hidden_cols = vec![3];

        let table = extract_sheet(&sheet, &sheet).unwrap();
        assert_eq!(table, vec![vec!["r1c1", "r1c2", "r1c4", "r1c5"]]);
    }

    #[test]
    fn missing_and_out_of_grid_cells_are_blank() {
        let mut sheet = Fixture::grid(&[&["a", ""], &["", "d"]]);
        sheet.print_area = Some("$A$1:$C$3".to_owned());

        let table = extract_sheet(&sheet, &sheet).unwrap();
        assert_eq!(table, vec![vec!["a", "", ""], vec!["", "d", ""], vec!["", "", ""]]);
    }

    #[test]
    fn empty_sheet_skips_print_area() {
        let mut sheet = Fixture::default();
        sheet.print_area = Some("not a range".to_owned());

        assert!(extract_sheet(&sheet, &sheet).unwrap().is_empty());
    }

    #[test]
    fn malformed_print_area_fails() {
        let mut sheet = numbered(2, 2);
        sheet.print_area = Some("$A$1".to_owned());

        let error = extract_sheet(&sheet, &sheet).unwrap_err();
        assert!(matches!(error, PrintAreaCsvError::RangeError(RangeError::MalformedRange(_))));
    }

    #[test]
    fn print_area_limits_the_table() {
        let mut sheet = numbered(4, 4);
        sheet.print_area = Some("'Sheet 1'!$B$2:$C$3".to_owned());

        let table = extract_sheet(&sheet, &sheet).unwrap();
        assert_eq!(table, vec![vec!["r2c2", "r2c3"], vec!["r3c2", "r3c3"]]);
    }

    #[test]
    fn fully_hidden_columns_leave_empty_rows() {
        let mut sheet = numbered(2, 2);
        sheet.hidden_cols = vec![1, 2];

        let table = extract_sheet(&sheet, &sheet).unwrap();
        assert_eq!(table, vec![Vec::<String>::new(), Vec::new()]);
    }

    #[test]
    fn explicit_bounds_ignore_stored_print_area() {
        let sheet = numbered(3, 3);
        let bounds = RangeBounds {
            first_col: 3,
            first_row: 3,
            last_col: 4,
            last_row: 4,
        };

        let table = extract_visible(&bounds, &sheet, &sheet);
        assert_eq!(table, vec![vec!["r3c3", ""], vec!["", ""]]);
    }
}
