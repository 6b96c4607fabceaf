//! Print-area resolution.
//!
//! Turns the stored print-area reference of a sheet into inclusive 1-based bounds,
//! falling back to the full sheet extent when no print area is set.
use crate::error::PrintAreaCsvError;
use crate::spreadsheet::reference::letters_to_column;
use crate::spreadsheet::reference::MAX_ROW;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// One range corner such as `$AB$12`
static CORNER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]+)\$?([0-9]+)$").expect("Hardcode regex pattern"));

/// Errors related to print-area parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid print area '{0}'")]
    MalformedRange(String),
}

/// Inclusive rectangular bounds, 1-based.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RangeBounds {
    pub first_col: usize,
    pub first_row: usize,
    pub last_col: usize,
    pub last_row: usize,
}

impl RangeBounds {
    /// Bounds covering `A1` through the sheet's largest used cell.
    pub fn full_extent(max_col: usize, max_row: usize) -> Self {
        RangeBounds {
            first_col: 1,
            first_row: 1,
            last_col: max_col.max(1),
            last_row: max_row.max(1),
        }
    }
}

impl TryFrom<&str> for RangeBounds {
    type Error = PrintAreaCsvError;

    /// Parses a single-area reference such as `$B$2:$D$10` or `'Sheet 1'!$A$1:$C$3`.
    /// The sheet qualifier is everything up to the last `!`; quoted names may contain `!`.
    /// Corners given bottom-right first are swapped. Multi-area references are rejected.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let malformed = || RangeError::MalformedRange(value.to_owned());
        let areas = split_areas(value);
        let [area] = areas.as_slice() else {
            return Err(malformed().into());
        };
        let area = match area.rfind('!') {
            Some(index) => &area[index + 1..],
            None => *area,
        };

        let corners: Vec<&str> = area.trim().split(':').collect();
        let [top_left, bottom_right] = corners.as_slice() else {
            return Err(malformed().into());
        };
        let (first_col, first_row) = parse_corner(top_left).ok_or_else(malformed)?;
        let (last_col, last_row) = parse_corner(bottom_right).ok_or_else(malformed)?;
        Ok(RangeBounds {
            first_col: first_col.min(last_col),
            first_row: first_row.min(last_row),
            last_col: first_col.max(last_col),
            last_row: first_row.max(last_row),
        })
    }
}

/// Splits a reference into its comma-separated areas.
/// Commas inside quoted sheet names (`'a,b'!A1:B2`) do not separate areas.
fn split_areas(reference: &str) -> Vec<&str> {
    let mut areas = Vec::new();
    let mut is_quoted = false;
    let mut start = 0;
    for (index, character) in reference.char_indices() {
        match character {
            // `''` escapes a quote inside a quoted name and toggles twice
            '\'' => is_quoted = !is_quoted,
            ',' if !is_quoted => {
                areas.push(&reference[start..index]);
                start = index + 1;
            }
            _ => (),
        }
    }
    areas.push(&reference[start..]);
    areas
}

/// Parses one corner (`$AB$12`, `ab12`) into a 1-based `(col, row)`.
fn parse_corner(corner: &str) -> Option<(usize, usize)> {
    let captures = CORNER_PATTERN.captures(corner.trim())?;
    let col = letters_to_column(captures.get(1)?.as_str())?;
    let row = captures
        .get(2)?
        .as_str()
        .parse::<usize>()
        .ok()
        .filter(|row| (1..=MAX_ROW).contains(row))?;
    Some((col, row))
}

/// Resolves the rectangle to extract from a sheet.
///
/// # Arguments
/// * `reference` - Stored print-area reference, `None` or blank when unset
/// * `max_col` - Largest used column of the sheet (1-based)
/// * `max_row` - Largest used row of the sheet (1-based)
///
/// # Errors
/// `RangeError::MalformedRange` when a non-blank reference cannot be parsed.
pub fn resolve_range(reference: Option<&str>, max_col: usize, max_row: usize) -> Result<RangeBounds, PrintAreaCsvError> {
    let bounds = match reference.map(str::trim).filter(|reference| !reference.is_empty()) {
        Some(reference) => RangeBounds::try_from(reference)?,
        None => RangeBounds::full_extent(max_col, max_row),
    };
    debug!(reference = reference.unwrap_or(""), ?bounds, "resolved range");
    Ok(bounds)
}
