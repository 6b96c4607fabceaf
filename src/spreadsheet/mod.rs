//! # Spreadsheet Reading Module
//!
//! Opens Office Open XML workbooks (.xlsx, .xlsm, .xltx, .xltm) and reads each worksheet
//! into a structural layout and a value grid. Both views come from the same worksheet part,
//! so they agree on addressing.
pub(crate) mod cell;
pub(crate) mod excel;
pub mod reference;
pub mod sheet;
pub(crate) mod xlsx;

use crate::error::PrintAreaCsvError;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;

/// Errors raised while opening or reading a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// The workbook path does not name an existing file
    #[error("Workbook '{0}' not found")]
    WorkbookNotFound(String),

    /// The file exists but is not a readable workbook package
    #[error("Cannot read workbook '{0}': {1}")]
    UnreadableWorkbook(String, String),

    /// The file extension names a container this crate does not read
    #[error("Unsupported workbook format '{0}', expected .xlsx, .xlsm, .xltx or .xltm")]
    UnsupportedFormat(String),

    /// A required part is missing from the package
    #[error("Failed to open '{0}' in workbook package")]
    FileError(String),

    #[error("Sheet index {0} out of range")]
    SheetNotFound(usize),
}

/// A workbook whose sheets can be read one at a time, in workbook order.
pub trait Spreadsheet {
    /// Name the workbook was opened under.
    fn name(&self) -> String;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Reads the sheet at `index` (0-based, workbook order).
    fn read_sheet(&mut self, index: usize) -> Result<Worksheet, PrintAreaCsvError>;
}

/// Opens a workbook, choosing the reader from the file extension.
pub fn open_spreadsheet(path: &Path) -> Result<Box<dyn Spreadsheet>, PrintAreaCsvError> {
    let name = path.to_string_lossy().to_string();
    if !path.is_file() {
        Err(SpreadsheetError::WorkbookNotFound(name.to_owned()))?;
    }

    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xltx" | "xltm" => Ok(Box::new(XlsxSpreadsheet::open(path)?)),
        _ => Err(SpreadsheetError::UnsupportedFormat(name).into()),
    }
}
