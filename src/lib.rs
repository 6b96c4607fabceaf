//! # Print Area CSV
//!
//! Renders the printable region of every sheet in an Excel workbook as CSV text.
//!
//! ## Features
//!
//! - **Print areas**: the `_xlnm.Print_Area` defined name of each sheet selects the cells to
//!   export; sheets without one export their full used extent
//! - **Hidden rows and columns**: omitted entirely, never blanked
//! - **Cell rendering**: shared and inline strings, booleans, numbers, dates in the 1900 and
//!   1904 systems, error literals, and cached formula results
//! - **Structured diagnostics**: empty sheets and print-area fallbacks are returned to the
//!   caller instead of being printed
//! - **Pure Rust workbook parsing**: `.xlsx`, `.xlsm`, `.xltx` and `.xltm` packages are read
//!   with `zip` and `quick-xml`
//!
//! ## Example
//!
//! ```no_run
//! use print_area_csv::{convert_workbook, Options};
//! use std::path::Path;
//!
//! let conversion = convert_workbook(Path::new("report.xlsx"), &Options::default())?;
//! for (sheet, csv) in conversion.results.iter() {
//!     println!("--- Sheet: {} ---\n{}", sheet, csv);
//! }
//! # Ok::<(), print_area_csv::PrintAreaCsvError>(())
//! ```
pub mod converter;
pub mod error;
pub mod extractor;
pub(crate) mod helpers;
pub mod options;
pub mod range;
pub mod spreadsheet;

pub use crate::converter::convert_workbook;
pub use crate::converter::Conversion;
pub use crate::converter::Diagnostic;
pub use crate::converter::ResultMap;
pub use crate::error::PrintAreaCsvError;
pub use crate::extractor::ExtractedTable;
pub use crate::options::LineTerminator;
pub use crate::options::MalformedRangePolicy;
pub use crate::options::Options;
pub use crate::range::RangeBounds;
