use thiserror::Error;

/// Main error type for print-area-csv.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum PrintAreaCsvError {
    /// An error raised while processing one sheet, keeping the underlying error
    #[error("Sheet '{sheet}': {source}")]
    SheetError {
        sheet: String,
        #[source]
        source: Box<PrintAreaCsvError>,
    },

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Range resolution errors
    #[error("{0}")]
    RangeError(#[from] crate::range::RangeError),
}

impl PrintAreaCsvError {
    /// Attaches the name of the sheet being processed.
    pub(crate) fn in_sheet(self, sheet: &str) -> Self {
        PrintAreaCsvError::SheetError {
            sheet: sheet.to_owned(),
            source: Box::new(self),
        }
    }

    /// The underlying error with any sheet context removed.
    pub fn root(&self) -> &PrintAreaCsvError {
        match self {
            PrintAreaCsvError::SheetError { source, .. } => source.root(),
            error => error,
        }
    }
}
