//! # Workbook Conversion
//!
//! Runs every sheet of a workbook through print-area resolution and visible-cell
//! extraction, then serializes the surviving cells as CSV keyed by sheet name.
//! Non-fatal events are returned as [`Diagnostic`]s for the caller to report.
use crate::error::PrintAreaCsvError;
use crate::extractor::extract_sheet;
use crate::extractor::extract_visible;
use crate::extractor::ExtractedTable;
use crate::options::LineTerminator;
use crate::options::MalformedRangePolicy;
use crate::options::Options;
use crate::range::RangeBounds;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::sheet::SheetStructure;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::Spreadsheet;
use csv::QuoteStyle;
use csv::Terminator;
use csv::WriterBuilder;
use std::fmt::Display;
use std::path::Path;
use tracing::debug;

/// A non-fatal event raised while converting a workbook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// The sheet produced no rows; its CSV text is empty.
    EmptySheet { sheet: String },
    /// The stored print area did not parse and the full sheet extent was used instead.
    PrintAreaFallback {
        sheet: String,
        reference: String,
        message: String,
    },
}

impl Diagnostic {
    /// Name of the sheet the event concerns.
    pub fn sheet(&self) -> &str {
        match self {
            Diagnostic::EmptySheet { sheet } => sheet,
            Diagnostic::PrintAreaFallback { sheet, .. } => sheet,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::EmptySheet { sheet } => write!(f, "No data processed for sheet: {}", sheet),
            Diagnostic::PrintAreaFallback { sheet, reference, message } => write!(
                f,
                "Print area '{}' of sheet '{}' ignored ({}), using full extent",
                reference, sheet, message
            ),
        }
    }
}

/// CSV text per sheet, in workbook order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultMap {
    entries: Vec<(String, String)>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the CSV text of a sheet. A name already present keeps its position and
    /// has its text replaced.
    pub fn insert(&mut self, sheet: impl Into<String>, csv: impl Into<String>) {
        let sheet = sheet.into();
        let csv = csv.into();
        match self.entries.iter_mut().find(|(name, _)| *name == sheet) {
            Some((_, text)) => *text = csv,
            None => self.entries.push((sheet, csv)),
        }
    }

    pub fn get(&self, sheet: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, csv)| csv.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sheet names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(sheet, csv)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, csv)| (name.as_str(), csv.as_str()))
    }
}

impl IntoIterator for ResultMap {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Outcome of converting one workbook.
#[derive(Clone, Debug, Default)]
pub struct Conversion {
    pub results: ResultMap,
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts every accepted sheet of the workbook at `path` to CSV.
///
/// # Errors
/// Fails when the workbook is missing, unreadable or of an unsupported format, and, under
/// [`MalformedRangePolicy::Fail`], when a sheet's print area cannot be parsed.
pub fn convert_workbook(path: &Path, options: &Options) -> Result<Conversion, PrintAreaCsvError> {
    let mut spreadsheet = open_spreadsheet(path)?;
    convert_spreadsheet(spreadsheet.as_mut(), options)
}

/// Converts every accepted sheet of an opened workbook, in workbook order.
pub fn convert_spreadsheet(spreadsheet: &mut dyn Spreadsheet, options: &Options) -> Result<Conversion, PrintAreaCsvError> {
    let mut conversion = Conversion::default();
    for (index, name) in spreadsheet.sheet_names().into_iter().enumerate() {
        if !options.accept(&name) {
            debug!(sheet = %name, "skipped sheet not matching patterns");
            continue;
        }
        let worksheet = spreadsheet
            .read_sheet(index)
            .map_err(|error| error.in_sheet(&name))?;
        let csv = process_sheet(&worksheet, options, &mut conversion.diagnostics)?;
        conversion.results.insert(worksheet.name, csv);
    }
    debug!(
        workbook = %spreadsheet.name(),
        sheets = conversion.results.len(),
        diagnostics = conversion.diagnostics.len(),
        "converted workbook"
    );
    Ok(conversion)
}

/// Extracts the visible print area of one sheet and serializes it.
///
/// Returns an empty string, and records [`Diagnostic::EmptySheet`], when no rows survive.
pub fn process_sheet(
    worksheet: &Worksheet,
    options: &Options,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, PrintAreaCsvError> {
    let layout = &worksheet.layout;
    let table = match extract_sheet(layout, &worksheet.grid) {
        Ok(table) => table,
        Err(PrintAreaCsvError::RangeError(error)) if options.malformed_range == MalformedRangePolicy::FullExtent => {
            diagnostics.push(Diagnostic::PrintAreaFallback {
                sheet: worksheet.name.to_owned(),
                reference: layout.print_area().unwrap_or_default().to_owned(),
                message: error.to_string(),
            });
            let bounds = RangeBounds::full_extent(layout.max_col(), layout.max_row());
            extract_visible(&bounds, layout, &worksheet.grid)
        }
        Err(error) => return Err(error.in_sheet(&worksheet.name)),
    };

    debug!(sheet = %worksheet.name, rows = table.len(), "extracted sheet");
    if table.is_empty() {
        diagnostics.push(Diagnostic::EmptySheet {
            sheet: worksheet.name.to_owned(),
        });
        return Ok(String::new());
    }
    to_csv(&table, options)
}

/// Serializes a table as CSV, quoting only fields that need it.
///
/// An empty row (every column hidden) is written as a single quoted empty field, `""`,
/// so the record count matches the table.
pub fn to_csv(table: &ExtractedTable, options: &Options) -> Result<String, PrintAreaCsvError> {
    let terminator = match options.terminator {
        LineTerminator::Crlf => Terminator::CRLF,
        LineTerminator::Lf => Terminator::Any(b'\n'),
    };
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .terminator(terminator)
        .quote_style(QuoteStyle::Necessary)
        .flexible(true)
        .from_writer(Vec::new());
    for row in table {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|error| error.into_error())?;
    Ok(String::from_utf8(bytes).map_err(|error| error.utf8_error())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeError;
    use crate::spreadsheet::cell::Cell;
    use crate::spreadsheet::cell::CellType;
    use crate::spreadsheet::sheet::CellGrid;
    use crate::spreadsheet::sheet::SheetLayout;
    use csv::ReaderBuilder;

    /// Workbook held in memory
    struct Book(Vec<Worksheet>);

    impl Spreadsheet for Book {
        fn name(&self) -> String {
            "memory".to_owned()
        }

        fn sheet_names(&self) -> Vec<String> {
            self.0.iter().map(|sheet| sheet.name.to_owned()).collect()
        }

        fn read_sheet(&mut self, index: usize) -> Result<Worksheet, PrintAreaCsvError> {
            Ok(self.0[index].clone())
        }
    }

    fn worksheet(name: &str, print_area: Option<&str>, rows: &[&[&str]]) -> Worksheet {
        let mut layout = SheetLayout::new(print_area.map(str::to_owned));
        let mut grid = CellGrid::default();
        for (row, cells) in rows.iter().enumerate() {
            for (col, value) in cells.iter().enumerate() {
                layout.touch(row + 1, col + 1);
                if !value.is_empty() {
                    grid.push(Cell {
                        row,
                        col,
                        kind: CellType::InlineString,
                        value: value.to_string(),
                    });
                }
            }
        }
        Worksheet {
            name: name.to_owned(),
            layout,
            grid,
        }
    }

    fn parse(csv: &str) -> Vec<Vec<String>> {
        ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv.as_bytes())
            .records()
            .map(|record| record.unwrap().iter().map(str::to_owned).collect())
            .collect()
    }

    #[test]
    fn summary_and_raw_scenario() {
        let summary = worksheet("Summary", Some("$A$1:$B$2"), &[&["x", "1"], &["y", "2"]]);
        let mut raw = worksheet("Raw", None, &[&["a", "b", "c"], &["d", "e", "f"], &["g", "h", "i"]]);
        raw.layout.hide_row(2);

        let conversion = convert_spreadsheet(&mut Book(vec![summary, raw]), &Options::default()).unwrap();

        assert_eq!(conversion.results.names().collect::<Vec<_>>(), vec!["Summary", "Raw"]);
        assert_eq!(conversion.results.get("Summary"), Some("x,1\r\ny,2\r\n"));
        assert_eq!(conversion.results.get("Raw"), Some("a,b,c\r\ng,h,i\r\n"));
        assert!(conversion.diagnostics.is_empty());
    }

    #[test]
    fn empty_sheet_is_reported() {
        let empty = worksheet("Blank", Some("garbage"), &[]);

        let conversion = convert_spreadsheet(&mut Book(vec![empty]), &Options::default()).unwrap();

        assert_eq!(conversion.results.get("Blank"), Some(""));
        assert_eq!(conversion.diagnostics, vec![Diagnostic::EmptySheet { sheet: "Blank".to_owned() }]);
        assert_eq!(conversion.diagnostics[0].to_string(), "No data processed for sheet: Blank");
    }

    #[test]
    fn malformed_print_area_fails_by_default() {
        let sheet = worksheet("Broken", Some("$A$1"), &[&["x"]]);

        let error = convert_spreadsheet(&mut Book(vec![sheet]), &Options::default()).unwrap_err();

        assert_eq!(error.to_string(), "Sheet 'Broken': Invalid print area '$A$1'");
        assert!(matches!(
            &error,
            PrintAreaCsvError::SheetError { sheet, .. } if sheet == "Broken"
        ));
        assert!(matches!(
            error.root(),
            PrintAreaCsvError::RangeError(RangeError::MalformedRange(reference)) if reference == "$A$1"
        ));
    }

    #[test]
    fn malformed_print_area_can_fall_back() {
        let sheet = worksheet("Broken", Some("$A$1"), &[&["x", "y"], &["z", ""]]);
        let options = Options {
            malformed_range: MalformedRangePolicy::FullExtent,
            ..Options::default()
        };

        let conversion = convert_spreadsheet(&mut Book(vec![sheet]), &options).unwrap();

        assert_eq!(conversion.results.get("Broken"), Some("x,y\r\nz,\r\n"));
        assert_eq!(
            conversion.diagnostics,
            vec![Diagnostic::PrintAreaFallback {
                sheet: "Broken".to_owned(),
                reference: "$A$1".to_owned(),
                message: RangeError::MalformedRange("$A$1".to_owned()).to_string(),
            }]
        );
    }

    #[test]
    fn sheet_patterns_select_sheets() {
        let book = vec![
            worksheet("Summary", None, &[&["x"]]),
            worksheet("Notes", None, &[&["n"]]),
        ];
        let options = Options::default().with_sheet_patterns(&["Sum*"]).unwrap();

        let conversion = convert_spreadsheet(&mut Book(book), &options).unwrap();

        assert_eq!(conversion.results.len(), 1);
        assert_eq!(conversion.results.get("Summary"), Some("x\r\n"));
        assert_eq!(conversion.results.get("Notes"), None);
    }

    #[test]
    fn csv_round_trips_special_characters() {
        let table: ExtractedTable = vec![
            vec!["plain".to_owned(), "a,b".to_owned(), "say \"hi\"".to_owned()],
            vec!["line\nbreak".to_owned(), "".to_owned(), "crlf\r\nend".to_owned()],
        ];

        let csv = to_csv(&table, &Options::default()).unwrap();

        assert!(csv.starts_with("plain,\"a,b\",\"say \"\"hi\"\"\"\r\n"));
        assert_eq!(parse(&csv), table);
    }

    #[test]
    fn empty_rows_are_written_as_one_empty_field() {
        let table: ExtractedTable = vec![vec!["a".to_owned()], Vec::new(), vec!["b".to_owned()]];

        let csv = to_csv(&table, &Options::default()).unwrap();

        assert_eq!(csv, "a\r\n\"\"\r\nb\r\n");
        assert_eq!(parse(&csv), vec![vec!["a"], vec![""], vec!["b"]]);
    }

    #[test]
    fn delimiter_and_terminator_are_configurable() {
        let table: ExtractedTable = vec![vec!["a;b".to_owned(), "c".to_owned()], vec!["d".to_owned(), "e".to_owned()]];
        let options = Options {
            delimiter: b';',
            terminator: LineTerminator::Lf,
            ..Options::default()
        };

        assert_eq!(to_csv(&table, &options).unwrap(), "\"a;b\";c\nd;e\n");
    }

    #[test]
    fn result_map_replaces_in_place() {
        let mut results = ResultMap::new();
        results.insert("First", "1");
        results.insert("Second", "2");
        results.insert("First", "one");

        assert_eq!(results.iter().collect::<Vec<_>>(), vec![("First", "one"), ("Second", "2")]);
        assert_eq!(results.into_iter().count(), 2);
    }
}
