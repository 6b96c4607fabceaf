use crate::error::PrintAreaCsvError;
use glob::Pattern;

/// What to do when a sheet's stored print area cannot be parsed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MalformedRangePolicy {
    /// Abort the conversion with `MalformedRange`.
    #[default]
    Fail,
    /// Extract the full sheet extent and report a diagnostic.
    FullExtent,
}

/// Record terminator of the CSV output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LineTerminator {
    #[default]
    Crlf,
    Lf,
}

/// Options for converting a workbook.
#[derive(Clone, Debug)]
pub struct Options {
    /// Sheet name patterns for filtering which sheets to process.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Handling of print areas that do not parse.
    pub malformed_range: MalformedRangePolicy,

    /// Field delimiter (default: `,`).
    pub delimiter: u8,

    /// Record terminator (default: CRLF).
    pub terminator: LineTerminator,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sheet_name_patterns: None,
            malformed_range: MalformedRangePolicy::default(),
            delimiter: b',',
            terminator: LineTerminator::default(),
        }
    }
}

impl Options {
    /// Restricts conversion to sheets whose names match any of the glob patterns.
    /// An empty list keeps every sheet.
    pub fn with_sheet_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, PrintAreaCsvError> {
        self.sheet_name_patterns = if patterns.is_empty() {
            None
        } else {
            Some(patterns
                .iter()
                .map(|pattern| Pattern::new(pattern.as_ref()))
                .collect::<Result<Vec<_>, _>>()?)
        };
        Ok(self)
    }

    /// Checks if a sheet name matches the configured patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}
