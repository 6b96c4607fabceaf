use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use std::fmt::Display;

/// Milliseconds in one spreadsheet day.
const MILLISECONDS_PER_DAY: i64 = 86_400_000;

/// Types of cell data in a worksheet part.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as `1`/`0`
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings (`t="d"`)
    IsoDateTime,
    /// Inline string values, including cached formula strings
    InlineString,
    /// Shared string table entries, already resolved to their text
    SharedString,
    /// Error literals such as `#DIV/0!`
    Error,
}

impl CellType {
    /// Maps built-in Excel number format ids to a date/time cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Classifies a custom number format code.
    /// Date and time tokens inside quoted literals, escapes, and `[...]` sections are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    /// Whether values of this type are day serials in the 1904 date system.
    fn is_1904(&self) -> bool {
        matches!(self, Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904)
    }
}

/// A single valued cell: 0-based position, type, and raw text from the worksheet part.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }
}

impl Display for Cell {
    /// Writes the canonical text of the cell.
    /// Numbers that fail to parse are written as stored rather than dropped.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self.kind {
            CellType::Boolean => if self.value == "1" || self.value.eq_ignore_ascii_case("true") { "TRUE" } else { "FALSE" }.to_owned(),
            CellType::Number => to_number_string(&self.value),
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                to_datetime_string(&self.value, self.kind.is_1904()).unwrap_or_else(|| self.value.to_owned())
            }
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                to_date_string(&self.value, self.kind.is_1904()).unwrap_or_else(|| self.value.to_owned())
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                to_time_string(&self.value).unwrap_or_else(|| self.value.to_owned())
            }
            CellType::IsoDateTime => self.value.replace('T', " "),
            CellType::Empty | CellType::InlineString | CellType::SharedString | CellType::Error => self.value.to_owned(),
        };
        write!(f, "{}", value)
    }
}

/// Formats a stored number: integral values without a fraction, others in shortest form.
pub(crate) fn to_number_string(value: &str) -> String {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 => {
            format!("{}", number as i64)
        }
        Ok(number) if number.is_finite() => number.to_string(),
        _ => value.to_owned(),
    }
}

/// Splits a day serial into whole days and milliseconds into the day, rounding to the millisecond.
fn split_serial(value: &str) -> Option<(i64, i64)> {
    let serial = value.trim().parse::<f64>().ok().filter(|serial| serial.is_finite() && *serial >= 0.0)?;
    let total = (serial * MILLISECONDS_PER_DAY as f64).round() as i64;
    Some((total / MILLISECONDS_PER_DAY, total % MILLISECONDS_PER_DAY))
}

/// Converts whole days of a serial to a calendar date.
/// The 1900 system counts the nonexistent 1900-02-29 (Lotus 1-2-3 leap year bug).
fn serial_days_to_date(days: i64, is_1904: bool) -> Option<NaiveDate> {
    let offset = if is_1904 {
        1_462
    } else if days < 60 {
        1
    } else {
        0
    };
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(days + offset))
}

fn format_time(milliseconds: i64) -> String {
    let fraction = milliseconds % 1_000;
    let seconds = milliseconds / 1_000;
    let (hours, minutes, seconds) = (seconds / 3_600, seconds / 60 % 60, seconds % 60);
    if fraction > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{fraction:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Converts a numeric date to `YYYY-MM-DD`.
fn to_date_string(value: &str, is_1904: bool) -> Option<String> {
    let (days, _) = split_serial(value)?;
    Some(serial_days_to_date(days, is_1904)?.format("%Y-%m-%d").to_string())
}

/// Converts the fractional part of a numeric time to `HH:MM:SS`.
fn to_time_string(value: &str) -> Option<String> {
    let (_, milliseconds) = split_serial(value)?;
    Some(format_time(milliseconds))
}

/// Converts a numeric datetime to `YYYY-MM-DD HH:MM:SS`.
fn to_datetime_string(value: &str, is_1904: bool) -> Option<String> {
    let (days, milliseconds) = split_serial(value)?;
    let date = serial_days_to_date(days, is_1904)?;
    Some(format!("{} {}", date.format("%Y-%m-%d"), format_time(milliseconds)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 0,
            col: 0,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn numbers_drop_trailing_zero_fraction() {
        assert_eq!(cell(CellType::Number, "1").to_string(), "1");
        assert_eq!(cell(CellType::Number, "2.0").to_string(), "2");
        assert_eq!(cell(CellType::Number, "-3.25").to_string(), "-3.25");
        assert_eq!(cell(CellType::Number, "1E-3").to_string(), "0.001");
        assert_eq!(cell(CellType::Number, "not a number").to_string(), "not a number");
    }

    #[test]
    fn booleans_render_upper_case() {
        assert_eq!(cell(CellType::Boolean, "1").to_string(), "TRUE");
        assert_eq!(cell(CellType::Boolean, "0").to_string(), "FALSE");
    }

    #[test]
    fn dates_follow_the_workbook_date_system() {
        assert_eq!(cell(CellType::NumberDate1900, "1").to_string(), "1900-01-01");
        assert_eq!(cell(CellType::NumberDate1900, "61").to_string(), "1900-03-01");
        assert_eq!(cell(CellType::NumberDate1900, "45474").to_string(), "2024-07-01");
        assert_eq!(cell(CellType::NumberDate1904, "0").to_string(), "1904-01-01");
    }

    #[test]
    fn times_and_datetimes_round_to_milliseconds() {
        assert_eq!(cell(CellType::NumberTime1900, "0.5").to_string(), "12:00:00");
        assert_eq!(cell(CellType::NumberDateTime1900, "45474.75").to_string(), "2024-07-01 18:00:00");
        assert_eq!(cell(CellType::NumberDateTime1900, "45474.99999999999").to_string(), "2024-07-02 00:00:00");
    }

    #[test]
    fn text_and_errors_pass_through() {
        assert_eq!(cell(CellType::SharedString, "a,b").to_string(), "a,b");
        assert_eq!(cell(CellType::Error, "#DIV/0!").to_string(), "#DIV/0!");
        assert_eq!(cell(CellType::IsoDateTime, "2024-07-01T08:30:00").to_string(), "2024-07-01 08:30:00");
    }

    #[test]
    fn custom_formats_ignore_literals_and_brackets() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", true), CellType::NumberTime1904);
        assert_eq!(CellType::parse_custom_number_format("yyyy/m/d h:mm", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("0.00\" days\"", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]#,##0", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("General", false), CellType::Number);
    }

    #[test]
    fn builtin_formats_detect_dates() {
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDate1900));
        assert_eq!(CellType::parse_builtin_number_format_id("22", true), Some(CellType::NumberDateTime1904));
        assert_eq!(CellType::parse_builtin_number_format_id("0", false), None);
    }

    #[test]
    fn reference_uses_a1_notation() {
        let cell = Cell {
            row: 2,
            col: 27,
            kind: CellType::Number,
            value: "1".to_owned(),
        };
        assert_eq!(cell.reference(), "AB3");
    }
}
