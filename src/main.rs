use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use print_area_csv::convert_workbook;
use print_area_csv::Conversion;
use print_area_csv::LineTerminator;
use print_area_csv::MalformedRangePolicy;
use print_area_csv::Options;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OnMalformedRange {
    /// Abort with an error.
    Fail,
    /// Export the full sheet extent and warn.
    FullExtent,
}

impl From<OnMalformedRange> for MalformedRangePolicy {
    fn from(value: OnMalformedRange) -> Self {
        match value {
            OnMalformedRange::Fail => MalformedRangePolicy::Fail,
            OnMalformedRange::FullExtent => MalformedRangePolicy::FullExtent,
        }
    }
}

#[derive(Parser)]
#[command(version, about = "Export the visible print area of every sheet in an Excel workbook as CSV.")]
struct Args {
    /// Workbook to convert (.xlsx, .xlsm, .xltx, .xltm).
    workbook: PathBuf,

    /// Glob patterns selecting sheets by name (repeatable, default: all sheets).
    #[arg(long = "sheet")]
    sheets: Vec<String>,

    /// What to do when a stored print area cannot be parsed.
    #[arg(long, value_enum, default_value_t = OnMalformedRange::Fail)]
    on_malformed_range: OnMalformedRange,

    /// Field delimiter, a single ASCII character.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Terminate records with LF instead of CRLF.
    #[arg(long)]
    lf: bool,

    /// Write one `<sheet>.csv` file per sheet into this directory instead of printing.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Args {
    fn options(&self) -> Result<Options> {
        ensure!(self.delimiter.is_ascii(), "Delimiter '{}' is not an ASCII character", self.delimiter);
        let options = Options {
            malformed_range: self.on_malformed_range.into(),
            delimiter: self.delimiter as u8,
            terminator: if self.lf { LineTerminator::Lf } else { LineTerminator::Crlf },
            ..Options::default()
        };
        Ok(options.with_sheet_patterns(&self.sheets)?)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let options = args.options()?;
    let conversion = convert_workbook(&args.workbook, &options)
        .with_context(|| format!("Failed to convert '{}'", args.workbook.display()))?;

    for diagnostic in &conversion.diagnostics {
        warn!(sheet = diagnostic.sheet(), "{}", diagnostic);
    }

    match &args.output_dir {
        Some(directory) => write_files(&conversion, directory),
        None => print_sheets(&conversion),
    }
}

fn print_sheets(conversion: &Conversion) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for (sheet, csv) in conversion.results.iter() {
        writeln!(stdout, "--- Sheet: {} ---", sheet)?;
        writeln!(stdout, "{}", csv)?;
    }
    stdout.flush()?;
    Ok(())
}

fn write_files(conversion: &Conversion, directory: &Path) -> Result<()> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create output directory '{}'", directory.display()))?;
    for (sheet, csv) in conversion.results.iter() {
        let path = directory.join(format!("{}.csv", file_stem(sheet)));
        std::fs::write(&path, csv).with_context(|| format!("Failed to write '{}'", path.display()))?;
        info!(sheet, path = %path.display(), "wrote sheet");
    }
    Ok(())
}

/// Sheet names may contain path separators, which cannot appear in a file name.
fn file_stem(sheet: &str) -> String {
    sheet.replace(['/', '\\'], "_")
}
