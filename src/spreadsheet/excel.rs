//! Office Open XML package helpers
use crate::error::PrintAreaCsvError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Signature of a compound file, used by legacy `.xls` and encrypted packages
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

pub(crate) type Package = ZipArchive<BufReader<File>>;

/// Opens a workbook package at an existing path.
///
/// A file that is not a zip package (including password-protected workbooks, which are
/// compound files) is reported as `UnreadableWorkbook`.
pub(crate) fn open(path: &Path) -> Result<Package, PrintAreaCsvError> {
    let display = path.to_string_lossy().to_string();
    let mut reader = BufReader::new(File::open(path)?);
    if is_compound_file(&mut reader)? {
        Err(SpreadsheetError::UnreadableWorkbook(
            display.to_owned(),
            "compound file (password protected or legacy format)".to_owned(),
        ))?;
    }

    ZipArchive::new(reader)
        .map_err(|error| SpreadsheetError::UnreadableWorkbook(display, error.to_string()).into())
}

/// Loads relationship targets of a part
///
/// # Arguments
/// * `zip` - Package handle
/// * `path` - Path to the relationships part within the package
///
/// # Returns
/// Mapping of relationship ids to worksheet part paths
pub(crate) fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, PrintAreaCsvError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Chartsheets and dialog sheets carry no cell grid
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Maps style indexes to cell types using custom and built-in number formats
///
/// # Arguments
/// * `format_indexes` - Number format id of each `cellXfs` entry, in order
/// * `custom_formats` - Custom format codes keyed by number format id
/// * `is_1904` - Whether the workbook uses the 1904 date system
pub(crate) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, String>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .map(|format| CellType::parse_custom_number_format(format, is_1904))
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Normalizes a relationship target to a path within the package
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

fn is_compound_file<R: Read + Seek>(reader: &mut R) -> Result<bool, PrintAreaCsvError> {
    let mut signature = [0u8; 8];
    let is_compound = match reader.read_exact(&mut signature) {
        Ok(()) => signature == CFB_SIGNATURE,
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(error) => Err(error)?,
    };
    reader.seek(SeekFrom::Start(0))?;
    Ok(is_compound)
}
