use crate::error::PrintAreaCsvError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::Package;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::CellGrid;
use crate::spreadsheet::sheet::SheetLayout;
use crate::spreadsheet::sheet::Worksheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use tracing::debug;
use tracing::warn;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_DEFINED_NAME: QName = QName(b"definedName"); // Workbook or sheet scoped name
const TAG_COLUMN: QName = QName(b"col");              // Column span properties
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// Built-in defined name holding a sheet's print area
const PRINT_AREA_NAME: &str = "_xlnm.Print_Area";

/// A worksheet listed in the workbook part
#[derive(Clone, Debug)]
struct SheetEntry {
    name: String,
    zip_path: String,
    print_area: Option<String>,
}

/// Represents an Excel XLSX workbook package
pub(crate) struct XlsxSpreadsheet {
    /// File name of the workbook
    pub(crate) name: String,
    /// ZIP archive containing the package parts
    zip: Package,
    /// Cell type per style index, for date detection
    number_formats: Vec<CellType>,
    /// Shared string table
    shared_strings: Vec<String>,
    /// Worksheets in workbook order
    sheets: Vec<SheetEntry>,
}

impl XlsxSpreadsheet {
    /// Opens an XLSX workbook and loads its workbook-level parts
    ///
    /// # Arguments
    /// * `path` - Path to the XLSX file
    pub(crate) fn open(path: &Path) -> Result<XlsxSpreadsheet, PrintAreaCsvError> {
        let name = path.to_string_lossy().to_string();
        let mut zip = excel::open(path)?;
        if zip.file("xl/workbook.xml")?.is_none() {
            Err(SpreadsheetError::UnreadableWorkbook(name.to_owned(), "missing xl/workbook.xml".to_owned()))?;
        }

        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::UnreadableWorkbook(name.to_owned(), "workbook has no worksheets".to_owned()))?;
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(
            workbook = %name,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            is_1904,
            "opened workbook"
        );
        Ok(XlsxSpreadsheet {
            name,
            zip,
            number_formats,
            shared_strings,
            sheets,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.to_owned()).collect()
    }

    /// Reads one worksheet part into its layout and value grid
    ///
    /// Both views come from the same pass over the part, so they always agree on
    /// addressing. Formula text is skipped; only cached values are kept.
    fn read_sheet(&mut self, index: usize) -> Result<Worksheet, PrintAreaCsvError> {
        let entry = self.sheets.get(index).ok_or(SpreadsheetError::SheetNotFound(index))?;
        let mut layout = SheetLayout::new(entry.print_area.to_owned());
        let mut grid = CellGrid::default();
        let mut reader = self.zip.xml_reader(&entry.zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(entry.zip_path.to_owned()))?;

        // 0-based positions, used when `r` attributes are omitted
        let mut row = 0usize;
        let mut next_row = 0usize;
        let mut col = 0usize;
        let mut next_col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_COLUMN => {
                if event.get_flag("hidden")? {
                    let min = event.parse_attribute_value::<usize>("min")?.unwrap_or(1);
                    let max = event.parse_attribute_value::<usize>("max")?.unwrap_or(min);
                    layout.hide_cols(min, max);
                }
            }
            Event::Start(event) if event.name() == TAG_ROW => {
                row = event.parse_attribute_value::<usize>("r")?
                    .filter(|r| *r > 0)
                    .map(|r| r - 1)
                    .unwrap_or(next_row);
                next_row = row + 1;
                next_col = 0;
                if event.get_flag("hidden")? {
                    layout.hide_row(row + 1);
                }
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row, next_col));
                next_col = col + 1;
                layout.touch(row + 1, col + 1);
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellType::InlineString,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                if let Some(format_id) = event.get_attribute_value("s")? {
                    if kind == CellType::Number && !format_id.is_empty() {
                        let index = format_id.parse::<usize>()?;
                        kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                let mut cell = Cell {
                    row,
                    col,
                    kind,
                    value: std::mem::take(&mut value),
                };
                if cell.kind == CellType::SharedString && !cell.value.is_empty() {
                    let index = cell.value.trim().parse::<usize>()?;
                    cell.value = match self.shared_strings.get(index) {
                        Some(string) => string.to_owned(),
                        None => {
                            warn!(sheet = %entry.name, cell = %cell.reference(), index, "shared string index out of range");
                            String::new()
                        }
                    };
                }
                if cell.kind != CellType::Empty && !cell.value.is_empty() {
                    grid.push(cell);
                }
                kind = CellType::default();
            }
        });

        debug!(
            sheet = %entry.name,
            cells = grid.len(),
            print_area = entry.print_area.as_deref().unwrap_or(""),
            "read worksheet"
        );
        Ok(Worksheet {
            name: entry.name.to_owned(),
            layout,
            grid,
        })
    }
}

/// Loads the worksheet list, the date system, and per-sheet print areas from `xl/workbook.xml`
///
/// Print areas are `_xlnm.Print_Area` defined names scoped by `localSheetId`, the 0-based
/// position of the sheet in the `<sheets>` list.
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<SheetEntry>, bool), PrintAreaCsvError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    // (name, relationship id) for every sheet, chartsheets included, so positions line up
    // with localSheetId
    let mut listed: Vec<(String, String)> = Vec::new();
    let mut print_areas: HashMap<usize, String> = HashMap::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                listed.push((name.to_string(), id.to_string()));
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_flag("date1904")?;
        }
        Event::Start(event) if event.name() == TAG_DEFINED_NAME => {
            let is_print_area = event.get_attribute_value("name")?
                .map(|name| name.eq_ignore_ascii_case(PRINT_AREA_NAME))
                .unwrap_or(false);
            let sheet_index = event.parse_attribute_value::<usize>("localSheetId")?;
            if let Some(sheet_index) = sheet_index.filter(|_| is_print_area) {
                let reference = read_string_value(&mut reader, TAG_DEFINED_NAME, true)?;
                print_areas.insert(sheet_index, reference.trim().to_owned());
            }
        }
    });

    let sheets = listed
        .into_iter()
        .enumerate()
        .filter_map(|(index, (name, id))| {
            relationships.get(&id).map(|zip_path| SheetEntry {
                name,
                zip_path: zip_path.to_owned(),
                print_area: print_areas.remove(&index).filter(|reference| !reference.is_empty()),
            })
        })
        .collect();
    Ok((sheets, is_1904))
}

/// Loads cell types per style index from `xl/styles.xml`
///
/// Parses custom number formats and the `cellXfs` table so numeric cells styled as
/// dates or times can be rendered as such.
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, PrintAreaCsvError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, String>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), format.to_string());
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Loads the shared string table from `xl/sharedStrings.xml`, empty when the part is absent
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, PrintAreaCsvError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Reads string content up to `end_tag`
///
/// Rich-text runs are concatenated and phonetic runs skipped. With `is_text_content`
/// every text node counts; otherwise only text inside `<t>` elements does.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, PrintAreaCsvError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if !is_text_content && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
