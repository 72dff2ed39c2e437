// src/process/mod.rs
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use glob::{glob, Pattern};
use std::{
    fs::{self, File},
    io::Read,
    path::Path,
};
use tracing::debug;
use zip::ZipArchive;

pub mod raw_table;
pub mod reshape;
pub mod utils;

pub use raw_table::RawTable;
pub use reshape::{reshape, ColumnClassifier, ColumnRoles, Layout, LongRow, LongTable, Strategy};

/// Contents of one sheet: CSV bytes from a bundle, or cells already read
/// out of a workbook.
#[derive(Debug, Clone)]
pub enum SheetData {
    Csv(Vec<u8>),
    Cells(RawTable),
}

/// One sheet of a source document.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub data: SheetData,
}

impl Sheet {
    /// A sheet backed by CSV bytes.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: SheetData::Csv(data.into()),
        }
    }

    pub fn from_table(name: impl Into<String>, table: RawTable) -> Self {
        Self {
            name: name.into(),
            data: SheetData::Cells(table),
        }
    }

    pub fn parse(&self) -> Result<RawTable> {
        match &self.data {
            SheetData::Csv(bytes) => RawTable::from_csv_bytes(bytes)
                .with_context(|| format!("parsing sheet {}", self.name)),
            SheetData::Cells(table) => Ok(table.clone()),
        }
    }
}

/// A source document held in memory, sheets in document order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
}

/// Load the document at `path`. Missing documents are `Ok(None)`.
///
/// - a spreadsheet (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`): every
///   worksheet, in workbook order, named as in the workbook
/// - a `.zip` bundle: every `.csv` entry is a sheet, in archive order
/// - a directory: every `*.csv` file is a sheet, in name order
/// - a `.csv` file: a single sheet
///
/// CSV sheet names are file stems.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<Option<Workbook>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    if path.is_dir() {
        return load_directory(path).map(Some);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet(path).map(Some),
        "zip" => load_zip(path).map(Some),
        "csv" => {
            let data = fs::read(path).with_context(|| format!("reading {:?}", path))?;
            Ok(Some(Workbook::new(vec![Sheet::new(stem(path), data)])))
        }
        other => Err(anyhow!(
            "unsupported document format {:?} for {:?}",
            other,
            path
        )),
    }
}

const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Up-front buffer size for a zip entry. The size in the entry header is
/// untrusted, so the reservation is capped and `read_to_end` grows the rest.
fn reserve_for(claimed: u64) -> usize {
    claimed.min(MAX_PREALLOC) as usize
}

fn load_spreadsheet(path: &Path) -> Result<Workbook> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {:?}", path))?;

    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                debug!(sheet = %name, "cannot read worksheet: {}", e);
                continue;
            }
        };
        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
        sheets.push(Sheet::from_table(name, RawTable::from_rows(rows)));
    }
    debug!(sheets = sheets.len(), "loaded spreadsheet");
    Ok(Workbook::new(sheets))
}

/// Cell text as it would appear in a CSV export. Whole numbers print without
/// a fractional part so `2020.0` headers still read as years.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn load_zip(path: &Path) -> Result<Workbook> {
    let file = File::open(path).with_context(|| format!("Failed to open ZIP file: {:?}", path))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("Failed to read ZIP archive: {:?}", path))?;

    let mut sheets = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{} in {:?}", i, path))?;
        let name = entry.name().to_string();
        if !entry.is_file() || !name.to_lowercase().ends_with(".csv") {
            continue;
        }
        let mut buf = Vec::with_capacity(reserve_for(entry.size()));
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("Failed to read {} into memory", name))?;
        sheets.push(Sheet::new(stem(Path::new(&name)), buf));
    }
    debug!(sheets = sheets.len(), "loaded zip bundle");
    Ok(Workbook::new(sheets))
}

fn load_directory(dir: &Path) -> Result<Workbook> {
    let pattern = format!("{}/*.csv", Pattern::escape(&dir.to_string_lossy()));
    let mut sheets = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern for sheet directory")? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let data = fs::read(&path).with_context(|| format!("reading {:?}", path))?;
        sheets.push(Sheet::new(stem(&path), data));
    }
    debug!(sheets = sheets.len(), "loaded sheet directory");
    Ok(Workbook::new(sheets))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Write a minimal `.xlsx` with one worksheet per `(name, csv)` pair.
/// Cells that parse as numbers are stored as numbers, the rest as inline
/// strings.
#[cfg(test)]
pub(crate) fn write_test_xlsx(path: &Path, sheets: &[(&str, &str)]) -> Result<()> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn column(mut idx: usize) -> String {
        let mut name = String::new();
        loop {
            name.insert(0, (b'A' + (idx % 26) as u8) as char);
            if idx < 26 {
                break;
            }
            idx = idx / 26 - 1;
        }
        name
    }

    fn worksheet(csv: &str) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (r, line) in csv.lines().enumerate() {
            xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in line.split(',').enumerate() {
                let at = format!("{}{}", column(c), r + 1);
                if cell.is_empty() {
                    continue;
                }
                if cell.parse::<f64>().is_ok() {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, at, cell));
                } else {
                    let text = cell.replace('&', "&amp;").replace('<', "&lt;");
                    xml.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        at, text
                    ));
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    let mut types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut book = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        ));
        book.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            name, n, n
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        ));
    }
    types.push_str("</Types>");
    book.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    let mut zip = zip::ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(types.as_bytes())?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
    )?;
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(book.as_bytes())?;
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(rels.as_bytes())?;
    for (i, (_, csv)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(worksheet(csv).as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}
