//! Spreadsheet row extraction.
//!
//! Reads the first worksheet of an `.xlsx` workbook and flattens every data
//! row into a single string: each non-empty cell is stringified (shared and
//! inline strings resolved, numeric values taken as written) and joined
//! with single spaces. The header row is discarded — retrieval has no
//! awareness of column semantics. Row order is preserved.

use std::io::Read;
use std::path::Path;

use crate::extract::ExtractError;

/// Decompressed bytes allowed per ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

/// Read the data rows of the workbook at `path`, one string per row.
pub fn read_rows(path: &Path) -> Result<Vec<String>, ExtractError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::Sheet(format!("{}: {}", path.display(), e)))?;
    rows_from_bytes(&bytes)
}

/// Workbook-bytes variant of [`read_rows`], used directly by tests.
pub fn rows_from_bytes(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Sheet(e.to_string()))?;

    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_name = first_worksheet_name(&archive)?;
    let sheet_xml = read_zip_entry(&mut archive, &sheet_name)?;

    let mut rows = extract_rows(&sheet_xml, &shared_strings)?;
    if !rows.is_empty() {
        // Header row: column names carry no retrieval signal.
        rows.remove(0);
    }
    Ok(rows)
}

fn read_zip_entry(archive: &mut Archive, name: &str) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Sheet(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Sheet(format!("{}: {}", name, e)))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Sheet(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Shared strings, one entry per `<si>` (rich-text runs concatenated).
/// Workbooks without string cells have no sharedStrings part at all.
fn read_shared_strings(archive: &mut Archive) -> Result<Vec<String>, ExtractError> {
    match archive.by_name("xl/sharedStrings.xml") {
        Err(zip::result::ZipError::FileNotFound) => return Ok(Vec::new()),
        Err(e) => return Err(ExtractError::Sheet(e.to_string())),
        Ok(_) => {}
    }
    let xml = read_zip_entry(archive, "xl/sharedStrings.xml")?;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" if current.is_some() => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Sheet(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn first_worksheet_name(archive: &Archive) -> Result<String, ExtractError> {
    archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches("xl/worksheets/sheet")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(|s| s.to_string())
        .ok_or_else(|| ExtractError::Sheet("workbook has no worksheets".to_string()))
}

#[derive(Clone, Copy, PartialEq)]
enum CellType {
    Shared,
    Inline,
    Literal,
}

fn extract_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<String>, ExtractError> {
    let mut rows: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut cells: Option<Vec<String>> = None;
    let mut cell_type = CellType::Literal;
    let mut in_v = false;
    let mut in_inline_t = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => cells = Some(Vec::new()),
                b"c" => {
                    cell_type = CellType::Literal;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"t" {
                            cell_type = match attr.value.as_ref() {
                                b"s" => CellType::Shared,
                                b"inlineStr" => CellType::Inline,
                                _ => CellType::Literal,
                            };
                        }
                    }
                }
                b"v" => in_v = true,
                b"t" if cell_type == CellType::Inline => in_inline_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_v || in_inline_t => {
                let raw = te.unescape().unwrap_or_default();
                let value = if in_v && cell_type == CellType::Shared {
                    let idx: usize = raw.trim().parse().map_err(|_| {
                        ExtractError::Sheet(format!("bad shared-string index: {}", raw))
                    })?;
                    shared_strings
                        .get(idx)
                        .ok_or_else(|| {
                            ExtractError::Sheet(format!(
                                "shared-string index {} out of range ({} entries)",
                                idx,
                                shared_strings.len()
                            ))
                        })?
                        .clone()
                } else {
                    raw.trim().to_string()
                };
                if !value.is_empty() {
                    if let Some(row) = cells.as_mut() {
                        row.push(value);
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_inline_t = false,
                b"c" => cell_type = CellType::Literal,
                b"row" => {
                    if let Some(row) = cells.take() {
                        rows.push(row.join(" "));
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Sheet(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}
