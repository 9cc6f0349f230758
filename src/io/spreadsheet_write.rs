use std::fs::File;
use std::io::Write;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_xlsxwriter::{Format, Workbook};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::error::Result;
use crate::io::spreadsheet::Spreadsheet;
use crate::model::{CellValue, FIELD_NAMES};

/// Name given to the single sheet of a written document.
pub const SHEET_NAME: &str = "chord_dictionary";

const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

const ODS_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
 <manifest:file-entry manifest:full-path="/" manifest:version="1.2" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>
"#;

/// Writes the dictionary to an Excel workbook with a frozen header row.
pub fn write_xlsx(path: &Path, sheet: &Spreadsheet) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold();
    for (col_idx, header) in FIELD_NAMES.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, *header, &header_format)?;
    }

    for (row_idx, row) in sheet.rows().iter().enumerate() {
        let row_idx = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let col_idx = col_idx as u16;
            match cell {
                CellValue::Null => {}
                CellValue::Text(value) if value.is_empty() => {}
                CellValue::Text(value) => {
                    worksheet.write_string(row_idx, col_idx, value)?;
                }
                CellValue::Integer(value) => {
                    worksheet.write_number(row_idx, col_idx, *value as f64)?;
                }
                CellValue::Real(value) => {
                    worksheet.write_number(row_idx, col_idx, *value)?;
                }
                CellValue::Boolean(value) => {
                    worksheet.write_boolean(row_idx, col_idx, *value)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    if !sheet.is_empty() {
        let col_end = (FIELD_NAMES.len() as u16).saturating_sub(1);
        worksheet.autofilter(0, 0, sheet.len() as u32, col_end)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Writes the dictionary as an OpenDocument spreadsheet package.
///
/// The package carries only what readers require: the uncompressed
/// `mimetype` entry first, the manifest, and `content.xml`.
pub fn write_ods(path: &Path, sheet: &Spreadsheet) -> Result<()> {
    let content = ods_content(sheet)?;

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(ODS_MIMETYPE.as_bytes())?;
    zip.start_file("META-INF/manifest.xml", deflated)?;
    zip.write_all(ODS_MANIFEST.as_bytes())?;
    zip.start_file("content.xml", deflated)?;
    zip.write_all(&content)?;
    zip.finish()?;
    Ok(())
}

fn ods_content(sheet: &Spreadsheet) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut document = BytesStart::new("office:document-content");
    document.push_attribute((
        "xmlns:office",
        "urn:oasis:names:tc:opendocument:xmlns:office:1.0",
    ));
    document.push_attribute((
        "xmlns:table",
        "urn:oasis:names:tc:opendocument:xmlns:table:1.0",
    ));
    document.push_attribute((
        "xmlns:text",
        "urn:oasis:names:tc:opendocument:xmlns:text:1.0",
    ));
    document.push_attribute(("office:version", "1.2"));
    writer.write_event(Event::Start(document))?;
    writer.write_event(Event::Start(BytesStart::new("office:body")))?;
    writer.write_event(Event::Start(BytesStart::new("office:spreadsheet")))?;

    let mut table = BytesStart::new("table:table");
    table.push_attribute(("table:name", SHEET_NAME));
    writer.write_event(Event::Start(table))?;

    let header: Vec<CellValue> = FIELD_NAMES
        .iter()
        .map(|name| CellValue::Text((*name).to_string()))
        .collect();
    write_ods_row(&mut writer, &header)?;
    for row in sheet.rows() {
        write_ods_row(&mut writer, row)?;
    }

    writer.write_event(Event::End(BytesEnd::new("table:table")))?;
    writer.write_event(Event::End(BytesEnd::new("office:spreadsheet")))?;
    writer.write_event(Event::End(BytesEnd::new("office:body")))?;
    writer.write_event(Event::End(BytesEnd::new("office:document-content")))?;
    Ok(writer.into_inner())
}

fn write_ods_row(writer: &mut Writer<Vec<u8>>, row: &[CellValue]) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("table:table-row")))?;
    for cell in row {
        let mut element = BytesStart::new("table:table-cell");
        let display = match cell {
            CellValue::Null => None,
            CellValue::Text(value) if value.is_empty() => None,
            CellValue::Text(value) => {
                element.push_attribute(("office:value-type", "string"));
                Some(value.clone())
            }
            CellValue::Integer(value) => {
                let value = value.to_string();
                element.push_attribute(("office:value-type", "float"));
                element.push_attribute(("office:value", value.as_str()));
                Some(value)
            }
            CellValue::Real(value) => {
                let value = value.to_string();
                element.push_attribute(("office:value-type", "float"));
                element.push_attribute(("office:value", value.as_str()));
                Some(value)
            }
            CellValue::Boolean(value) => {
                let value = value.to_string();
                element.push_attribute(("office:value-type", "boolean"));
                element.push_attribute(("office:boolean-value", value.as_str()));
                Some(value)
            }
        };

        match display {
            None => writer.write_event(Event::Empty(element))?,
            Some(text) => {
                writer.write_event(Event::Start(element))?;
                writer.write_event(Event::Start(BytesStart::new("text:p")))?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                writer.write_event(Event::End(BytesEnd::new("text:p")))?;
                writer.write_event(Event::End(BytesEnd::new("table:table-cell")))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new("table:table-row")))?;
    Ok(())
}
