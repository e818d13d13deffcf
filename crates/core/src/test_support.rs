//! Writes small `.xlsx` workbooks for loader tests.

use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Employees" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

// Style 0 is general, style 1 the builtin short date format (id 14).
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs>
</styleSheet>"#;

/// One worksheet cell.
pub enum Cell<'a> {
    Text(&'a str),
    /// Excel serial day number rendered with a date format.
    Serial(f64),
    /// ISO 8601 date cell (`t="d"`).
    Iso(&'a str),
}

/// `(cell reference, value)` pairs, e.g. `("C2", Cell::Serial(43831.0))`.
pub fn write_workbook(path: &Path, cells: &[(&str, Cell<'_>)]) {
    let mut rows: Vec<(u32, Vec<String>)> = Vec::new();
    for (reference, cell) in cells {
        let row: u32 = reference
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .unwrap();
        let xml = match cell {
            Cell::Text(s) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{s}</t></is></c>"#),
            Cell::Serial(n) => format!(r#"<c r="{reference}" s="1"><v>{n}</v></c>"#),
            Cell::Iso(s) => format!(r#"<c r="{reference}" t="d"><v>{s}</v></c>"#),
        };
        match rows.iter_mut().find(|(r, _)| *r == row) {
            Some((_, row_cells)) => row_cells.push(xml),
            None => rows.push((row, vec![xml])),
        }
    }
    rows.sort_by_key(|(r, _)| *r);

    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row, row_cells) in &rows {
        sheet.push_str(&format!(r#"<row r="{row}">{}</row>"#, row_cells.concat()));
    }
    sheet.push_str("</sheetData></worksheet>");

    let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/styles.xml", STYLES),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ] {
        zip.start_file(name, FileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Header row with a blank second column, a dated body and one empty row.
pub fn write_staff_workbook(path: &Path) {
    write_workbook(
        path,
        &[
            ("A1", Cell::Text("Name")),
            ("C1", Cell::Text("Start Date")),
            ("D1", Cell::Text("Reviewed")),
            ("E1", Cell::Text("Department")),
            ("A2", Cell::Text("Alice Smith")),
            ("B2", Cell::Text("note")),
            ("C2", Cell::Serial(43831.0)),
            ("D2", Cell::Iso("2019-06-01T00:00:00")),
            ("E2", Cell::Text("Engineering")),
            ("A4", Cell::Text("Bob Jones")),
            ("C4", Cell::Serial(44197.0)),
            ("E4", Cell::Text("Sales")),
        ],
    );
}
