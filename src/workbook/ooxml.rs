//! xlsxパッケージ内のXML操作
//!
//! 元ファイルの書式を残すため、ワークブックを作り直さずに
//! 対象シートのXMLと styles.xml だけを書き換え、他のパートはそのままコピーする。

use crate::error::{ReportAiError, Result};
use daily_report_common::sheet::column_letters;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";

/// 追加するセル（インライン文字列）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCell {
    pub col: u32,
    pub text: String,
    pub style: u32,
}

/// 行番号ごとの追加セル（列昇順）
pub type RowCells = BTreeMap<u32, Vec<NewCell>>;

/// 追加した書式のインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedStyles {
    /// 太字・中央揃え
    pub header: u32,
    /// 折り返し・上下中央
    pub data: u32,
}

pub fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ReportAiError::Zip(format!("{}: {}", name, e)))?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// 置き換えたパート以外をそのままコピーして新しいパッケージを書き出す
pub fn write_package<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    dest: &Path,
    replaced: &HashMap<String, Vec<u8>>,
) -> Result<()> {
    let output = File::create(dest)?;
    let mut zip = ZipWriter::new(output);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        match replaced.get(&name) {
            Some(bytes) => {
                zip.start_file(name, options)?;
                zip.write_all(bytes)?;
            }
            None => zip.raw_copy_file(file)?,
        }
    }

    zip.finish()?;
    Ok(())
}

/// シート名に対応するワークシートのパート名を解決
///
/// 名前が見つからなければアクティブシート（`activeTab`）を使う。
/// 戻り値は（実際のシート名, パート名）。
pub fn resolve_sheet_part(
    workbook_xml: &[u8],
    rels_xml: &[u8],
    sheet_name: &str,
) -> Result<(String, String)> {
    let sheets = parse_workbook_sheets(workbook_xml)?;
    let active = active_tab(workbook_xml)?;
    let (name, rel_id) = sheets
        .iter()
        .find(|(name, _)| name == sheet_name)
        .or_else(|| sheets.get(active))
        .or_else(|| sheets.first())
        .cloned()
        .ok_or_else(|| ReportAiError::SheetNotFound(sheet_name.to_string()))?;

    let targets = parse_relationships(rels_xml)?;
    let target = targets
        .get(&rel_id)
        .ok_or_else(|| ReportAiError::Xml(format!("シート '{}' のリレーションがありません", name)))?;

    let part = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    };
    Ok((name, part))
}

/// `<workbookView activeTab="n">` のシート番号（0始まり、指定なしは0）
pub fn active_tab(workbook_xml: &[u8]) -> Result<usize> {
    let mut reader = Reader::from_reader(workbook_xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"workbookView" => {
                let tab = attr_value(&e, b"activeTab")?
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0);
                return Ok(tab);
            }
            Event::Eof => return Ok(0),
            _ => {}
        }
        buf.clear();
    }
}

/// パッケージを開いてアクティブシートの番号を読む
pub fn read_active_tab(path: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?;
    active_tab(&workbook_xml)
}

/// workbook.xml の（シート名, r:id）一覧
fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let key = attr.key.as_ref();
                    let value = attr.unescape_value()?.into_owned();
                    if key == b"name" {
                        name = Some(value);
                    } else if key != b"sheetId" && local_name(key) == b"id" {
                        rel_id = Some(value);
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// .rels の Id -> Target
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// styles.xml に太字フォントと2つのセル書式を追加
pub fn patch_styles(xml: &[u8]) -> Result<(Vec<u8>, AddedStyles)> {
    let scan = scan_styles(xml)?;
    if !scan.has_fonts || !scan.has_cell_xfs {
        return Err(ReportAiError::Xml(
            "styles.xml に fonts / cellXfs がありません".into(),
        ));
    }

    let bold_font = scan.font_count;
    let styles = AddedStyles {
        header: scan.xf_count,
        data: scan.xf_count + 1,
    };

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 512));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"fonts" => {
                writer.write_event(Event::Start(with_count(&e, scan.font_count + 1)?))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"fonts" => {
                write_bold_font(&mut writer, &scan.first_font)?;
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Event::Start(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                writer.write_event(Event::Start(with_count(&e, scan.xf_count + 2)?))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                write_cell_xfs(&mut writer, bold_font)?;
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok((writer.into_inner(), styles))
}

struct StylesScan {
    has_fonts: bool,
    has_cell_xfs: bool,
    font_count: u32,
    xf_count: u32,
    /// 先頭フォントの子要素（サイズ・フォント名を太字フォントに引き継ぐ）
    first_font: Vec<Event<'static>>,
}

fn scan_styles(xml: &[u8]) -> Result<StylesScan> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut scan = StylesScan {
        has_fonts: false,
        has_cell_xfs: false,
        font_count: 0,
        xf_count: 0,
        first_font: Vec::new(),
    };

    let mut stack: Vec<Vec<u8>> = Vec::new();
    // 先頭フォント要素の内側にいる間の深さ
    let mut capture_level: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref()).to_vec();
                if capture_level.is_some() {
                    scan.first_font.push(Event::Start(e.into_owned()));
                }
                match (stack.last().map(Vec::as_slice), name.as_slice()) {
                    (Some(b"fonts"), b"font") => {
                        scan.font_count += 1;
                        if scan.font_count == 1 {
                            capture_level = Some(stack.len() + 1);
                        }
                    }
                    (Some(b"cellXfs"), b"xf") => scan.xf_count += 1,
                    (_, b"fonts") => scan.has_fonts = true,
                    (_, b"cellXfs") => scan.has_cell_xfs = true,
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = local_name(e.name().as_ref()).to_vec();
                if capture_level.is_some() && name != b"b" {
                    scan.first_font.push(Event::Empty(e.into_owned()));
                }
                match (stack.last().map(Vec::as_slice), name.as_slice()) {
                    (Some(b"fonts"), b"font") => scan.font_count += 1,
                    (Some(b"cellXfs"), b"xf") => scan.xf_count += 1,
                    _ => {}
                }
            }
            Event::End(e) => {
                stack.pop();
                if let Some(level) = capture_level {
                    if stack.len() < level {
                        capture_level = None;
                    } else {
                        scan.first_font.push(Event::End(e.into_owned()));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(scan)
}

fn with_count(start: &BytesStart<'_>, count: u32) -> Result<BytesStart<'static>> {
    let mut patched = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() != b"count" {
            patched.push_attribute(attr);
        }
    }
    patched.push_attribute(("count", count.to_string().as_str()));
    Ok(patched)
}

fn write_bold_font(writer: &mut Writer<Vec<u8>>, base: &[Event<'static>]) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("font")))?;
    writer.write_event(Event::Empty(BytesStart::new("b")))?;
    for ev in base {
        writer.write_event(ev.clone())?;
    }
    writer.write_event(Event::End(BytesEnd::new("font")))?;
    Ok(())
}

fn write_cell_xfs(writer: &mut Writer<Vec<u8>>, bold_font: u32) -> Result<()> {
    let font = bold_font.to_string();

    let mut header = BytesStart::new("xf");
    header.extend_attributes([
        ("numFmtId", "0"),
        ("fontId", font.as_str()),
        ("fillId", "0"),
        ("borderId", "0"),
        ("xfId", "0"),
        ("applyFont", "1"),
        ("applyAlignment", "1"),
    ]);
    writer.write_event(Event::Start(header))?;
    let mut alignment = BytesStart::new("alignment");
    alignment.extend_attributes([("horizontal", "center"), ("vertical", "center")]);
    writer.write_event(Event::Empty(alignment))?;
    writer.write_event(Event::End(BytesEnd::new("xf")))?;

    let mut data = BytesStart::new("xf");
    data.extend_attributes([
        ("numFmtId", "0"),
        ("fontId", "0"),
        ("fillId", "0"),
        ("borderId", "0"),
        ("xfId", "0"),
        ("applyAlignment", "1"),
    ]);
    writer.write_event(Event::Start(data))?;
    let mut alignment = BytesStart::new("alignment");
    alignment.extend_attributes([("vertical", "center"), ("wrapText", "1")]);
    writer.write_event(Event::Empty(alignment))?;
    writer.write_event(Event::End(BytesEnd::new("xf")))?;

    Ok(())
}

/// シートの最終列（セル・結合範囲・`<dimension>` から算出、空シートは0）
pub fn scan_max_column(xml: &[u8]) -> Result<u32> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut max_col = 0;
    let mut col_in_row = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"row" => col_in_row = 0,
                b"c" => {
                    // r属性が無いセルは直前のセルの次の列
                    col_in_row = match attr_value(&e, b"r")? {
                        Some(r) => parse_cell_ref(&r).map(|(col, _)| col).unwrap_or(col_in_row + 1),
                        None => col_in_row + 1,
                    };
                    max_col = max_col.max(col_in_row);
                }
                b"mergeCell" | b"dimension" => {
                    if let Some((_, _, last_col, _)) =
                        attr_value(&e, b"ref")?.as_deref().and_then(parse_range_ref)
                    {
                        max_col = max_col.max(last_col);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(max_col)
}

/// シートXMLにセルを追加
///
/// 追加セルは既存セルより右の列に置く前提で、各行の末尾に書き込む。
/// XMLに無い行は行番号順に新規作成し、`<dimension>` を広げる。
pub fn patch_sheet(xml: &[u8], cells: &RowCells) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + cells.len() * 256));

    let rows: Vec<u32> = cells.keys().copied().collect();
    let mut next = 0usize;
    let mut buf = Vec::new();
    let mut saw_sheet_data = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"dimension" => {
                let dimension = widened_dimension(&e, cells)?;
                writer.write_event(Event::Empty(dimension))?;
            }
            // Start側で自己終了タグとして書き出し済み
            Event::End(ref e) if local_name(e.name().as_ref()) == b"dimension" => {}
            Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                writer.write_event(Event::Start(e.into_owned()))?;
                patch_sheet_data(&mut reader, &mut writer, cells, &rows, &mut next)?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                if rows.is_empty() {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                } else {
                    writer.write_event(Event::Start(e.into_owned()))?;
                    write_remaining_rows(&mut writer, cells, &rows, &mut next)?;
                    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"worksheet" => {
                if !saw_sheet_data && !rows.is_empty() {
                    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
                    write_remaining_rows(&mut writer, cells, &rows, &mut next)?;
                    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                }
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn patch_sheet_data(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    cells: &RowCells,
    rows: &[u32],
    next: &mut usize,
) -> Result<()> {
    let mut buf = Vec::new();
    let mut last_row = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_num = row_number(&e, last_row)?;
                last_row = row_num;
                write_rows_before(writer, cells, rows, next, row_num)?;

                match take_row(cells, rows, next, row_num) {
                    Some(new_cells) => {
                        writer.write_event(Event::Start(without_spans(&e)?))?;
                        copy_until_row_end(reader, writer)?;
                        write_cells(writer, row_num, new_cells)?;
                        writer.write_event(Event::End(BytesEnd::new("row")))?;
                    }
                    None => writer.write_event(Event::Start(e.into_owned()))?,
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_num = row_number(&e, last_row)?;
                last_row = row_num;
                write_rows_before(writer, cells, rows, next, row_num)?;

                match take_row(cells, rows, next, row_num) {
                    Some(new_cells) => {
                        // `<row/>` を `<row>...</row>` に変換
                        writer.write_event(Event::Start(without_spans(&e)?))?;
                        write_cells(writer, row_num, new_cells)?;
                        writer.write_event(Event::End(BytesEnd::new("row")))?;
                    }
                    None => writer.write_event(Event::Empty(e.into_owned()))?,
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                write_remaining_rows(writer, cells, rows, next)?;
                writer.write_event(Event::End(e.into_owned()))?;
                break;
            }
            Event::Eof => {
                return Err(ReportAiError::Xml("sheetData の途中でファイルが終了しました".into()));
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(())
}

/// 行の終了タグ直前まで（入れ子も含めて）そのままコピーする。終了タグ自体は書かない。
fn copy_until_row_end(reader: &mut Reader<&[u8]>, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                writer.write_event(Event::Start(e.into_owned()))?;
            }
            Event::End(e) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Event::Eof => {
                return Err(ReportAiError::Xml("row の途中でファイルが終了しました".into()));
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(())
}

fn write_rows_before(
    writer: &mut Writer<Vec<u8>>,
    cells: &RowCells,
    rows: &[u32],
    next: &mut usize,
    row_num: u32,
) -> Result<()> {
    while *next < rows.len() && rows[*next] < row_num {
        write_new_row(writer, rows[*next], &cells[&rows[*next]])?;
        *next += 1;
    }
    Ok(())
}

fn write_remaining_rows(
    writer: &mut Writer<Vec<u8>>,
    cells: &RowCells,
    rows: &[u32],
    next: &mut usize,
) -> Result<()> {
    while *next < rows.len() {
        write_new_row(writer, rows[*next], &cells[&rows[*next]])?;
        *next += 1;
    }
    Ok(())
}

fn take_row<'a>(
    cells: &'a RowCells,
    rows: &[u32],
    next: &mut usize,
    row_num: u32,
) -> Option<&'a [NewCell]> {
    if *next < rows.len() && rows[*next] == row_num {
        *next += 1;
        cells.get(&row_num).map(Vec::as_slice)
    } else {
        None
    }
}

fn write_new_row(writer: &mut Writer<Vec<u8>>, row_num: u32, cells: &[NewCell]) -> Result<()> {
    let mut row = BytesStart::new("row");
    row.push_attribute(("r", row_num.to_string().as_str()));
    writer.write_event(Event::Start(row))?;
    write_cells(writer, row_num, cells)?;
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_cells(writer: &mut Writer<Vec<u8>>, row_num: u32, cells: &[NewCell]) -> Result<()> {
    for cell in cells {
        let reference = format!("{}{}", column_letters(cell.col), row_num);
        let mut c = BytesStart::new("c");
        c.push_attribute(("r", reference.as_str()));
        c.push_attribute(("s", cell.style.to_string().as_str()));

        if cell.text.is_empty() {
            writer.write_event(Event::Empty(c))?;
            continue;
        }

        c.push_attribute(("t", "inlineStr"));
        writer.write_event(Event::Start(c))?;
        writer.write_event(Event::Start(BytesStart::new("is")))?;
        let mut t = BytesStart::new("t");
        if needs_space_preserve(&cell.text) {
            t.push_attribute(("xml:space", "preserve"));
        }
        writer.write_event(Event::Start(t))?;
        writer.write_event(Event::Text(BytesText::new(&cell.text)))?;
        writer.write_event(Event::End(BytesEnd::new("t")))?;
        writer.write_event(Event::End(BytesEnd::new("is")))?;
        writer.write_event(Event::End(BytesEnd::new("c")))?;
    }
    Ok(())
}

fn without_spans(row: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    let mut patched = BytesStart::new(String::from_utf8_lossy(row.name().as_ref()).into_owned());
    for attr in row.attributes() {
        let attr = attr?;
        if attr.key.as_ref() != b"spans" {
            patched.push_attribute(attr);
        }
    }
    Ok(patched)
}

fn widened_dimension(dimension: &BytesStart<'_>, cells: &RowCells) -> Result<BytesStart<'static>> {
    let current = attr_value(dimension, b"ref")?
        .as_deref()
        .and_then(parse_range_ref)
        .unwrap_or((1, 1, 1, 1));

    let (mut first_col, mut first_row, mut last_col, mut last_row) = current;
    for (&row, row_cells) in cells {
        for cell in row_cells {
            first_col = first_col.min(cell.col);
            first_row = first_row.min(row);
            last_col = last_col.max(cell.col);
            last_row = last_row.max(row);
        }
    }

    let reference = format!(
        "{}{}:{}{}",
        column_letters(first_col),
        first_row,
        column_letters(last_col),
        last_row
    );
    let mut patched = BytesStart::new(String::from_utf8_lossy(dimension.name().as_ref()).into_owned());
    patched.push_attribute(("ref", reference.as_str()));
    Ok(patched)
}

fn row_number(row: &BytesStart<'_>, previous: u32) -> Result<u32> {
    Ok(attr_value(row, b"r")?
        .and_then(|r| r.trim().parse().ok())
        .unwrap_or(previous + 1))
}

fn attr_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// "AB12" -> (列, 行)（1始まり、$は無視）
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            acc.checked_mul(26)?
                .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
        })?;
    let row = digits.parse().ok()?;
    Some((col, row))
}

/// "A1:C3" -> (先頭列, 先頭行, 最終列, 最終行)。単一セル参照も受け付ける。
pub fn parse_range_ref(reference: &str) -> Option<(u32, u32, u32, u32)> {
    let (start, end) = reference.split_once(':').unwrap_or((reference, reference));
    let (c1, r1) = parse_cell_ref(start)?;
    let (c2, r2) = parse_cell_ref(end)?;
    Some((c1.min(c2), r1.min(r2), c1.max(c2), r1.max(r2)))
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) || text.contains('\n')
}
