//! 作業用シートの読み込み
//!
//! .xlsx からセル値（表示テキスト）と結合範囲を取り出して `Sheet` を組み立てる。

use super::ooxml;
use crate::error::{ReportAiError, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use daily_report_common::{MergeRegion, Sheet};
use std::path::Path;

/// 作業用シートを読み込む
///
/// 指定シートが無い場合は先頭シートを使う。シートが1枚も無ければ `SheetNotFound`。
pub fn load_working_sheet(path: &Path, sheet_name: &str) -> Result<Sheet> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ReportAiError::ExcelRead(format!("{}: {}", path.display(), e)))?;

    let active = ooxml::read_active_tab(path)?;
    let name = resolve_sheet_name(&workbook.sheet_names(), sheet_name, active)?;

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| ReportAiError::ExcelRead(format!("シート '{}': {}", name, e)))?;

    let mut sheet = Sheet::new(name.clone());
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (height, width) = range.get_size();
    if height > 0 && width > 0 {
        sheet.ensure_size(start_row + height as u32, start_col + width as u32);
    }

    for (r, c, cell) in range.used_cells() {
        if let Some(text) = cell_text(cell) {
            sheet.set_value(start_row + r as u32 + 1, start_col + c as u32 + 1, text);
        }
    }

    workbook
        .load_merged_regions()
        .map_err(|e| ReportAiError::ExcelRead(format!("結合セルの読み込みに失敗: {}", e)))?;

    let regions = match workbook.worksheet_merge_cells(&name) {
        Some(Ok(regions)) => regions,
        Some(Err(e)) => {
            return Err(ReportAiError::ExcelRead(format!("結合セルの読み込みに失敗: {}", e)));
        }
        None => Vec::new(),
    };

    for dims in regions {
        let region = MergeRegion::new(
            dims.start.0 + 1,
            dims.start.1 + 1,
            dims.end.0 + 1,
            dims.end.1 + 1,
        );
        if let Err(e) = sheet.merge(region) {
            log::warn!("結合範囲 {} をスキップ: {}", region.to_a1(), e);
        }
    }

    log::debug!(
        "シート '{}' を読み込み: {}行 x {}列, 結合 {}件",
        name,
        sheet.max_row(),
        sheet.max_column(),
        sheet.merge_regions().len()
    );

    Ok(sheet)
}

/// 使用するシート名を決定
///
/// 指定名が無ければアクティブシート（`active` 番目）、それも無ければ先頭シート。
pub(crate) fn resolve_sheet_name(names: &[String], requested: &str, active: usize) -> Result<String> {
    if let Some(name) = names.iter().find(|n| n.as_str() == requested) {
        return Ok(name.clone());
    }

    let fallback = names
        .get(active)
        .or_else(|| names.first())
        .ok_or_else(|| ReportAiError::SheetNotFound(requested.to_string()))?;
    log::warn!("シート '{}' が無いためアクティブシート '{}' を使用", requested, fallback);
    Ok(fallback.clone())
}

/// セル値を表示テキストに変換（空は None）
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        // 整数値の浮動小数は小数点なしで表示
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Data::Float(n) => Some(n.to_string()),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(format!("#{:?}", e)),
    }
}
