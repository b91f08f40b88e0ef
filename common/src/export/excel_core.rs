//! Excel生成（共通ライブラリ）
//!
//! 整形済みの作業用シートを確認用のxlsxとして書き出す。
//! 値・結合範囲・折り返し指定のみを反映し、元ファイルの書式は引き継がない。

use crate::sheet::Sheet;
use rust_xlsxwriter::*;

/// 作業用シートをxlsxバッファに生成
///
/// # Arguments
/// * `sheet` - 結合解除・Issue統合後のシート
///
/// # Returns
/// xlsxファイルのバイト列
pub fn generate_sheet_buffer(sheet: &Sheet) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let wrap_format = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::VerticalCenter);
    let plain_format = Format::new();

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet.name())
        .map_err(|e| format!("シート名設定エラー: {}", e))?;

    for (row, col, value) in sheet.cells() {
        if sheet.merge_containing(row, col).is_some() {
            // 結合範囲は merge_range で書き込む
            continue;
        }
        let format = if sheet.is_wrapped(row, col) { &wrap_format } else { &plain_format };
        worksheet
            .write_string_with_format(row - 1, (col - 1) as u16, value, format)
            .map_err(|e| format!("セル書き込みエラー: {}", e))?;
    }

    for region in sheet.merge_regions() {
        let value = sheet.get(region.first_row, region.first_col).unwrap_or("");
        let format = if sheet.is_wrapped(region.first_row, region.first_col) {
            &wrap_format
        } else {
            &plain_format
        };
        if region.first_row == region.last_row && region.first_col == region.last_col {
            // 単一セルの結合はxlsxwriterが受け付けない
            worksheet
                .write_string_with_format(region.first_row - 1, (region.first_col - 1) as u16, value, format)
                .map_err(|e| format!("セル書き込みエラー: {}", e))?;
            continue;
        }
        worksheet
            .merge_range(
                region.first_row - 1,
                (region.first_col - 1) as u16,
                region.last_row - 1,
                (region.last_col - 1) as u16,
                value,
                format,
            )
            .map_err(|e| format!("セルマージエラー: {}", e))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}
