//! 旧形式ワークブックの変換
//!
//! .xlsb / .xls を calamine で読み、rust_xlsxwriter で .xlsx として書き直す。
//! 旧形式のリーダーは書式を返さないため、変換後は値のみ（全シート・シート名は維持）。

use super::ContainerFormat;
use crate::error::{ReportAiError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};

/// 作業用の .xlsx パスを返す
///
/// .xlsx はそのまま返し、旧形式は同じディレクトリに拡張子を .xlsx に変えて変換する。
pub fn ensure_xlsx(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(ReportAiError::FileNotFound(path.display().to_string()));
    }

    let format = ContainerFormat::from_path(path)?;
    if !format.is_legacy() {
        return Ok(path.to_path_buf());
    }

    let output = path.with_extension("xlsx");
    convert_to_xlsx(path, &output)?;
    log::info!("{:?} を変換: {} -> {}", format, path.display(), output.display());
    Ok(output)
}

/// ワークブック全体を値のみの .xlsx に書き出す
pub fn convert_to_xlsx(source: &Path, dest: &Path) -> Result<()> {
    let mut reader = open_workbook_auto(source)
        .map_err(|e| ReportAiError::ExcelRead(format!("{}: {}", source.display(), e)))?;

    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let mut workbook = Workbook::new();

    for sheet_name in reader.sheet_names() {
        let range = reader
            .worksheet_range(&sheet_name)
            .map_err(|e| ReportAiError::ExcelRead(format!("シート '{}': {}", sheet_name, e)))?;

        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&sheet_name)
            .map_err(|e| ReportAiError::ExcelWrite(format!("シート名設定エラー: {}", e)))?;

        // データがA1から始まるとは限らない
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        for (r, c, cell) in range.used_cells() {
            let row = start_row + r as u32;
            let col = (start_col as usize + c) as u16;

            let written = match cell {
                Data::Empty => continue,
                Data::String(s) => worksheet.write_string(row, col, s.as_str()),
                Data::Float(n) => worksheet.write_number(row, col, *n),
                Data::Int(n) => worksheet.write_number(row, col, *n as f64),
                Data::Bool(b) => worksheet.write_boolean(row, col, *b),
                Data::DateTime(dt) => {
                    worksheet.write_number_with_format(row, col, dt.as_f64(), &date_format)
                }
                Data::DateTimeIso(s) | Data::DurationIso(s) => {
                    worksheet.write_string(row, col, s.as_str())
                }
                Data::Error(e) => worksheet.write_string(row, col, format!("#{:?}", e)),
            };
            written.map_err(|e| ReportAiError::ExcelWrite(format!("セル書き込みエラー: {}", e)))?;
        }
    }

    workbook
        .save(dest)
        .map_err(|e| ReportAiError::ExcelWrite(format!("{}: {}", dest.display(), e)))?;

    Ok(())
}
