//! 前処理パイプライン
//!
//! 変換 → 作業用シート読み込み → 結合セル解除 → Issue列統合 を順に行う。

use crate::error::{ReportAiError, Result};
use crate::workbook::{ensure_xlsx, load_working_sheet};
use daily_report_common::export::excel_core::generate_sheet_buffer;
use daily_report_common::{consolidate, normalize, RowGroup, Sheet, SheetLayout};
use std::path::{Path, PathBuf};

/// 前処理結果
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// 変換後（未整形）の .xlsx。結果ファイルはこれを元に作る
    pub canonical_path: PathBuf,
    pub sheet: Sheet,
    /// 対象列（1始まり）
    pub target_column: u32,
    pub groups: Vec<RowGroup>,
    pub dissolved_merges: usize,
}

impl Preprocessed {
    /// データ開始行から最終行までの対象列の値
    pub fn issue_values(&self, layout: &SheetLayout) -> Vec<Option<&str>> {
        self.sheet.column_values(self.target_column, layout.data_start_row)
    }
}

/// パイプラインを実行
pub fn run(source: &Path, sheet_name: &str, column_name: &str, layout: &SheetLayout) -> Result<Preprocessed> {
    let canonical_path = ensure_xlsx(source)?;
    let mut sheet = load_working_sheet(&canonical_path, sheet_name)?;

    let dissolved_merges = normalize(&mut sheet, layout.data_start_row);
    log::debug!("結合セル {}件を解除", dissolved_merges);

    let groups = consolidate(&mut sheet, column_name, layout)?;
    let target_column = sheet
        .find_column(layout.header_row, column_name)
        .ok_or_else(|| daily_report_common::Error::ColumnNotFound(column_name.to_string()))?;
    log::info!(
        "前処理完了: {} ({}行, グループ {}件)",
        sheet.name(),
        sheet.max_row().saturating_sub(layout.data_start_row.saturating_sub(1)),
        groups.len()
    );

    Ok(Preprocessed {
        canonical_path,
        sheet,
        target_column,
        groups,
        dissolved_merges,
    })
}

/// 整形済みシートを `processed_<ファイル名>` として保存
pub fn save_processed(preprocessed: &Preprocessed) -> Result<PathBuf> {
    let buffer = generate_sheet_buffer(&preprocessed.sheet).map_err(ReportAiError::ExcelWrite)?;

    let file_name = preprocessed
        .canonical_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet.xlsx".to_string());
    let output = preprocessed
        .canonical_path
        .with_file_name(format!("processed_{}", file_name));

    std::fs::write(&output, buffer)?;
    Ok(output)
}
