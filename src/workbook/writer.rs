//! 分類結果の書き出し
//!
//! 元の .xlsx を開き直し、対象シートの最終列の右に
//! 불량명・설비명・조치내용 の3列を追加して別ファイルに保存する。
//! 元ファイルは変更しない。

use super::ooxml::{self, NewCell, RowCells};
use crate::config::AppConfig;
use crate::error::{ReportAiError, Result};
use chrono::{DateTime, Local};
use daily_report_common::{ClassificationRecord, SheetLayout, OUTPUT_HEADERS};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";

/// 結果ファイルの書き出し
pub trait ResultWriter: Send + Sync {
    /// `records[i]` をデータ開始行 + i 行目に書き込み、出力ファイルのパスを返す
    fn write(
        &self,
        original: &Path,
        records: &[ClassificationRecord],
        sheet_name: &str,
    ) -> Result<PathBuf>;
}

/// xlsxパッケージを直接書き換える ResultWriter
#[derive(Debug, Clone)]
pub struct XlsxResultWriter {
    results_dir: PathBuf,
    layout: SheetLayout,
}

impl XlsxResultWriter {
    pub fn new(results_dir: impl Into<PathBuf>, layout: SheetLayout) -> Self {
        Self {
            results_dir: results_dir.into(),
            layout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.results_dir(), config.layout)
    }

    /// `classified_<元ファイル名>_<YYYYmmdd_HHMMSS>.xlsx`
    pub fn result_file_name(original: &Path, now: DateTime<Local>) -> String {
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result".to_string());
        format!("classified_{}_{}.xlsx", stem, now.format("%Y%m%d_%H%M%S"))
    }
}

impl ResultWriter for XlsxResultWriter {
    fn write(
        &self,
        original: &Path,
        records: &[ClassificationRecord],
        sheet_name: &str,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.results_dir)?;
        let output = self
            .results_dir
            .join(Self::result_file_name(original, Local::now()));

        if let Err(e) = append_results(original, &output, records, sheet_name, &self.layout) {
            // 書きかけのファイルを残さない
            let _ = std::fs::remove_file(&output);
            return Err(e);
        }

        log::info!("結果ファイルを保存: {}", output.display());
        Ok(output)
    }
}

/// 元ファイルに分類列を追加して `output` に保存
pub fn append_results(
    original: &Path,
    output: &Path,
    records: &[ClassificationRecord],
    sheet_name: &str,
    layout: &SheetLayout,
) -> Result<()> {
    if !original.exists() {
        return Err(ReportAiError::FileNotFound(original.display().to_string()));
    }

    let mut archive = ZipArchive::new(File::open(original)?)?;

    let workbook_xml = ooxml::read_part(&mut archive, ooxml::WORKBOOK_PART)?;
    let rels_xml = ooxml::read_part(&mut archive, WORKBOOK_RELS_PART)?;
    let (resolved_name, sheet_part) =
        ooxml::resolve_sheet_part(&workbook_xml, &rels_xml, sheet_name)?;
    if resolved_name != sheet_name {
        log::warn!("シート '{}' が無いため '{}' に書き込みます", sheet_name, resolved_name);
    }

    let sheet_xml = ooxml::read_part(&mut archive, &sheet_part)?;
    let styles_xml = ooxml::read_part(&mut archive, STYLES_PART)?;

    let (patched_styles, styles) = ooxml::patch_styles(&styles_xml)?;
    let start_col = ooxml::scan_max_column(&sheet_xml)? + 1;

    let mut cells = RowCells::new();
    cells.insert(
        layout.header_row,
        OUTPUT_HEADERS
            .iter()
            .enumerate()
            .map(|(offset, header)| NewCell {
                col: start_col + offset as u32,
                text: header.to_string(),
                style: styles.header,
            })
            .collect(),
    );
    for (index, record) in records.iter().enumerate() {
        let row_cells = record
            .fields()
            .iter()
            .enumerate()
            .map(|(offset, value)| NewCell {
                col: start_col + offset as u32,
                text: value.to_string(),
                style: styles.data,
            })
            .collect();
        cells.insert(layout.data_row(index), row_cells);
    }

    let patched_sheet = ooxml::patch_sheet(&sheet_xml, &cells)?;

    let mut replaced = HashMap::new();
    replaced.insert(sheet_part, patched_sheet);
    replaced.insert(STYLES_PART.to_string(), patched_styles);

    ooxml::write_package(&mut archive, output, &replaced)?;

    log::debug!(
        "シート '{}' の {}列目から分類結果 {}行を追加",
        resolved_name,
        start_col,
        records.len()
    );
    Ok(())
}
