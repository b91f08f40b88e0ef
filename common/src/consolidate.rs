//! Issue列統合モジュール
//!
//! キー列（B列からIssue列の手前まで）の値が連続して一致する行を1グループとし、
//! グループ内のIssueテキストを改行で連結して先頭行に書き込み、
//! Issue列をグループの行範囲で結合し直す。

use crate::error::{Error, Result};
use crate::layout::SheetLayout;
use crate::sheet::{MergeRegion, Sheet};

/// キー列の値が一致する連続行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    pub first_row: u32,
    pub last_row: u32,
    /// 空でないIssue値（trim済み）を行順に改行で連結したもの
    pub text: String,
}

impl RowGroup {
    pub fn row_count(&self) -> u32 {
        self.last_row - self.first_row + 1
    }
}

type RowKey = Vec<Option<String>>;

/// Issue列を統合する
///
/// 見出し行で `target_column` が見つからなければ `ColumnNotFound` を返し、シートは変更しない。
/// 検出したグループを行順で返す。
pub fn consolidate(
    sheet: &mut Sheet,
    target_column: &str,
    layout: &SheetLayout,
) -> Result<Vec<RowGroup>> {
    let target_col = sheet
        .find_column(layout.header_row, target_column)
        .ok_or_else(|| Error::ColumnNotFound(target_column.to_string()))?;

    let groups = detect_row_groups(sheet, target_col, layout);

    for group in &groups {
        let value = (!group.text.is_empty()).then(|| group.text.clone());
        sheet.set(group.first_row, target_col, value);
        sheet.mark_wrapped(group.first_row, target_col);

        if group.last_row > group.first_row {
            sheet.merge(MergeRegion::column_span(
                target_col,
                group.first_row,
                group.last_row,
            ))?;
        }
    }

    Ok(groups)
}

/// 行グループを検出する（シートは変更しない）
///
/// データ開始行から最終行までを走査し、末尾に番兵を置いて最後のグループを確定させる。
pub fn detect_row_groups(sheet: &Sheet, target_col: u32, layout: &SheetLayout) -> Vec<RowGroup> {
    let key_cols: Vec<u32> = (layout.first_data_column..target_col).collect();
    let row_key = |row: u32| -> RowKey {
        key_cols.iter().map(|&col| sheet.canonical(row, col)).collect()
    };

    let mut groups = Vec::new();
    let mut current_key: Option<RowKey> = None;
    let mut current_rows: Vec<u32> = Vec::new();

    let rows = (layout.data_start_row..=sheet.max_row())
        .map(Some)
        .chain(std::iter::once(None));

    for row in rows {
        let key = row.map(row_key);

        match (row, &key, &current_key) {
            (Some(r), Some(k), Some(current)) if k == current => {
                current_rows.push(r);
            }
            _ => {
                if let Some(group) = finalize_group(sheet, &current_rows, target_col) {
                    groups.push(group);
                }
                current_key = key;
                current_rows.clear();
                current_rows.extend(row);
            }
        }
    }

    groups
}

fn finalize_group(sheet: &Sheet, rows: &[u32], target_col: u32) -> Option<RowGroup> {
    let (&first_row, &last_row) = (rows.first()?, rows.last()?);

    let text = rows
        .iter()
        .filter_map(|&row| sheet.get(row, target_col))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Some(RowGroup {
        first_row,
        last_row,
        text,
    })
}
