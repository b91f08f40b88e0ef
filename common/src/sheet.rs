//! 作業用シートモデル
//!
//! 結合セル解除・Issue統合の対象となるインメモリのシート。
//! 元ファイルの書式は保持しない（書式付きの出力は元ファイルを開き直して行う）。
//! 行・列はすべて1始まり。

use crate::error::{Error, Result};
use crate::types::is_empty_value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 結合セル範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRegion {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl MergeRegion {
    pub fn new(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    /// 1列の縦方向結合
    pub fn column_span(col: u32, first_row: u32, last_row: u32) -> Self {
        Self::new(first_row, col, last_row, col)
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn overlaps(&self, other: &MergeRegion) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    /// 範囲内の全セル座標（行優先）
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |row| (self.first_col..=self.last_col).map(move |col| (row, col)))
    }

    /// A1形式の範囲表記（例: "B4:B6"）
    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letters(self.first_col),
            self.first_row,
            column_letters(self.last_col),
            self.last_row
        )
    }
}

/// 列番号（1始まり）をA1形式の列記号に変換
pub fn column_letters(col: u32) -> String {
    let mut n = col;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// 作業用シート
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    /// cells[row - 1][col - 1]
    cells: Vec<Vec<Option<String>>>,
    columns: u32,
    merges: Vec<MergeRegion>,
    /// 折り返し・上下中央揃えを指定されたセル
    wrapped: BTreeSet<(u32, u32)>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 文字列の2次元配列から生成（空文字は空セル）
    pub fn from_text_rows(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let mut sheet = Self::new(name);
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.set_value(r as u32 + 1, c as u32 + 1, *value);
                }
            }
            sheet.ensure_size(r as u32 + 1, row.len() as u32);
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_row(&self) -> u32 {
        self.cells.len() as u32
    }

    pub fn max_column(&self) -> u32 {
        self.columns
    }

    /// 行数・列数を最低でも指定サイズまで広げる
    pub fn ensure_size(&mut self, rows: u32, columns: u32) {
        if columns > self.columns {
            self.columns = columns;
            for row in &mut self.cells {
                row.resize(columns as usize, None);
            }
        }
        while self.cells.len() < rows as usize {
            self.cells.push(vec![None; self.columns as usize]);
        }
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&str> {
        if row == 0 || col == 0 {
            return None;
        }
        self.cells
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
            .and_then(|v| v.as_deref())
    }

    pub fn set(&mut self, row: u32, col: u32, value: Option<String>) {
        if row == 0 || col == 0 {
            return;
        }
        self.ensure_size(row, col);
        self.cells[row as usize - 1][col as usize - 1] = value;
    }

    pub fn set_value(&mut self, row: u32, col: u32, value: impl Into<String>) {
        self.set(row, col, Some(value.into()));
    }

    pub fn clear(&mut self, row: u32, col: u32) {
        if self.get(row, col).is_some() {
            self.set(row, col, None);
        }
    }

    pub fn merge_regions(&self) -> &[MergeRegion] {
        &self.merges
    }

    pub fn merge_containing(&self, row: u32, col: u32) -> Option<&MergeRegion> {
        self.merges.iter().find(|m| m.contains(row, col))
    }

    /// 範囲を結合する
    ///
    /// 左上セルの値を残し、それ以外のセルは空にする。
    /// 既存の結合範囲と重なる場合はエラー。
    pub fn merge(&mut self, region: MergeRegion) -> Result<()> {
        if let Some(existing) = self.merges.iter().find(|m| m.overlaps(&region)) {
            return Err(Error::MergeOverlap(format!(
                "{} と {} が重複",
                region.to_a1(),
                existing.to_a1()
            )));
        }

        self.ensure_size(region.last_row, region.last_col);
        for (row, col) in region.cells() {
            if (row, col) != (region.first_row, region.first_col) {
                self.clear(row, col);
            }
        }
        self.merges.push(region);
        Ok(())
    }

    /// 結合を解除する（セル値は変更しない）
    pub fn unmerge(&mut self, region: &MergeRegion) -> bool {
        let before = self.merges.len();
        self.merges.retain(|m| m != region);
        self.merges.len() != before
    }

    pub fn mark_wrapped(&mut self, row: u32, col: u32) {
        self.wrapped.insert((row, col));
    }

    pub fn is_wrapped(&self, row: u32, col: u32) -> bool {
        self.wrapped.contains(&(row, col))
    }

    /// 値が入っているセルを行優先で列挙
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &str)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().filter_map(move |(c, value)| {
                value
                    .as_deref()
                    .map(|v| (r as u32 + 1, c as u32 + 1, v))
            })
        })
    }

    /// 見出し行から列名（前後空白を除いた完全一致）で列番号を探す
    pub fn find_column(&self, header_row: u32, name: &str) -> Option<u32> {
        let name = name.trim();
        (1..=self.columns).find(|&col| {
            self.get(header_row, col)
                .map(|v| v.trim() == name)
                .unwrap_or(false)
        })
    }

    /// 指定列の `from_row` から最終行までの値
    pub fn column_values(&self, col: u32, from_row: u32) -> Vec<Option<&str>> {
        (from_row.max(1)..=self.max_row())
            .map(|row| self.get(row, col))
            .collect()
    }

    /// キー比較用の正規化済みの値（空はNone、それ以外はtrim済み）
    pub fn canonical(&self, row: u32, col: u32) -> Option<String> {
        let value = self.get(row, col);
        if is_empty_value(value) {
            None
        } else {
            value.map(|v| v.trim().to_string())
        }
    }
}
