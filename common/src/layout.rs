//! レイアウト設定モジュール
//!
//! 日報シートの固定レイアウト（ヘッダー行・データ開始行・キー列開始位置）と
//! 出力列の見出しを定義する。行・列番号はすべて1始まり。

use serde::{Deserialize, Serialize};

/// 追加する分類列の見出し（この順で最終列の右に追加）
pub const OUTPUT_HEADERS: [&str; 3] = ["불량명", "설비명", "조치내용"];

/// シートレイアウト
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetLayout {
    /// 見出し行
    pub header_row: u32,
    /// データ開始行
    pub data_start_row: u32,
    /// キー列の先頭列（B列 = 2）
    pub first_data_column: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 3,
            data_start_row: 4,
            first_data_column: 2,
        }
    }
}

impl SheetLayout {
    /// 分類結果 `index` 番目に対応するデータ行
    pub fn data_row(&self, index: usize) -> u32 {
        self.data_start_row + index as u32
    }
}
