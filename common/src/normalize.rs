//! 結合セル解除モジュール
//!
//! データ開始行以降にかかる結合セルを解除し、
//! 解除した範囲の全セルへ左上セルの値を複製する。

use crate::sheet::{MergeRegion, Sheet};

/// 結合セルを解除して値を埋める
///
/// - 最終行が `start_row` より上の結合（装飾用の見出し）はそのまま残す
/// - 範囲内で `start_row` 以上のセルだけに左上の値を書き込む
/// - 結合されていない空セルは補完しない
///
/// 解除した結合の数を返す。結合が残っていないシートでは何もしない。
pub fn normalize(sheet: &mut Sheet, start_row: u32) -> usize {
    let targets: Vec<MergeRegion> = sheet
        .merge_regions()
        .iter()
        .filter(|region| region.last_row >= start_row)
        .copied()
        .collect();

    for region in &targets {
        let top_left = sheet
            .get(region.first_row, region.first_col)
            .map(str::to_string);

        sheet.unmerge(region);

        for (row, col) in region.cells() {
            if row >= start_row {
                sheet.set(row, col, top_left.clone());
            }
        }
    }

    targets.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_sheet() -> Sheet {
        let mut sheet = Sheet::from_text_rows(
            "일보_DPU",
            &[
                &["", "日報"],
                &[],
                &["", "Line", "Model", "Issue"],
                &["", "L1", "M1", "a"],
                &["", "", "", "b"],
                &["", "", "M2", "c"],
            ],
        );
        // タイトル（見出しより上）
        sheet.merge(MergeRegion::new(1, 2, 2, 4)).unwrap();
        // Line列 4-6行
        sheet.merge(MergeRegion::column_span(2, 4, 6)).unwrap();
        // Model列 4-5行
        sheet.merge(MergeRegion::column_span(3, 4, 5)).unwrap();
        sheet
    }

    #[test]
    fn test_fills_merged_cells_below_start_row() {
        let mut sheet = report_sheet();
        let dissolved = normalize(&mut sheet, 4);

        assert_eq!(dissolved, 2);
        assert_eq!(sheet.get(5, 2), Some("L1"));
        assert_eq!(sheet.get(6, 2), Some("L1"));
        assert_eq!(sheet.get(5, 3), Some("M1"));
        assert_eq!(sheet.get(6, 3), Some("M2"));
    }

    #[test]
    fn test_keeps_header_merges() {
        let mut sheet = report_sheet();
        normalize(&mut sheet, 4);

        assert_eq!(sheet.merge_regions(), &[MergeRegion::new(1, 2, 2, 4)]);
        assert_eq!(sheet.get(1, 2), Some("日報"));
    }

    #[test]
    fn test_region_straddling_start_row_fills_only_data_rows() {
        let mut sheet = Sheet::from_text_rows("s", &[&[], &["", "top"], &[], &[]]);
        sheet.merge(MergeRegion::column_span(2, 2, 5)).unwrap();

        normalize(&mut sheet, 4);

        assert!(sheet.merge_regions().is_empty());
        assert_eq!(sheet.get(2, 2), Some("top"));
        assert_eq!(sheet.get(3, 2), None);
        assert_eq!(sheet.get(4, 2), Some("top"));
        assert_eq!(sheet.get(5, 2), Some("top"));
    }

    #[test]
    fn test_blank_cells_are_not_filled() {
        let mut sheet = Sheet::from_text_rows("s", &[&[], &[], &[], &["", "K1"], &["", ""]]);
        normalize(&mut sheet, 4);
        assert_eq!(sheet.get(5, 2), None);
    }

    #[test]
    fn test_idempotent() {
        let mut sheet = report_sheet();
        normalize(&mut sheet, 4);
        let once = sheet.clone();

        let dissolved = normalize(&mut sheet, 4);

        assert_eq!(dissolved, 0);
        assert_eq!(sheet, once);
    }
}
