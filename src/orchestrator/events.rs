//! 実行イベント・集計

use crate::store::RunStatus;
use daily_report_common::ClassificationRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 完了時のサマリー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub history_id: u64,
    pub filename: String,
    pub status: RunStatus,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub failed_rows: usize,
    pub result_path: PathBuf,
    pub message: String,
}

impl RunSummary {
    pub fn completion_message(processed: usize, failed: usize) -> String {
        format!("분류가 완료되었습니다. (성공: {}, 실패: {})", processed, failed)
    }
}

/// 進捗イベント（`type` フィールドで種別を表す）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RunEvent {
    Start { total: usize },
    Progress { current: usize, total: usize },
    Complete(RunSummary),
    Error { message: String },
}

/// 1行分の処理結果
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// 空セル（分類器は呼ばない）
    Skipped,
    Classified(ClassificationRecord),
    /// 再試行をすべて使い切った
    Failed,
}

/// 行ごとの結果の集計
#[derive(Debug, Default)]
pub struct Tally {
    pub records: Vec<ClassificationRecord>,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            records: Vec::with_capacity(rows),
            ..Default::default()
        }
    }

    pub fn push(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Skipped => {
                self.skipped += 1;
                self.records.push(ClassificationRecord::empty());
            }
            RowOutcome::Classified(record) => {
                self.processed += 1;
                self.records.push(record);
            }
            RowOutcome::Failed => {
                self.failed += 1;
                self.records.push(ClassificationRecord::empty());
            }
        }
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let start = serde_json::to_value(RunEvent::Start { total: 3 }).unwrap();
        assert_eq!(start, serde_json::json!({"type": "start", "total": 3}));

        let progress = serde_json::to_value(RunEvent::Progress { current: 1, total: 3 }).unwrap();
        assert_eq!(progress, serde_json::json!({"type": "progress", "current": 1, "total": 3}));

        let error = serde_json::to_value(RunEvent::Error { message: "x".into() }).unwrap();
        assert_eq!(error, serde_json::json!({"type": "error", "message": "x"}));
    }

    #[test]
    fn test_complete_event_is_flat() {
        let summary = RunSummary {
            history_id: 7,
            filename: "a.xlsx".into(),
            status: RunStatus::Completed,
            total_rows: 3,
            processed_rows: 2,
            failed_rows: 0,
            result_path: PathBuf::from("/results/out.xlsx"),
            message: RunSummary::completion_message(2, 0),
        };

        let value = serde_json::to_value(RunEvent::Complete(summary.clone())).unwrap();

        assert_eq!(value["type"], "complete");
        assert_eq!(value["history_id"], 7);
        assert_eq!(value["status"], "completed");
        assert_eq!(value["message"], "분류가 완료되었습니다. (성공: 2, 실패: 0)");

        let back: RunEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, RunEvent::Complete(summary));
    }

    #[test]
    fn test_tally_counts() {
        let mut tally = Tally::with_capacity(3);
        tally.push(RowOutcome::Skipped);
        tally.push(RowOutcome::Classified(ClassificationRecord::new("a", "b", "c")));
        tally.push(RowOutcome::Failed);

        assert_eq!(tally.total(), 3);
        assert_eq!(tally.processed + tally.failed + tally.skipped, tally.total());
        assert!(tally.records[0].is_empty());
        assert!(tally.records[2].is_empty());
    }
}
