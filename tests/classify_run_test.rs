//! 分類実行テスト
//!
//! 前処理 → 行ごとの分類 → 結果書き出し → 履歴更新 の一連の流れを、
//! 応答を固定したバックエンドで検証

use calamine::{open_workbook, Data, Reader, Xlsx};
use daily_report_ai::classifier::{ChatBackend, RowClassifier};
use daily_report_ai::config::AppConfig;
use daily_report_ai::error::{ReportAiError, Result};
use daily_report_ai::orchestrator::{Orchestrator, RunEvent, RunRequest};
use daily_report_ai::results;
use daily_report_ai::store::{HistoryEntry, HistoryStore, MemoryHistoryStore, NewRun, RunStatus};
use daily_report_ai::workbook::{ResultWriter, XlsxResultWriter};
use daily_report_common::{ClassificationRecord, DEFAULT_PROMPT};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;

const SHEET: &str = "일보_Worst55";

/// 事前に決めた応答を順に返すバックエンド
struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChatBackend for ScriptedBackend {
    async fn complete_json(&self, _system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(user.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReportAiError::ApiCall("no more responses".into())))
    }
}

/// 呼ばれた回数を数える共有バックエンド
struct SharedBackend<'a>(&'a ScriptedBackend);

impl ChatBackend for SharedBackend<'_> {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        self.0.complete_json(system, user).await
    }
}

/// 常に失敗する ResultWriter
struct FailingWriter;

impl ResultWriter for FailingWriter {
    fn write(&self, _original: &Path, _records: &[ClassificationRecord], _sheet_name: &str) -> Result<PathBuf> {
        Err(ReportAiError::ExcelWrite("disk full".into()))
    }
}

/// 書き込み内容を記録するだけの ResultWriter
#[derive(Default)]
struct RecordingWriter {
    written: Mutex<Vec<ClassificationRecord>>,
    output: PathBuf,
}

impl ResultWriter for RecordingWriter {
    fn write(&self, _original: &Path, records: &[ClassificationRecord], _sheet_name: &str) -> Result<PathBuf> {
        *self.written.lock().unwrap() = records.to_vec();
        Ok(self.output.clone())
    }
}

/// 完了への更新だけを拒否する履歴ストア
#[derive(Default)]
struct RejectCompletionStore {
    inner: MemoryHistoryStore,
}

impl HistoryStore for RejectCompletionStore {
    fn create(&self, run: NewRun) -> Result<HistoryEntry> {
        self.inner.create(run)
    }

    fn update(&self, entry: &HistoryEntry) -> Result<()> {
        if entry.status == RunStatus::Completed {
            return Err(ReportAiError::Store("read-only".into()));
        }
        self.inner.update(entry)
    }

    fn get(&self, id: u64) -> Result<Option<HistoryEntry>> {
        self.inner.get(id)
    }

    fn list_recent(&self, skip: usize, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.inner.list_recent(skip, limit)
    }
}

fn valid(defect: &str) -> Result<String> {
    Ok(format!(
        r#"{{"불량명": "{}", "설비명": "LINE-A", "조치내용": "재작업"}}"#,
        defect
    ))
}

/// 3行目が見出し、4行目からデータの日報を作る
fn write_report(dir: &TempDir, issues: &[&str]) -> PathBuf {
    let path = dir.path().join("report.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET).unwrap();
    sheet.write_string(0, 0, "일보").unwrap();
    sheet.write_string(2, 1, "Line").unwrap();
    sheet.write_string(2, 2, "Issue").unwrap();
    for (i, issue) in issues.iter().enumerate() {
        let row = 3 + i as u32;
        sheet.write_string(row, 1, format!("K{}", i + 1)).unwrap();
        if !issue.is_empty() {
            sheet.write_string(row, 2, *issue).unwrap();
        }
    }
    workbook.save(&path).unwrap();
    path
}

fn request(source: PathBuf) -> RunRequest {
    RunRequest {
        source,
        sheet_name: SHEET.to_string(),
        column_name: "Issue".to_string(),
        prompt: DEFAULT_PROMPT.to_string(),
        few_shot_examples: None,
    }
}

/// 空のIssue行は分類器を呼ばず、空レコードになる
#[tokio::test]
async fn test_empty_rows_are_skipped() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["기포", "", "스크래치"]);
    let config = AppConfig::for_data_dir(dir.path());

    let backend = ScriptedBackend::new(vec![valid("기포"), valid("스크래치")]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();
    let writer = RecordingWriter {
        output: dir.path().join("out.xlsx"),
        ..Default::default()
    };

    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source))
        .await
        .unwrap();

    assert_eq!(backend.call_count(), 2);
    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.processed_rows, 2);
    assert_eq!(summary.failed_rows, 0);

    let written = writer.written.lock().unwrap().clone();
    assert_eq!(written.len(), 3);
    assert_eq!(written[0].defect_name, "기포");
    assert!(written[1].is_empty());
    assert_eq!(written[2].defect_name, "스크래치");
}

/// 不正な応答が続いても3回目で成功すれば成功扱い
#[tokio::test]
async fn test_retry_then_success() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["기포"]);
    let config = AppConfig::for_data_dir(dir.path());

    let backend = ScriptedBackend::new(vec![
        Ok("これはJSONではない".into()),
        Ok(r#"{"불량명": "기포"}"#.into()),
        valid("기포"),
    ]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();
    let writer = RecordingWriter {
        output: dir.path().join("out.xlsx"),
        ..Default::default()
    };

    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source))
        .await
        .unwrap();

    assert_eq!(backend.call_count(), 3);
    assert_eq!(summary.processed_rows, 1);
    assert_eq!(summary.failed_rows, 0);
}

/// 再試行を使い切った行は失敗として数え、実行自体は完了する
#[tokio::test]
async fn test_retry_exhaustion_counts_failure() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["기포", "찍힘"]);
    let config = AppConfig::for_data_dir(dir.path());

    let backend = ScriptedBackend::new(vec![
        Err(ReportAiError::ApiCall("timeout".into())),
        Ok("[]".into()),
        Ok("{}".into()),
        valid("찍힘"),
    ]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();
    let writer = RecordingWriter {
        output: dir.path().join("out.xlsx"),
        ..Default::default()
    };

    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source))
        .await
        .unwrap();

    assert_eq!(backend.call_count(), 4);
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.processed_rows, 1);
    assert_eq!(summary.failed_rows, 1);
    assert_eq!(summary.message, "분류가 완료되었습니다. (성공: 1, 실패: 1)");

    let written = writer.written.lock().unwrap().clone();
    assert!(written[0].is_empty());
    assert_eq!(written[1].defect_name, "찍힘");
}

/// 結果ファイルの書き出しに失敗したら履歴は failed になり、結果パスは残らない
#[tokio::test]
async fn test_write_failure_marks_run_failed() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["기포"]);
    let config = AppConfig::for_data_dir(dir.path());

    let backend = ScriptedBackend::new(vec![valid("기포")]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = Orchestrator::new(&classifier, &history, &FailingWriter, &config)
        .run_streaming(request(source), tx)
        .await;

    assert!(matches!(result, Err(ReportAiError::ExcelWrite(_))));

    let entries = history.list_recent(0, 10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, RunStatus::Failed);
    assert!(entries[0].result_path.is_none());
    assert!(entries[0].error_message.as_deref().unwrap().contains("disk full"));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 3, "{:?}", events);
    assert_eq!(events[0], RunEvent::Start { total: 1 });
    assert_eq!(events[1], RunEvent::Progress { current: 1, total: 1 });
    assert!(matches!(&events[2], RunEvent::Error { message } if message.contains("disk full")));
    assert!(!events.iter().any(|e| matches!(e, RunEvent::Complete(_))));

    let err = results::fetch_result(&history, entries[0].id).unwrap_err();
    assert!(matches!(err, ReportAiError::ResultUnavailable(_)));
}

/// 存在しないファイルは履歴を作らずにエラーイベントを返す
#[tokio::test]
async fn test_missing_source_creates_no_history() {
    let dir = tempdir().unwrap();
    let config = AppConfig::for_data_dir(dir.path());

    let classifier: RowClassifier<ScriptedBackend> = RowClassifier::offline(Duration::ZERO);
    let history = MemoryHistoryStore::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = Orchestrator::new(&classifier, &history, &FailingWriter, &config)
        .run_streaming(request(dir.path().join("none.xlsx")), tx)
        .await;

    assert!(matches!(result, Err(ReportAiError::FileNotFound(_))));
    assert!(history.list_recent(0, 10).unwrap().is_empty());
    assert!(matches!(rx.try_recv(), Ok(RunEvent::Error { .. })));
    assert!(rx.try_recv().is_err());
}

/// イベントは start → progress(1..=N) → complete の順
#[tokio::test]
async fn test_streaming_event_order() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["기포", "", "찍힘"]);
    let config = AppConfig::for_data_dir(dir.path());

    let backend = ScriptedBackend::new(vec![valid("기포"), valid("찍힘")]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();
    let writer = RecordingWriter {
        output: dir.path().join("out.xlsx"),
        ..Default::default()
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run_streaming(request(source), tx)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            RunEvent::Start { total: 3 },
            RunEvent::Progress { current: 1, total: 3 },
            RunEvent::Progress { current: 2, total: 3 },
            RunEvent::Progress { current: 3, total: 3 },
            RunEvent::Complete(summary),
        ]
    );
}

/// 成功 + 失敗 + 空行 = 全行
#[tokio::test]
async fn test_counter_invariant() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["a", "", "b", "c", ""]);
    let config = AppConfig {
        max_retries: 1,
        ..AppConfig::for_data_dir(dir.path())
    };

    let backend = ScriptedBackend::new(vec![valid("a"), Ok("nope".into()), valid("c")]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();
    let writer = RecordingWriter {
        output: dir.path().join("out.xlsx"),
        ..Default::default()
    };

    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source))
        .await
        .unwrap();

    let written = writer.written.lock().unwrap().clone();
    let skipped = 2;
    assert_eq!(summary.total_rows, 5);
    assert_eq!(written.len(), summary.total_rows);
    assert_eq!(summary.processed_rows, 2);
    assert_eq!(summary.failed_rows, 1);
    assert_eq!(summary.processed_rows + summary.failed_rows + skipped, summary.total_rows);

    let entry = history.get(summary.history_id).unwrap().unwrap();
    assert_eq!(entry.total_rows, 5);
    assert_eq!(entry.processed_rows, 2);
    assert_eq!(entry.failed_rows, 1);
}

/// 実際のxlsx書き出しまで通し、結果ファイルを取得できる
#[tokio::test]
async fn test_end_to_end_with_xlsx_writer() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["기포 발생", "", "스크래치"]);
    let config = AppConfig::for_data_dir(dir.path());
    config.ensure_dirs().unwrap();

    let backend = ScriptedBackend::new(vec![valid("기포"), valid("스크래치")]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();
    let writer = XlsxResultWriter::from_config(&config);

    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source.clone()))
        .await
        .unwrap();

    assert!(summary.result_path.starts_with(config.results_dir()));
    let file_name = summary.result_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("classified_report_"));

    let mut workbook: Xlsx<_> = open_workbook(&summary.result_path).unwrap();
    let range = workbook.worksheet_range(SHEET).unwrap();
    assert_eq!(range.get_value((2, 2)), Some(&Data::String("Issue".into())));
    assert_eq!(range.get_value((2, 3)), Some(&Data::String("불량명".into())));
    assert_eq!(range.get_value((2, 4)), Some(&Data::String("설비명".into())));
    assert_eq!(range.get_value((2, 5)), Some(&Data::String("조치내용".into())));
    assert_eq!(range.get_value((3, 3)), Some(&Data::String("기포".into())));
    assert_eq!(range.get_value((3, 4)), Some(&Data::String("LINE-A".into())));
    assert_eq!(range.get_value((5, 3)), Some(&Data::String("스크래치".into())));
    assert!(matches!(range.get_value((4, 3)), None | Some(Data::Empty)));

    let entry = history.get(summary.history_id).unwrap().unwrap();
    assert_eq!(entry.status, RunStatus::Completed);
    assert_eq!(entry.filename, "report.xlsx");

    let bytes = results::fetch_result(&history, summary.history_id).unwrap();
    assert_eq!(bytes, std::fs::read(&summary.result_path).unwrap());
}

/// オフライン分類器でも最後まで実行できる
#[tokio::test]
async fn test_offline_run() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["a", "b"]);
    let config = AppConfig::for_data_dir(dir.path());

    let classifier: RowClassifier<ScriptedBackend> = RowClassifier::offline(Duration::from_millis(1));
    let history = MemoryHistoryStore::new();
    let writer = RecordingWriter {
        output: dir.path().join("out.xlsx"),
        ..Default::default()
    };

    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source))
        .await
        .unwrap();

    assert_eq!(summary.processed_rows, 2);
    assert!(writer.written.lock().unwrap().iter().all(|r| !r.is_empty()));
}

/// 履歴の完了更新に失敗したら、書き出した結果ファイルも残さない
#[tokio::test]
async fn test_history_failure_removes_result_file() {
    let dir = tempdir().unwrap();
    let source = write_report(&dir, &["기포"]);
    let config = AppConfig::for_data_dir(dir.path());
    config.ensure_dirs().unwrap();

    let backend = ScriptedBackend::new(vec![valid("기포")]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = RejectCompletionStore::default();
    let writer = XlsxResultWriter::from_config(&config);

    let result = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source))
        .await;

    assert!(matches!(result, Err(ReportAiError::Store(_))));

    let entries = history.list_recent(0, 10).unwrap();
    assert_eq!(entries[0].status, RunStatus::Failed);
    assert!(entries[0].result_path.is_none());

    let leftovers: Vec<_> = std::fs::read_dir(config.results_dir()).unwrap().collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

/// 結合されたキーで複数行にまたがるIssueは先頭行でまとめて分類し、続く行は空のまま
#[tokio::test]
async fn test_multi_row_group_end_to_end() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("report.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET).unwrap();
    sheet.write_string(2, 1, "Line").unwrap();
    sheet.write_string(2, 2, "Issue").unwrap();
    sheet
        .merge_range(3, 1, 4, 1, "K1", &rust_xlsxwriter::Format::new())
        .unwrap();
    sheet.write_string(3, 2, "기포").unwrap();
    sheet.write_string(4, 2, "온도 이상").unwrap();
    sheet.write_string(5, 1, "K2").unwrap();
    sheet.write_string(5, 2, "스크래치").unwrap();
    workbook.save(&source).unwrap();

    let config = AppConfig::for_data_dir(dir.path());
    config.ensure_dirs().unwrap();

    let backend = ScriptedBackend::new(vec![valid("기포"), valid("스크래치")]);
    let classifier = RowClassifier::new(SharedBackend(&backend));
    let history = MemoryHistoryStore::new();
    let writer = XlsxResultWriter::from_config(&config);

    let summary = Orchestrator::new(&classifier, &history, &writer, &config)
        .run(request(source))
        .await
        .unwrap();

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].ends_with("Issue 내용: 기포\n온도 이상"));
    assert!(calls[1].ends_with("Issue 내용: 스크래치"));

    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.processed_rows, 2);
    assert_eq!(summary.failed_rows, 0);

    // データ開始行(4行目) + i に書き込まれる
    let mut workbook: Xlsx<_> = open_workbook(&summary.result_path).unwrap();
    let range = workbook.worksheet_range(SHEET).unwrap();
    assert_eq!(range.get_value((3, 3)), Some(&Data::String("기포".into())));
    assert!(matches!(range.get_value((4, 3)), None | Some(Data::Empty)));
    assert_eq!(range.get_value((5, 3)), Some(&Data::String("스크래치".into())));
}
