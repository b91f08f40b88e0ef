//! 分類オーケストレーター
//!
//! 履歴作成 → 前処理 → 行ごとの分類 → 結果ファイル書き出し → 履歴更新。
//! 一括実行（`run`）とイベント通知付き実行（`run_streaming`）は同じ処理を共有する。

pub mod events;

pub use events::{RowOutcome, RunEvent, RunSummary, Tally};

use crate::classifier::{ChatBackend, RowClassifier};
use crate::config::AppConfig;
use crate::error::{ReportAiError, Result};
use crate::pipeline;
use crate::store::{HistoryEntry, HistoryStore, NewRun};
use crate::workbook::{ContainerFormat, ResultWriter};
use daily_report_common::is_empty_value;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// 実行リクエスト
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: PathBuf,
    pub sheet_name: String,
    pub column_name: String,
    pub prompt: String,
    pub few_shot_examples: Option<String>,
}

pub struct Orchestrator<'a, B> {
    classifier: &'a RowClassifier<B>,
    history: &'a dyn HistoryStore,
    writer: &'a dyn ResultWriter,
    config: &'a AppConfig,
}

impl<'a, B: ChatBackend> Orchestrator<'a, B> {
    pub fn new(
        classifier: &'a RowClassifier<B>,
        history: &'a dyn HistoryStore,
        writer: &'a dyn ResultWriter,
        config: &'a AppConfig,
    ) -> Self {
        Self {
            classifier,
            history,
            writer,
            config,
        }
    }

    /// 一括実行
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary> {
        self.execute(&request, &mut |_: RunEvent| {}).await
    }

    /// 進捗イベントを送りながら実行
    ///
    /// 受信側が閉じていても処理は最後まで続ける。
    pub async fn run_streaming(
        &self,
        request: RunRequest,
        tx: UnboundedSender<RunEvent>,
    ) -> Result<RunSummary> {
        self.execute(&request, &mut |event: RunEvent| {
            let _ = tx.send(event);
        })
        .await
    }

    async fn execute(
        &self,
        request: &RunRequest,
        emit: &mut (dyn FnMut(RunEvent) + Send),
    ) -> Result<RunSummary> {
        if let Err(e) = validate_input(request) {
            emit(RunEvent::Error { message: e.to_string() });
            return Err(e);
        }

        let entry = match self.history.create(NewRun::new(
            &request.source,
            &request.sheet_name,
            &request.column_name,
        )) {
            Ok(entry) => entry,
            Err(e) => {
                emit(RunEvent::Error { message: e.to_string() });
                return Err(e);
            }
        };
        log::info!("分類開始: #{} {}", entry.id, entry.filename);

        let result = match self.process(request, emit).await {
            Ok((tally, result_path)) => {
                let completed = self.complete(entry.clone(), &tally, result_path.clone());
                if completed.is_err() {
                    // 履歴に残らない結果ファイルは公開しない
                    discard_output(&result_path);
                }
                completed
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(summary) => {
                log::info!("#{} {}", summary.history_id, summary.message);
                emit(RunEvent::Complete(summary.clone()));
                Ok(summary)
            }
            Err(e) => {
                let mut failed = entry;
                failed.mark_failed(e.to_string());
                if let Err(store_err) = self.history.update(&failed) {
                    log::error!("履歴の更新に失敗 (#{}): {}", failed.id, store_err);
                }
                log::error!("分類中にエラーが発生 (#{}): {}", failed.id, e);
                emit(RunEvent::Error { message: e.to_string() });
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        request: &RunRequest,
        emit: &mut (dyn FnMut(RunEvent) + Send),
    ) -> Result<(Tally, PathBuf)> {
        let layout = &self.config.layout;
        let preprocessed = pipeline::run(
            &request.source,
            &request.sheet_name,
            &request.column_name,
            layout,
        )?;

        let values: Vec<Option<String>> = preprocessed
            .issue_values(layout)
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        let total = values.len();
        emit(RunEvent::Start { total });

        let mut tally = Tally::with_capacity(total);
        for (index, value) in values.iter().enumerate() {
            let outcome = self.classify_row(value.as_deref(), request).await;
            match &outcome {
                RowOutcome::Skipped => log::debug!("{}行目: 空のためスキップ", layout.data_row(index)),
                RowOutcome::Classified(record) => {
                    log::info!("{}行目: {}", layout.data_row(index), record.defect_name)
                }
                RowOutcome::Failed => log::warn!("{}行目: 分類失敗", layout.data_row(index)),
            }
            tally.push(outcome);

            emit(RunEvent::Progress {
                current: index + 1,
                total,
            });
            tokio::task::yield_now().await;
        }

        let result_path = self.writer.write(
            &preprocessed.canonical_path,
            &tally.records,
            preprocessed.sheet.name(),
        )?;

        Ok((tally, result_path))
    }

    /// 1行分の処理（空セルは分類器を呼ばない）
    async fn classify_row(&self, value: Option<&str>, request: &RunRequest) -> RowOutcome {
        let text = match value {
            Some(v) if !is_empty_value(Some(v)) => v,
            _ => return RowOutcome::Skipped,
        };

        match self
            .classifier
            .classify(
                text,
                &request.prompt,
                request.few_shot_examples.as_deref(),
                self.config.max_retries,
            )
            .await
        {
            Some(record) => RowOutcome::Classified(record),
            None => RowOutcome::Failed,
        }
    }

    fn complete(&self, mut entry: HistoryEntry, tally: &Tally, result_path: PathBuf) -> Result<RunSummary> {
        entry.mark_completed(&result_path, tally.total(), tally.processed, tally.failed);
        self.history.update(&entry)?;

        Ok(RunSummary {
            history_id: entry.id,
            filename: entry.filename,
            status: entry.status,
            total_rows: tally.total(),
            processed_rows: tally.processed,
            failed_rows: tally.failed,
            result_path,
            message: RunSummary::completion_message(tally.processed, tally.failed),
        })
    }
}

fn discard_output(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::error!("結果ファイルの削除に失敗: {} ({})", path.display(), e);
    }
}

/// 実行前の入力チェック（履歴は作らない）
fn validate_input(request: &RunRequest) -> Result<()> {
    if !request.source.exists() {
        return Err(ReportAiError::FileNotFound(request.source.display().to_string()));
    }
    ContainerFormat::from_path(&request.source)?;
    Ok(())
}
