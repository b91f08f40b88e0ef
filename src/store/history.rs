//! 分類実行履歴
//!
//! 実行開始時に processing で作成し、オーケストレーターだけが
//! completed / failed に更新する。削除はしない。

use super::lock;
use crate::error::{ReportAiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 実行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        };
        f.pad(label)
    }
}

/// 履歴エントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub filename: String,
    pub file_path: String,
    pub sheet_name: String,
    pub column_name: String,
    pub status: RunStatus,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub failed_rows: usize,
    pub error_message: Option<String>,
    pub result_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn mark_completed(
        &mut self,
        result_path: &Path,
        total_rows: usize,
        processed_rows: usize,
        failed_rows: usize,
    ) {
        self.status = RunStatus::Completed;
        self.result_path = Some(result_path.display().to_string());
        self.total_rows = total_rows;
        self.processed_rows = processed_rows;
        self.failed_rows = failed_rows;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error_message = Some(message.into());
        self.result_path = None;
    }
}

/// 新規実行の登録内容
#[derive(Debug, Clone)]
pub struct NewRun {
    pub filename: String,
    pub file_path: String,
    pub sheet_name: String,
    pub column_name: String,
}

impl NewRun {
    pub fn new(source: &Path, sheet_name: &str, column_name: &str) -> Self {
        Self {
            filename: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: source.display().to_string(),
            sheet_name: sheet_name.to_string(),
            column_name: column_name.to_string(),
        }
    }
}

/// 履歴ストア
pub trait HistoryStore: Send + Sync {
    fn create(&self, run: NewRun) -> Result<HistoryEntry>;
    fn update(&self, entry: &HistoryEntry) -> Result<()>;
    fn get(&self, id: u64) -> Result<Option<HistoryEntry>>;
    /// 新しい順に `skip` 件飛ばして最大 `limit` 件
    fn list_recent(&self, skip: usize, limit: usize) -> Result<Vec<HistoryEntry>>;
}

/// 履歴の保存形式
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Ledger {
    version: u32,
    next_id: u64,
    entries: Vec<HistoryEntry>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            version: Ledger::CURRENT_VERSION,
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl Ledger {
    const CURRENT_VERSION: u32 = 1;

    fn create(&mut self, run: NewRun) -> HistoryEntry {
        let entry = HistoryEntry {
            id: self.next_id,
            filename: run.filename,
            file_path: run.file_path,
            sheet_name: run.sheet_name,
            column_name: run.column_name,
            status: RunStatus::Processing,
            total_rows: 0,
            processed_rows: 0,
            failed_rows: 0,
            error_message: None,
            result_path: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.next_id += 1;
        self.entries.push(entry.clone());
        entry
    }

    fn update(&mut self, entry: &HistoryEntry) -> Result<()> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or(ReportAiError::HistoryNotFound(entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    fn get(&self, id: u64) -> Option<HistoryEntry> {
        self.entries.iter().find(|e| e.id == id).cloned()
    }

    fn list_recent(&self, skip: usize, limit: usize) -> Vec<HistoryEntry> {
        let mut entries: Vec<&HistoryEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        entries.into_iter().skip(skip).take(limit).cloned().collect()
    }
}

/// メモリ上の履歴ストア（テスト・一時実行用）
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn create(&self, run: NewRun) -> Result<HistoryEntry> {
        Ok(lock(&self.ledger)?.create(run))
    }

    fn update(&self, entry: &HistoryEntry) -> Result<()> {
        lock(&self.ledger)?.update(entry)
    }

    fn get(&self, id: u64) -> Result<Option<HistoryEntry>> {
        Ok(lock(&self.ledger)?.get(id))
    }

    fn list_recent(&self, skip: usize, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(lock(&self.ledger)?.list_recent(skip, limit))
    }
}

/// JSONファイルの履歴ストア
///
/// 更新のたびにファイル全体を書き直す。プロセス内の排他のみで、
/// 複数プロセスからの同時書き込みは調停しない。
#[derive(Debug)]
pub struct JsonHistoryStore {
    path: PathBuf,
    ledger: Mutex<Ledger>,
}

impl JsonHistoryStore {
    /// 履歴ファイルを開く（無ければ空で開始）
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ledger = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let ledger: Ledger = serde_json::from_reader(reader)?;
            if ledger.version != Ledger::CURRENT_VERSION {
                return Err(ReportAiError::Store(format!(
                    "履歴ファイルのバージョンが不一致です: {} (期待値 {})",
                    ledger.version,
                    Ledger::CURRENT_VERSION
                )));
            }
            ledger
        } else {
            Ledger::default()
        };

        Ok(Self {
            path,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, ledger)?;
        Ok(())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn create(&self, run: NewRun) -> Result<HistoryEntry> {
        let mut ledger = lock(&self.ledger)?;
        let entry = ledger.create(run);
        self.save(&ledger)?;
        Ok(entry)
    }

    fn update(&self, entry: &HistoryEntry) -> Result<()> {
        let mut ledger = lock(&self.ledger)?;
        ledger.update(entry)?;
        self.save(&ledger)
    }

    fn get(&self, id: u64) -> Result<Option<HistoryEntry>> {
        Ok(lock(&self.ledger)?.get(id))
    }

    fn list_recent(&self, skip: usize, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(lock(&self.ledger)?.list_recent(skip, limit))
    }
}
