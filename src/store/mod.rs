//! 永続化（実行履歴・ユーザー設定）

pub mod history;
pub mod settings;

pub use history::{HistoryEntry, HistoryStore, JsonHistoryStore, MemoryHistoryStore, NewRun, RunStatus};
pub use settings::{SettingsStore, UserConfig};

use crate::error::{ReportAiError, Result};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| ReportAiError::Store("ロックの取得に失敗しました".into()))
}
