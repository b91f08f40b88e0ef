//! 結果ファイルの取得

use crate::error::{ReportAiError, Result};
use crate::store::{HistoryEntry, HistoryStore, RunStatus};
use std::path::PathBuf;

/// 完了済み実行の結果ファイルのパス
pub fn result_path(store: &dyn HistoryStore, id: u64) -> Result<(HistoryEntry, PathBuf)> {
    let entry = store.get(id)?.ok_or(ReportAiError::HistoryNotFound(id))?;

    if entry.status != RunStatus::Completed {
        return Err(ReportAiError::ResultUnavailable(format!(
            "#{} はまだ完了していません ({})",
            id, entry.status
        )));
    }
    let path = match &entry.result_path {
        Some(p) => PathBuf::from(p),
        None => {
            return Err(ReportAiError::ResultUnavailable(format!(
                "#{} に結果ファイルがありません",
                id
            )))
        }
    };
    if !path.is_file() {
        return Err(ReportAiError::ResultUnavailable(format!(
            "結果ファイルが見つかりません: {}",
            path.display()
        )));
    }

    Ok((entry, path))
}

/// 完了済み実行の結果ファイルの中身
pub fn fetch_result(store: &dyn HistoryStore, id: u64) -> Result<Vec<u8>> {
    let (_, path) = result_path(store, id)?;
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryHistoryStore, NewRun};
    use std::path::Path;
    use tempfile::tempdir;

    fn new_run(store: &MemoryHistoryStore) -> HistoryEntry {
        store
            .create(NewRun::new(Path::new("/up/a.xlsx"), "일보_Worst55", "Issue"))
            .unwrap()
    }

    #[test]
    fn test_unknown_id() {
        let store = MemoryHistoryStore::new();
        let err = fetch_result(&store, 42).unwrap_err();
        assert!(matches!(err, ReportAiError::HistoryNotFound(42)));
    }

    #[test]
    fn test_processing_run_unavailable() {
        let store = MemoryHistoryStore::new();
        let entry = new_run(&store);

        let err = fetch_result(&store, entry.id).unwrap_err();
        assert!(matches!(err, ReportAiError::ResultUnavailable(_)));
    }

    #[test]
    fn test_failed_run_unavailable() {
        let store = MemoryHistoryStore::new();
        let mut entry = new_run(&store);
        entry.mark_failed("boom");
        store.update(&entry).unwrap();

        let err = fetch_result(&store, entry.id).unwrap_err();
        assert!(matches!(err, ReportAiError::ResultUnavailable(_)));
    }

    #[test]
    fn test_missing_file_unavailable() {
        let dir = tempdir().unwrap();
        let store = MemoryHistoryStore::new();
        let mut entry = new_run(&store);
        entry.mark_completed(&dir.path().join("gone.xlsx"), 1, 1, 0);
        store.update(&entry).unwrap();

        let err = fetch_result(&store, entry.id).unwrap_err();
        assert!(matches!(err, ReportAiError::ResultUnavailable(_)));
    }

    #[test]
    fn test_completed_run_bytes() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("classified_a.xlsx");
        std::fs::write(&output, b"result-bytes").unwrap();

        let store = MemoryHistoryStore::new();
        let mut entry = new_run(&store);
        entry.mark_completed(&output, 2, 2, 0);
        store.update(&entry).unwrap();

        assert_eq!(fetch_result(&store, entry.id).unwrap(), b"result-bytes");
    }
}
