//! 古いファイルの削除
//!
//! アップロード・結果ディレクトリ直下で、最終更新から `days` 日を過ぎたファイルを消す。
//! 削除に失敗しても処理は止めず、件数として報告する。

use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 削除結果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// 対象になったファイル（ドライラン時は削除されない）
    pub candidates: Vec<PathBuf>,
    pub deleted: usize,
    pub failed: usize,
}

impl CleanupReport {
    fn merge(&mut self, other: CleanupReport) {
        self.candidates.extend(other.candidates);
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

/// 複数ディレクトリをまとめて掃除
pub fn cleanup_dirs(dirs: &[PathBuf], days: u64, dry_run: bool) -> CleanupReport {
    let cutoff = cutoff_before(Utc::now(), days);
    let mut report = CleanupReport::default();
    for dir in dirs {
        report.merge(cleanup_dir(dir, cutoff, dry_run));
    }
    report
}

/// `now` の `days` 日前。表せないほど大きい日数は最小日時（何も消さない）
pub fn cutoff_before(now: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    i64::try_from(days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `cutoff` より前に更新されたファイルを削除
pub fn cleanup_dir(dir: &Path, cutoff: DateTime<Utc>, dry_run: bool) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in find_old_files(dir, cutoff) {
        if dry_run {
            log::info!("[dry-run] 削除対象: {}", path.display());
        } else {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("削除: {}", path.display());
                    report.deleted += 1;
                }
                Err(e) => {
                    log::error!("削除に失敗: {} ({})", path.display(), e);
                    report.failed += 1;
                }
            }
        }
        report.candidates.push(path);
    }

    report
}

/// 直下のファイルのうち更新日時が `cutoff` より前のもの
pub fn find_old_files(dir: &Path, cutoff: DateTime<Utc>) -> Vec<PathBuf> {
    if !dir.exists() {
        log::warn!("ディレクトリが存在しません: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|modified| DateTime::<Utc>::from(modified) < cutoff)
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    files.sort();
    files
}
