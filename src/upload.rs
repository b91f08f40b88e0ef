//! アップロード受け付け
//!
//! 拡張子をチェックし、タイムスタンプ付きのファイル名でアップロード先にコピーする。

use crate::error::{ReportAiError, Result};
use crate::workbook::ContainerFormat;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// 受け付けたファイル
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub original_name: String,
    pub stored_path: PathBuf,
    pub format: ContainerFormat,
    pub size: u64,
}

/// `source` をアップロード先へコピー
pub fn accept(source: &Path, upload_dir: &Path) -> Result<StoredUpload> {
    if !source.is_file() {
        return Err(ReportAiError::FileNotFound(source.display().to_string()));
    }
    let format = ContainerFormat::from_path(source)?;

    std::fs::create_dir_all(upload_dir)?;
    let stored_path = unique_path(source, upload_dir, Local::now());
    let size = std::fs::copy(source, &stored_path)?;
    log::info!("アップロード: {} -> {}", source.display(), stored_path.display());

    Ok(StoredUpload {
        original_name: source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        stored_path,
        format,
        size,
    })
}

/// `{stem}_{YYYYmmdd_HHMMSS}{.ext}`。同名があれば `_2`, `_3` ... を付ける
pub fn unique_path(source: &Path, dir: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let base = format!("{}_{}", stem, now.format("%Y%m%d_%H%M%S"));

    let mut candidate = dir.join(format!("{}{}", base, ext));
    let mut n = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}{}", base, n, ext));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 9, 7, 1).unwrap()
    }

    #[test]
    fn test_unique_path_format() {
        let dir = tempdir().unwrap();
        let path = unique_path(Path::new("/in/일보 3월.xlsb"), dir.path(), fixed_time());
        assert_eq!(path, dir.path().join("일보 3월_20240305_090701.xlsb"));
    }

    #[test]
    fn test_unique_path_collision() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a_20240305_090701.xlsx"), b"x").unwrap();

        let path = unique_path(Path::new("a.xlsx"), dir.path(), fixed_time());
        assert_eq!(path, dir.path().join("a_20240305_090701_2.xlsx"));
    }

    #[test]
    fn test_accept_copies_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("report.XLSX");
        std::fs::write(&source, b"PK-data").unwrap();
        let uploads = dir.path().join("uploads");

        let stored = accept(&source, &uploads).unwrap();

        assert_eq!(stored.original_name, "report.XLSX");
        assert_eq!(stored.format, ContainerFormat::Xlsx);
        assert_eq!(stored.size, 7);
        assert!(stored.stored_path.starts_with(&uploads));
        assert_eq!(std::fs::read(&stored.stored_path).unwrap(), b"PK-data");
    }

    #[test]
    fn test_accept_rejects_extension() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("report.csv");
        std::fs::write(&source, b"a,b").unwrap();

        let err = accept(&source, &dir.path().join("uploads")).unwrap_err();
        assert!(matches!(err, ReportAiError::UnsupportedFormat(_)));
        assert!(!dir.path().join("uploads").exists());
    }

    #[test]
    fn test_accept_missing_file() {
        let dir = tempdir().unwrap();
        let err = accept(&dir.path().join("none.xlsx"), dir.path()).unwrap_err();
        assert!(matches!(err, ReportAiError::FileNotFound(_)));
    }
}
