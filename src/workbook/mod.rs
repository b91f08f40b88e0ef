//! ワークブック入出力モジュール
//!
//! - convert: 旧形式（.xlsb / .xls）から .xlsx への変換
//! - reader: 作業用シート（値・結合範囲）の読み込み
//! - writer: 元ファイルの書式を保ったまま分類列を追加
//! - ooxml: xlsxパッケージ内のXML操作

pub mod convert;
mod ooxml;
pub mod reader;
pub mod writer;

pub use convert::ensure_xlsx;
pub use reader::load_working_sheet;
pub use writer::{ResultWriter, XlsxResultWriter};

use crate::error::{ReportAiError, Result};
use std::path::Path;

/// コンテナ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Xlsx,
    Xlsb,
    Xls,
}

impl ContainerFormat {
    /// 拡張子から判定（大文字小文字は区別しない）
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "xlsb" => Ok(Self::Xlsb),
            "xls" => Ok(Self::Xls),
            _ => Err(ReportAiError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// 変換が必要な旧形式か
    pub fn is_legacy(self) -> bool {
        !matches!(self, Self::Xlsx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(ContainerFormat::from_path(Path::new("a.xlsx")).unwrap(), ContainerFormat::Xlsx);
        assert_eq!(ContainerFormat::from_path(Path::new("a.XLSB")).unwrap(), ContainerFormat::Xlsb);
        assert_eq!(ContainerFormat::from_path(Path::new("dir/a.xls")).unwrap(), ContainerFormat::Xls);
    }

    #[test]
    fn test_reject_other_extensions() {
        for name in ["a.csv", "a.xlsm", "noext"] {
            let err = ContainerFormat::from_path(Path::new(name)).unwrap_err();
            assert!(matches!(err, ReportAiError::UnsupportedFormat(_)));
        }
    }

    #[test]
    fn test_is_legacy() {
        assert!(!ContainerFormat::Xlsx.is_legacy());
        assert!(ContainerFormat::Xlsb.is_legacy());
        assert!(ContainerFormat::Xls.is_legacy());
    }
}
