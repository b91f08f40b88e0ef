//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Merge region overlaps an existing region: {0}")]
    MergeOverlap(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
