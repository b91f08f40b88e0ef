//! 제조 일보 Issue 自動分類
//!
//! 日報ワークブックを前処理し、Issue列を1行ずつLLMで分類して
//! 元の書式を保ったまま結果列を追加する。

pub mod classifier;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod results;
pub mod store;
pub mod upload;
pub mod workbook;
