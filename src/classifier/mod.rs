//! Issue分類モジュール
//!
//! 1行分のIssueテキストをLLMに渡し、불량명・설비명・조치내용 を取り出す。
//! 応答が検証を通るまで最大 `max_retries` 回試行する。

pub mod backend;
mod offline;

pub use backend::{ChatBackend, OpenAiBackend};

use crate::config::AppConfig;
use crate::error::{ReportAiError, Result};
use crate::store::UserConfig;
use daily_report_common::{build_system_prompt, build_user_message, parse_classification, ClassificationRecord};
use std::time::Duration;

/// 1行単位の分類器
pub struct RowClassifier<B> {
    /// None のときはオフライン（固定レコードを返す）
    backend: Option<B>,
    offline_delay: Duration,
}

impl<B: ChatBackend> RowClassifier<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Some(backend),
            offline_delay: Duration::ZERO,
        }
    }

    /// バックエンドを呼ばず、`delay` 待ってから固定レコードを返す分類器
    pub fn offline(delay: Duration) -> Self {
        Self {
            backend: None,
            offline_delay: delay,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.backend.is_none()
    }

    /// Issueテキストを分類
    ///
    /// # Returns
    /// * `Some(record)` - 検証を通った最初の応答
    /// * `None` - すべての試行が失敗
    pub async fn classify(
        &self,
        issue_text: &str,
        prompt: &str,
        few_shot_examples: Option<&str>,
        max_retries: u32,
    ) -> Option<ClassificationRecord> {
        let Some(backend) = &self.backend else {
            let record = offline::canned_record();
            tokio::time::sleep(self.offline_delay).await;
            return Some(record);
        };

        let system = build_system_prompt(few_shot_examples);
        let user = build_user_message(prompt, issue_text);

        for attempt in 1..=max_retries {
            match backend.complete_json(&system, &user).await {
                Ok(content) => match parse_classification(&content) {
                    Ok(record) => return Some(record),
                    Err(e) => {
                        log::warn!("応答の検証に失敗 (試行 {}/{}): {}", attempt, max_retries, e);
                    }
                },
                Err(e) => {
                    log::error!("分類リクエストに失敗 (試行 {}/{}): {}", attempt, max_retries, e);
                }
            }
        }

        None
    }
}

impl RowClassifier<OpenAiBackend> {
    /// ユーザー設定から分類器を作る
    ///
    /// `mock_llm` が有効ならオフライン。そうでなければAPIキーが必須。
    pub fn from_settings(settings: &UserConfig, config: &AppConfig) -> Result<Self> {
        if config.mock_llm {
            return Ok(Self::offline(Duration::from_millis(config.mock_delay_ms)));
        }

        let api_key = settings.api_key().ok_or(ReportAiError::MissingApiKey)?;
        let backend = OpenAiBackend::new(
            &settings.base_url,
            api_key,
            settings.model_name.as_str(),
            Duration::from_secs(config.request_timeout_seconds),
        )?;
        Ok(Self::new(backend))
    }
}
