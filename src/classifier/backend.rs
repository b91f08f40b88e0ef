//! LLMバックエンド
//!
//! 「システムプロンプトとユーザーメッセージを渡すと、JSON文字列を返すか失敗する」
//! という最小限のインターフェースと、OpenAI互換APIの実装。

use crate::error::{ReportAiError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// 応答の温度（抽出タスクなので低め）
pub const TEMPERATURE: f32 = 0.3;

pub trait ChatBackend: Send + Sync {
    /// JSONオブジェクト形式の応答本文を返す
    fn complete_json(&self, system: &str, user: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI互換の chat/completions バックエンド
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportAiError::ApiCall(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl ChatBackend for OpenAiBackend {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { format_type: "json_object" },
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReportAiError::ApiCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ReportAiError::ApiCall(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReportAiError::ApiParse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ReportAiError::ApiParse("choices が空です".into()))
    }
}
