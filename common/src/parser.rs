//! APIレスポンスパーサー
//!
//! LLMのレスポンスからJSONオブジェクトを取り出し、
//! 必須キーを検証して ClassificationRecord に変換する

use crate::error::{Error, Result};
use crate::types::{ClassificationRecord, REQUIRED_KEYS};
use serde_json::Value;

/// APIレスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. レスポンス全体が `{...}`
/// 2. ```json ... ``` ブロック
/// 3. 最初の `{` から最後の `}` まで
///
/// # Examples
/// ```
/// use daily_report_common::extract_json_object;
///
/// let response = "결과: {\"불량명\": \"기포\"}";
/// let json = extract_json_object(response).unwrap();
/// assert!(json.starts_with('{'));
/// ```
pub fn extract_json_object(response: &str) -> Result<&str> {
    let trimmed = response.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed);
    }

    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if end > start {
            return Ok(&response[start..=end]);
        }
    }

    Err(Error::Parse("JSONオブジェクトが見つかりません".into()))
}

/// 分類レスポンスをパース
///
/// # Returns
/// * `Ok(ClassificationRecord)` - JSONオブジェクトで必須キーがすべて揃っている
/// * `Err(Error::Json)` - JSONとして不正
/// * `Err(Error::Parse)` - オブジェクトでない、または必須キーが欠けている
pub fn parse_classification(response: &str) -> Result<ClassificationRecord> {
    let json_str = extract_json_object(response)?;
    let value: Value = serde_json::from_str(json_str)?;

    let object = value
        .as_object()
        .ok_or_else(|| Error::Parse(format!("JSONオブジェクトではありません: {}", value)))?;

    ClassificationRecord::from_json_object(object).ok_or_else(|| {
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        Error::Parse(format!("必須キーがありません: {}", missing.join(", ")))
    })
}
