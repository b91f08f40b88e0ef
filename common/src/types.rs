//! 分類結果の型定義
//!
//! - ClassificationRecord: 1行分の抽出結果（불량명・설비명・조치내용）
//! - is_empty_value: 空セル判定（None・空文字・空白のみを同一視）

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// LLMレスポンスに必須のキー
pub const REQUIRED_KEYS: [&str; 3] = ["불량명", "설비명", "조치내용"];

/// 1行分の分類結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// 불량명（不良名）
    #[serde(rename = "불량명", default)]
    pub defect_name: String,

    /// 설비명（設備名）
    #[serde(rename = "설비명", default)]
    pub equipment_name: String,

    /// 조치내용（処置内容）
    #[serde(rename = "조치내용", default)]
    pub corrective_action: String,
}

impl ClassificationRecord {
    pub fn new(
        defect_name: impl Into<String>,
        equipment_name: impl Into<String>,
        corrective_action: impl Into<String>,
    ) -> Self {
        Self {
            defect_name: defect_name.into(),
            equipment_name: equipment_name.into(),
            corrective_action: corrective_action.into(),
        }
    }

    /// 空レコード（空セル・分類失敗時）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.defect_name.is_empty()
            && self.equipment_name.is_empty()
            && self.corrective_action.is_empty()
    }

    /// 出力列の順序（OUTPUT_HEADERSと同順）で値を返す
    pub fn fields(&self) -> [&str; 3] {
        [
            &self.defect_name,
            &self.equipment_name,
            &self.corrective_action,
        ]
    }

    /// JSONオブジェクトから生成
    ///
    /// 必須キーが1つでも欠けていれば `None`。
    /// 値は文字列以外も受け付け、null は空文字、その他はJSON表記に変換する。
    pub fn from_json_object(object: &Map<String, Value>) -> Option<Self> {
        if !REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
            return None;
        }

        let field = |key: &str| object.get(key).map(value_to_text).unwrap_or_default();

        Some(Self {
            defect_name: field(REQUIRED_KEYS[0]),
            equipment_name: field(REQUIRED_KEYS[1]),
            corrective_action: field(REQUIRED_KEYS[2]),
        })
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// セル値が空かどうか
///
/// None・空文字・空白のみの文字列をすべて空とみなす。
/// キー列の比較とIssue列のスキップ判定で同じ基準を使う。
pub fn is_empty_value(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}
