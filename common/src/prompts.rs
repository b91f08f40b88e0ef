//! プロンプト生成モジュール
//!
//! 日報Issue分類で使うプロンプト:
//! - DEFAULT_PROMPT: ユーザープロンプト未設定時の既定値
//! - build_system_prompt: 抽出タスクの指示（Few-shot例を末尾に付加）
//! - build_user_message: ユーザープロンプト + Issue本文

/// ユーザープロンプトの既定値
pub const DEFAULT_PROMPT: &str =
    "다음 Issue 내용을 분석하여 불량명, 설비명, 조치내용을 JSON 형식으로 추출해주세요.";

/// システムプロンプト生成
///
/// # Arguments
/// * `few_shot_examples` - Few-shot例。指定時は見出しを付けてそのまま末尾に追加
///
/// # Returns
/// 3項目（불량명・설비명・조치내용）のJSON抽出を指示するプロンプト
pub fn build_system_prompt(few_shot_examples: Option<&str>) -> String {
    let mut prompt = String::from(
        r#"당신은 제조 현장의 일보를 분석하는 전문가입니다.
Issue 내용을 분석하여 다음 정보를 JSON 형식으로 추출해야 합니다:
- 불량명: 발생한 불량의 이름
- 설비명: 불량이 발생한 설비의 이름
- 조치내용: 불량에 대한 조치 내용

응답은 반드시 다음 JSON 형식이어야 합니다:
{"불량명": "추출된 불량명", "설비명": "추출된 설비명", "조치내용": "추출된 조치내용"}

정보를 추출할 수 없는 경우 빈 문자열("")을 사용하세요."#,
    );

    if let Some(examples) = few_shot_examples.filter(|e| !e.trim().is_empty()) {
        prompt.push_str("\n\n### 예제:\n");
        prompt.push_str(examples);
    }

    prompt
}

/// ユーザーメッセージ生成
pub fn build_user_message(prompt: &str, issue_text: &str) -> String {
    format!("{}\n\nIssue 내용: {}", prompt, issue_text)
}
