//! オフライン分類（LLMを呼ばない動作確認用）

use daily_report_common::ClassificationRecord;
use rand::seq::IndexedRandom;

const CANNED: [(&str, &str, &str); 5] = [
    ("기포", "LINE-C 코터", "건조 온도 조정"),
    ("스크래치", "LINE-B 이송 롤러", "롤러 교체"),
    ("이물", "LINE-A 노광기", "클리닝 실시"),
    ("치수 불량", "프레스 #2", "금형 재조정"),
    ("오염", "세정기", "세정액 교체"),
];

/// 固定レコードから1件を選ぶ
pub fn canned_record() -> ClassificationRecord {
    let mut rng = rand::rng();
    let (defect, equipment, action) = CANNED.choose(&mut rng).copied().unwrap_or(CANNED[0]);
    ClassificationRecord::new(defect, equipment, action)
}
