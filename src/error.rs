use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`daily-report-ai settings set --api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していないファイル形式です: {0}（対応形式: .xlsx, .xlsb, .xls）")]
    UnsupportedFormat(String),

    #[error("シートが見つかりません: {0}")]
    SheetNotFound(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("Excel読み込みエラー: {0}")]
    ExcelRead(String),

    #[error("Excel生成エラー: {0}")]
    ExcelWrite(String),

    #[error("XML処理エラー: {0}")]
    Xml(String),

    #[error("ZIP処理エラー: {0}")]
    Zip(String),

    #[error("履歴が見つかりません: {0}")]
    HistoryNotFound(u64),

    #[error("履歴ストアエラー: {0}")]
    Store(String),

    #[error("ダウンロードできる結果ファイルがありません: {0}")]
    ResultUnavailable(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] daily_report_common::Error),
}

impl From<zip::result::ZipError> for ReportAiError {
    fn from(e: zip::result::ZipError) -> Self {
        ReportAiError::Zip(e.to_string())
    }
}

impl From<quick_xml::Error> for ReportAiError {
    fn from(e: quick_xml::Error) -> Self {
        ReportAiError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ReportAiError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ReportAiError::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportAiError>;
