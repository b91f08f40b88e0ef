use crate::error::{ReportAiError, Result};
use daily_report_common::SheetLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DATA_DIR_ENV: &str = "DAILY_REPORT_DATA_DIR";
const MOCK_LLM_ENV: &str = "DAILY_REPORT_MOCK_LLM";
const CONFIG_PATH_ENV: &str = "DAILY_REPORT_CONFIG";

/// プロセス全体の設定
///
/// 実行ごとに明示的に渡す（グローバルには持たない）。
/// ユーザーごとの設定（APIキー・プロンプト等）は `store::settings` 側で管理する。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 履歴・設定・アップロード・結果ファイルの保存先
    pub data_dir: PathBuf,
    /// 省略時は data_dir/uploads
    pub upload_dir: Option<PathBuf>,
    /// 省略時は data_dir/results
    pub results_dir: Option<PathBuf>,
    /// LLMを呼ばずにダミーの分類結果を返す
    pub mock_llm: bool,
    pub mock_delay_ms: u64,
    pub request_timeout_seconds: u64,
    /// 1行あたりの最大試行回数
    pub max_retries: u32,
    /// cleanup で削除する経過日数
    pub retention_days: u64,
    pub default_base_url: String,
    pub default_model: String,
    pub default_sheet_name: String,
    pub default_column_name: String,
    pub layout: SheetLayout,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("daily-report-ai"))
            .unwrap_or_else(|| PathBuf::from("data"));

        Self {
            data_dir,
            upload_dir: None,
            results_dir: None,
            mock_llm: false,
            mock_delay_ms: 100,
            request_timeout_seconds: 120,
            max_retries: 3,
            retention_days: 30,
            default_base_url: "https://api.openai.com/v1".into(),
            default_model: "gpt-4o-mini".into(),
            default_sheet_name: "일보_Worst55".into(),
            default_column_name: "Issue".into(),
            layout: SheetLayout::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| ReportAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("daily-report-ai").join("config.json"))
    }

    /// data_dir だけを差し替えた設定（テスト・一時実行用）
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(flag) = std::env::var(MOCK_LLM_ENV) {
            self.mock_llm = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("uploads"))
    }

    pub fn results_dir(&self) -> PathBuf {
        self.results_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("results"))
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// アップロード・結果ディレクトリを作成
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.upload_dir())?;
        std::fs::create_dir_all(self.results_dir())?;
        Ok(())
    }
}
