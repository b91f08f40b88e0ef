//! ユーザー設定
//!
//! APIキー・モデル・既定のシート名/列名・プロンプト・Few-shot例を保持する。
//! 初回読み込み時に既定値で作成し、更新は全項目の置き換え。

use super::lock;
use crate::config::AppConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_name: String,
    pub sheet_name: String,
    pub column_name: String,
    pub prompt: Option<String>,
    pub few_shot_examples: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserConfig {
    /// プロセス設定の既定値から生成
    pub fn from_defaults(config: &AppConfig) -> Self {
        Self {
            api_key: None,
            base_url: config.default_base_url.clone(),
            model_name: config.default_model.clone(),
            sheet_name: config.default_sheet_name.clone(),
            column_name: config.default_column_name.clone(),
            prompt: None,
            few_shot_examples: None,
            updated_at: Utc::now(),
        }
    }

    /// 空白のみのAPIキーは未設定扱い
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// 表示用（先頭数文字以外を伏せる）
    pub fn masked_api_key(&self) -> String {
        match self.api_key() {
            Some(key) if key.chars().count() > 8 => {
                let head: String = key.chars().take(5).collect();
                format!("{}****", head)
            }
            Some(_) => "****".to_string(),
            None => "未設定".to_string(),
        }
    }
}

/// ユーザー設定の保存先
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    cached: Mutex<Option<UserConfig>>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 設定を取得（無ければ既定値で作成して保存）
    pub fn load_or_init(&self, config: &AppConfig) -> Result<UserConfig> {
        let mut cached = lock(&self.cached)?;
        if let Some(settings) = cached.as_ref() {
            return Ok(settings.clone());
        }

        let settings = if self.path.exists() {
            let reader = BufReader::new(File::open(&self.path)?);
            serde_json::from_reader(reader)?
        } else {
            let settings = UserConfig::from_defaults(config);
            self.save(&settings)?;
            log::info!("ユーザー設定を作成: {}", self.path.display());
            settings
        };

        *cached = Some(settings.clone());
        Ok(settings)
    }

    /// 設定を丸ごと置き換える
    pub fn replace(&self, mut settings: UserConfig) -> Result<UserConfig> {
        let mut cached = lock(&self.cached)?;
        settings.updated_at = Utc::now();
        self.save(&settings)?;
        *cached = Some(settings.clone());
        Ok(settings)
    }

    fn save(&self, settings: &UserConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, settings)?;
        Ok(())
    }
}
