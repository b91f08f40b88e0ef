use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "daily-report-ai")]
#[command(about = "제조 일보 Issue 自動分類・結果Excel出力ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 日報ファイルをアップロード先にコピー
    Upload {
        /// 日報ファイル（.xlsx / .xlsb / .xls）
        #[arg(required = true)]
        file: PathBuf,
    },

    /// 前処理のみ実行（変換・結合セル解除・Issue統合）
    Preprocess {
        /// 日報ファイル
        #[arg(required = true)]
        file: PathBuf,

        /// シート名（省略時はユーザー設定）
        #[arg(short, long)]
        sheet: Option<String>,

        /// Issue列名（省略時はユーザー設定）
        #[arg(short, long)]
        column: Option<String>,

        /// 整形済みシートを processed_<ファイル名> として保存
        #[arg(long)]
        save: bool,
    },

    /// Issue列を分類して結果ファイルを生成
    Classify {
        /// 日報ファイル
        #[arg(required = true)]
        file: PathBuf,

        /// シート名（省略時はユーザー設定）
        #[arg(short, long)]
        sheet: Option<String>,

        /// Issue列名（省略時はユーザー設定）
        #[arg(short, long)]
        column: Option<String>,

        /// 分類プロンプト（省略時はユーザー設定または既定値）
        #[arg(short, long)]
        prompt: Option<String>,

        /// 進捗バーを表示
        #[arg(long)]
        stream: bool,

        /// 進捗イベントをJSON Linesで出力
        #[arg(long, conflicts_with = "stream")]
        events: bool,
    },

    /// 実行履歴
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// 結果ファイルを取得
    Download {
        /// 履歴ID
        #[arg(required = true)]
        id: u64,

        /// 保存先（省略時はカレントに元のファイル名で保存）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// ユーザー設定を表示/編集
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// 古いアップロード・結果ファイルを削除
    Cleanup {
        /// 保持日数（省略時は設定値）
        #[arg(short, long)]
        days: Option<u64>,

        /// 削除せずに対象だけ表示
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 新しい順に一覧表示
    List {
        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// 1件の詳細を表示
    Show {
        #[arg(required = true)]
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// 現在の設定を表示
    Show,

    /// 設定を変更（指定した項目のみ）
    Set {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        sheet: Option<String>,

        #[arg(long)]
        column: Option<String>,

        #[arg(long)]
        prompt: Option<String>,

        /// Few-shot例を書いたテキストファイル
        #[arg(long)]
        few_shot_file: Option<PathBuf>,
    },
}
