use anyhow::Context;
use clap::Parser;
use daily_report_ai::classifier::RowClassifier;
use daily_report_ai::cli::{Cli, Commands, HistoryAction, SettingsAction};
use daily_report_ai::config::AppConfig;
use daily_report_ai::orchestrator::{Orchestrator, RunEvent, RunRequest};
use daily_report_ai::store::{HistoryEntry, HistoryStore, JsonHistoryStore, SettingsStore};
use daily_report_ai::workbook::XlsxResultWriter;
use daily_report_ai::{cleanup, pipeline, results, upload};
use daily_report_common::DEFAULT_PROMPT;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = AppConfig::load()?;
    config.ensure_dirs()?;
    let settings_store = SettingsStore::new(config.settings_path());

    match cli.command {
        Commands::Upload { file } => {
            println!("📥 daily-report-ai - アップロード\n");
            let stored = upload::accept(&file, &config.upload_dir())?;
            println!("✔ {} ({} bytes)", stored.stored_path.display(), stored.size);
        }

        Commands::Preprocess { file, sheet, column, save } => {
            println!("🧹 daily-report-ai - 前処理\n");
            let settings = settings_store.load_or_init(&config)?;
            let sheet = sheet.unwrap_or(settings.sheet_name);
            let column = column.unwrap_or(settings.column_name);

            println!("[1/2] 変換・結合セル解除・Issue統合中...");
            let preprocessed = pipeline::run(&file, &sheet, &column, &config.layout)?;
            println!(
                "✔ シート「{}」: 結合セル {}件を解除, グループ {}件\n",
                preprocessed.sheet.name(),
                preprocessed.dissolved_merges,
                preprocessed.groups.len()
            );
            for group in &preprocessed.groups {
                println!(
                    "  {}〜{}行: {}",
                    group.first_row,
                    group.last_row,
                    group.text.replace('\n', " / ")
                );
            }

            if save {
                println!("\n[2/2] 整形済みシートを保存中...");
                let path = pipeline::save_processed(&preprocessed)?;
                println!("✔ 保存: {}", path.display());
            }
        }

        Commands::Classify { file, sheet, column, prompt, stream, events } => {
            let settings = settings_store.load_or_init(&config)?;
            let request = RunRequest {
                source: file,
                sheet_name: sheet.unwrap_or_else(|| settings.sheet_name.clone()),
                column_name: column.unwrap_or_else(|| settings.column_name.clone()),
                prompt: prompt
                    .or_else(|| settings.prompt.clone())
                    .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
                few_shot_examples: settings.few_shot_examples.clone(),
            };

            let classifier = RowClassifier::from_settings(&settings, &config)?;
            let history = JsonHistoryStore::open(config.history_path())?;
            let writer = XlsxResultWriter::from_config(&config);
            let orchestrator = Orchestrator::new(&classifier, &history, &writer, &config);

            if !events {
                println!("🤖 daily-report-ai - Issue分類{}\n", if classifier.is_offline() { " (モック)" } else { "" });
            }

            let summary = if stream || events {
                let (tx, rx) = mpsc::unbounded_channel();
                let (summary, ()) = tokio::join!(
                    orchestrator.run_streaming(request, tx),
                    consume_events(rx, events)
                );
                summary?
            } else {
                println!("[1/1] 分類中...");
                orchestrator.run(request).await?
            };

            if !events {
                println!("✔ {}", summary.message);
                println!("✔ 結果ファイル: {}", summary.result_path.display());
                println!("\n✅ 完了 (履歴ID: {})", summary.history_id);
            }
        }

        Commands::History { action } => {
            let history = JsonHistoryStore::open(config.history_path())?;
            match action {
                HistoryAction::List { skip, limit } => {
                    let entries = history.list_recent(skip, limit)?;
                    if entries.is_empty() {
                        println!("履歴がありません");
                    }
                    for entry in &entries {
                        println!(
                            "#{:<4} {:<10} {}  {} ({}/{}行)",
                            entry.id,
                            entry.status,
                            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                            entry.filename,
                            entry.processed_rows,
                            entry.total_rows
                        );
                    }
                }
                HistoryAction::Show { id } => {
                    let entry = history
                        .get(id)?
                        .ok_or(daily_report_ai::error::ReportAiError::HistoryNotFound(id))?;
                    print_entry(&entry);
                }
            }
        }

        Commands::Download { id, output } => {
            let history = JsonHistoryStore::open(config.history_path())?;
            let (_, source) = results::result_path(&history, id)?;
            let bytes = results::fetch_result(&history, id)?;

            let dest = output.unwrap_or_else(|| {
                PathBuf::from(source.file_name().unwrap_or_else(|| std::ffi::OsStr::new("result.xlsx")))
            });
            std::fs::write(&dest, bytes).with_context(|| format!("書き込みに失敗: {}", dest.display()))?;
            println!("✔ 保存: {}", dest.display());
        }

        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                let settings = settings_store.load_or_init(&config)?;
                println!("設定: {}", settings_store.path().display());
                println!("  APIキー: {}", settings.masked_api_key());
                println!("  ベースURL: {}", settings.base_url);
                println!("  モデル: {}", settings.model_name);
                println!("  シート名: {}", settings.sheet_name);
                println!("  列名: {}", settings.column_name);
                println!("  プロンプト: {}", settings.prompt.as_deref().unwrap_or("(既定)"));
                println!(
                    "  Few-shot例: {}",
                    if settings.few_shot_examples.is_some() { "あり" } else { "なし" }
                );
                println!("  更新日時: {}", settings.updated_at.format("%Y-%m-%d %H:%M:%S"));
            }
            SettingsAction::Set {
                api_key,
                base_url,
                model,
                sheet,
                column,
                prompt,
                few_shot_file,
            } => {
                let mut settings = settings_store.load_or_init(&config)?;
                if let Some(key) = api_key {
                    settings.api_key = Some(key);
                }
                if let Some(url) = base_url {
                    settings.base_url = url;
                }
                if let Some(model) = model {
                    settings.model_name = model;
                }
                if let Some(sheet) = sheet {
                    settings.sheet_name = sheet;
                }
                if let Some(column) = column {
                    settings.column_name = column;
                }
                if let Some(prompt) = prompt {
                    settings.prompt = Some(prompt);
                }
                if let Some(path) = few_shot_file {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Few-shot例を読み込めません: {}", path.display()))?;
                    settings.few_shot_examples = Some(text);
                }
                settings_store.replace(settings)?;
                println!("✔ 設定を保存しました");
            }
        },

        Commands::Cleanup { days, dry_run } => {
            println!("🗑  daily-report-ai - クリーンアップ\n");
            let days = days.unwrap_or(config.retention_days);
            let report = cleanup::cleanup_dirs(&[config.upload_dir(), config.results_dir()], days, dry_run);

            if dry_run {
                for path in &report.candidates {
                    println!("  {}", path.display());
                }
                println!("✔ 削除対象: {}件（{}日より前）", report.candidates.len(), days);
            } else {
                println!("✔ 削除: {}件, 失敗: {}件", report.deleted, report.failed);
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// イベントを進捗バーまたはJSON Linesで表示
async fn consume_events(mut rx: mpsc::UnboundedReceiver<RunEvent>, json_lines: bool) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        if json_lines {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("イベントのシリアライズに失敗: {}", e),
            }
            continue;
        }

        match event {
            RunEvent::Start { total } => {
                let pb = ProgressBar::new(total as u64);
                if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len}行 {msg}") {
                    pb.set_style(style.progress_chars("#>-"));
                }
                bar = Some(pb);
            }
            RunEvent::Progress { current, .. } => {
                if let Some(pb) = &bar {
                    pb.set_position(current as u64);
                }
            }
            RunEvent::Complete(_) => {
                if let Some(pb) = bar.take() {
                    pb.finish_with_message("完了");
                }
            }
            RunEvent::Error { message } => {
                if let Some(pb) = bar.take() {
                    pb.abandon_with_message(message);
                }
            }
        }
    }
}

fn print_entry(entry: &HistoryEntry) {
    println!("履歴 #{}", entry.id);
    println!("  ファイル: {} ({})", entry.filename, entry.file_path);
    println!("  シート/列: {} / {}", entry.sheet_name, entry.column_name);
    println!("  状態: {}", entry.status);
    println!(
        "  行数: 全{} / 成功{} / 失敗{}",
        entry.total_rows, entry.processed_rows, entry.failed_rows
    );
    if let Some(result) = &entry.result_path {
        println!("  結果: {}", result);
    }
    if let Some(message) = &entry.error_message {
        println!("  エラー: {}", message);
    }
    println!("  作成: {}", entry.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(done) = entry.completed_at {
        println!("  完了: {}", done.format("%Y-%m-%d %H:%M:%S"));
    }
}
