use civic_report::{api, cli, commands, config, error, scanner};
use civic_report_common::{
    resolve_overlay, Coordinates, MediaSnapshot, OverlayInfo, ReportFilter, ReportForm,
    ReportStats, Role, SubmitOutcome,
};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use dialoguer::Select;
use error::{CivicError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli).await {
        eprintln!("✖ {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    let data_dir = config.data_dir()?;
    log::debug!("Data directory: {}", data_dir.display());

    match cli.command {
        Commands::List { issue_type, department, status, search, json } => {
            let store = commands::open_store(&data_dir);
            let filter = ReportFilter {
                issue_type,
                department,
                status: status.map(Into::into),
                search: search.unwrap_or_default(),
            };
            let visible = filter.apply(store.reports());

            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                for report in &visible {
                    println!("{}", commands::format_report(report));
                }
                println!("\nShowing {} of {}", visible.len(), store.len());
            }
        }

        Commands::Stats => {
            let store = commands::open_store(&data_dir);
            let stats = ReportStats::from_reports(store.reports());
            println!("Total:       {}", stats.total);
            println!("Pending:     {}", stats.pending);
            println!("In Progress: {}", stats.in_progress);
            println!("Resolved:    {}", stats.resolved);
        }

        Commands::Submit {
            description,
            issue_type,
            custom_type,
            department,
            location,
            lat,
            lon,
            media_dir,
            recursive,
            attach,
            offline,
        } => {
            println!("📝 civic-report - 通報\n");

            let mut form = ReportForm {
                description: description.unwrap_or_default(),
                issue_type: issue_type.unwrap_or_default(),
                custom_issue_type: custom_type.unwrap_or_default(),
                department: department.unwrap_or_default(),
                location: location.unwrap_or_default(),
            };

            let media = load_attachments(media_dir, recursive, &attach)?;
            println!(
                "✔ 添付: 写真{}件 / 動画{}件 / ボイスメモ{}件",
                media.images.len(),
                media.videos.len(),
                media.voice_notes.len()
            );

            let client = api::build_client(&config)?;
            let position = lat.zip(lon).map(|(latitude, longitude)| Coordinates { latitude, longitude });
            let coords = if position.is_some() {
                let locator = api::CliLocator::new(client.clone(), config.geocoder_url.clone(), position);
                resolve_overlay(&locator).await
            } else {
                OverlayInfo::default()
            };
            commands::fill_location(&mut form, &coords);

            let uploader = (!offline && config.has_api())
                .then(|| api::HttpUploader::new(client, config.api_url.clone()));
            if uploader.is_none() && !offline {
                log::info!("api_url is not configured, saving locally only");
            }

            let store = RefCell::new(commands::open_store(&data_dir));
            let spinner = spinner("送信中...");
            let outcome = commands::submit_report(
                &store,
                uploader.as_ref(),
                &form,
                &media,
                &coords,
                chrono::Utc::now(),
            )
            .await;
            spinner.finish_and_clear();

            match outcome? {
                SubmitOutcome::Confirmed(report) => {
                    println!("✅ 送信しました: #{}", report.id);
                }
                SubmitOutcome::KeptLocal { id, reason } => {
                    println!("✔ ローカルに保存しました: #{} ({})", id, reason);
                }
            }
        }

        Commands::Status { id, status } => {
            commands::require_role(config.role, Role::Government)?;
            let mut store = commands::open_store(&data_dir);
            commands::update_status(&mut store, &id, status.into())?;
            println!("✔ #{} を {} に変更しました", id, civic_report_common::ReportStatus::from(status));
        }

        Commands::Notify { message } => {
            commands::require_role(config.role, Role::Government)?;
            let mut log = commands::open_notifications(&data_dir);
            let sent = commands::broadcast(&mut log, &message, chrono::Utc::now().timestamp_millis())?;
            println!("✔ お知らせを送信しました: {}", sent.message);
        }

        Commands::Notifications => {
            let log = commands::open_notifications(&data_dir);
            if log.notifications().is_empty() {
                println!("お知らせはありません");
            }
            for n in log.notifications().iter().rev() {
                println!("- {}", n.message);
            }
        }

        Commands::Export { output } => {
            commands::require_role(config.role, Role::Government)?;
            let store = commands::open_store(&data_dir);
            let path = output.unwrap_or_else(|| PathBuf::from(commands::EXPORT_FILE_NAME));
            commands::export_to(&store, &path)?;
            println!("✔ {}件をエクスポート: {}", store.len(), path.display());
        }

        Commands::Role { role } => {
            let role = match role {
                Some(role) => role.into(),
                None => select_role(config.role)?,
            };
            config.role = Some(role);
            config.save()?;
            println!("✔ ロール: {}", role.as_str());
        }

        Commands::Config { set_api_url, set_geocoder_url, show } => {
            let changed = set_api_url.is_some() || set_geocoder_url.is_some();
            if let Some(url) = set_api_url {
                config.api_url = url;
            }
            if let Some(url) = set_geocoder_url {
                config.geocoder_url = url;
            }
            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!("  API: {}", if config.has_api() { config.api_url.as_str() } else { "未設定" });
                println!("  逆ジオコーディング: {}", config.geocoder_url);
                println!("  データ: {}", data_dir.display());
                println!("  ロール: {}", config.role.map(|r| r.as_str()).unwrap_or("未設定"));
                println!("  タイムアウト: {}秒", config.timeout_seconds);
            }
        }
    }

    Ok(())
}

fn load_attachments(
    media_dir: Option<PathBuf>,
    recursive: bool,
    attach: &[PathBuf],
) -> Result<MediaSnapshot<Vec<u8>>> {
    let mut files = scanner::media_from_paths(attach)?;
    if let Some(dir) = media_dir {
        let found = scanner::scan_folder(&dir, recursive)?;
        if found.is_empty() {
            return Err(CivicError::NoMediaFound(dir.display().to_string()));
        }
        files.extend(found);
    }
    scanner::load_media(&files)
}

fn select_role(current: Option<Role>) -> Result<Role> {
    let roles = [Role::Citizen, Role::Government];
    let labels = ["Citizen", "Government"];
    let default = roles.iter().position(|r| Some(*r) == current).unwrap_or(0);

    let index = Select::new()
        .with_prompt("ロールを選択")
        .items(&labels)
        .default(default)
        .interact()
        .map_err(|e| CivicError::CliExecution(e.to_string()))?;
    Ok(roles[index])
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
