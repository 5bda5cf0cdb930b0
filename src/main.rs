//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run
//! the discovery. The blueprint JSON is the only thing written to stdout;
//! logs go to stderr.

use clap::Parser;
use dotenv::dotenv;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tg_botmap::adapters::persistence::report_store::FsReportStore;
use tg_botmap::adapters::telegram::{
    auth_adapter::GrammersAuthAdapter, client::GrammersBotGateway,
};
use tg_botmap::adapters::ui::login::InquireLoginPrompt;
use tg_botmap::domain::{DomainError, Report};
use tg_botmap::ports::{AuthPort, BotGateway, LoginPrompt, ReportStorePort};
use tg_botmap::shared::config::AppConfig;
use tg_botmap::usecases::{AuthService, ExploreLimits, ExplorerService, WaitProfile};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map a bot's interactive surface (commands, buttons, keyboards) into a
/// JSON blueprint by driving a real conversation with it.
#[derive(Parser, Debug)]
#[command(name = "tg-botmap", version, about)]
struct Cli {
    /// Bot handle, e.g. @SampleBot.
    bot: String,

    /// Seconds to wait for each response.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Maximum button depth to explore.
    #[arg(long, default_value_t = 5)]
    max_depth: u32,

    /// Total button budget for the run.
    #[arg(long, default_value_t = 100)]
    max_buttons: usize,

    /// Also write the blueprint to the reports directory.
    #[arg(long)]
    save: bool,

    /// Allow an interactive login when no session is saved.
    #[arg(long)]
    login: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut cli = Cli::parse();
    cli.bot = normalize_handle(&cli.bot);
    match run(&cli).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let mut report = Report::new(&cli.bot);
            report.ok = false;
            report.error = Some(e.to_string());
            print_report(&report);
            if e.is_expected() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

/// Handles are accepted with or without the `@`; the blueprint always
/// carries the prefixed form.
fn normalize_handle(bot: &str) -> String {
    let trimmed = bot.trim();
    if trimmed.starts_with('@') {
        trimmed.to_string()
    } else {
        format!("@{}", trimmed)
    }
}

async fn run(cli: &Cli) -> Result<Report, DomainError> {
    let cfg = AppConfig::load().unwrap_or_default();
    let (api_id, api_hash) = cfg.require_credentials()?;

    let client =
        tg_botmap::adapters::telegram::session::connect(api_id, cfg.session_path_or_default())
            .await?;

    let auth_adapter: Arc<dyn AuthPort> = Arc::new(GrammersAuthAdapter::new(client.clone()));
    let prompt: Arc<dyn LoginPrompt> = Arc::new(InquireLoginPrompt);
    AuthService::new(auth_adapter, prompt, api_hash, cfg.phone.clone())
        .ensure_authorized(cli.login)
        .await?;

    let gateway: Arc<dyn BotGateway> = Arc::new(GrammersBotGateway::new(client));
    let limits = ExploreLimits {
        timeout: Duration::from_secs(cli.timeout),
        max_depth: cli.max_depth,
        max_buttons: cli.max_buttons,
    };
    let waits = WaitProfile {
        interaction_delay: Duration::from_millis(cfg.interaction_delay_ms_or_default()),
        ..WaitProfile::default()
    };
    info!(bot = %cli.bot, timeout = cli.timeout, max_depth = cli.max_depth,
        max_buttons = cli.max_buttons, "starting discovery");

    let mut report = ExplorerService::new(gateway, limits, waits)
        .run(&cli.bot)
        .await?;

    if cli.save {
        let store = FsReportStore::new(cfg.reports_dir());
        let path = store.save(&report).await?;
        report.saved_to = Some(path.display().to_string());
    }
    Ok(report)
}

/// Stdout carries exactly one JSON document per run, success or not.
fn print_report(report: &Report) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("{{\"ok\": false, \"error\": \"serialize report: {}\"}}", e),
    }
}
