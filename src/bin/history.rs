use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use steam_history::config::{AppConfig, CONFIG_PATH};
use steam_history::fetch::CommunityClient;
use steam_history::history::{TradeHistoryOptions, get_trade_history};
use steam_history::market::{MarketHistoryOptions, get_market_apps, get_market_history};
use steam_history::paging::{HistoryPosition, PagingProtocol, next_position};
use steam_history::reporter;

#[derive(Parser)]
#[command(name = "steam-history", about = "Steam Community trade and market history extractor")]
struct Args {
    /// Path to the TOML config with session cookies
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trade/inventory history of the configured account
    Trades {
        /// Start from this epoch second (cursor protocol)
        #[arg(long, conflicts_with = "after_time")]
        start_time: Option<i64>,

        /// Start after this trade time (boundary protocol)
        #[arg(long, requires = "after_trade")]
        after_time: Option<String>,

        /// Start after this trade id (boundary protocol)
        #[arg(long, requires = "after_time")]
        after_trade: Option<String>,

        /// Walk backwards from the boundary instead of forwards
        #[arg(long, requires = "after_time")]
        prev: bool,

        /// Paging protocol to expect
        #[arg(long, value_enum, default_value_t = PagingProtocol::Auto)]
        protocol: PagingProtocol,

        /// Resolve vanity profile names to SteamIDs
        #[arg(long)]
        resolve_vanity: bool,

        /// Number of pages to follow
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Community Market history of the configured account
    Market {
        #[arg(long)]
        count: Option<u32>,

        #[arg(long)]
        start: Option<u32>,

        /// Resolve vanity profile names to SteamIDs
        #[arg(long)]
        resolve_vanity: bool,
    },

    /// List apps with items on the Community Market
    Apps,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AppConfig::load(&args.config)?;
    info!("Loaded config from {}", args.config.display());
    if config.account.login_secure.is_empty() {
        warn!("No steamLoginSecure cookie configured; run setup-account first");
    }
    let client = CommunityClient::new(&config).context("failed to build HTTP client")?;
    let settings = &config.settings;

    match args.command {
        Command::Trades {
            start_time,
            after_time,
            after_trade,
            prev,
            protocol,
            resolve_vanity,
            pages,
        } => {
            let position = match (start_time, after_time, after_trade) {
                (Some(t), _, _) => HistoryPosition::StartTime(t),
                (None, Some(time), Some(trade_id)) => HistoryPosition::After {
                    time,
                    trade_id,
                    previous: prev,
                },
                _ => HistoryPosition::Newest,
            };
            let mut options = TradeHistoryOptions {
                position,
                protocol,
                resolve_vanity_urls: resolve_vanity,
                resolve_concurrency: settings.resolve_concurrency,
                language: settings.language.clone(),
            };

            let profile = client.profile_url();
            let mut total = 0usize;
            let mut last = None;
            for page in 1..=pages.max(1) {
                let history = get_trade_history(&client, &profile, &options)
                    .await
                    .with_context(|| format!("failed to read trade history page {page}"))?;
                info!("Page {page}: {} event(s)", history.events.len());
                total += history.events.len();
                for event in &history.events {
                    reporter::report_event(event);
                }

                let next = next_position(&history.pagination);
                last = Some(json!({
                    "pagination": history.pagination,
                    "startTime": history.start_time,
                }));
                match next {
                    Some(position) => options.position = position,
                    None => {
                        info!("Reached the end of trade history");
                        break;
                    }
                }
            }
            reporter::report_summary(&json!({ "events": total, "last_page": last }));
        }

        Command::Market {
            count,
            start,
            resolve_vanity,
        } => {
            let options = MarketHistoryOptions {
                count,
                start,
                resolve_vanity_urls: resolve_vanity,
                resolve_concurrency: settings.resolve_concurrency,
            };
            let history = get_market_history(&client, &options)
                .await
                .context("failed to read market history")?;
            info!(
                "Market history: {} event(s), {} of {} from {}",
                history.events.len(),
                history.pagesize,
                history.total_count,
                history.start
            );
            for event in &history.events {
                reporter::report_event(event);
            }
            reporter::report_summary(&json!({
                "pagesize": history.pagesize,
                "total_count": history.total_count,
                "start": history.start,
            }));
        }

        Command::Apps => {
            let apps = get_market_apps(&client)
                .await
                .context("failed to read market app list")?;
            info!("Found {} market app(s)", apps.len());
            reporter::report_summary(&apps);
        }
    }

    Ok(())
}
