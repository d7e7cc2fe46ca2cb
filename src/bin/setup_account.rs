//! setup-account - First-time setup for steam-history.
//!
//! Expects `config.toml` to already exist with the account's `steam_id` and
//! `session_id`. Reads the `steamLoginSecure` cookie, checks that the
//! trade-history page renders with it, and saves it to the config file.
//!
//! By default, reads the cookie interactively (hidden input) to avoid
//! leaking it into shell history. Use `--login-secure` only for scripted use.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;

use steam_history::config::{AppConfig, CONFIG_PATH};
use steam_history::fetch::CommunityClient;
use steam_history::history::{TradeHistoryOptions, get_trade_history};

#[derive(Parser)]
#[command(
    name = "setup-account",
    about = "Validate session cookies and save them to config.toml"
)]
struct Cli {
    /// Value of the steamLoginSecure cookie.
    /// If omitted, reads interactively with hidden input (recommended).
    #[arg(long)]
    login_secure: Option<String>,

    /// Value of the sessionid cookie, if it changed.
    #[arg(long)]
    session_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = Path::new(CONFIG_PATH);

    let mut app_config = AppConfig::load(config_path).with_context(|| {
        format!(
            "{} not found - create it with [account] steam_id and session_id first",
            config_path.display()
        )
    })?;

    println!("=== steam-history - Account Setup ===\n");

    // ── Step 1: Read cookies ───────────────────────────────────────
    let login_secure = match cli.login_secure {
        Some(value) => value,
        None => {
            let value = rpassword::prompt_password("Enter steamLoginSecure cookie: ")
                .context("failed to read cookie")?;
            if value.trim().is_empty() {
                bail!("cookie cannot be empty");
            }
            value.trim().to_string()
        }
    };
    app_config.account.login_secure = login_secure;
    if let Some(session_id) = cli.session_id {
        app_config.account.session_id = session_id;
    }

    // ── Step 2: Check the session renders history ──────────────────
    println!("Checking trade history for {}...", app_config.account.steam_id);
    let client = CommunityClient::new(&app_config)?;
    let options = TradeHistoryOptions {
        language: app_config.settings.language.clone(),
        ..Default::default()
    };
    let history = get_trade_history(&client, &client.profile_url(), &options)
        .await
        .context("trade history did not render - check the cookies")?;
    println!("  Session OK, newest page has {} event(s)", history.events.len());
    println!();

    // ── Step 3: Save ───────────────────────────────────────────────
    println!("Updating cookies in {}...", config_path.display());
    app_config.save(config_path)?;
    println!("  Config updated successfully");
    println!();

    println!("Next steps:");
    println!("  cargo run --bin steam-history -- trades --resolve-vanity --pages 3");
    println!("  cargo run --bin steam-history -- market --count 50");

    Ok(())
}
