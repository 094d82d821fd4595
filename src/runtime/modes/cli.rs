//! CLI mode
//!
//! Admin commands run directly against the configured store through
//! [`AdminService`], the same code path as the `/admin` routes.

use anyhow::{Context, Result, bail};
use chrono::DateTime;
use colored::Colorize;
use std::path::Path;

use crate::cli::{Commands, ConfigCommands};
use crate::config::StaticConfig;
use crate::runtime::lifetime;
use crate::services::{ActiveItem, AdminService, HwidSnapshot};
use crate::utils::non_blank;

const DEFAULT_SAMPLE_PATH: &str = "config.example.toml";

/// Run one non-server command
pub async fn run_cli(cmd: Commands, config: &StaticConfig) -> Result<()> {
    match cmd {
        Commands::Serve => bail!("serve is not a CLI command"),
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => config_generate(output_path.as_deref(), force),
        Commands::Actives => {
            let admin = admin_service(config).await?;
            print_actives(&admin.list_actives().await?);
            Ok(())
        }
        Commands::Inspect { hwid } => {
            let hwid = hwid_arg(&hwid)?;
            let admin = admin_service(config).await?;
            print_snapshot(&admin.inspect(hwid).await?);
            Ok(())
        }
        Commands::Blacklist { hwid, reason } => {
            let hwid = hwid_arg(&hwid)?;
            let admin = admin_service(config).await?;
            let entry = admin.blacklist(hwid, reason.as_deref()).await?;
            println!(
                "{} {} ({})",
                "Blacklisted".red().bold(),
                hwid.cyan(),
                entry.reason
            );
            Ok(())
        }
        Commands::Unblacklist { hwid } => {
            let hwid = hwid_arg(&hwid)?;
            let admin = admin_service(config).await?;
            if admin.unblacklist(hwid).await? {
                println!("{} {}", "Unblacklisted".green().bold(), hwid.cyan());
            } else {
                println!("{} {} was not blacklisted", "Note:".yellow(), hwid.cyan());
            }
            Ok(())
        }
        Commands::Kick { hwid, reason } => {
            let hwid = hwid_arg(&hwid)?;
            let admin = admin_service(config).await?;
            let signal = admin.kick(hwid, reason.as_deref()).await?;
            println!(
                "{} {} ({})",
                "Kicked".yellow().bold(),
                hwid.cyan(),
                signal.reason
            );
            Ok(())
        }
    }
}

/// Trimmed HWID, the same normalisation the HTTP routes apply
fn hwid_arg(raw: &str) -> Result<&str> {
    match non_blank(Some(raw)) {
        Some(hwid) => Ok(hwid),
        None => bail!("HWID must not be blank"),
    }
}

async fn admin_service(config: &StaticConfig) -> Result<AdminService> {
    lifetime::startup::prepare_admin(config).await
}

fn config_generate(output_path: Option<&str>, force: bool) -> Result<()> {
    let path = output_path.unwrap_or(DEFAULT_SAMPLE_PATH);
    if Path::new(path).exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path);
    }

    StaticConfig::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path))?;
    println!("{} {}", "Sample configuration written to".green(), path);
    Ok(())
}

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_ttl(ttl_secs: Option<u64>) -> String {
    match ttl_secs {
        Some(secs) => format!("{}s left", secs),
        None => "no expiry".to_string(),
    }
}

fn print_actives(items: &[ActiveItem]) {
    if items.is_empty() {
        println!("{}", "No active leases".dimmed());
        return;
    }

    println!("{} active lease(s)", items.len().to_string().bold());
    for item in items {
        println!(
            "  {}  {:>6}s left  expires {}",
            item.hwid.cyan(),
            item.seconds_left,
            format_millis(item.expires_at)
        );
    }
}

fn print_snapshot(snapshot: &HwidSnapshot) {
    println!("{} {}", "HWID".bold(), snapshot.hwid.cyan());
    if snapshot.is_empty() {
        println!("  {}", "no stored state".dimmed());
        return;
    }

    if let Some(pending) = &snapshot.pending {
        println!(
            "  {:<10} link {} ({})",
            "pending".yellow(),
            pending.record.delivery_url,
            format_ttl(pending.ttl_secs)
        );
    }
    if let Some(active) = &snapshot.active {
        println!(
            "  {:<10} activated {} expires {} ({})",
            "active".green(),
            format_millis(active.record.activated_at),
            format_millis(active.record.expires_at),
            format_ttl(active.ttl_secs)
        );
    }
    if let Some(entry) = &snapshot.blacklist {
        println!(
            "  {:<10} {} since {}",
            "blacklist".red(),
            entry.record.reason,
            format_millis(entry.record.at)
        );
    }
    if let Some(kick) = &snapshot.kick {
        println!(
            "  {:<10} {} ({})",
            "kick".magenta(),
            kick.record.reason,
            format_ttl(kick.ttl_secs)
        );
    }
}
