use std::path::Path;

use anyhow::{Context, Result};
use att_core::{EventKind, SystemClock};
use chrono_tz::Tz;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use att_cli::commands::{bulk, day, export, import, month, policy, proxy, record, status, watch};
use att_cli::{BulkAction, Cli, Commands, Config, PolicyAction, ProxyAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(att_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = att_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn reference_zone(config: &Config) -> Result<Tz> {
    config.zone().context("invalid reference timezone")
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::CheckIn(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            record::run(&mut db, EventKind::CheckIn, args)?;
        }
        Some(Commands::CheckOut(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            record::run(&mut db, EventKind::CheckOut, args)?;
        }
        Some(Commands::Bulk(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                BulkAction::CheckIn(args) => bulk::run(&mut db, EventKind::CheckIn, args)?,
                BulkAction::CheckOut(args) => bulk::run(&mut db, EventKind::CheckOut, args)?,
            }
        }
        Some(Commands::Import) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            import::run(&mut db)?;
        }
        Some(Commands::Status { subject, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let zone = reference_zone(&config)?;
            status::run(&db, subject.as_deref(), *json, zone)?;
        }
        Some(Commands::Day {
            subject,
            date,
            json,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let zone = reference_zone(&config)?;
            day::run(&db, subject, *date, *json, zone, &SystemClock)?;
        }
        Some(Commands::Month {
            year,
            month: month_number,
            subject,
            json,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let zone = reference_zone(&config)?;
            month::run(
                &db,
                *year,
                *month_number,
                subject.as_deref(),
                *json,
                zone,
                &config.thresholds(),
            )?;
        }
        Some(Commands::Export { from, to }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let zone = reference_zone(&config)?;
            export::run(&db, *from, *to, zone)?;
        }
        Some(Commands::Watch { subject }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let zone = reference_zone(&config)?;
            watch::run(db, subject, zone, config.refresh_interval())?;
        }
        Some(Commands::Proxy(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                ProxyAction::Add {
                    proxy: proxy_subject,
                    delegating,
                    label,
                } => proxy::run_add(&mut db, proxy_subject, delegating, label)?,
                ProxyAction::List { delegating, json } => {
                    proxy::run_list(&db, delegating.as_deref(), *json)?;
                }
            }
        }
        Some(Commands::Policy(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                PolicyAction::Show => policy::run_show(&db)?,
                PolicyAction::Set { start, end } => policy::run_set(&mut db, start, end)?,
            }
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
