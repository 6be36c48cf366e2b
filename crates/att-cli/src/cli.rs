//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Attendance tracker.
///
/// Records check-ins and check-outs, reconstructs work sessions and reports
/// daily working time, policy violations and monthly presence.
#[derive(Debug, Parser)]
#[command(name = "att", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a check-in.
    CheckIn(RecordArgs),

    /// Record a check-out.
    CheckOut(RecordArgs),

    /// Check several subjects in or out on their behalf.
    #[command(subcommand)]
    Bulk(BulkAction),

    /// Import events as JSON Lines from stdin.
    Import,

    /// Show whether subjects are currently working.
    Status {
        /// Only show this subject.
        #[arg(long)]
        subject: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one subject's working time and policy flags for a date.
    Day {
        #[arg(long)]
        subject: String,

        /// Date in the reference timezone (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the monthly presence grid.
    Month {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u32,

        /// Only show this subject.
        #[arg(long)]
        subject: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export events as CSV to stdout.
    Export {
        /// First date to include (YYYY-MM-DD, reference timezone).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to include (YYYY-MM-DD, reference timezone).
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Follow one subject's working time for today until interrupted.
    Watch {
        #[arg(long)]
        subject: String,
    },

    /// Manage proxy subjects.
    #[command(subcommand)]
    Proxy(ProxyAction),

    /// Show or change working hours.
    #[command(subcommand)]
    Policy(PolicyAction),
}

/// Arguments for a single check-in or check-out.
#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Subject key (e.g. an email address).
    #[arg(long)]
    pub subject: String,

    /// Display name. Defaults to the subject key.
    #[arg(long)]
    pub name: Option<String>,

    /// When it happened: ISO 8601 or relative ("2 hours ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,

    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Human-readable address.
    #[arg(long)]
    pub address: Option<String>,
}

/// Bulk actions.
#[derive(Debug, Subcommand)]
pub enum BulkAction {
    /// Check every listed subject in.
    CheckIn(BulkArgs),

    /// Check every listed subject out.
    CheckOut(BulkArgs),
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    /// Subject performing the action.
    #[arg(long)]
    pub actor: String,

    /// Target subjects.
    #[arg(long = "subject", required = true, num_args = 1..)]
    pub subjects: Vec<String>,

    /// When it happened: ISO 8601 or relative ("2 hours ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,

    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    #[arg(long)]
    pub address: Option<String>,
}

/// Proxy management actions.
#[derive(Debug, Subcommand)]
pub enum ProxyAction {
    /// Register a proxy subject recorded through an employee.
    Add {
        /// Proxy subject key.
        #[arg(long)]
        proxy: String,

        /// Employee the proxy is recorded through.
        #[arg(long)]
        delegating: String,

        /// Display label.
        #[arg(long)]
        label: String,
    },

    /// List registered proxies.
    List {
        /// Only proxies recorded through this employee.
        #[arg(long)]
        delegating: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Working hours actions.
#[derive(Debug, Subcommand)]
pub enum PolicyAction {
    /// Show the working hours in force.
    Show,

    /// Replace the working hours.
    Set {
        /// Check-ins after this time are late (HH:MM).
        #[arg(long)]
        start: String,

        /// Check-outs before this time are early (HH:MM).
        #[arg(long)]
        end: String,
    },
}
