//! reclaimx - campus resource wastage reporting
//!
//! Operator CLI over the reclaimx core: register users, file reports, triage
//! their status and print per-resource analytics.

mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reclaimx_core::config::StorageConfig;
use reclaimx_core::{Config, Reclaim, ReportStatus, Resource};

use crate::output::Format;

#[derive(Parser)]
#[command(name = "reclaimx")]
#[command(about = "Report and triage campus resource wastage")]
#[command(version)]
struct Args {
    /// Directory holding users.csv and reports.csv (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },

    /// File a wastage report as an authenticated user
    Report {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum)]
        resource: ResourceArg,
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// List reports, optionally filtered
    List {
        #[arg(long, value_enum)]
        resource: Option<ResourceArg>,
        /// Only reports filed by this phone number
        #[arg(long)]
        phone: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Set the status of a report
    Status {
        id: u64,
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Per-resource reported/resolved/pending counts
    Summary {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Check whether any of a user's reports has been resolved
    Notice {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },

    /// Import users.csv / data.csv written by the previous version
    Import {
        #[arg(long)]
        users: Option<PathBuf>,
        #[arg(long)]
        reports: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ResourceArg {
    Electricity,
    Water,
    Infrastructure,
}

impl From<ResourceArg> for Resource {
    fn from(arg: ResourceArg) -> Self {
        match arg {
            ResourceArg::Electricity => Resource::Electricity,
            ResourceArg::Water => Resource::Water,
            ResourceArg::Infrastructure => Resource::Infrastructure,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Resolved,
}

impl From<StatusArg> for ReportStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => ReportStatus::Pending,
            StatusArg::Resolved => ReportStatus::Resolved,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        reclaimx_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let storage = match args.data_dir {
        Some(dir) => StorageConfig {
            data_dir: Some(dir),
            ..config.storage
        },
        None => config.storage,
    };

    tracing::info!(data_dir = %storage.data_dir().display(), "Opening tables");
    let app = Reclaim::open(&storage).context("failed to open record tables")?;

    run(&app, args.command)
}

fn run(app: &Reclaim, command: Command) -> Result<()> {
    match command {
        Command::Register {
            name,
            phone,
            password,
        } => {
            let session = app.register(&name, &phone, &password)?;
            println!("Registered {} ({})", session.name, session.phone);
        }

        Command::Report {
            phone,
            password,
            resource,
            location,
            description,
        } => {
            let session = app.login(&phone, &password)?;
            let report = app.submit_report(&session, resource.into(), &location, &description)?;
            println!("Submitted report {} ({})", report.id, report.resource);
        }

        Command::List {
            resource,
            phone,
            format,
        } => {
            let mut rows = match resource {
                Some(resource) => app.reports_by_resource(resource.into())?,
                None => app.all_reports()?,
            };
            if let Some(phone) = phone {
                rows.retain(|row| row.report.reporter_phone == phone);
            }
            output::print_reports(&rows, format)?;
        }

        Command::Status { id, status } => {
            let report = app
                .set_status(id, status.into())
                .with_context(|| format!("failed to update report {id}"))?;
            println!("Report {} is now {}", report.id, report.status);
        }

        Command::Summary { format } => {
            let dashboard = app.dashboard()?;
            output::print_summary(&dashboard, format)?;
        }

        Command::Notice { phone, password } => {
            let session = app.login(&phone, &password)?;
            if app.notice(&session)? {
                println!("One or more of your reported issues has been resolved.");
            } else {
                println!("No resolved reports yet.");
            }
        }

        Command::Import { users, reports } => {
            if users.is_none() && reports.is_none() {
                anyhow::bail!("nothing to import: pass --users and/or --reports");
            }
            let stats =
                reclaimx_core::import_legacy(app, users.as_deref(), reports.as_deref())
                    .context("legacy import failed")?;
            println!(
                "Imported {} user(s) and {} report(s); skipped {} existing user(s), {} existing report(s), {} malformed row(s)",
                stats.users_added,
                stats.reports_added,
                stats.users_existing,
                stats.reports_existing,
                stats.malformed
            );
        }
    }

    Ok(())
}
