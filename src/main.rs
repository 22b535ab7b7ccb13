mod config;
mod event_log;
mod paths;
mod quota;
mod store;
mod tracker;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use config::QuotaConfig;
use quota::{DailyLimit, DayKey};
use store::QuotaStore;
use tracker::{Identity, QuotaTracker};

/// Exit code when the daily limit denies a view.
const EXIT_LIMIT_REACHED: i32 = 2;

#[derive(Parser)]
#[command(name = "quota")]
#[command(about = "Daily view quota tracker for the contact directory")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// User id of the signed-in principal (omit for anonymous, unlimited)
    #[arg(short, long)]
    user: Option<String>,

    /// Override the configured daily limit
    #[arg(short, long)]
    limit: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Attempt to open a contact's detail view
    View {
        /// The contact record id being opened
        record_id: String,
    },
    /// Show how many views are left today
    Remaining,
    /// List the contact ids viewed today
    Viewed,
    /// Delete persisted records for days other than today
    Prune,
}

fn effective_limit(cli_limit: Option<i64>) -> DailyLimit {
    match cli_limit {
        Some(raw) => DailyLimit::new(raw),
        None => QuotaConfig::load().daily_limit(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let identity = Identity::from_user_id(cli.user.as_deref());
    let limit = effective_limit(cli.limit);

    match cli.command {
        Command::View { record_id } => {
            let mut tracker = QuotaTracker::load(identity, limit, Local::now());
            let outcome = tracker.attempt_view(&record_id);
            match outcome.remaining {
                Some(remaining) if outcome.allowed => {
                    let note = if outcome.first_view { "" } else { " (already viewed today)" };
                    println!(
                        "Allowed{}: {} ({}/{} used, {} remaining)",
                        note,
                        record_id,
                        tracker.viewed_count(),
                        tracker.limit().get(),
                        remaining
                    );
                }
                Some(_) => {
                    println!(
                        "Denied: {} (daily limit of {} reached)",
                        record_id,
                        tracker.limit().get()
                    );
                    std::process::exit(EXIT_LIMIT_REACHED);
                }
                None => {
                    println!("Allowed: {} (anonymous, quota not enforced)", record_id);
                }
            }
        }
        Command::Remaining => {
            let tracker = QuotaTracker::load(identity, limit, Local::now());
            match tracker.remaining() {
                Some(remaining) => println!(
                    "{} remaining ({}/{} used today)",
                    remaining,
                    tracker.viewed_count(),
                    tracker.limit().get()
                ),
                None => println!("unlimited (anonymous, quota not enforced)"),
            }
        }
        Command::Viewed => {
            let tracker = QuotaTracker::load(identity, limit, Local::now());
            if tracker.limit_reached() {
                println!(
                    "Daily limit of {} reached; only contacts below can be re-opened.",
                    tracker.limit().get()
                );
            }
            for id in tracker.viewed_today() {
                println!("{}", id);
            }
        }
        Command::Prune => {
            let store = QuotaStore::open()?;
            let removed = store.prune(&DayKey::today())?;
            println!("Removed {} stale quota record(s)", removed);
        }
    }

    Ok(())
}
