//! cxboard - Voice agent CX dashboard in the terminal

mod cli;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cxboard_core::analytics::DashboardReport;
use cxboard_core::config::DashboardConfig;
use cxboard_core::filter::{self, RecordQuery};
use cxboard_core::selection::{JsonFileStore, KeyValueStore, MemoryStore, SelectionState};
use cxboard_core::store::RecordStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use cli::{parse_category, parse_period, parse_time_bounds};

#[derive(Parser)]
#[command(
    name = "cxboard",
    version,
    about = "Voice agent CX dashboard",
    long_about = "KPI tiles, intent breakdowns, trends and call history for voice agent calls.\n\
                  \n\
                  The selected date, period and category are remembered between runs. A new\n\
                  session moves the date back to today and keeps the period and category.\n\
                  \n\
                  Examples:\n\
                    cxboard                                  # Report for the current selection\n\
                    cxboard report --date 2025-10-23         # Report for one day\n\
                    cxboard report --period week             # Switch to the week around the date\n\
                    cxboard calls --from 09:00 --to 12:00    # Morning calls\n\
                    cxboard calls --search \"john smith\"      # Search caller, agent, transcript\n\
                    cxboard select --reset                   # Back to today, by day, all intents\n\
                    cxboard export --format csv --output calls.csv\n\
                  \n\
                  Environment Variables:\n\
                    CXBOARD_CONFIG                   # Config file (default: <config dir>/cxboard/config.toml)\n\
                    CXBOARD_RECORDS                  # JSON record file replacing the built-in calls\n\
                    CXBOARD_STATE_DIR                # Where the selection is saved\n\
                    CXBOARD_SESSION                  # Session id; reuse it to keep the saved date\n\
                    CXBOARD_FORMAT                   # Force output format: json|table\n\
                    CXBOARD_NO_COLOR                 # Disable ANSI colors (log-friendly)\n\
                    RUST_LOG                         # Log filter for stderr (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Config file path
    #[arg(long, env = "CXBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// JSON record file (default: built-in calls)
    #[arg(long, env = "CXBOARD_RECORDS")]
    records: Option<PathBuf>,

    /// Directory holding the saved selection
    #[arg(long, env = "CXBOARD_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Session id (default: process id, so every run is a new session)
    #[arg(long, env = "CXBOARD_SESSION")]
    session: Option<String>,

    /// Override today's date (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Force output format (json|table)
    #[arg(long, env = "CXBOARD_FORMAT", value_parser = ["json", "table"])]
    format: Option<String>,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "CXBOARD_NO_COLOR")]
    no_color: bool,
}

/// Flags that change the persisted selection before a command runs
#[derive(Args, Default)]
struct SelectionArgs {
    /// Anchor date: YYYY-MM-DD, YYYY-MM (month) or YYYY-Www (week)
    #[arg(long, short = 'd')]
    date: Option<String>,
    /// Period granularity: day, week or month
    #[arg(long, short = 'p')]
    period: Option<String>,
    /// Intent filter: all, an intent label or a slug (fraud, balance, tnc, ...)
    #[arg(long, short = 'c')]
    category: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Mode {
    /// KPI tiles and intent breakdown for the selection (default)
    Report {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Call history for the selection
    Calls {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Earliest time of day (HH:MM)
        #[arg(long)]
        from: Option<String>,
        /// Latest time of day (HH:MM); earlier than --from wraps past midnight
        #[arg(long)]
        to: Option<String>,
        /// Case-insensitive text search over caller, agent and transcript
        #[arg(long, short = 's')]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change the saved selection
    Select {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Reset to today, by day, all intents
        #[arg(long)]
        reset: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hourly, daily and week-of-month series for the selection
    Trends {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the selection's calls or report to a file
    Export {
        #[command(flatten)]
        selection: SelectionArgs,
        /// File format
        #[arg(long, value_enum)]
        format: ExportFormat,
        /// Destination file
        #[arg(long, short = 'o')]
        output: PathBuf,
        /// Export the computed report instead of the calls (JSON only)
        #[arg(long)]
        report: bool,
    },
}

/// Everything a command needs, resolved from flags, env and config
struct AppContext {
    config: DashboardConfig,
    store: RecordStore,
    state: SelectionState<Box<dyn KeyValueStore>>,
    today: NaiveDate,
    force_json: bool,
    no_color: bool,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    init_tracing();

    let force_json = cli.format.as_deref() == Some("json");
    let no_color = cli.no_color;
    let mode = cli.mode.take().unwrap_or(Mode::Report {
        selection: SelectionArgs::default(),
        json: false,
    });
    let mut ctx = build_context(cli, force_json, no_color)?;

    match mode {
        Mode::Report { selection, json } => {
            apply_selection(&mut ctx, &selection)?;
            run_report(&ctx, json)?;
        }
        Mode::Calls {
            selection,
            from,
            to,
            search,
            json,
        } => {
            apply_selection(&mut ctx, &selection)?;
            run_calls(&ctx, from.as_deref(), to.as_deref(), search.as_deref(), json)?;
        }
        Mode::Select {
            selection,
            reset,
            json,
        } => {
            if reset {
                ctx.state.reset(ctx.today);
            }
            apply_selection(&mut ctx, &selection)?;
            run_select(&ctx, json)?;
        }
        Mode::Trends { selection, json } => {
            apply_selection(&mut ctx, &selection)?;
            run_trends(&ctx, json)?;
        }
        Mode::Export {
            selection,
            format,
            output,
            report,
        } => {
            apply_selection(&mut ctx, &selection)?;
            run_export(&ctx, format, &output, report)?;
        }
    }

    Ok(())
}

/// Log to stderr so table and JSON output on stdout stay clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_context(cli: Cli, force_json: bool, no_color: bool) -> Result<AppContext> {
    let config_path = cli.config.or_else(DashboardConfig::default_path);
    let config = match config_path {
        Some(path) => DashboardConfig::load(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => DashboardConfig::default(),
    };

    let store = match cli.records.or_else(|| config.records_path.clone()) {
        Some(path) => {
            let (store, report) = RecordStore::load_from_file(&path)
                .with_context(|| format!("Failed to load call records: {}", path.display()))?;
            if report.has_errors() {
                eprintln!(
                    "Skipped {} of {} records in {}:",
                    report.records_skipped,
                    report.records_skipped + report.records_loaded,
                    path.display()
                );
                for error in report.errors.iter().take(5) {
                    eprintln!("  - {}: {}", error.source, error.message);
                    if let Some(suggestion) = &error.suggestion {
                        eprintln!("    {}", suggestion);
                    }
                }
            }
            store
        }
        None => RecordStore::builtin(),
    };

    let state_dir = cli.state_dir.or_else(|| config.state_dir());
    let (persistent, mut session): (Box<dyn KeyValueStore>, Box<dyn KeyValueStore>) =
        match state_dir {
            Some(dir) => (
                Box::new(JsonFileStore::new(dir.join("selection.json"))),
                Box::new(JsonFileStore::new(dir.join("session.json"))),
            ),
            None => {
                tracing::warn!("No state directory available, selection will not be saved");
                (Box::new(MemoryStore::new()), Box::new(MemoryStore::new()))
            }
        };

    let session_id = cli
        .session
        .unwrap_or_else(|| std::process::id().to_string());
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let state = SelectionState::load(persistent, session.as_mut(), &session_id, today);

    Ok(AppContext {
        config,
        store,
        state,
        today,
        force_json,
        no_color,
    })
}

/// Apply --period, then --date (read in the new period's format), then --category
fn apply_selection(ctx: &mut AppContext, args: &SelectionArgs) -> Result<()> {
    if let Some(period) = &args.period {
        ctx.state.set_granularity(parse_period(period)?);
    }
    if let Some(date) = &args.date {
        let granularity = ctx.state.selection().granularity;
        ctx.state
            .set_date_str(date)
            .with_context(|| format!("Invalid --date for period {}", granularity))?;
    }
    if let Some(category) = &args.category {
        ctx.state.set_category(parse_category(category)?);
    }
    Ok(())
}

fn compute_report(ctx: &AppContext, time_of_day: filter::TimeOfDayBounds) -> Result<DashboardReport> {
    let report = DashboardReport::compute(
        &ctx.store,
        ctx.state.selection(),
        time_of_day,
        &ctx.config.thresholds,
        ctx.today,
    )
    .context("Failed to compute report")?;
    Ok(report)
}

fn run_report(ctx: &AppContext, json: bool) -> Result<()> {
    let report = compute_report(ctx, Default::default())?;
    println!(
        "{}",
        cli::format_report(&report, json || ctx.force_json, ctx.no_color)
    );
    if !(json || ctx.force_json) {
        println!(
            "\nCalls today ({}): {}",
            ctx.today,
            filter::calls_on_date(&ctx.store, ctx.today)
        );
    }
    Ok(())
}

fn run_calls(
    ctx: &AppContext,
    from: Option<&str>,
    to: Option<&str>,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    let bounds = parse_time_bounds(from, to)?;
    let selection = ctx.state.selection();
    let range = ctx.state.range().context("Failed to compute selection range")?;

    let query = RecordQuery::new(range)
        .with_category(selection.category)
        .with_time_of_day(bounds);
    let mut records = filter::apply(&ctx.store, &query);
    if let Some(text) = search {
        records = filter::search(&records, text);
    }

    let json = json || ctx.force_json;
    if !json {
        println!(
            "{}{}\n",
            cli::describe_selection(selection, &range),
            if bounds.is_full_day() {
                String::new()
            } else {
                format!(", {}", bounds)
            }
        );
    }
    println!("{}", cli::format_calls_table(&records, json, ctx.no_color));
    Ok(())
}

fn run_select(ctx: &AppContext, json: bool) -> Result<()> {
    let range = ctx.state.range().context("Failed to compute selection range")?;
    println!(
        "{}",
        cli::format_selection(
            ctx.state.selection(),
            &range,
            ctx.state.is_persisting(),
            json || ctx.force_json
        )
    );
    Ok(())
}

fn run_trends(ctx: &AppContext, json: bool) -> Result<()> {
    let report = compute_report(ctx, Default::default())?;
    println!(
        "{}",
        cli::format_trends(&report, json || ctx.force_json, ctx.no_color)
    );
    Ok(())
}

fn run_export(
    ctx: &AppContext,
    format: ExportFormat,
    output: &Path,
    as_report: bool,
) -> Result<()> {
    if as_report {
        if let ExportFormat::Csv = format {
            anyhow::bail!("--report is only available with --format json");
        }
        let report = compute_report(ctx, Default::default())?;
        cxboard_core::export_report_to_json(&report, output)?;
        println!("Exported report {} to {}", report.anchor_key, output.display());
        return Ok(());
    }

    let range = ctx.state.range().context("Failed to compute selection range")?;
    let records = filter::filter_records(
        &ctx.store,
        &range,
        ctx.state.selection().category,
        Default::default(),
    );
    match format {
        ExportFormat::Csv => cxboard_core::export_records_to_csv(&records, output)?,
        ExportFormat::Json => cxboard_core::export_records_to_json(&records, output)?,
    }
    println!("Exported {} calls to {}", records.len(), output.display());
    Ok(())
}
