use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use slot_engine::{
    compute_availability, events_from_json, format_message, format_slot, parse_timezone,
    time::parse_rfc3339, AvailabilityConfig, SlotDescriptor,
};
use tracing_subscriber::EnvFilter;

const NO_SLOTS_MESSAGE: &str = "No available slots found in the selected time range.";

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Find open meeting slots in exported calendar events"
)]
struct Cli {
    /// Events JSON (array, array of arrays, or {"items": [...]}); "-" reads stdin
    #[arg(short, long, default_value = "-")]
    events: String,

    /// Meeting length in minutes
    #[arg(short, long, default_value_t = 30)]
    duration: u32,

    /// Number of working days to search
    #[arg(short = 'n', long, default_value_t = 5)]
    days: u32,

    /// First instant to consider (RFC 3339); defaults to now
    #[arg(long)]
    start: Option<String>,

    /// Settings JSON with filter, limit, timezone and working-hour preferences
    #[arg(long)]
    settings: Option<PathBuf>,

    /// IANA timezone for working hours (overrides settings)
    #[arg(short, long)]
    timezone: Option<String>,

    /// Count all-day events as busy
    #[arg(long)]
    include_all_day: bool,

    /// Count events without a location or meeting link as busy
    #[arg(long)]
    include_no_location: bool,

    /// Count events without attendees as busy
    #[arg(long)]
    include_no_participants: bool,

    /// Return at most this many slots (0 = unlimited)
    #[arg(long)]
    max_slots: Option<usize>,

    /// Spread limited slots across days
    #[arg(long)]
    diversify: bool,

    /// Booking page appended to the reply block (overrides settings)
    #[arg(long)]
    booking_link: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    /// Bulleted reply block, ready to paste
    Message,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotOutput {
    #[serde(flatten)]
    slot: SlotDescriptor,
    label: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let tz = parse_timezone(&config.timezone)?;
    let start = match &cli.start {
        Some(s) => parse_rfc3339(s).context("invalid --start")?,
        None => Utc::now(),
    };

    let raw = read_input(&cli.events)?;
    let json: serde_json::Value =
        serde_json::from_str(&raw).context("events input is not valid JSON")?;
    let events = events_from_json(&json);
    tracing::info!(events = events.len(), %start, days = cli.days, "computing availability");

    let slots = compute_availability(&events, cli.duration, start, cli.days, &config)?;

    match cli.format {
        OutputFormat::Text => {
            if slots.is_empty() {
                println!("{NO_SLOTS_MESSAGE}");
            }
            for slot in &slots {
                println!("{}", format_slot(slot, tz));
            }
        }
        OutputFormat::Json => {
            let output: Vec<SlotOutput> = slots
                .into_iter()
                .map(|slot| SlotOutput {
                    label: format_slot(&slot, tz),
                    slot,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Message => {
            let message = format_message(
                &slots,
                cli.duration,
                cli.days,
                tz,
                config.booking_link.as_deref(),
            );
            println!("{message}");
        }
    }

    Ok(())
}

/// Settings file first, then command-line flags on top.
fn build_config(cli: &Cli) -> Result<AvailabilityConfig> {
    let mut config = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => AvailabilityConfig::default(),
    };

    if let Some(tz) = &cli.timezone {
        config.timezone = tz.clone();
    }
    config.filter.include_all_day |= cli.include_all_day;
    config.filter.include_no_location |= cli.include_no_location;
    config.filter.include_no_participants |= cli.include_no_participants;
    if let Some(max) = cli.max_slots {
        config.limit.max_slots = max;
    }
    config.limit.diversify |= cli.diversify;
    if let Some(link) = &cli.booking_link {
        config.booking_link = Some(link.clone());
    }

    Ok(config)
}

fn load_settings(path: &Path) -> Result<AvailabilityConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse settings {}", path.display()))
}

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read events from stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(source).with_context(|| format!("failed to read events {source}"))
    }
}
