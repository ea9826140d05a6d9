//! `timeline` CLI: build timelines, gaps, and event set algebra from JSON.
//!
//! Events are read as a JSON array of `{"id", "start", "end"}` records with
//! RFC 3339 timestamps.
//!
//! ## Usage
//!
//! ```sh
//! # Resolve overlapping events into one timeline (later events win)
//! timeline chain -i events.json
//!
//! # Free time between events, limited to a window with clipped edges
//! timeline gaps -i events.json --window-start 2026-03-02T09:00:00Z \
//!     --window-end 2026-03-02T17:00:00Z --edge truncated
//!
//! # Counts and durations
//! cat events.json | timeline stats
//!
//! # Events shared by two calendars
//! timeline combine -i work.json --with home.json --op intersection
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::io::{self, Read};
use timeline_engine::{select_window, EdgeMode, Event, EventCollection, TimeNode, TimeNodeChain};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "timeline",
    version,
    about = "Build consistent timelines and free-time gaps from calendar events"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve events into a non-overlapping timeline
    Chain {
        #[command(flatten)]
        source: Source,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the free-time gaps between timeline entries
    Gaps {
        #[command(flatten)]
        source: Source,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show node, overwrite, and duration statistics
    Stats {
        #[command(flatten)]
        source: Source,
    },
    /// Union or intersection of two event files
    Combine {
        #[command(flatten)]
        source: Source,
        /// Second event file
        #[arg(long)]
        with: String,
        /// Set operation to apply
        #[arg(long, value_enum, default_value_t = SetOp::Union)]
        op: SetOp,
    },
}

/// Where events come from and which of them to keep.
#[derive(Args)]
struct Source {
    /// Input JSON file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Start of the selection window (RFC 3339, or naive time read as UTC)
    #[arg(long, requires = "window_end")]
    window_start: Option<String>,
    /// End of the selection window
    #[arg(long, requires = "window_start")]
    window_end: Option<String>,
    /// Edge policy for events crossing the window: inclusive, exclusive, truncated
    #[arg(long, default_value = "inclusive")]
    edge: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum SetOp {
    Union,
    Intersection,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Chain { source, output } => {
            let chain = TimeNodeChain::from_nodes(load_events(&source)?)
                .context("Failed to build timeline")?;
            let nodes: Vec<&TimeNode> = chain.iter().collect();
            write_output(output.as_deref(), &serde_json::to_string_pretty(&nodes)?)?;
        }
        Commands::Gaps { source, output } => {
            let chain = TimeNodeChain::from_nodes(load_events(&source)?)
                .context("Failed to build timeline")?;
            let gaps = chain.inverse().context("Failed to compute gaps")?;
            let nodes: Vec<&TimeNode> = gaps.iter().collect();
            write_output(output.as_deref(), &serde_json::to_string_pretty(&nodes)?)?;
        }
        Commands::Stats { source } => {
            let events = load_events(&source)?;
            let event_count = events.len();
            let mut chain = TimeNodeChain::new();
            let overwritten = chain
                .insert_all_with_overwrites(events)
                .context("Failed to build timeline")?;
            let gaps = chain.inverse().context("Failed to compute gaps")?;

            println!("Events:       {}", event_count);
            println!("Nodes:        {}", chain.len());
            println!("Overwritten:  {}", overwritten.len());
            println!("Busy time:    {} s", chain.total_time().num_seconds());
            println!("Gaps:         {}", gaps.len());
            println!("Free time:    {} s", gaps.total_time().num_seconds());
        }
        Commands::Combine { source, with, op } => {
            let left = EventCollection::from_events(load_events(&source)?);
            let other = Source {
                input: Some(with),
                ..source
            };
            let right = EventCollection::from_events(load_events(&other)?);

            let combined = match op {
                SetOp::Union => left.union(&right),
                SetOp::Intersection => left.intersection(&right),
            };
            let mut members: Vec<TimeNode> = combined.events().into_iter().collect();
            members.sort_by(|a, b| {
                (a.start(), a.end(), a.id()).cmp(&(b.start(), b.end(), b.id()))
            });

            let report = json!({
                "name": combined.name(),
                "total_seconds": combined.total_time().num_seconds(),
                "events": members,
            });
            write_output(None, &serde_json::to_string_pretty(&report)?)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Read events and apply the window selection, if one was given.
///
/// The edge policy is validated even without a window so that a typo is
/// reported rather than ignored.
fn load_events(source: &Source) -> Result<Vec<TimeNode>> {
    let edge: EdgeMode = source.edge.parse()?;
    let json = read_input(source.input.as_deref())?;
    let events: Vec<TimeNode> =
        serde_json::from_str(&json).context("Failed to parse events JSON")?;
    debug!(count = events.len(), "loaded events");

    match (&source.window_start, &source.window_end) {
        (Some(start), Some(end)) => {
            let selected = select_window(&events, parse_datetime(start)?, parse_datetime(end)?, edge)?;
            debug!(kept = selected.len(), %edge, "applied window");
            Ok(selected)
        }
        _ => Ok(events),
    }
}

/// Parse an RFC 3339 timestamp, or a naive `%Y-%m-%dT%H:%M:%S` one as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .with_context(|| format!("Invalid datetime '{}'", s))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
