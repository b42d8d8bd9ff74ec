//! Diffscope comparison view, driven from the terminal.
//!
//! Reads line commands from stdin and prints view events to stdout. Logs go
//! to stderr.
//!
//! Usage:
//!   # Against a profile server
//!   cargo run -p diffscope-cli -- --url http://localhost:4040 --query 'app.cpu{}'
//!
//!   # Offline, from a JSON fixture
//!   cargo run -p diffscope-cli -- --fixture demo.json --query 'app{}'
//!
//!   # Settings from a RON file, flags override
//!   cargo run -p diffscope-cli -- --config view.ron --max-nodes 2048
//!
//!   # Write a starting config
//!   cargo run -p diffscope-cli -- --query 'app{}' --print-config > view.ron

mod commands;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, fmt};

use diffscope_client::{
    Fixture, HttpBackend, InMemoryBackend, QueryBackend, ViewConfig, ViewHandle, spawn_view,
};
use diffscope_types::{Side, TimeRange};

use commands::Command;

/// Compare two time windows of a profiling backend.
#[derive(Parser, Debug)]
#[command(name = "diffscope")]
#[command(about = "Side-by-side profile diff over two time windows")]
struct Args {
    /// RON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Profile server base URL
    #[arg(long)]
    url: Option<String>,

    /// Serve queries from a JSON fixture instead of a server
    #[arg(long, conflicts_with = "url")]
    fixture: Option<PathBuf>,

    /// Main query; fills whichever side has none
    #[arg(short, long)]
    query: Option<String>,

    /// Cap on nodes in the rendered diff
    #[arg(long)]
    max_nodes: Option<u32>,

    /// Baseline window as FROM..UNTIL (Unix seconds)
    #[arg(long, value_parser = parse_range)]
    left: Option<TimeRange>,

    /// Comparison window as FROM..UNTIL (Unix seconds)
    #[arg(long, value_parser = parse_range)]
    right: Option<TimeRange>,

    /// Print the resolved settings as RON and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_range(s: &str) -> Result<TimeRange, String> {
    let (from, until) = s.split_once("..").ok_or("expected FROM..UNTIL")?;
    let from = from.trim().parse().map_err(|_| format!("bad FROM: {from}"))?;
    let until = until.trim().parse().map_err(|_| format!("bad UNTIL: {until}"))?;
    Ok(TimeRange::new(from, until))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries events; keep logs on stderr
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    if args.print_config {
        print!("{}", config.to_ron()?);
        return Ok(());
    }

    let backend: Arc<dyn QueryBackend> = match &args.fixture {
        Some(path) => {
            tracing::info!(fixture = %path.display(), "Using in-memory backend");
            let fixture = Fixture::load(path)
                .with_context(|| format!("loading fixture {}", path.display()))?;
            Arc::new(InMemoryBackend::new(fixture))
        }
        None => {
            tracing::info!(url = %config.backend_url, "Using HTTP backend");
            Arc::new(HttpBackend::new(config.backend_url.clone(), config.request_timeout())?)
        }
    };

    let (view, mut events) = spawn_view(backend, &config);

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", output::event_line(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tracing::info!("diffscope ready, `help` lists commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let cmd = match commands::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        if !run_command(&view, cmd).await? {
            break;
        }
    }

    tracing::info!("diffscope shutting down");
    let _ = view.shutdown();
    drop(view);
    let _ = printer.await;
    Ok(())
}

fn build_config(args: &Args) -> Result<ViewConfig> {
    let mut config = match &args.config {
        Some(path) => ViewConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewConfig::default(),
    };
    if let Some(url) = &args.url {
        config.backend_url = url.clone();
    }
    if let Some(query) = &args.query {
        config.query = query.clone();
    }
    if let Some(max_nodes) = args.max_nodes {
        config.max_nodes = max_nodes;
    }
    if let Some(left) = args.left {
        config.left = left;
    }
    if let Some(right) = args.right {
        config.right = right;
    }
    Ok(config)
}

/// Returns false on `quit`.
async fn run_command(view: &ViewHandle, cmd: Command) -> Result<bool> {
    match cmd {
        Command::Select { side: Some(side), from, until } => view.select_range(side, from, until)?,
        Command::Select { side: None, from, until } => view.select_combined(from, until)?,
        Command::Query { side, query } => view.set_side_query(side, &query)?,
        Command::RootName { query } => view.select_root_name(&query)?,
        Command::MainQuery { query } => view.set_main_query(&query)?,
        Command::Label { side, label } => {
            let snap = view.snapshot().await?;
            let query = match side {
                Side::Left => snap.left_query,
                Side::Right => snap.right_query,
            };
            view.select_tag_label(side, &label, &query)?;
        }
        Command::MaxNodes(n) => view.set_max_nodes(n)?,
        Command::Refresh => view.refresh()?,
        Command::Dismiss => view.dismiss_error()?,
        Command::Show => print!("{}", output::snapshot_text(&view.snapshot().await?)),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}
