//! CLI binary for docmerge-client.
//!
//! A thin shim over the library crate: every subcommand pulls the server
//! queue, applies one operation through the session, and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docmerge_client::{
    ClientConfig, DocumentInfo, MergeConfigUpdate, MergeError, MergeSession, Orientation,
    PageRef, PageSize, QueueChange, QueueObserver, QueueSnapshot,
};
use futures::future::AbortHandle;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Observer: report rollbacks on stderr ─────────────────────────────────────

struct CliObserver {
    quiet: bool,
}

impl QueueObserver for CliObserver {
    fn on_queue_changed(&self, change: &QueueChange, snapshot: &QueueSnapshot) {
        if self.quiet {
            return;
        }
        let what = match change {
            QueueChange::Added { id, .. } => format!("added {id}"),
            QueueChange::Removed { page, .. } => format!("removed {}", page.id),
            QueueChange::Moved { id, to, .. } => format!("moved {id} to {}", to + 1),
            QueueChange::Extended { ids } => format!("added {} pages", ids.len()),
            QueueChange::Toggled { added, removed, .. } if removed.is_empty() => {
                format!("selected {} pages", added.len())
            }
            QueueChange::Toggled { removed, .. } => format!("deselected {} pages", removed.len()),
            QueueChange::Cleared { previous } => format!("cleared {} pages", previous.len()),
            QueueChange::Replaced { .. } => return,
        };
        eprintln!(
            "{} {}  {}",
            green("✔"),
            what,
            dim(&format!("(queue: {} pages, v{})", snapshot.len(), snapshot.version))
        );
    }

    fn on_rolled_back(&self, _change: &QueueChange, error: &MergeError) {
        eprintln!("{} server refused the change; local queue rolled back", red("✗"));
        eprintln!("  {}", dim(&error.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show the server's merge queue
  docmerge queue

  # Pages are 1-indexed on the command line
  docmerge add doc-42 3
  docmerge range doc-42 1-10
  docmerge toggle doc-7

  # Move a queued page to the front
  docmerge move page-9f2c 1

  # Merge into A4 landscape with bookmarks
  docmerge execute --page-size a4 --orientation landscape --bookmarks --name report.pdf

ENVIRONMENT VARIABLES:
  DOCMERGE_BASE_URL          Service URL (default http://localhost:8000)
  DOCMERGE_API_PREFIX        API prefix (default /api/v1)
  DOCMERGE_TIMEOUT           Request timeout in seconds (default 30)
  DOCMERGE_EXECUTE_TIMEOUT   Merge deadline in seconds (default 300)
  RUST_LOG                   Override log filter
"#;

/// Build and run merge jobs on a document-processing service.
#[derive(Parser, Debug)]
#[command(
    name = "docmerge",
    version,
    about = "Build and run merge jobs on a document-processing service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Service base URL.
    #[arg(long, global = true, env = "DOCMERGE_BASE_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// Versioned API prefix.
    #[arg(long, global = true, env = "DOCMERGE_API_PREFIX", default_value = "/api/v1")]
    api_prefix: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "DOCMERGE_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Merge deadline in seconds.
    #[arg(long, global = true, env = "DOCMERGE_EXECUTE_TIMEOUT", default_value_t = 300)]
    execute_timeout: u64,

    /// Print JSON instead of a table.
    #[arg(long, global = true, env = "DOCMERGE_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCMERGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "DOCMERGE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the merge queue.
    Queue,
    /// List the selectable pages of a source document.
    Pages { document_id: String },
    /// Queue one page of a document (1-indexed).
    Add { document_id: String, page: usize },
    /// Remove a queued page by id.
    Remove { page_id: String },
    /// Queue a page range of a document, e.g. 3-15 (1-indexed, inclusive).
    Range { document_id: String, pages: String },
    /// Select all pages of a document, or deselect them if all are queued.
    Toggle { document_id: String },
    /// Move a queued page to a new position (1-indexed).
    Move { page_id: String, position: usize },
    /// Empty the merge queue.
    Clear,
    /// Show the merge preview.
    Preview,
    /// Merge the queue into one document.
    Execute(ExecuteArgs),
}

#[derive(clap::Args, Debug)]
struct ExecuteArgs {
    /// Page size: auto, a3, a4, a5, letter, legal.
    #[arg(long)]
    page_size: Option<PageSize>,

    /// Orientation: keep-original, portrait, landscape.
    #[arg(long)]
    orientation: Option<Orientation>,

    /// Output file name.
    #[arg(long)]
    name: Option<String>,

    /// Carry source bookmarks into the output.
    #[arg(long)]
    bookmarks: bool,

    /// Document title metadata.
    #[arg(long)]
    title: Option<String>,

    /// Document author metadata.
    #[arg(long)]
    author: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Session ──────────────────────────────────────────────────────────
    let config = ClientConfig::builder()
        .base_url(&cli.base_url)
        .api_prefix(&cli.api_prefix)
        .request_timeout_secs(cli.timeout)
        .execute_timeout_secs(cli.execute_timeout)
        .build()
        .context("Invalid configuration")?;

    let observer = Arc::new(CliObserver {
        quiet: cli.quiet || cli.json,
    });
    let session = MergeSession::connect(&config)
        .context("Failed to create HTTP client")?
        .with_observer(observer);
    let gateway = session.gateway();

    if !matches!(cli.command, Command::Pages { .. } | Command::Preview) {
        gateway.pull().await.context("Failed to fetch the merge queue")?;
    }

    match &cli.command {
        Command::Queue => print_pages(&gateway.snapshot(), cli.json)?,
        Command::Pages { document_id } => {
            let pages = gateway
                .document_pages(document_id)
                .await
                .with_context(|| format!("Failed to list pages of '{document_id}'"))?;
            print_pages(&pages, cli.json)?;
        }
        Command::Add { document_id, page } => {
            let index = one_based(*page)?;
            let pages = gateway
                .document_pages(document_id)
                .await
                .with_context(|| format!("Failed to list pages of '{document_id}'"))?;
            let selected = pages
                .into_iter()
                .find(|p| p.page_index == index)
                .with_context(|| format!("Document '{document_id}' has no page {page}"))?;
            let queue = gateway.push_add(selected).await.context("Failed to add page")?;
            finish(&queue, &cli)?;
        }
        Command::Remove { page_id } => {
            let queue = gateway
                .push_remove(page_id)
                .await
                .context("Failed to remove page")?;
            finish(&queue, &cli)?;
        }
        Command::Range { document_id, pages } => {
            let (start, end) = parse_range(pages)?;
            let queue = gateway
                .select_range(document_id, start, end)
                .await
                .context("Failed to select range")?;
            finish(&queue, &cli)?;
        }
        Command::Toggle { document_id } => {
            let pages = gateway
                .document_pages(document_id)
                .await
                .with_context(|| format!("Failed to list pages of '{document_id}'"))?;
            let queue = gateway
                .toggle_all(document_id, &pages)
                .await
                .context("Failed to toggle pages")?;
            finish(&queue, &cli)?;
        }
        Command::Move { page_id, position } => {
            let index = one_based(*position)?;
            let queue = gateway
                .push_reorder(page_id, index)
                .await
                .context("Failed to move page")?;
            finish(&queue, &cli)?;
        }
        Command::Clear => {
            let queue = gateway.push_clear().await.context("Failed to clear queue")?;
            finish(&queue, &cli)?;
        }
        Command::Preview => {
            let preview = session.preview().await.context("Failed to fetch preview")?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&preview).context("Failed to serialise preview")?
                );
            } else {
                for (i, page) in preview.pages.iter().enumerate() {
                    println!("{:>4}  {}", i + 1, page);
                }
            }
        }
        Command::Execute(args) => execute(&session, args, &cli).await?,
    }

    Ok(())
}

async fn execute(
    session: &MergeSession<docmerge_client::HttpBackend>,
    args: &ExecuteArgs,
    cli: &Cli,
) -> Result<()> {
    let mut update = MergeConfigUpdate::new();
    if let Some(size) = args.page_size {
        update = update.page_size(size);
    }
    if let Some(orientation) = args.orientation {
        update = update.orientation(orientation);
    }
    if let Some(ref name) = args.name {
        update = update.output_file_name(name.clone());
    }
    if args.bookmarks {
        update = update.include_bookmarks(true);
    }
    if args.title.is_some() || args.author.is_some() {
        update = update.metadata(Some(DocumentInfo {
            title: args.title.clone(),
            author: args.author.clone(),
            ..Default::default()
        }));
    }
    session.update_config(update);

    let spinner = if cli.quiet || cli.json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Merging");
        bar.set_message(format!("{} pages  (Ctrl-C to stop waiting)", session.gateway().len()));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    };

    // Ctrl-C stops waiting; the server may still finish the job.
    let (handle, registration) = AbortHandle::new_pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });

    let outcome = session.execute_cancellable(registration).await;
    ctrl_c.abort();
    spinner.finish_and_clear();

    let artifact = outcome.context("Merge failed")?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact).context("Failed to serialise result")?
        );
    } else {
        println!("{}", artifact.download_name);
        if !cli.quiet {
            eprintln!(
                "{} merged {} pages into {}",
                green("✔"),
                artifact.total_pages,
                bold(&artifact.download_name)
            );
            for warning in &artifact.warnings {
                eprintln!("  {} {}", red("⚠"), warning);
            }
        }
    }
    Ok(())
}

/// Print the queue after a mutation (JSON only; the observer already reported it).
fn finish(queue: &QueueSnapshot, cli: &Cli) -> Result<()> {
    if cli.json {
        print_pages(queue, true)?;
    }
    Ok(())
}

fn print_pages(pages: &[PageRef], json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(pages).context("Failed to serialise pages")?
        );
        return Ok(());
    }
    if pages.is_empty() {
        eprintln!("{}", dim("(empty)"));
        return Ok(());
    }
    for (i, page) in pages.iter().enumerate() {
        let name = if page.original_document_name.is_empty() {
            &page.document_id
        } else {
            &page.original_document_name
        };
        println!(
            "{:>4}  {:<24}  {} p.{:<4} {}",
            i + 1,
            page.id,
            name,
            page.page_index + 1,
            dim(&page.rotation.to_string()),
        );
    }
    Ok(())
}

/// Convert a 1-indexed CLI position to a zero-based index.
fn one_based(n: usize) -> Result<usize> {
    if n < 1 {
        anyhow::bail!("Positions are 1-indexed, minimum is 1 (got {})", n);
    }
    Ok(n - 1)
}

/// Parse `3-15` or `7` (1-indexed, inclusive) into a zero-based range.
fn parse_range(s: &str) -> Result<(usize, usize)> {
    let s = s.trim();
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start.trim().parse().context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }
        return Ok((one_based(start)?, one_based(end)?));
    }
    let page: usize = s.parse().context("Invalid page number")?;
    let index = one_based(page)?;
    Ok((index, index))
}
