//! drivesweep - search approved drives by file type and act on the results.
//!
//! Usage:
//!   drivesweep drives                               List mounted drives
//!   drivesweep search --approve DIR --ext mp3,flac  Search approved folders
//!   drivesweep copy --approve DIR --ext pdf --dest OUT
//!   drivesweep move --approve DIR --ext log --dest OUT
//!   drivesweep copy --approve DIR --ext mp3 --dest OUT --by-type  (into OUT/Music)
//!   drivesweep delete --approve DIR --ext tmp --yes
//!   drivesweep --help                               Show help
//!
//! Nothing is searched or touched unless it lies under an `--approve`d folder
//! (or every available drive with `--all-drives`). Ctrl-C stops a running
//! search at the next folder and a running batch before the next file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use drivesweep_core::{
    ApprovalSandbox, Drive, DriveCatalog, ExtensionCategory, FileRecord, SearchCriteria,
    SearchOptions, default_folder_name, parse_extension_list,
};
use drivesweep_ops::{
    BatchExecutor, ERROR_REPORT_LIMIT, OperationEvent, OperationOutcome, OperationRequest,
    start_execute,
};
use drivesweep_scan::{
    Scanner, SearchEvent, SearchStatistics, SearchSummary, export_csv, export_json, start_search,
};

#[derive(Parser)]
#[command(
    name = "drivesweep",
    version,
    about = "Sandboxed multi-drive file search with batch copy, move and delete",
    long_about = "drivesweep finds files by extension across the folders and drives you \
                  approve, then copies, moves or deletes the results.\n\n\
                  Paths outside the approved folders are never read or written."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List mounted drives
    Drives {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Search approved folders for file types
    Search {
        #[command(flatten)]
        search: SearchArgs,

        /// Write the results to a file (.csv or .json)
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Copy every match into a folder
    Copy {
        #[command(flatten)]
        search: SearchArgs,

        /// Destination folder (created if missing, must be approved)
        #[arg(short, long)]
        dest: PathBuf,

        /// Put files in a subfolder named after their type (Music, Images, ...)
        #[arg(long)]
        by_type: bool,
    },

    /// Move every match into a folder
    Move {
        #[command(flatten)]
        search: SearchArgs,

        /// Destination folder (created if missing, must be approved)
        #[arg(short, long)]
        dest: PathBuf,

        /// Put files in a subfolder named after their type (Music, Images, ...)
        #[arg(long)]
        by_type: bool,
    },

    /// Delete every match
    Delete {
        #[command(flatten)]
        search: SearchArgs,

        /// Send files to the trash instead of deleting them
        #[arg(long)]
        trash: bool,

        /// Actually delete (without this the matches are only listed)
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Approve a folder for searching and file operations (repeatable)
    #[arg(short, long = "approve", value_name = "DIR")]
    approve: Vec<PathBuf>,

    /// Approve every available drive
    #[arg(long)]
    all_drives: bool,

    /// Extensions to look for, e.g. "mp3,flac" or ".pdf .docx" (repeatable)
    #[arg(short = 'x', long = "ext", value_name = "LIST")]
    extensions: Vec<String>,

    /// Predefined set of extensions
    #[arg(short, long, value_parser = parse_category)]
    category: Option<ExtensionCategory>,

    /// Search only this approved folder
    #[arg(short, long)]
    scope: Option<PathBuf>,

    /// Do not descend into subfolders
    #[arg(long)]
    no_subfolders: bool,

    /// Skip well-known operating system folders
    #[arg(long)]
    exclude_system: bool,

    /// Skip folders matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Follow symbolic links
    #[arg(long)]
    follow_links: bool,

    /// Skip hidden files and folders
    #[arg(long)]
    no_hidden: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn parse_category(s: &str) -> Result<ExtensionCategory, String> {
    s.parse()
        .map_err(|_| format!("unknown category {s:?} (documents, music, images, videos, code)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping...");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Command::Drives { format } => run_drives(format)?,
        Command::Search {
            search,
            export,
            format,
        } => {
            run_search(&search, export, format, &cancel).await?;
        }
        Command::Copy {
            search,
            dest,
            by_type,
        } => {
            let dest = batch_destination(&search, dest, by_type)?;
            let (sandbox, records) = search_for_batch(&search, &cancel).await?;
            let request = OperationRequest::copy(records, dest);
            run_batch(sandbox, request, &cancel).await?;
        }
        Command::Move {
            search,
            dest,
            by_type,
        } => {
            let dest = batch_destination(&search, dest, by_type)?;
            let (sandbox, records) = search_for_batch(&search, &cancel).await?;
            let request = OperationRequest::move_to(records, dest);
            run_batch(sandbox, request, &cancel).await?;
        }
        Command::Delete { search, trash, yes } => {
            let (sandbox, records) = search_for_batch(&search, &cancel).await?;
            if !yes {
                for record in &records {
                    println!("{}", record.path.display());
                }
                eprintln!(
                    "{} files would be deleted. Run again with --yes to delete them.",
                    records.len()
                );
                return Ok(());
            }
            let mut request = OperationRequest::delete(records);
            if trash {
                request = request.with_trash();
            }
            run_batch(sandbox, request, &cancel).await?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// List drives.
fn run_drives(format: OutputFormat) -> Result<()> {
    let drives = DriveCatalog::new().list_drives();

    match format {
        OutputFormat::Text => {
            if drives.is_empty() {
                println!(" No drives found.");
            }
            for drive in &drives {
                println!(
                    " {}  ({} free, {})",
                    drive.display_name(),
                    format_size(drive.free_bytes),
                    drive.file_system
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&drives)?);
        }
    }

    Ok(())
}

/// Build the sandbox from `--approve` and `--all-drives`.
fn build_sandbox(args: &SearchArgs) -> Result<(Arc<ApprovalSandbox>, Vec<Drive>)> {
    let drives = DriveCatalog::new().list_drives();
    let sandbox = ApprovalSandbox::with_roots(&args.approve).context("Invalid folder")?;
    if args.all_drives {
        sandbox.approve_all(&drives);
    }
    if sandbox.is_empty() {
        bail!("Nothing approved: pass --approve DIR or --all-drives");
    }
    let roots = sandbox.list_approved_roots();
    tracing::debug!(
        roots = %roots.iter().map(|p| p.display()).join(", "),
        "sandbox ready"
    );
    Ok((Arc::new(sandbox), drives))
}

/// Turn the command line into search criteria.
fn build_criteria(args: &SearchArgs) -> Result<SearchCriteria> {
    let mut builder = SearchCriteria::builder();
    for list in &args.extensions {
        builder.extensions(parse_extension_list(list));
    }
    if let Some(category) = args.category {
        builder.extensions(category.extensions().iter().copied());
    }
    if let Some(ref scope) = args.scope {
        builder.scope(scope.clone());
    }
    builder.include_subfolders(!args.no_subfolders);
    builder
        .build()
        .context("Pass at least one extension with --ext or --category")
}

fn build_options(args: &SearchArgs) -> Result<SearchOptions> {
    let mut options = if args.exclude_system {
        SearchOptions::with_system_exclusions()
    } else {
        SearchOptions::default()
    };
    options.exclude_patterns.extend(args.exclude.iter().cloned());
    options.follow_symlinks = args.follow_links;
    options.include_hidden = !args.no_hidden;
    options.exclusion_set().context("Invalid --exclude pattern")?;
    Ok(options)
}

/// Run a search, streaming matches to `on_found`.
async fn stream_search(
    args: &SearchArgs,
    cancel: &CancellationToken,
    mut on_found: impl FnMut(&FileRecord),
) -> Result<(Arc<ApprovalSandbox>, Vec<FileRecord>, SearchSummary)> {
    let (sandbox, drives) = build_sandbox(args)?;
    let criteria = build_criteria(args)?;
    let scanner = Scanner::new(Arc::clone(&sandbox))
        .with_options(build_options(args)?)
        .with_drives(&drives);

    let mut events = start_search(Arc::new(scanner), criteria, cancel.clone());
    let mut records = Vec::new();
    let mut summary = None;

    while let Some(event) = events.recv().await {
        match event {
            SearchEvent::Found(record) => {
                on_found(&record);
                records.push(record);
            }
            SearchEvent::Progress(progress) => {
                tracing::trace!(
                    dir = %progress.current_dir.display(),
                    found = progress.files_found,
                    "searching"
                );
            }
            SearchEvent::Complete(result) => summary = Some(result.context("Search failed")?),
        }
    }

    let Some(summary) = summary else {
        bail!("Search ended without a result");
    };

    for warning in &summary.warnings {
        tracing::warn!("{warning}");
    }

    Ok((sandbox, records, summary))
}

/// Search and print the results.
async fn run_search(
    args: &SearchArgs,
    export: Option<PathBuf>,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let text = matches!(format, OutputFormat::Text);
    let (_, records, summary) = stream_search(args, cancel, |record| {
        if text {
            println!(
                " {:<40} {:>12}  {}  {}",
                record.name,
                record.display_size(),
                record.modified_local().format("%Y-%m-%d %H:%M"),
                record.path.display()
            );
        }
    })
    .await?;

    match format {
        OutputFormat::Text => {
            let stats = SearchStatistics::from_records(&records);
            println!();
            println!("{}", "─".repeat(70));
            println!(
                " {} files, {} in {:.2}s{}",
                summary.total_found,
                format_size(summary.total_bytes),
                summary.elapsed.as_secs_f64(),
                if summary.cancelled { " (stopped early)" } else { "" }
            );
            let breakdown = stats
                .top_extensions()
                .into_iter()
                .map(|(ext, s)| format!(".{ext}: {}", s.files))
                .join(", ");
            if !breakdown.is_empty() {
                println!(" {breakdown}");
            }
            if !summary.warnings.is_empty() {
                println!(" {} folder(s) could not be read", summary.warnings.len());
            }
            println!("{}", "─".repeat(70));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    if let Some(path) = export {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let rows = if is_json {
            export_json(&records, &path)?
        } else {
            export_csv(&records, &path)?
        };
        eprintln!("Exported {rows} rows to {}", path.display());
    }

    Ok(())
}

/// Search quietly and hand back what a batch should act on.
async fn search_for_batch(
    args: &SearchArgs,
    cancel: &CancellationToken,
) -> Result<(Arc<ApprovalSandbox>, Vec<FileRecord>)> {
    let (sandbox, records, summary) = stream_search(args, cancel, |_| {}).await?;
    if summary.cancelled {
        bail!("Search was stopped; nothing was changed");
    }
    eprintln!(
        "Found {} files ({})",
        records.len(),
        format_size(summary.total_bytes)
    );
    Ok((sandbox, records))
}

/// Destination folder, optionally sorted by the first requested extension.
fn batch_destination(args: &SearchArgs, dest: PathBuf, by_type: bool) -> Result<PathBuf> {
    if !by_type {
        return Ok(dest);
    }
    let criteria = build_criteria(args)?;
    let first = args
        .extensions
        .iter()
        .flat_map(|list| parse_extension_list(list))
        .next()
        .or_else(|| criteria.extensions.iter().next().cloned())
        .unwrap_or_default();
    Ok(dest.join(default_folder_name(&first)))
}

/// Execute a batch and print its outcome.
async fn run_batch(
    sandbox: Arc<ApprovalSandbox>,
    request: OperationRequest,
    cancel: &CancellationToken,
) -> Result<()> {
    if request.targets.is_empty() {
        println!(" Nothing to do.");
        return Ok(());
    }

    let executor = Arc::new(BatchExecutor::new(sandbox));
    let mut events = start_execute(executor, request, cancel.clone());
    let mut outcome = None;

    while let Some(event) = events.recv().await {
        match event {
            OperationEvent::Progress(progress) => {
                eprint!(
                    "\r {}/{} {:<50}",
                    progress.processed,
                    progress.total,
                    progress.current_file.as_deref().unwrap_or("")
                );
            }
            OperationEvent::Complete(result) => {
                eprintln!();
                outcome = Some(result.context("Operation rejected")?);
            }
        }
    }

    let Some(outcome) = outcome else {
        bail!("Operation ended without a result");
    };
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &OperationOutcome) {
    println!();
    println!(" {} ({})", outcome.summary(), format_size(outcome.bytes_processed));

    let report = outcome.error_report(ERROR_REPORT_LIMIT);
    if !report.is_empty() {
        println!();
        println!(" Errors:");
        for line in report.to_string().lines() {
            println!("   {line}");
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
