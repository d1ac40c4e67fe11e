//! twinfold - Find duplicate files and merge structurally similar folders.
//!
//! Usage:
//!   twinfold duplicates [PATH]        Group files by hash, size, name or date
//!   twinfold similar [PATH]           Group subfolders with matching layouts
//!   twinfold merge PRIMARY SECONDARY  Move a folder's files into another
//!   twinfold sizes [PATH]             List files largest first
//!   twinfold archive FILE...          Zip selected files
//!   twinfold delete FILE... --yes     Permanently delete selected files
//!   twinfold mkdirs BASE NAME...      Create folders from a list
//!   twinfold cache [PATH]             Inspect or clear the index cache

mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use itertools::Itertools;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use twinfold_analyze::{
    DuplicateFinder, SimilarityConfig, SimilarityEstimator, SizeUnit, candidate_folders,
    list_files_by_size,
};
use twinfold_core::{FingerprintMethod, MethodSet, ScanWarning, describe_modified_key};
use twinfold_ops::{
    ARCHIVE_FILE_NAME, ConflictResolution, MergeAction, MergeOptions, MergeReport,
    OperationComplete, archive_files, create_folders, delete_files, merge_group, merge_into,
};
use twinfold_scan::{
    CachePolicy, IndexCache, IndexScanner, ScanConfig, ScanReport, StructureMapper,
};

#[derive(Parser)]
#[command(
    name = "twinfold",
    version,
    about = "Find duplicate files and merge structurally similar folders",
    long_about = "twinfold indexes a directory tree by content hash, size, name or \
                  modification time to find duplicate files, and compares folder \
                  layouts to find and merge folders that hold the same structure."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); TWINFOLD_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find duplicate files
    Duplicates {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Fingerprint method: hash, size, name or modifiedTime (repeatable)
        #[arg(short, long = "method", default_value = "hash")]
        methods: Vec<FingerprintMethod>,

        /// Ignore an existing index cache
        #[arg(long)]
        rescan: bool,

        /// Do not write the index cache
        #[arg(long)]
        no_cache: bool,

        /// Skip hidden files and directories
        #[arg(long)]
        skip_hidden: bool,

        /// Glob pattern of names to skip (repeatable)
        #[arg(short, long)]
        ignore: Vec<String>,

        /// Hashing threads (0 = all cores, 1 = no thread pool)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Group subfolders whose layouts match
    Similar {
        /// Folder whose immediate subfolders are compared
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Minimum shared-subpath percentage
        #[arg(short, long, default_value = "60")]
        threshold: f64,

        /// Allowed relative difference in subpath counts
        #[arg(long, default_value = "0.25")]
        tolerance: f64,

        /// Only map this many levels below each folder
        #[arg(short = 'd', long)]
        max_depth: Option<usize>,

        /// Merge the listed groups (numbers as printed, repeatable)
        #[arg(long)]
        merge: Vec<usize>,

        /// Rename incoming files instead of skipping them on conflict
        #[arg(long)]
        auto_rename: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Merge folders into a primary folder
    Merge {
        /// Folder that receives the files
        primary: PathBuf,

        /// Folders to empty into the primary
        #[arg(required = true)]
        secondaries: Vec<PathBuf>,

        /// Rename incoming files instead of skipping them on conflict
        #[arg(long)]
        auto_rename: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List files by size, largest first
    Sizes {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Display unit: Bytes, KB, MB or GB (default: human readable)
        #[arg(short, long)]
        unit: Option<SizeUnit>,

        /// Number of files to show
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Store files in a zip archive by base name
    Archive {
        /// Files to archive
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Archive to write
        #[arg(short, long, default_value = ARCHIVE_FILE_NAME)]
        output: PathBuf,
    },

    /// Permanently delete files
    Delete {
        /// Files to delete
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Confirm the deletion; nothing is removed without it
        #[arg(long)]
        yes: bool,
    },

    /// Create folders under a base directory
    Mkdirs {
        /// Base directory
        base: PathBuf,

        /// Relative folder names
        names: Vec<String>,

        /// Read names from a file, one per line
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Inspect or remove the index cache of a directory
    Cache {
        /// Scanned root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Delete the cache
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Command::Duplicates {
            path,
            methods,
            rescan,
            no_cache,
            skip_hidden,
            ignore,
            threads,
            format,
        } => {
            let config = ScanConfig::builder()
                .root(path)
                .methods(methods.into_iter().collect::<MethodSet>())
                .cache_policy(if rescan {
                    CachePolicy::AlwaysRescan
                } else {
                    CachePolicy::TrustCache
                })
                .write_cache(!no_cache)
                .include_hidden(!skip_hidden)
                .ignore_patterns(ignore)
                .threads(threads)
                .build()
                .context("Invalid scan options")?;
            run_duplicates(&config, format)?;
        }
        Command::Similar {
            path,
            threshold,
            tolerance,
            max_depth,
            merge,
            auto_rename,
            format,
        } => {
            let config = SimilarityConfig::builder()
                .threshold(threshold)
                .count_tolerance(tolerance)
                .build()
                .context("Invalid similarity options")?;
            run_similar(&path, config, max_depth, &merge, merge_options(auto_rename), format)?;
        }
        Command::Merge {
            primary,
            secondaries,
            auto_rename,
            format,
        } => {
            run_merge(&primary, &secondaries, merge_options(auto_rename), format)?;
        }
        Command::Sizes {
            path,
            unit,
            top,
            format,
        } => {
            run_sizes(&path, unit, top, format)?;
        }
        Command::Archive { files, output } => {
            run_archive(&files, &output)?;
        }
        Command::Delete { files, yes } => {
            run_delete(&files, yes)?;
        }
        Command::Mkdirs { base, names, from } => {
            run_mkdirs(&base, names, from)?;
        }
        Command::Cache { path, clear } => {
            run_cache(&path, clear)?;
        }
    }

    Ok(())
}

fn merge_options(auto_rename: bool) -> MergeOptions {
    let resolution = if auto_rename {
        ConflictResolution::AutoRename
    } else {
        ConflictResolution::Skip
    };
    MergeOptions::new().with_conflict_resolution(resolution)
}

/// Build the index while printing progress to stderr.
fn scan_with_progress(config: &ScanConfig) -> Result<ScanReport> {
    let scanner = IndexScanner::new();
    let mut progress_rx = scanner.subscribe();

    let printer = thread::spawn(move || {
        let mut printed = false;
        loop {
            match progress_rx.blocking_recv() {
                Ok(progress) => {
                    eprint!(
                        "\r Fingerprinting {}/{} files ({:.0}%, {:.0} files/s)",
                        progress.files_processed,
                        progress.files_total,
                        progress.percentage(),
                        progress.files_per_second()
                    );
                    printed = true;
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        if printed {
            eprintln!();
        }
    });

    let result = scanner.build_index(config);
    drop(scanner);
    if printer.join().is_err() {
        warn!("progress printer panicked");
    }

    result.wrap_err_with(|| format!("Failed to index {}", config.root.display()))
}

/// Run duplicate detection.
fn run_duplicates(config: &ScanConfig, format: OutputFormat) -> Result<()> {
    eprintln!("Indexing {} by {}...", config.root.display(), config.methods);

    let scan = scan_with_progress(config)?;
    if scan.from_cache() {
        eprintln!(
            "Using cached index {} (pass --rescan to pick up changes)",
            IndexCache::path(&scan.root).display()
        );
    }

    let report = DuplicateFinder::new()
        .find_duplicates(&scan.index, &config.methods)
        .context("Duplicate detection failed")?;

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate File Report");
            println!("{}", "─".repeat(70));
            println!();

            if !report.has_duplicates() {
                println!(" No duplicate files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files)",
                    report.groups.len(),
                    report.total_duplicate_files()
                );
                println!();

                for (i, group) in report.groups.iter().enumerate() {
                    println!(
                        " Group {} by {} {} ({} files)",
                        i + 1,
                        group.method,
                        describe_key(group.method, &group.key),
                        group.count()
                    );
                    for path in &group.paths {
                        println!("   {}", path.display());
                    }
                    println!();
                }
            }

            print_warnings(&scan.warnings);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "groups": report.groups,
                "methods": report.methods,
                "warnings": scan.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Render a group key for people.
fn describe_key(method: FingerprintMethod, key: &str) -> String {
    match method {
        FingerprintMethod::Hash => key.chars().take(16).collect(),
        FingerprintMethod::Size => key
            .parse::<u64>()
            .map(format_size)
            .unwrap_or_else(|_| key.to_string()),
        FingerprintMethod::Name => key.to_string(),
        FingerprintMethod::ModifiedTime => {
            describe_modified_key(key).unwrap_or_else(|| key.to_string())
        }
    }
}

/// Run similarity grouping, optionally merging selected groups.
fn run_similar(
    path: &Path,
    config: SimilarityConfig,
    max_depth: Option<usize>,
    merge: &[usize],
    options: MergeOptions,
    format: OutputFormat,
) -> Result<()> {
    let folders = candidate_folders(path)
        .wrap_err_with(|| format!("Cannot list folders in {}", path.display()))?;
    eprintln!("Comparing {} folders in {}...", folders.len(), path.display());

    let mut mapper = StructureMapper::new();
    if let Some(depth) = max_depth {
        mapper = mapper.with_max_depth(depth);
    }
    let estimator = SimilarityEstimator::with_config(config).with_mapper(mapper);
    let report = estimator.group_similar_folders(&folders);

    match format {
        OutputFormat::Text => {
            println!();
            if !report.has_groups() {
                println!(" No similar folders found.");
            }
            for (i, group) in report.groups.iter().enumerate() {
                println!(
                    " Group {}: {}",
                    i + 1,
                    group.paths().iter().map(|p| p.display()).join(" <-> ")
                );
                for member in group.secondaries() {
                    println!("   {:>5.1}%  {}", member.score, member.path.display());
                }
            }
            print_warnings(&report.warnings);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    for &number in merge {
        let Some(group) = number.checked_sub(1).and_then(|i| report.groups.get(i)) else {
            bail!("No similarity group {number}");
        };
        eprintln!("Merging group {number} into {}...", group.primary().display());
        for merge_report in merge_group(group, &options) {
            print_merge_report(&merge_report);
        }
    }

    Ok(())
}

/// Merge each secondary into the primary.
fn run_merge(
    primary: &Path,
    secondaries: &[PathBuf],
    options: MergeOptions,
    format: OutputFormat,
) -> Result<()> {
    let mut reports = Vec::with_capacity(secondaries.len());
    let mut rejected = 0;
    for secondary in secondaries {
        let report = merge_into(primary, secondary, &options).unwrap_or_else(|e| {
            warn!(secondary = %secondary.display(), error = %e, "merge refused");
            rejected += 1;
            MergeReport::rejected(primary, secondary, &e)
        });
        if let OutputFormat::Text = format {
            print_merge_report(&report);
        }
        reports.push(report);
    }

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if rejected > 0 {
        bail!("{rejected} of {} folders could not be merged", secondaries.len());
    }
    Ok(())
}

fn print_merge_report(report: &MergeReport) {
    println!(
        " {} -> {}",
        report.secondary.display(),
        report.primary.display()
    );
    for action in &report.actions {
        match action {
            MergeAction::Skipped { source, existing } => println!(
                "   skipped {} ({} exists)",
                source.display(),
                existing.display()
            ),
            MergeAction::Failed { path, message } => {
                println!("   failed  {}: {message}", path.display())
            }
            _ => {}
        }
    }
    println!(
        "   {} moved, {} skipped, {} failed{}",
        report.moved_count(),
        report.skipped_count(),
        report.failed_count(),
        if report.secondary_removed() {
            ", folder removed"
        } else {
            ""
        }
    );
}

/// List files by size.
fn run_sizes(
    path: &Path,
    unit: Option<SizeUnit>,
    top: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let listing = list_files_by_size(path)
        .wrap_err_with(|| format!("Cannot list files in {}", path.display()))?;
    let files = listing.top(top.unwrap_or(usize::MAX));

    match format {
        OutputFormat::Text => {
            for file in files {
                let size = match unit {
                    Some(unit) => unit.format(file.size),
                    None => format_size(file.size),
                };
                println!("{:>14}  {}", size, file.path.display());
            }
            println!();
            println!(
                " {} files, {} total",
                listing.files.len(),
                format_size(listing.total_size())
            );
            print_warnings(&listing.warnings);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(files)?);
        }
    }

    Ok(())
}

fn run_archive(files: &[PathBuf], output: &Path) -> Result<()> {
    let report = archive_files(files, output, |_| {})
        .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
    print_complete(&report.complete);
    eprintln!("Wrote {} ({} entries)", output.display(), report.entries.len());
    Ok(())
}

fn run_delete(files: &[PathBuf], yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "Refusing to delete {} files without --yes (deletion is permanent)",
            files.len()
        );
    }
    let complete = delete_files(files, |_| {});
    print_complete(&complete);
    Ok(())
}

fn run_mkdirs(base: &Path, mut names: Vec<String>, from: Option<PathBuf>) -> Result<()> {
    if let Some(list) = from {
        let content = fs::read_to_string(&list)
            .wrap_err_with(|| format!("Cannot read {}", list.display()))?;
        names.extend(content.lines().map(str::to_string));
    }
    if !base.is_dir() {
        bail!("{} is not a directory", base.display());
    }

    let complete = create_folders(base, &names, |p| {
        if let Some(path) = &p.current_file {
            eprintln!(
                " [{}/{} {:>3.0}%] {}",
                p.files_completed,
                p.files_total,
                p.percentage(),
                path.display()
            );
        }
    });
    print_complete(&complete);
    Ok(())
}

fn run_cache(path: &Path, clear: bool) -> Result<()> {
    let cache = IndexCache::path(path);
    if clear {
        if IndexCache::invalidate(path).context("Cannot remove cache")? {
            eprintln!("Removed {}", cache.display());
        } else {
            eprintln!("No cache at {}", cache.display());
        }
        return Ok(());
    }

    match IndexCache::load(path).context("Cannot read cache")? {
        Some(index) => {
            println!(" {}", cache.display());
            for method in MethodSet::all().iter() {
                println!(
                    "   {:<13} {} keys, {} paths",
                    method.to_string(),
                    index.key_count(method),
                    index.path_count(method)
                );
            }
        }
        None => println!(" No cache at {}", cache.display()),
    }
    Ok(())
}

fn print_complete(complete: &OperationComplete) {
    for error in &complete.errors {
        eprintln!("  {error}");
    }
    println!("{}", complete.summary());
}

fn print_warnings(warnings: &[ScanWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!(" {} warning(s):", warnings.len());
    for warning in warnings {
        match warning.method {
            Some(method) => println!("   [{method}] {}", warning.message),
            None => println!("   {}", warning.message),
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
