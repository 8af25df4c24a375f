use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use format_on_save::config::{discover, load_from_path, FormatConfig};
use format_on_save::{
    ClangFormat, Document, FormatOnSave, SaveEvent, SaveOutcome, SaveResult, SkipReason,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "format-on-save")]
#[command(about = "Apply clang-format replacements to source files in place", long_about = None)]
#[command(version)]
struct Cli {
    /// Log progress (repeat for debug output); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format files (or directories, recursively) in place
    Format {
        /// Files or directories to format (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Config file (otherwise discovered from the project root)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the style file (auto-detected if not specified)
        #[arg(short, long)]
        project_root: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report files that are not formatted; exits non-zero if any would change
    Check {
        /// Files or directories to check (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Config file (otherwise discovered from the project root)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the style file (auto-detected if not specified)
        #[arg(short, long)]
        project_root: Option<PathBuf>,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Format {
            paths,
            config,
            project_root,
            dry_run,
            diff,
        } => cmd_format(paths, config, project_root, dry_run, diff, false),

        Commands::Check {
            paths,
            config,
            project_root,
            diff,
        } => cmd_format(paths, config, project_root, true, diff, true),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Resolve the directory the style file lives in for `file`.
///
/// Priority order:
/// 1. Explicit --project-root flag
/// 2. Nearest ancestor of `file` holding a configured style file
/// 3. The file's own directory
fn resolve_project_root(
    explicit: Option<&Path>,
    file: &Path,
    config: &FormatConfig,
) -> PathBuf {
    if let Some(root) = explicit {
        return root.to_path_buf();
    }

    let parent = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    parent
        .ancestors()
        .find(|dir| config.find_style_file(dir).is_some())
        .unwrap_or(parent)
        .to_path_buf()
}

fn load_config(explicit: Option<PathBuf>, start: &Path) -> Result<FormatConfig> {
    let config = match explicit {
        Some(path) => load_from_path(&path)?,
        None => discover(start)?,
    };
    Ok(config)
}

/// Expand directories into the files inside them that have a configured
/// extension. Explicit file arguments are kept as given.
fn collect_files(paths: &[PathBuf], config: &FormatConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let walker = WalkDir::new(path).into_iter().filter_entry(|entry| {
            // Skip hidden directories such as .git, but never the root itself
            entry.depth() == 0
                || !entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
        });

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && config.matches_extension(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Helper: Show unified diff between original and formatted content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (formatted)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

#[derive(Default)]
struct Totals {
    formatted: usize,
    unchanged: usize,
    skipped: usize,
    failed: usize,
}

fn cmd_format(
    paths: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    check: bool,
) -> Result<()> {
    let paths = if paths.is_empty() {
        vec![env::current_dir()?]
    } else {
        paths
    };

    // 1. Load config relative to the project root or the first path
    let start = match (&project_root, paths.first()) {
        (Some(root), _) => root.clone(),
        (None, Some(first)) if first.is_dir() => first.clone(),
        (None, Some(first)) => first
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
        (None, None) => PathBuf::from("."),
    };
    let config = load_config(config_path, &start)?;

    // 2. Make sure the formatter is available before touching anything
    let formatter: ClangFormat = config.formatter();
    match formatter.version() {
        Ok(version) => log::info!("using {}", version),
        Err(e) => anyhow::bail!("{}", e.to_string().red()),
    }

    let files = collect_files(&paths, &config)?;
    let session = FormatOnSave::new(config, formatter);

    if dry_run && !check {
        println!("{}", "[DRY RUN - showing what would be formatted]".cyan());
    }

    // 3. Format each file
    let mut totals = Totals::default();

    for file in files {
        let root = resolve_project_root(project_root.as_deref(), &file, session.config());

        let mut document = match Document::open(&file) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                totals.failed += 1;
                continue;
            }
        };
        let original = document.content().to_string();

        let outcome = session.on_saved(SaveEvent {
            path: &file,
            project_root: &root,
            original: &original,
            buffer: &mut document,
        });

        match outcome {
            Ok(SaveOutcome::Applied { summary, skipped, .. }) => {
                // Every replacement rewrote text with itself
                if !document.is_modified() {
                    println!("{} {}: Already formatted", "⊙".yellow(), file.display());
                    totals.unchanged += 1;
                    continue;
                }

                if show_diff {
                    display_diff(&file, &original, document.content());
                }

                if dry_run {
                    let verb = if check { "Needs formatting" } else { "Would format" };
                    println!(
                        "{} {}: {} ({} replacements)",
                        "✓".green(),
                        file.display(),
                        verb,
                        summary.total()
                    );
                } else {
                    match document.save() {
                        Ok(SaveResult::Written { .. }) => println!(
                            "{} {}: Formatted ({} replacements)",
                            "✓".green(),
                            file.display(),
                            summary.total()
                        ),
                        Ok(SaveResult::Unchanged { .. }) => {
                            totals.unchanged += 1;
                            continue;
                        }
                        Err(e) => {
                            eprintln!("{} {}: Save failed - {}", "✗".red(), file.display(), e);
                            totals.failed += 1;
                            continue;
                        }
                    }
                }

                if !skipped.is_empty() {
                    println!(
                        "  {}",
                        format!("{} malformed replacement(s) were skipped", skipped.len())
                            .yellow()
                    );
                }
                totals.formatted += 1;
            }
            Ok(SaveOutcome::Unchanged { .. }) => {
                println!("{} {}: Already formatted", "⊙".yellow(), file.display());
                totals.unchanged += 1;
            }
            Ok(SaveOutcome::Skipped(reason)) => {
                let why = match reason {
                    SkipReason::UnsupportedExtension => "unsupported extension",
                    SkipReason::NoStyleFile => "no style file in project root",
                };
                println!("{} {}: Skipped ({})", "⊘".cyan(), file.display(), why);
                totals.skipped += 1;
            }
            Ok(SaveOutcome::FormatterFailed { status, output }) => {
                eprintln!(
                    "{} {}: Formatter exited with {:?}",
                    "✗".red(),
                    file.display(),
                    status
                );
                eprintln!("  {}", output.trim());
                totals.failed += 1;
            }
            Ok(SaveOutcome::Aborted { reason }) => {
                eprintln!("{} {}: Aborted - {}", "✗".red(), file.display(), reason);
                totals.failed += 1;
            }
            Err(e) => {
                eprintln!("{} {}: Error - {}", "✗".red(), file.display(), e);
                totals.failed += 1;
            }
        }
    }

    // 4. Summary
    println!();
    println!("{}", "Summary:".bold());
    let formatted_label = if dry_run { "would be formatted" } else { "formatted" };
    println!(
        "  {} {}",
        format!("{}", totals.formatted).green(),
        formatted_label
    );
    println!(
        "  {} already formatted",
        format!("{}", totals.unchanged).yellow()
    );
    println!("  {} skipped", format!("{}", totals.skipped).cyan());
    println!("  {} failed", format!("{}", totals.failed).red());

    if totals.failed > 0 || (check && totals.formatted > 0) {
        std::process::exit(1);
    }

    Ok(())
}
