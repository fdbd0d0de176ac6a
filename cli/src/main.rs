//! tycheck CLI - one-shot host for a checker session.
//!
//! Each invocation starts a session for the workspace root, runs one request
//! against one file, prints the result and shuts the checker down again.
//!
//! ```text
//! tycheck check src/app.py --dirty
//! tycheck inspect src/app.py 12:5:12:9
//! tycheck suggest src/app.py app.handler --write
//! tycheck suppress src/app.py 12 arg-type --write
//! ```

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::{
    env,
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::{Arc, Mutex},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tycheck_annotate::{
    Baseline, FunctionShape, apply_edits, highlight_range, reconcile, signature_edits,
    suppress_edit,
};
use tycheck_config::{INTERPRETER_ENV, TycheckConfig, WORKSPACE_CONFIG, user_config_path};
use tycheck_session::{ProcessSpawner, Session};
use tycheck_types::{Diagnostic, Document, LineIndex, SourceDocument, SourceId, TextRange};
use tycheck_utils::{ReplaceOptions, replace_file};

#[derive(Parser, Debug)]
#[command(name = "tycheck", version, about = "Type checker session host for Python workspaces")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full check and print diagnostics for one file
    Check {
        #[command(flatten)]
        file: FileArgs,

        /// Show every finding, ignoring .mypy/baseline.json
        #[arg(long)]
        no_baseline: bool,
    },

    /// Print the inferred type of the expression at LINE:COL:END_LINE:END_COL
    Inspect {
        #[command(flatten)]
        file: FileArgs,

        location: String,
    },

    /// Ask the checker for a function signature inferred from call sites
    Suggest {
        #[command(flatten)]
        file: FileArgs,

        /// Dotted name, e.g. `pkg.module.function`
        name: String,

        /// Write the suggested annotations into the file
        #[arg(long)]
        write: bool,
    },

    /// Add a `# type: ignore[CODE]` comment to a line
    Suppress {
        file: PathBuf,

        line: u32,

        code: String,

        /// Modify the file instead of printing the fixed line
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args, Debug)]
struct FileArgs {
    file: PathBuf,

    /// Treat the file as having unsaved edits (checked via the scratch file)
    #[arg(long)]
    dirty: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir().context("reading current directory")?,
    };
    let root = fs::canonicalize(&root)
        .with_context(|| format!("workspace root {} not found", root.display()))?;

    let config = match TycheckConfig::load(&root)? {
        Some((config, path)) => {
            tracing::info!(path = %path.display(), "Using config");
            config
        }
        None => TycheckConfig::default(),
    };

    if let Command::Suppress {
        file,
        line,
        code,
        write,
    } = &cli.command
    {
        return suppress(file, *line, code, *write);
    }

    let session = open_session(&root, &config).await?;
    let result = run(&session, &root, &config, cli.command).await;
    session.shutdown().await;
    result
}

async fn open_session(root: &Path, config: &TycheckConfig) -> Result<Session> {
    let interpreter = config.interpreter();
    let session = Session::new(root, interpreter, Arc::new(ProcessSpawner));
    if !session.is_available().await {
        bail!(
            "type checking unavailable: set [checker] interpreter in {WORKSPACE_CONFIG} or {INTERPRETER_ENV}"
        );
    }
    Ok(session)
}

async fn run(
    session: &Session,
    root: &Path,
    config: &TycheckConfig,
    command: Command,
) -> Result<ExitCode> {
    match command {
        Command::Check { file, no_baseline } => {
            let doc = load_document(&file)?;
            let source = source_id(root, &file.file)?;
            let report = session.run_check(&doc).await?;

            let mut diagnostics = report.diagnostics;
            let mut baselined = Vec::new();
            if config.baseline_enabled()
                && !no_baseline
                && let Some(baseline) = Baseline::load(root)?
            {
                let shown = reconcile(baseline.entries_for(&source), diagnostics);
                baselined = shown.baseline;
                diagnostics = shown.fresh;
            }

            for diagnostic in baselined.iter().chain(&diagnostics) {
                print_diagnostic(&source, doc.text(), diagnostic);
            }
            if report.used_scratch {
                eprintln!("(checked unsaved content)");
            }

            let failed = diagnostics.iter().any(|d| d.severity().is_error());
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Inspect { file, location } => {
            let doc = load_document(&file)?;
            let range = parse_location(doc.text(), &location)?;
            match session.inspect(&doc, range).await {
                Some(answer) => {
                    println!("{answer}");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("no type information at {location}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Suggest { file, name, write } => {
            let doc = load_document(&file)?;
            let suggestion = session.suggest(&doc, &name).await?;
            println!("{}", serde_json::to_string_pretty(&suggestion)?);

            if write {
                let function = name.rsplit('.').next().unwrap_or(&name);
                let text = doc.text();
                let Some(shape) = FunctionShape::find(text, function) else {
                    bail!("no definition of `{function}` in {}", file.file.display());
                };
                let updated = apply_edits(text, &signature_edits(&shape, &suggestion));
                replace_file(&file.file, updated.as_bytes(), ReplaceOptions::for_source_edit())
                    .with_context(|| format!("writing {}", file.file.display()))?;
                tracing::info!(path = %file.file.display(), function, "Applied suggested signature");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Suppress {
            file,
            line,
            code,
            write,
        } => suppress(&file, line, &code, write),
    }
}

fn suppress(file: &Path, line: u32, code: &str, write: bool) -> Result<ExitCode> {
    let text =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let Some(edit) = suppress_edit(&text, line, code) else {
        bail!("{} has no line {line}", file.display());
    };
    let updated = apply_edits(&text, &[edit]);

    if write {
        replace_file(file, updated.as_bytes(), ReplaceOptions::for_source_edit())
            .with_context(|| format!("writing {}", file.display()))?;
    } else {
        let index = LineIndex::new(&updated);
        if let Some(fixed) = index.line_text(line as usize - 1) {
            println!("{fixed}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_document(args: &FileArgs) -> Result<Document> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let path = fs::canonicalize(&args.file)
        .with_context(|| format!("resolving {}", args.file.display()))?;
    Ok(if args.dirty {
        Document::unsaved(path, text, 1)
    } else {
        Document::saved(path, text, 1)
    })
}

fn source_id(root: &Path, file: &Path) -> Result<SourceId> {
    let path = fs::canonicalize(file).with_context(|| format!("resolving {}", file.display()))?;
    SourceId::relative_to(root, &path)
        .with_context(|| format!("{} is outside the workspace {}", file.display(), root.display()))
}

/// `LINE:COL:END_LINE:END_COL`, 1-indexed with an inclusive end column, to a byte range.
fn parse_location(text: &str, location: &str) -> Result<TextRange> {
    let parts: Vec<u32> = location
        .split(':')
        .map(str::parse::<u32>)
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid location `{location}`"))?;
    let [line, col, end_line, end_col] = parts[..] else {
        bail!("location must be LINE:COL:END_LINE:END_COL, got `{location}`");
    };

    let index = LineIndex::new(text);
    let start = index
        .offset(line, col)
        .with_context(|| format!("{line}:{col} is outside the file"))?;
    let end = end_col
        .checked_add(1)
        .and_then(|past_end| index.offset(end_line, past_end))
        .with_context(|| format!("{end_line}:{end_col} is outside the file"))?;
    if end < start {
        bail!("location `{location}` ends before it starts");
    }
    Ok(TextRange::new(start, end))
}

fn print_diagnostic(source: &SourceId, text: &str, diagnostic: &Diagnostic) {
    println!("{}", diagnostic.display_with_path(source.as_str()));
    if let Some(range) = highlight_range(text, diagnostic) {
        let index = LineIndex::new(text);
        let line = index.line_of(range.start);
        if let (Some(line_text), Some(line_start)) = (index.line_text(line), index.line_start(line))
        {
            let pad = index.column(range.start);
            let width = text[range.start..range.end.min(line_start + line_text.len())]
                .chars()
                .count()
                .max(1);
            println!("    {line_text}");
            println!("    {}{}", " ".repeat(pad), "^".repeat(width));
        }
    }
}

/// Initialize tracing to a log file in ~/.tycheck/logs/.
///
/// Stdout carries command output, so logs never go there.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::debug!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.tycheck/logs/tycheck.log
    if let Some(config_path) = user_config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("tycheck.log"));
    }

    // Fallback: ./.tycheck/logs/tycheck.log
    candidates.push(PathBuf::from(".tycheck").join("logs").join("tycheck.log"));

    candidates
}
