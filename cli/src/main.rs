//! MediaCopy - Command-line front-end for the copy engine.
//!
//! Copies new videos from watermarked source folders to a destination tree,
//! one file at a time, with progress on stderr. While a batch runs, commands
//! typed on stdin pause, resume, skip or stop it.

use chrono::Local;
use clap::Parser;
use engine::{
    create_job, plan_job, run_job, CopyEngine, CopyJob, EngineError, FileOutcome, FolderScanner,
    JobControl, JobSummary, JsonControlStore, ProgressCallback, Settings,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::debug;

/// MediaCopy - copy new media files between folder trees
#[derive(Parser, Debug)]
#[command(name = "mediacopy")]
#[command(version = "0.1.0")]
#[command(about = "Copy new media files with pause, resume and skip")]
struct Args {
    /// Source root directory
    #[arg(long, value_name = "PATH")]
    src: PathBuf,

    /// Destination root directory
    #[arg(long, value_name = "PATH")]
    dst: PathBuf,

    /// Control file holding the folder watermarks
    #[arg(long, value_name = "FILE")]
    control: PathBuf,

    /// Optional JSON settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Size of each copy buffer in KiB (overrides the settings file)
    #[arg(long, value_name = "KIB")]
    buffer_kib: Option<usize>,

    /// Show what would be copied and exit
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,
}

/// Interactive commands read from stdin while a batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Skip,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Command::Pause),
        "r" | "resume" => Some(Command::Resume),
        "s" | "skip" => Some(Command::Skip),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// Forward stdin commands to `control` until stdin closes or `quit`.
fn spawn_command_reader(control: Arc<JobControl>) {
    let spawned = thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(Command::Pause) => {
                        control.pause();
                        eprintln!("\nPaused. Type 'r' to resume.");
                    }
                    Some(Command::Resume) => control.resume(),
                    Some(Command::Skip) => control.skip(),
                    Some(Command::Quit) => {
                        control.stop();
                        break;
                    }
                    None => eprintln!("\nCommands: p(ause), r(esume), s(kip), q(uit)"),
                }
            }
        });

    // Without the reader the batch still runs; it just can't be steered.
    if let Err(e) = spawned {
        eprintln!("Warning: interactive commands unavailable: {}", e);
    }
}

/// CLI implementation of ProgressCallback for displaying copy progress
struct CliProgress {
    verbose: bool,
    start_time: Instant,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            start_time: Instant::now(),
        }
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    fn format_duration(elapsed: std::time::Duration) -> String {
        let secs = elapsed.as_secs();
        let (hours, mins, secs) = (secs / 3600, (secs % 3600) / 60, secs % 60);

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }

    fn progress_bar(done: u64, total: u64) -> String {
        let percent = if total == 0 {
            100
        } else {
            (done.min(total) as f64 / total as f64 * 100.0) as usize
        };
        let filled = percent / 5;
        format!("[{}{}] {:3}%", "=".repeat(filled), " ".repeat(20 - filled), percent)
    }
}

impl ProgressCallback for CliProgress {
    fn on_job_started(&self, job: &CopyJob) {
        eprintln!("Starting at {}", Local::now().format("%H:%M:%S"));
        eprintln!("  Source: {}", job.source_root.display());
        eprintln!("  Destination: {}", job.destination_root.display());
        eprintln!("  {}", job.status_line());
        eprintln!("Commands: p(ause), r(esume), s(kip), q(uit)");
        eprintln!();
    }

    fn on_file_started(&self, job: &CopyJob, file_index: usize) {
        if self.verbose {
            eprintln!("[{:3}] Starting: {}", file_index, job.items[file_index]);
        }
    }

    fn on_file_progress(&self, job: &CopyJob, file_index: usize, _bytes_this_file: u64, bytes_total: u64) {
        eprint!(
            "\r{} {}/{} | {}",
            Self::progress_bar(bytes_total, job.total_bytes),
            Self::format_bytes(bytes_total),
            Self::format_bytes(job.total_bytes),
            job.items[file_index].relative_path,
        );
        let _ = std::io::stderr().flush();
    }

    fn on_file_completed(&self, job: &CopyJob, file_index: usize, outcome: &FileOutcome) {
        if self.verbose {
            let status = match outcome {
                FileOutcome::Copied => "Copied".to_string(),
                FileOutcome::Skipped => "Skipped".to_string(),
                FileOutcome::Failed(message) => format!("Failed ({})", message),
            };
            eprintln!("\n[{:3}] {}: {}", file_index, status, job.items[file_index].relative_path);
        }
    }

    fn on_job_completed(&self, _job: &CopyJob, summary: &JobSummary) {
        eprintln!();
        if summary.stopped {
            eprintln!("Stopped.");
        } else {
            eprintln!("Copy complete!");
        }

        eprintln!(
            "Summary: {} copied, {} skipped, {} failed",
            summary.copied_count, summary.skipped_count, summary.failed_count
        );
        eprintln!("Bytes copied: {}", Self::format_bytes(summary.bytes_copied));
        eprintln!("Elapsed: {}", Self::format_duration(self.start_time.elapsed()));

        if !summary.failed_items.is_empty() {
            eprintln!();
            eprintln!("Failed files:");
            for (path, message) in &summary.failed_items {
                eprintln!("  {}: {}", path, message);
            }
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse arguments, then run the batch
fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let control = Arc::new(JobControl::new());
    if !args.dry_run {
        spawn_command_reader(Arc::clone(&control));
    }

    let exit_code = match run_cli(&args, &control) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Effective settings: the settings file (if any) with CLI overrides.
fn load_settings(args: &Args) -> Result<Settings, EngineError> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(kib) = args.buffer_kib {
        settings.engine.buffer_size = kib.checked_mul(1024).ok_or_else(|| EngineError::InvalidConfig {
            message: format!("buffer of {} KiB is too large", kib),
        })?;
    }

    settings.validate()?;
    Ok(settings)
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args, control: &JobControl) -> Result<(), String> {
    let settings = load_settings(args).map_err(|e| e.to_string())?;
    debug!(?settings, "settings loaded");

    let mut job = create_job(&args.src, &args.dst, &args.control)
        .map_err(|e| format!("Job creation failed: {}", e))?;

    let scanner = FolderScanner::new(&job.source_root, &job.destination_root, &settings.job.extensions);
    plan_job(&mut job, &scanner, &JsonControlStore).map_err(|e| format!("Job planning failed: {}", e))?;

    if args.dry_run || job.items.is_empty() {
        println!("{}", job.status_line());
        if args.verbose {
            for item in &job.items {
                println!("  {}", item);
            }
        }
        return Ok(());
    }

    let engine = CopyEngine::new(settings.engine).map_err(|e| e.to_string())?;
    let progress = CliProgress::new(args.verbose);

    let summary = run_job(
        &mut job,
        &engine,
        control,
        &JsonControlStore,
        &settings.job,
        Some(&progress),
    )
    .map_err(|e| format!("Job execution failed: {}", e))?;

    if summary.failed_count > 0 {
        Err(format!("{} file(s) failed to copy", summary.failed_count))
    } else {
        Ok(())
    }
}
