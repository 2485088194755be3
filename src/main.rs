//! cerebro - CLI entrypoint.
//!
//! This module handles:
//! - CLI parsing (clap)
//! - progress bars (indicatif)
//! - coloured output (colored)
//! - confirmation prompts, the deletion gate, and script/report export
//!
//! Core logic for discovery, hashing, scoring, decision and execution
//! lives in the library crate.

use cerebro::cancel::CancellationToken;
use cerebro::gate::{DeletionGate, DeletionGateConfig};
use cerebro::model::{DeletionPolicy, Mode, PipelineRequest, SimilarityAlgorithm};
use cerebro::pipeline::{self, PipelineResult};
use cerebro::progress::{Phase, ProgressEvent, ProgressSink};
use cerebro::{executor, format_bytes, report, script, trash};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "cerebro",
    version,
    about = "Find, score, and safely clean up duplicate files and near-duplicate images.",
    long_about = "cerebro recursively scans one or more roots, groups suspected duplicates\n\
                  through a size -> partial-hash -> full-hash pipeline (or a perceptual-hash\n\
                  branch for near-duplicate images), scores each group member explainably,\n\
                  and proposes exactly one survivor per group. Deletion is always planned\n\
                  first and gated behind an explicit token; by default nothing is removed."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find exact (content-hash) duplicate files.
    Scan(ScanArgs),
    /// Find visually similar images via perceptual hashing.
    Similar(SimilarArgs),
    /// Run the full pipeline through execution (plan + delete).
    Clean(CleanArgs),
    /// Reverse a previous trash-based cleanup.
    Undo(UndoArgs),
}

#[derive(clap::Args, Clone)]
struct CommonScanArgs {
    /// Root directories to scan recursively
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Force deterministic, sorted traversal and tie-breaking
    #[arg(long)]
    validation_mode: bool,

    /// Minimum file size to consider, in bytes
    #[arg(long, default_value_t = 0)]
    min_size: u64,

    /// Include dotfiles and dot-directories
    #[arg(long)]
    include_hidden: bool,

    /// Follow symlinks during traversal (cycle-safe)
    #[arg(long)]
    follow_symlinks: bool,

    /// Write the cerebro.report.v1 JSON audit report to this path instead of just printing
    #[arg(long = "json-output", value_name = "FILE")]
    json_output: Option<PathBuf>,

    /// Also write cleanup.sh + cleanup.ps1 alongside the report
    #[arg(long = "export-scripts", value_name = "DIR")]
    export_scripts: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ScanArgs {
    #[command(flatten)]
    common: CommonScanArgs,

    /// Skip the authoritative full-file hash after partial-hash matches
    #[arg(long)]
    no_full_hash: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Dhash,
    Phash,
}

#[derive(clap::Args)]
struct SimilarArgs {
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    #[arg(long)]
    validation_mode: bool,

    /// 0 (loose) .. 100 (strict) perceptual match strictness
    #[arg(long, default_value_t = 60)]
    matching_level: u8,

    #[arg(long, value_enum, default_value = "phash")]
    algorithm: AlgorithmArg,

    #[arg(long, default_value_t = 64)]
    bitmap_size: u32,

    #[arg(long)]
    no_orientation_invariant: bool,

    #[arg(long = "json-output", value_name = "FILE")]
    json_output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Trash,
    Permanent,
    DryRun,
}

impl From<PolicyArg> for DeletionPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Trash => DeletionPolicy::MoveToTrash,
            PolicyArg::Permanent => DeletionPolicy::DeletePermanently,
            PolicyArg::DryRun => DeletionPolicy::DryRun,
        }
    }
}

#[derive(clap::Args)]
struct CleanArgs {
    #[command(flatten)]
    common: CommonScanArgs,

    #[arg(long, value_enum, default_value = "dry-run")]
    policy: PolicyArg,

    /// Supply a gate token non-interactively instead of confirming on stdin
    #[arg(long)]
    token: Option<String>,

    /// Decide survivors per-group interactively instead of trusting the score
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

#[derive(clap::Args)]
struct UndoArgs {
    /// The `.cerebro_trash` directory to undo
    trash_dir: PathBuf,
}

/// Ask the user a yes/no question. Returns `true` for "y"/"yes" (case-insensitive).
fn ask_yes_no(prompt: &str) -> bool {
    print!("{prompt} ");
    io::stdout().flush().ok();

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(_) => {
            let answer = input.trim();
            answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
        }
        Err(e) => {
            eprintln!("{} {}", "Failed to read input:".red(), e);
            false
        }
    }
}

fn ask_user_to_confirm() -> bool {
    let prompt = "Apply this cleanup plan? [y/N]:".bright_red().bold().to_string();
    ask_yes_no(&prompt)
}

/// Ask which path in a group should survive. Empty input defaults to the first.
fn prompt_for_survivor(paths: &[PathBuf]) -> usize {
    loop {
        println!("{}", "Which file should survive?".bright_yellow());
        for (i, path) in paths.iter().enumerate() {
            let hint = if i == 0 { " (default)" } else { "" };
            println!(
                "  [{}] {}{}",
                (i + 1).to_string().bright_yellow(),
                path.display().to_string().cyan(),
                hint
            );
        }
        print!("{} ", format!("Enter 1-{} (default 1):", paths.len()).bright_yellow());
        io::stdout().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return 0;
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return 0;
        }
        if let Ok(num) = trimmed.parse::<usize>() {
            if num >= 1 && num <= paths.len() {
                return num - 1;
            }
        }
        eprintln!("{}", format!("Please enter a number between 1 and {}.", paths.len()).yellow());
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Discover => "discover",
        Phase::SizeGroup => "size_group",
        Phase::PartialHash => "partial_hash",
        Phase::FullHash => "full_hash",
        Phase::Cluster => "cluster",
        Phase::Score => "score",
        Phase::Decide => "decide",
        Phase::ConfirmDelete => "confirm_delete",
        Phase::Delete => "delete",
        Phase::Record => "record",
        Phase::Complete => "complete",
        Phase::Failed => "failed",
        Phase::Cancelled => "cancelled",
    }
}

/// Run `work` on a background thread, draining its progress events into
/// an indicatif bar on the calling thread as they arrive.
fn run_with_progress_bar<T: Send + 'static>(work: impl FnOnce(ProgressSink) -> T + Send + 'static) -> T {
    let (tx, rx) = std::sync::mpsc::channel::<ProgressEvent>();
    let sink = ProgressSink::new(tx);

    let handle = std::thread::spawn(move || work(sink));

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/100 {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    for event in rx {
        bar.set_position(event.pct as u64);
        bar.set_message(format!("{}: {}", phase_label(event.phase), event.message));
    }
    bar.finish_and_clear();

    handle.join().expect("pipeline worker thread panicked")
}

fn print_groups(result: &PipelineResult) {
    if result.groups.is_empty() {
        println!("{}", "No duplicates found.".bright_green().bold());
        return;
    }

    let plan = result.delete_plan.as_ref();

    for (idx, group) in result.groups.iter().enumerate() {
        println!(
            "\n{} {} {}",
            "---".bright_yellow(),
            "Duplicate Group".bright_yellow().bold(),
            (idx + 1).to_string().bright_yellow()
        );

        for item in &group.items {
            let is_survivor = plan
                .map(|p| {
                    p.items
                        .iter()
                        .any(|pi| pi.survivor && pi.path == item.path && pi.group_id == group.group_id)
                })
                .unwrap_or(false);
            if is_survivor {
                println!("{} {}", "[KEEP]".green().bold(), item.path.display().to_string().cyan());
            } else {
                println!("{} {}", "[DUPE]".red().bold(), item.path.display().to_string().cyan());
            }
        }
    }

    let total_saving: u64 = plan
        .map(|p| p.delete_candidates().map(|i| i.size_bytes).sum())
        .unwrap_or(0);
    let removable = plan.map(|p| p.delete_candidates().count()).unwrap_or(0);

    println!(
        "\n{} {} duplicate file(s) can be removed, freeing approximately {}.",
        "Summary:".blue().bold(),
        removable.to_string().bright_yellow(),
        format_bytes(total_saving).bright_green().bold()
    );
}

fn export_report_and_scripts(
    result: &PipelineResult,
    request: &PipelineRequest,
    json_output: Option<&PathBuf>,
    export_scripts: Option<&PathBuf>,
) {
    if let Some(out_path) = json_output {
        let generated_ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let payload = report::build_report(
            "",
            request,
            result.stats.clone(),
            &result.groups,
            result.delete_plan.as_ref(),
            generated_ts,
        );
        match report::write_json_report(out_path, &payload) {
            Ok(path) => println!("{} {}", "JSON report written to:".blue().bold(), path.display().to_string().cyan()),
            Err(e) => eprintln!("{} {e}", "Failed to write JSON report:".red().bold()),
        }
    }

    if let Some(dir) = export_scripts {
        if let Some(plan) = &result.delete_plan {
            match script::write_cleanup_scripts(dir, plan, "") {
                Ok((sh, ps1)) => println!(
                    "{} {} + {}",
                    "Cleanup scripts written:".blue().bold(),
                    sh.display().to_string().cyan(),
                    ps1.display().to_string().cyan()
                ),
                Err(e) => eprintln!("{} {e}", "Failed to write cleanup scripts:".red().bold()),
            }
        }
    }
}

fn run_scan(args: ScanArgs) {
    let request = PipelineRequest::builder(args.common.roots.clone())
        .mode(Mode::Scan)
        .min_size_bytes(args.common.min_size)
        .include_hidden(args.common.include_hidden)
        .follow_symlinks(args.common.follow_symlinks)
        .validation_mode(args.common.validation_mode)
        .use_full_hash(!args.no_full_hash)
        .build();

    let result = run_with_progress_bar({
        let request = request.clone();
        move |sink| pipeline::run(&request, &CancellationToken::new(), &sink)
    });

    if result.cancelled {
        println!("{}", "Scan cancelled.".yellow().bold());
        return;
    }

    print_groups(&result);
    export_report_and_scripts(&result, &request, args.common.json_output.as_ref(), args.common.export_scripts.as_ref());
}

fn run_similar(args: SimilarArgs) {
    let algorithm = match args.algorithm {
        AlgorithmArg::Dhash => SimilarityAlgorithm::DHash,
        AlgorithmArg::Phash => SimilarityAlgorithm::PHash,
    };

    let request = PipelineRequest::builder(args.roots.clone())
        .mode(Mode::Similar)
        .validation_mode(args.validation_mode)
        .matching_level(args.matching_level)
        .bitmap_size(args.bitmap_size)
        .similarity_algorithm(algorithm)
        .orientation_invariant(!args.no_orientation_invariant)
        .build();

    let result = run_with_progress_bar({
        let request = request.clone();
        move |sink| pipeline::run(&request, &CancellationToken::new(), &sink)
    });

    if result.cancelled {
        println!("{}", "Similarity scan cancelled.".yellow().bold());
        return;
    }

    print_groups(&result);
    export_report_and_scripts(&result, &request, args.json_output.as_ref(), None);
}

fn apply_interactive_survivor_choices(result: &mut PipelineResult) {
    let Some(plan) = result.delete_plan.as_mut() else { return };

    for group in &result.groups {
        println!(
            "\n{} {} {}",
            "---".bright_yellow(),
            "Duplicate Group".bright_yellow().bold(),
            group.group_id.cyan()
        );
        let paths: Vec<PathBuf> = group.items.iter().map(|i| i.path.clone()).collect();
        let survivor_idx = prompt_for_survivor(&paths);

        for item in plan.items.iter_mut().filter(|i| i.group_id == group.group_id) {
            let is_survivor = item.path == paths[survivor_idx];
            item.survivor = is_survivor;
            item.reason = if is_survivor {
                "survivor:selected_by_score".to_string()
            } else {
                "duplicate:lower_score".to_string()
            };
        }
    }
}

fn run_clean(args: CleanArgs) {
    let policy: DeletionPolicy = args.policy.into();
    let request = PipelineRequest::builder(args.common.roots.clone())
        .mode(Mode::Delete)
        .min_size_bytes(args.common.min_size)
        .include_hidden(args.common.include_hidden)
        .follow_symlinks(args.common.follow_symlinks)
        .validation_mode(args.common.validation_mode)
        .deletion_policy(policy)
        .build();

    let mut result = run_with_progress_bar({
        let request = request.clone();
        move |sink| pipeline::run(&request, &CancellationToken::new(), &sink)
    });

    if result.cancelled {
        println!("{}", "Clean cancelled.".yellow().bold());
        return;
    }

    if result.groups.is_empty() {
        println!("{}", "No duplicates found; nothing to clean.".bright_green().bold());
        return;
    }

    if args.interactive {
        apply_interactive_survivor_choices(&mut result);
    }

    print_groups(&result);

    if matches!(policy, DeletionPolicy::DryRun) {
        println!("\n{} {}", "Dry run:".yellow().bold(), "no files were deleted.".yellow());
        export_report_and_scripts(&result, &request, args.common.json_output.as_ref(), args.common.export_scripts.as_ref());
        return;
    }

    let gate = DeletionGate::new(DeletionGateConfig::default());
    let token = match &args.token {
        Some(t) => t.clone(),
        None => {
            if !ask_user_to_confirm() {
                println!("{}", "Aborted. No files were deleted.".yellow());
                return;
            }
            gate.issue_token("cli confirm")
        }
    };

    if let Err(e) = gate.assert_allowed(request.validation_mode, Some(&token)) {
        eprintln!("{} {e}", "Deletion blocked:".red().bold());
        return;
    }

    let plan = result.delete_plan.as_ref().expect("plan exists when groups are non-empty");
    let scan_root = args.common.roots.first().cloned().unwrap_or_default();
    let outcome = executor::execute(plan, &request, &scan_root, &CancellationToken::new(), &ProgressSink::null());

    if let Some(action) = &outcome.trash_action {
        let trash_root = scan_root.join(trash::TRASH_DIR_NAME);
        if let Err(e) = trash::write_trash_log(&trash_root, action) {
            eprintln!("{} {e}", "Warning: failed to persist trash log:".yellow().bold());
        }
    }

    println!(
        "\n{} Deleted {} file(s), {} failed.",
        "Done:".green().bold(),
        outcome.deleted_count.to_string().bright_yellow(),
        outcome.failed_count.to_string().bright_yellow()
    );
    for (path, reason) in &outcome.failures {
        eprintln!("{} {}: {reason}", "[FAILED]".red().bold(), path.display());
    }

    export_report_and_scripts(&result, &request, args.common.json_output.as_ref(), args.common.export_scripts.as_ref());
}

fn run_undo(args: UndoArgs) {
    match trash::read_trash_log(&args.trash_dir) {
        Ok(action) => {
            if trash::undo(&action) {
                println!("{} {} file(s) restored.", "Undo complete:".green().bold(), action.moved.len());
            } else {
                eprintln!("{}", "Undo completed with some failures; check the files above.".yellow().bold());
            }
        }
        Err(e) => eprintln!("{} {e}", "Failed to read trash log:".red().bold()),
    }
}

fn main() {
    env_logger::init();

    println!(
        "{}\n------------------------------------------------------------",
        "cerebro — duplicate-file detection and safe-cleanup engine".bold()
    );

    let cli = Cli::parse();
    match cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Similar(args) => run_similar(args),
        Command::Clean(args) => run_clean(args),
        Command::Undo(args) => run_undo(args),
    }
}
