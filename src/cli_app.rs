//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use registry_retention::core::config::Config;
use registry_retention::core::errors::RrpError;
use registry_retention::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use registry_retention::registry::client::HttpRegistry;
use registry_retention::registry::session::SessionCookie;
use registry_retention::retention::RunContext;
use registry_retention::retention::eviction::{
    EvictionReport, RepoEvictor, prompt_batch_size, validate_batch_size,
};
use registry_retention::retention::policy::{FactorSpec, PolicyConfig};
use registry_retention::retention::ranking::Ranking;
use registry_retention::retention::runner::{
    TagRetentionSummary, analyse_repositories, run_tag_retention,
};
use registry_retention::retention::scoring::ScoringEngine;
use registry_retention::retention::tags::{RepositoryTagReport, TagRetentionOptions};

/// Registry retention policy runner.
#[derive(Debug, Parser)]
#[command(
    name = "rrp",
    author,
    version,
    about = "Registry Retention Policy - score, rank and prune registry repositories and tags",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Print per-repository score breakdowns.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (prompts and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Score public repositories and interactively soft-delete the lowest ranked.
    ReposRetention,
    /// Delete the oldest over-age tags of each repository beyond a cap.
    TagsRetention(TagsRetentionArgs),
    /// Show the effective retention policy.
    Policy,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct TagsRetentionArgs {
    /// Tags created at most this many days ago are never deleted.
    #[arg(short, long, value_name = "DAYS")]
    day: u32,
    /// Number of over-age tags to keep per repository.
    #[arg(short, long, value_name = "COUNT")]
    max: usize,
    /// Only process repositories matching this search query (default: all).
    #[arg(short = 'n', long, default_value = "", value_name = "NAME")]
    repo_name: String,
    /// Report what would be deleted without deleting anything.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type. Every variant ends the process with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// Retention run failure.
    #[error(transparent)]
    Retention(#[from] RrpError),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::ReposRetention => run_repos_retention(cli),
        Command::TagsRetention(args) => run_tags_retention(cli, args),
        Command::Policy => run_policy(cli),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Shared run plumbing
// ---------------------------------------------------------------------------

/// Loaded configuration plus the registry client and activity log it implies.
struct RunEnv {
    config: Config,
    registry: HttpRegistry,
    log: JsonlWriter,
}

impl RunEnv {
    fn load(cli: &Cli) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        let session =
            SessionCookie::resolve(Config::session_id_override(), &config.paths.session_file)?;
        let registry = HttpRegistry::new(&config.registry, &session);
        let log = JsonlWriter::open(JsonlConfig::new(&config.paths.activity_log));
        Ok(Self {
            config,
            registry,
            log,
        })
    }
}

/// Bracket a command with `run_start`/`run_complete` entries and record a
/// fatal error before it propagates.
fn logged_run<T>(
    log: &mut JsonlWriter,
    command: &str,
    body: impl FnOnce(&mut JsonlWriter) -> Result<T, CliError>,
) -> Result<T, CliError> {
    log.write_entry(&LogEntry::new(EventType::RunStart, Severity::Info).details(command));
    let result = body(log);

    let complete = LogEntry::new(EventType::RunComplete, Severity::Info).details(command);
    match &result {
        Ok(_) => log.write_entry(&complete.outcome(Ok(()))),
        Err(CliError::Retention(error)) => {
            log.write_entry(&LogEntry::error(error));
            log.write_entry(&complete.outcome(Err(error)));
        }
        Err(other) => {
            let mut entry = complete;
            entry.ok = Some(false);
            entry.severity = Severity::Critical;
            entry.error_message = Some(other.to_string());
            log.write_entry(&entry);
        }
    }
    log.flush();
    result
}

// ---------------------------------------------------------------------------
// repos-retention
// ---------------------------------------------------------------------------

fn run_repos_retention(cli: &Cli) -> Result<(), CliError> {
    let mode = output_mode(cli);
    let RunEnv {
        config,
        registry,
        mut log,
    } = RunEnv::load(cli)?;

    logged_run(&mut log, "repos-retention", |log| {
        let policy = PolicyConfig::load(&config.policy.file)?;
        let mut ctx = RunContext::new(&registry, log);
        let engine = ScoringEngine::new(policy, ctx.now);
        let analysis = analyse_repositories(&mut ctx, &engine)?;

        if mode == OutputMode::Human && !cli.quiet {
            print_ranking(&analysis.ranking, analysis.public_repo_count, cli.verbose);
        }

        // Prompts stay off stdout in JSON mode so the report remains parseable.
        let mut prompt_out: Box<dyn Write> = match mode {
            OutputMode::Human => Box::new(io::stdout()),
            OutputMode::Json => Box::new(io::stderr()),
        };
        let Some(requested) = prompt_batch_size(&mut io::stdin().lock(), &mut prompt_out)? else {
            return emit_repo_cancelled(mode, &analysis.ranking, analysis.public_repo_count);
        };
        let count = validate_batch_size(requested)?;

        if mode == OutputMode::Human && !cli.quiet {
            println!("\n=== Start soft deletion ===\n");
        }
        let mut heap = analysis.ranking.consumption_heap();
        let report = RepoEvictor::new(&mut ctx).execute(&mut heap, count)?;

        match mode {
            OutputMode::Human => {
                print_eviction_report(&report, cli.quiet);
                if !report.deleted.is_empty() && !cli.quiet {
                    print_gc_hint();
                }
            }
            OutputMode::Json => {
                write_json_line(&json!({
                    "command": "repos-retention",
                    "public_repo_count": analysis.public_repo_count,
                    "ranking": analysis.ranking.entries(),
                    "cancelled": false,
                    "eviction": report,
                }))?;
            }
        }
        Ok(())
    })
}

fn emit_repo_cancelled(
    mode: OutputMode,
    ranking: &Ranking,
    public_repo_count: u64,
) -> Result<(), CliError> {
    match mode {
        OutputMode::Human => println!("\nInput closed before confirmation; nothing deleted."),
        OutputMode::Json => write_json_line(&json!({
            "command": "repos-retention",
            "public_repo_count": public_repo_count,
            "ranking": ranking.entries(),
            "cancelled": true,
        }))?,
    }
    Ok(())
}

fn print_ranking(ranking: &Ranking, public_repo_count: u64, verbose: bool) {
    println!("{}", "-".repeat(72));
    println!("     Current Number of Public Repositories: {public_repo_count}");
    println!("{}", "-".repeat(72));
    println!("  Ranked by score (low to high); the top of the list is deleted first.\n");
    println!(
        "  {:>3}  {:>10}  {:>6}  {:<40}  {:>8}  {:>5}  {:<20}",
        "#", "score", "id", "name", "pulls", "tags", "updated"
    );
    for (i, candidate) in ranking.entries().iter().enumerate() {
        println!(
            "  {:>3}  {:>10.2}  {:>6}  {:<40}  {:>8}  {:>5}  {:<20}",
            i + 1,
            candidate.score,
            candidate.id,
            candidate.name,
            candidate.pull_count,
            candidate.tags_count,
            candidate.update_time.format("%Y-%m-%d %H:%M:%S"),
        );
        if verbose {
            println!("       {}", candidate.breakdown.to_string().dimmed());
        }
    }
}

fn print_eviction_report(report: &EvictionReport, quiet: bool) {
    if !quiet {
        for candidate in &report.deleted {
            println!("  {} {} (score {:.2})", "deleted".green(), candidate.name, candidate.score);
        }
    }
    for failed in &report.failed {
        eprintln!("  {} {}: {}", "failed".red(), failed.name, failed.error);
    }
    if quiet {
        return;
    }
    if report.exhausted {
        println!(
            "  {}",
            format!(
                "only {} repositories were available for deletion",
                report.attempted()
            )
            .yellow()
        );
    }
    println!(
        "\n=== Finish soft deletion: {} deleted, {} failed ===\n",
        report.deleted.len(),
        report.failed.len()
    );
}

fn print_gc_hint() {
    println!("-----------------------------");
    println!(
        "Soft deletion only unlinks repositories. To reclaim disk space, run the registry's garbage collection:"
    );
    println!("1. Enter the registry installation directory (e.g. /opt/apps/harbor/)");
    println!("2. Preview which blobs would be removed:");
    println!("    a. docker-compose stop");
    println!(
        "    b. docker run -it --name gc --rm --volumes-from registry vmware/registry:2.6.2-photon garbage-collect --dry-run /etc/registry/config.yml"
    );
    println!("3. Run garbage collection and restart:");
    println!(
        "    a. docker run -it --name gc --rm --volumes-from registry vmware/registry:2.6.2-photon garbage-collect /etc/registry/config.yml"
    );
    println!("    b. docker-compose start");
    println!();
    println!(
        "{}",
        "WARNING: make sure nothing pushes images while garbage collection runs, or layers of the pushed image may be deleted. Stop the registry first."
            .yellow()
    );
    println!("-----------------------------");
}

// ---------------------------------------------------------------------------
// tags-retention
// ---------------------------------------------------------------------------

fn run_tags_retention(cli: &Cli, args: &TagsRetentionArgs) -> Result<(), CliError> {
    let mode = output_mode(cli);
    let RunEnv {
        registry, mut log, ..
    } = RunEnv::load(cli)?;
    let options = TagRetentionOptions {
        max_age_days: args.day,
        max_keep: args.max,
        repo_name: args.repo_name.clone(),
        dry_run: args.dry_run,
    };

    logged_run(&mut log, "tags-retention", |log| {
        let mut ctx = RunContext::new(&registry, log);

        if mode == OutputMode::Human && !cli.quiet {
            print_tag_run_header(&options);
        }

        let mut reports = Vec::new();
        let summary = run_tag_retention(&mut ctx, &options, |report| match mode {
            OutputMode::Human => {
                if !cli.quiet {
                    print_tag_report(report);
                }
                for failed in &report.failed {
                    eprintln!(
                        "  {} {}:{}: {}",
                        "failed".red(),
                        report.repository,
                        failed.name,
                        failed.error
                    );
                }
            }
            OutputMode::Json => reports.push(report.clone()),
        })?;

        match mode {
            OutputMode::Human => {
                if !cli.quiet {
                    print_tag_summary(&summary);
                }
            }
            OutputMode::Json => write_json_line(&json!({
                "command": "tags-retention",
                "options": {
                    "day": options.max_age_days,
                    "max": options.max_keep,
                    "repo_name": options.repo_name,
                    "dry_run": options.dry_run,
                },
                "repositories": reports,
                "summary": summary,
            }))?,
        }
        Ok(())
    })
}

fn print_tag_run_header(options: &TagRetentionOptions) {
    println!("===============================");
    println!("==  Start tags RP Analysing  ==");
    println!("===============================\n");
    if options.repo_name.is_empty() {
        println!(
            "==> on all repositories, max-days-untouched: {}   max-keep-num-after-Ndays: {}",
            options.max_age_days, options.max_keep
        );
    } else {
        println!(
            "==> only on repositories matching [{}], max-days-untouched: {}   max-keep-num-after-Ndays: {}",
            options.repo_name, options.max_age_days, options.max_keep
        );
    }
}

const TAG_TABLE_RULE: &str = "+--------+----------------------------------------------------+----------------------------------+-----------------+";

fn print_tag_report(report: &RepositoryTagReport) {
    println!("\n{}", "-".repeat(54));
    println!(
        "| repo_name: {} | tags_count: {} |",
        report.repository, report.reported_tags
    );
    println!("{}", "-".repeat(54));
    println!("{TAG_TABLE_RULE}");
    println!(
        "| {:<6} | {:<50} | {:<32} | {:<15} |",
        "Action", "TagName", "CreateTime", "DaysPast"
    );
    println!("{TAG_TABLE_RULE}");
    for tag in &report.tags {
        let marker = if report.is_marked(tag) { "*" } else { "" };
        println!(
            "| {:<6} | {:<50} | {:<32} | {:<15.6} |",
            marker, tag.name, tag.created_raw, tag.age_days
        );
    }
    println!("{TAG_TABLE_RULE}");
    println!(
        "--> # of tags within {} days: {} , # of tags older than {} days: {}",
        report.max_age_days, report.retained, report.max_age_days, report.candidates
    );

    if !report.over_cap() {
        println!(
            "--> max-keep-num-after-Ndays ({}) covers actual num ({}), nothing to do.",
            report.max_keep, report.candidates
        );
        return;
    }
    println!(
        "--> max-keep-num-after-Ndays ({}) less than actual num ({}), evicting oldest.",
        report.max_keep, report.candidates
    );
    let verb = if report.dry_run {
        "would delete".yellow()
    } else {
        "deleted".green()
    };
    for tag in &report.evicted {
        println!("    {verb} {}:{} (created {})", report.repository, tag.name, tag.created_raw);
    }
    if report.dry_run {
        println!("with '--dry-run' set, nothing was deleted.");
    }
}

fn print_tag_summary(summary: &TagRetentionSummary) {
    let verb = if summary.dry_run {
        "would delete"
    } else {
        "deleted"
    };
    println!(
        "\n=== Finish tags RP Analysing: {} repositories, {} retained, {} over age, {} {verb}, {} failed ===\n",
        summary.repositories, summary.retained, summary.candidates, summary.evicted, summary.failed
    );
}

// ---------------------------------------------------------------------------
// policy
// ---------------------------------------------------------------------------

fn run_policy(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let policy = PolicyConfig::load(&config.policy.file)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("Policy file: {}", config.policy.file.display());
            for (label, spec) in [
                ("update_time (days)", &policy.update_time),
                ("pull_count", &policy.pull_count),
                ("tags_count", &policy.tags_count),
            ] {
                print_factor_spec(label, spec);
            }
        }
        OutputMode::Json => write_json_line(&json!({
            "command": "policy",
            "file": config.policy.file,
            "policy": policy,
        }))?,
    }
    Ok(())
}

fn print_factor_spec(label: &str, spec: &FactorSpec) {
    println!("\n{} base {:.2}", label.bold(), spec.base);
    if spec.buckets.is_empty() {
        println!("  (no buckets, every value takes the default weight)");
        return;
    }
    for bucket in &spec.buckets {
        println!(
            "  [{:>6}, {:>6})  weight {:.2}",
            bucket.range.low, bucket.range.high, bucket.weight
        );
    }
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("RRP_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

/// The tool is interactive, so anything but an explicit JSON request is human.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
