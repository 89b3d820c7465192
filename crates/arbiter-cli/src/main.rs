//! Arbiter CLI
//!
//! Judges a source file against a directory of `N.in` / `N.out` test cases.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arbiter::{
    CaseResult, Config, EXAMPLE_CONFIG, ExecutionLimits, ExecutionPolicy, Judge, JudgeRequest,
    Language, TestCase, TestReport,
};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(about = "Judge untrusted submissions against test cases")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "arbiter.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Judge a submission and print the verdict
    Judge(SubmissionArgs),

    /// Run every test case and print a per-case report
    Test(SubmissionArgs),

    /// List configured languages
    Languages,

    /// Show the effective configuration
    ShowConfig,
}

#[derive(Args)]
struct SubmissionArgs {
    /// Source file to judge
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Language (e.g. cpp, java, python)
    #[arg(short, long)]
    language: Language,

    /// Directory holding N.in / N.out pairs
    #[arg(long, value_name = "DIR")]
    cases: PathBuf,

    /// Time limit per case in milliseconds
    #[arg(short, long)]
    time_limit: Option<u64>,

    /// Memory limit per case in KB
    #[arg(short, long)]
    memory_limit: Option<u64>,

    /// Execution policy (sequential or aggregate)
    #[arg(long)]
    policy: Option<ExecutionPolicy>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Judge(args) => run_judge(config, args).await,
        Commands::Test(args) => run_test(config, args).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_judge(config: Config, args: SubmissionArgs) -> Result<()> {
    let (judge, request) = prepare(config, &args).await?;
    let result = judge.judge(request).await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to serialize result")?
        );
    } else {
        println!("{}", result.status);
        if !result.is_accepted() {
            println!("{}", result.message);
        }
        println!("Time: {} ms", result.total_execution_time_ms);
        println!("Memory: {} KB", result.max_memory_used_kb);
        if let Some(case) = &result.failed_case {
            print_case_detail(case);
        }
    }

    if result.is_accepted() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

async fn run_test(config: Config, args: SubmissionArgs) -> Result<()> {
    let (judge, request) = prepare(config, &args).await?;
    let report = judge.run_tests(request).await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        print_report(&report);
    }

    if report.total > 0 && report.passed == report.total {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// Read the submission and its cases, and build a judge for them
async fn prepare(mut config: Config, args: &SubmissionArgs) -> Result<(Judge, JudgeRequest)> {
    if let Some(policy) = args.policy {
        config.execution_policy = policy;
    }

    let source_code = tokio::fs::read_to_string(&args.source)
        .await
        .with_context(|| format!("failed to read source file '{}'", args.source.display()))?;
    let test_cases = load_cases(&args.cases).await?;
    info!(language = %args.language, cases = test_cases.len(), "judging submission");

    let limits = ExecutionLimits::new(
        args.time_limit.unwrap_or(config.default_limits.time_limit_ms),
        args.memory_limit
            .unwrap_or(config.default_limits.memory_limit_kb),
    );
    let judge = Judge::new(config).context("invalid configuration")?;
    let request = JudgeRequest::new(source_code, args.language, test_cases).with_limits(limits);
    Ok((judge, request))
}

/// Load `N.in` / `N.out` pairs from `dir`, ordered by N
async fn load_cases(dir: &Path) -> Result<Vec<TestCase>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read test case directory '{}'", dir.display()))?;

    let mut numbered = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "in") {
            continue;
        }
        let Some(index) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u64>().ok())
        else {
            debug!(path = %path.display(), "skipping non-numbered input");
            continue;
        };
        numbered.push((index, path));
    }
    numbered.sort_by_key(|(index, _)| *index);

    let mut cases = Vec::with_capacity(numbered.len());
    for (_, input_path) in numbered {
        let output_path = input_path.with_extension("out");
        let input = tokio::fs::read_to_string(&input_path)
            .await
            .with_context(|| format!("failed to read '{}'", input_path.display()))?;
        let expected = tokio::fs::read_to_string(&output_path)
            .await
            .with_context(|| format!("missing expected output '{}'", output_path.display()))?;
        cases.push(TestCase::new(input, expected));
    }

    if cases.is_empty() {
        anyhow::bail!("no test cases found in '{}'", dir.display());
    }
    Ok(cases)
}

fn print_report(report: &TestReport) {
    if let (Some(status), Some(message)) = (report.rejection, &report.message) {
        println!("{status}");
        println!("{message}");
        return;
    }

    for (index, case) in report.case_results.iter().enumerate() {
        println!(
            "#{:<4} {:<22} {:>6} ms {:>9} KB",
            index + 1,
            case.status.to_string(),
            case.execution_time_ms,
            case.memory_used_kb
        );
        if !case.is_accepted() {
            print_case_detail(case);
        }
    }
    println!();
    println!(
        "{:?}: {}/{} passed, {} ms total, {} KB peak",
        report.outcome,
        report.passed,
        report.total,
        report.total_execution_time_ms,
        report.max_memory_used_kb
    );
}

fn print_case_detail(case: &CaseResult) {
    if let Some(message) = case.message.as_deref().filter(|m| !m.trim().is_empty()) {
        println!("  message:  {}", message.trim_end());
    }
    println!("  expected: {:?}", case.expected_output);
    if let Some(actual) = &case.actual_output {
        println!("  actual:   {actual:?}");
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    for language in config.supported_languages() {
        if let Ok(toolchain) = config.toolchain(language) {
            println!(
                "  {:<10} {} ({})",
                language.id(),
                toolchain.name,
                toolchain.source_name()
            );
        }
    }
}

fn show_config(config: &Config) {
    println!("Execution policy: {:?}", config.execution_policy);
    println!();
    println!("Default limits:");
    println!("  Time limit: {} ms", config.default_limits.time_limit_ms);
    println!("  Memory limit: {} KB", config.default_limits.memory_limit_kb);
    println!("  Compile timeout: {} ms", config.compile_timeout_ms);
    println!("  Output cap: {} KB", config.max_output_kb);
    println!();
    if config.sandbox.enabled {
        println!("Sandbox: {}", config.sandbox.command);
    } else {
        println!("Sandbox: disabled");
    }
    println!(
        "Worker pool: {} workers, queue of {}",
        config.pool.workers, config.pool.queue_capacity
    );
    println!(
        "Comparison: epsilon {}, ignore whitespace {}",
        config.compare.epsilon, config.compare.ignore_whitespace
    );
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
