use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use cron_backup::config::{self, Config};
use cron_backup::managers::logging::{self, LoggingConfig};
use cron_backup::utils::cron::{next_after, parse_schedule};
use cron_backup::utils::dispatch::dispatch_and_wait;
use cron_backup::utils::ProcessDispatcher;
use cron_backup::{CronScheduler, JobBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "cron-backup")]
#[command(about = "Scheduled backups shipped to multiple storages", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/cron-backup/config.toml")]
    config: PathBuf,

    /// Run the scheduler daemon when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one job now, or every job once in its own process
    Run {
        /// Job to run in this process (defaults to all jobs)
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Validate configuration and check required external tools
    Validate,

    /// List configured jobs and their next run
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config_or_env(&cli.config)?;

    match cli.command {
        None => {
            let _log_guard = init_file_logging(&config)?;
            run_daemon(&config, &cli.config)
        }
        Some(Commands::Run { job: Some(name) }) => {
            let _log_guard = init_file_logging(&config)?;
            let resolved = config::find_job(&config, &name)?;
            let job = JobBuilder::new(&config).build(&resolved)?;
            job.run()?;
            Ok(())
        }
        Some(Commands::Run { job: None }) => {
            let _log_guard = init_file_logging(&config)?;
            run_all(&config, &cli.config)
        }
        Some(Commands::Validate) => {
            logging::init_console_logging();
            validate(&config)
        }
        Some(Commands::List) => {
            logging::init_console_logging();
            list(&config)
        }
    }
}

/// Console plus rotating file logging (caller keeps the guard alive)
fn init_file_logging(config: &Config) -> Result<logging::LogGuard> {
    logging::init_logging(&LoggingConfig::from_global(&config.global))
}

fn run_daemon(config: &Config, config_path: &Path) -> Result<()> {
    let jobs = config::resolve_jobs(config)?;

    // Surface configuration errors at startup rather than in every child
    JobBuilder::new(config).build_all(&jobs)?;

    let dispatcher = ProcessDispatcher::for_current_exe(config_path)?;
    let mut scheduler = CronScheduler::new(dispatcher);
    let armed = scheduler.schedule_all(
        jobs.iter().map(|job| (job.schedule.as_str(), job.name.as_str())),
        Utc::now(),
    );
    if armed == 0 && !jobs.is_empty() {
        anyhow::bail!("None of the {} configured job(s) has an upcoming run", jobs.len());
    }

    info!(
        "Starting scheduler for application '{}' with {} of {} job(s)",
        config.global.app_name,
        armed,
        jobs.len()
    );
    scheduler.run(Duration::from_secs(config.global.poll_interval_seconds))
}

fn run_all(config: &Config, config_path: &Path) -> Result<()> {
    let names: Vec<String> = config::resolve_jobs(config)?
        .into_iter()
        .map(|job| job.name)
        .collect();

    println!("Running {} job(s)...", names.len());
    let dispatcher = ProcessDispatcher::for_current_exe(config_path)?;
    let failed = dispatch_and_wait(&dispatcher, &names);

    if !failed.is_empty() {
        anyhow::bail!("{} job(s) failed: {}", failed.len(), failed.join(", "));
    }

    println!("✓ All jobs completed successfully");
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    let jobs = config::resolve_jobs(config)?;
    let builder = JobBuilder::new(config);
    let mut problems = 0;

    println!("Application: {}", config.global.app_name);

    for job in &jobs {
        if let Err(e) = builder.build(job) {
            println!("✗ Job '{}': {}", job.name, e);
            problems += 1;
            continue;
        }

        let missing = builder.missing_programs(job)?;

        if missing.is_empty() {
            println!("✓ Job '{}' ({})", job.name, job.schedule);
        } else {
            println!("✗ Job '{}': missing programs on PATH: {}", job.name, missing.join(", "));
            problems += 1;
        }
    }

    if problems > 0 {
        anyhow::bail!("{} of {} job(s) have problems", problems, jobs.len());
    }

    println!("Configuration is valid!");
    Ok(())
}

fn list(config: &Config) -> Result<()> {
    let now = Utc::now();

    println!("Configured jobs:");
    for job in config::resolve_jobs(config)? {
        let next_run = parse_schedule(&job.schedule)
            .ok()
            .and_then(|schedule| next_after(&schedule, now))
            .map(|next| next.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());

        println!("  {}", job.name);
        println!("    Schedule: {}", job.schedule);
        println!("    Next run: {}", next_run);
        println!("    Target: {}", job.config.target.kind);
        println!(
            "    Storages: {}",
            job.config
                .storages
                .iter()
                .map(|s| s.kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!(
            "    Notifiers: {}",
            job.config
                .notifiers
                .iter()
                .map(|n| n.kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!();
    }

    Ok(())
}
