//! jobpool CLI: drive the job engine and inspect persisted results.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jobpool::config::Config;
use jobpool::engine::Engine;
use jobpool::model::{JobId, JobStatusView};
use jobpool::storage::ResultStore;
use jobpool::telemetry::{TelemetryConfig, init_telemetry};
use serde_json::json;

#[derive(Parser)]
#[command(name = "jobpool", about = "In-process asynchronous job engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a batch of synthetic jobs through the pool, then drain
    Run {
        /// Number of jobs to submit
        #[arg(long, default_value_t = 20)]
        jobs: u64,
        /// Every n-th job fails (0 disables failures)
        #[arg(long, default_value_t = 5)]
        fail_every: u64,
        /// Upper bound on the simulated work time per job
        #[arg(long, default_value_t = 200)]
        max_delay_ms: u64,
    },
    /// Show the persisted record of a job
    Show {
        /// Job id, e.g. job_id_3
        id: String,
        /// Results directory (defaults to RESULTS_DIR)
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },
    /// List job ids with a persisted record
    List {
        /// Results directory (defaults to RESULTS_DIR)
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Run {
            jobs,
            fail_every,
            max_delay_ms,
        } => cmd_run(config, jobs, fail_every, max_delay_ms).await,
        Command::Show { id, results_dir } => {
            let dir = results_dir.unwrap_or(config.pool.results_dir);
            cmd_show(dir, id).await
        }
        Command::List { results_dir } => {
            let dir = results_dir.unwrap_or(config.pool.results_dir);
            cmd_list(dir).await
        }
    }
}

async fn cmd_run(
    config: Config,
    jobs: u64,
    fail_every: u64,
    max_delay_ms: u64,
) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "jobpool".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let engine = Engine::start(config.pool).await?;

    for n in 0..jobs {
        let fails = fail_every > 0 && (n + 1) % fail_every == 0;
        let delay = Duration::from_millis((n * 37) % max_delay_ms.max(1));
        engine.submit(move || {
            std::thread::sleep(delay);
            if fails {
                return Err("division by zero".to_string());
            }
            let sum: u64 = (0..=n * 1000).sum();
            Ok(json!({ "n": n, "sum": sum }))
        });
    }

    tokio::select! {
        _ = wait_until_terminal(&engine) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("interrupted, draining {} queued job(s)", engine.pending_jobs_count());
        }
    }

    engine.shutdown().await?;

    println!("{:<14}  STATUS", "JOB");
    println!("{}", "-".repeat(24));
    for (id, status) in engine.all_statuses() {
        println!("{:<14}  {status}", id.to_string());
    }
    Ok(())
}

async fn wait_until_terminal(engine: &Engine) {
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        ticker.tick().await;
        let statuses = engine.all_statuses();
        let running = statuses
            .values()
            .filter(|status| **status == JobStatusView::Running)
            .count();
        if running == 0 {
            return;
        }
        println!(
            "{running} job(s) running, {} queued",
            engine.pending_jobs_count()
        );
    }
}

async fn cmd_show(dir: PathBuf, id: String) -> anyhow::Result<()> {
    let store = ResultStore::open(&dir).await?;
    let id: JobId = id.parse()?;
    let record = store.read(id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_list(dir: PathBuf) -> anyhow::Result<()> {
    let store = ResultStore::open(&dir).await?;
    let ids = store.list().await?;

    if ids.is_empty() {
        println!("No results found in {}.", dir.display());
        return Ok(());
    }
    for id in &ids {
        let record = store.read(*id).await?;
        println!("{:<14}  {}", id.to_string(), record.status());
    }
    println!("\n{} record(s)", ids.len());
    Ok(())
}
