//! t2sql-bench - benchmark text-to-SQL generation endpoints.

mod cli;

use anyhow::Context;
use cli::{Cli, Command};
use serde::Serialize;
use std::sync::Arc;
use t2sql_bench::config::Config;
use t2sql_bench::error::BenchError;
use t2sql_bench::eval::{EvaluationResult, JobSummaryStats};
use t2sql_bench::logging;
use t2sql_bench::metadata;
use t2sql_bench::persistence::{JobDetail, StateDb};
use t2sql_bench::service::BenchmarkService;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        match e.downcast_ref::<BenchError>() {
            Some(bench) => error!("{}: {}", bench.category(), bench),
            None => error!("{e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Arc::new(Config::load(&config_path)?);

    match &cli.command {
        Command::Databases => {
            let names = metadata::list_databases(&config.metadata_path)?;
            if cli.json {
                print_json(&names)?;
            } else {
                names.iter().for_each(|name| println!("{name}"));
            }
            return Ok(());
        }
        Command::Metadata { database } => {
            let meta = metadata::get_database_metadata(&config.metadata_path, database)?;
            if cli.json {
                print_json(&meta)?;
            } else {
                println!("{}", meta.schema_ddl);
                println!(
                    "\n{} column descriptions, {} knowledge base entries",
                    meta.column_meanings.len(),
                    meta.knowledge_base.len()
                );
            }
            return Ok(());
        }
        _ => {}
    }

    let state = StateDb::open(&config.state_db_path).await?;
    let service = BenchmarkService::from_config(config.clone(), state.clone());
    let outcome = dispatch(&cli, &config, &service).await;
    state.close().await;
    outcome
}

async fn dispatch(cli: &Cli, config: &Config, service: &BenchmarkService) -> anyhow::Result<()> {
    match &cli.command {
        Command::Run { endpoints } => {
            info!("Benchmark databases at {}", config.display_base_url());

            let mut started = Vec::with_capacity(endpoints.len());
            for endpoint in endpoints {
                let (job_id, handle) = service.start_job(endpoint).await?;
                println!("Started job {job_id} for {endpoint}");
                started.push((job_id, handle));
            }

            let (ids, handles): (Vec<i64>, Vec<_>) = started.into_iter().unzip();
            for joined in futures::future::join_all(handles).await {
                joined.context("benchmark task did not finish")??;
            }

            for job_id in ids {
                if let Some(detail) = service.job_detail(job_id).await? {
                    print_detail(cli.json, &detail)?;
                }
            }
        }
        Command::Jobs => {
            let jobs = service.list_jobs().await?;
            if cli.json {
                print_json(&jobs)?;
            } else {
                for job in jobs {
                    println!(
                        "{:>5}  {:<10} {}  {}",
                        job.id,
                        job.status.as_str(),
                        job.created_at,
                        job.endpoint_url
                    );
                }
            }
        }
        Command::Show { job_id, results } => {
            let detail = service
                .job_detail(*job_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Job {job_id} not found"))?;
            print_detail(cli.json, &detail)?;

            if *results {
                let rows = service.job_results(*job_id).await?;
                print_results(cli.json, &rows)?;
            }
        }
        Command::Delete { job_id } => {
            if !service.delete_job(*job_id).await? {
                anyhow::bail!("Job {job_id} not found");
            }
            println!("Deleted job {job_id}");
        }
        Command::Evaluate { instance_id, sql } => {
            let evaluation = service.manual_evaluate(instance_id, sql).await?;
            if cli.json {
                print_json(&evaluation)?;
            } else {
                println!(
                    "{instance_id}: {}",
                    if evaluation.is_correct { "correct" } else { "incorrect" }
                );
                if let Some(err) = &evaluation.error {
                    println!("{err}");
                }
            }
        }
        Command::Databases | Command::Metadata { .. } => {}
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn print_detail(json: bool, detail: &JobDetail) -> anyhow::Result<()> {
    if json {
        return print_json(detail);
    }

    let job = &detail.job;
    println!("Job {} [{}] {}", job.id, job.status, job.endpoint_url);
    println!("  created {}  updated {}", job.created_at, job.updated_at);
    print_stats(&detail.stats);
    Ok(())
}

fn print_stats(stats: &JobSummaryStats) {
    println!(
        "  total {}  correct {}  execution_error {}  wrong_result {}",
        stats.total, stats.correct, stats.execution_error, stats.wrong_result
    );
    println!(
        "  accuracy {:.3}  valid_sql_rate {:.3}  avg_latency {:.1} ms",
        stats.accuracy_score, stats.valid_sql_rate, stats.avg_latency_ms
    );
}

fn print_results(json: bool, rows: &[EvaluationResult]) -> anyhow::Result<()> {
    if json {
        return print_json(rows);
    }

    for row in rows {
        let latency = row
            .latency_ms
            .map(|ms| format!("{ms:.0} ms"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<16} {:>8}",
            row.instance_id,
            row.outcome.as_str(),
            latency
        );
        if let Some(err) = &row.error {
            for line in err.lines() {
                println!("    {line}");
            }
        }
    }
    Ok(())
}
