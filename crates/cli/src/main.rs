mod cli;
mod functions;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tracing::info;

use fanout::{DefaultParallelOptions, Parallel};
use fanout_core::config::{self, PoolConfig};
use fanout_pool::IsolatedThreadPool;

use crate::cli::{CliArgs, Command, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    config::load_dotenv();
    let args = CliArgs::parse();
    let config = resolve_config(&args);
    config.log_summary();

    let pipeline = match args.command {
        Command::Pipeline(pipeline) => pipeline,
        Command::Config => {
            return print_report(
                &json!({
                    "profile": config.profile_label(),
                    "units": config.resolved_units(),
                    "maxConcurrencyLevel": config.resolved_max_concurrency_level(),
                    "minValuesPerWorker": config.min_values_per_worker,
                    "maxValuesPerWorker": config.max_values_per_worker,
                }),
                args.pretty,
            )
        }
    };

    let (registry, funcs) = functions::registry().context("failed to register functions")?;
    let pool = Arc::new(
        IsolatedThreadPool::from_config(registry, &config).context("failed to start worker pool")?,
    );
    let options = DefaultParallelOptions::from_config(pool.clone(), &config)
        .context("invalid scheduling configuration")?;
    let parallel = Parallel::new(options);

    info!(?pipeline, units = pool.units(), "running pipeline");
    let result: Value = match pipeline {
        Pipeline::Squares { count, even } => {
            let mut chain = parallel.from(1..=count).map(&funcs.square);
            if even {
                chain = chain.filter(&funcs.is_even);
            }
            Value::Array(chain.result()?.await.context("squares pipeline failed")?)
        }
        Pipeline::Sum { start, end, step } => parallel
            .range(start, end, step)?
            .reduce(0, &funcs.add)?
            .await
            .context("sum pipeline failed")?,
        Pipeline::Times { count } => Value::Array(
            parallel
                .times(count, &funcs.square)
                .result()?
                .await
                .context("times pipeline failed")?,
        ),
    };

    print_report(
        &json!({
            "result": result,
            "metrics": pool.metrics(),
        }),
        args.pretty,
    )
}

/// Env config, overridden by whatever was passed on the command line.
fn resolve_config(args: &CliArgs) -> PoolConfig {
    let mut config = PoolConfig::for_profile(&args.profile);
    if let Some(units) = args.units {
        config.units = units;
    }
    if let Some(level) = args.max_concurrency {
        config.max_concurrency_level = level;
    }
    if args.min_values_per_worker.is_some() {
        config.min_values_per_worker = args.min_values_per_worker;
    }
    if args.max_values_per_worker.is_some() {
        config.max_values_per_worker = args.max_values_per_worker;
    }
    config
}

fn print_report(report: &Value, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    println!("{text}");
    Ok(())
}
