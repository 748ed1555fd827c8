use std::{io::Read, path::PathBuf, sync::Arc};

use chrono::Utc;
use clap::Parser;
use sweeper::{
    config::SweeperConfig,
    db,
    jobs::{self, Dependencies, Outcome},
    models::Job,
    observability,
    queue::{self, JobQueue},
    retention,
};

/// CLI arguments for the sweeper deletes worker
#[derive(Parser, Debug)]
#[command(version, about = "Cascading deletes worker", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (defaults to built-in settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the deletes worker until interrupted
    Worker,
    /// Run one job directly, without the queue
    Run {
        /// JSON job file (`-` reads stdin)
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Push one job onto the deletes queue
    Enqueue {
        /// JSON job file (`-` reads stdin)
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Run the retention scheduler until interrupted
    Maintenance {
        /// Enqueue a single round of purges and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = load_config(args.config.as_ref());

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Command::Worker => run_worker(config).await,
        Command::Run { input } => run_job(config, &input).await,
        Command::Enqueue { input } => run_enqueue(config, &input).await,
        Command::Maintenance { once } => run_maintenance(config, once).await,
    }
}

fn load_config(path: Option<&PathBuf>) -> SweeperConfig {
    let result = match path {
        Some(path) => SweeperConfig::from_file(path),
        None => {
            let config = SweeperConfig::default();
            config.validate().map(|()| config)
        }
    };
    result.unwrap_or_else(|e| {
        eprintln!("Failed to load config: {}", e);
        std::process::exit(1);
    })
}

fn read_input(input: &str) -> String {
    let result = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        std::fs::read_to_string(input)
    };
    result.unwrap_or_else(|e| {
        eprintln!("Failed to read job from {}: {}", input, e);
        std::process::exit(1);
    })
}

async fn dependencies(config: &SweeperConfig) -> Dependencies {
    let store = db::create_store(&config.database).await.unwrap_or_else(|e| {
        eprintln!("Failed to open record store: {}", e);
        std::process::exit(1);
    });
    Dependencies::new(store, config.storage.clone())
}

async fn open_queue(config: &SweeperConfig) -> Arc<dyn JobQueue> {
    queue::create_queue(&config.queue).await.unwrap_or_else(|e| {
        eprintln!("Failed to open job queue: {}", e);
        std::process::exit(1);
    })
}

async fn run_worker(config: SweeperConfig) {
    let deps = dependencies(&config).await;
    let queue = open_queue(&config).await;

    let worker = queue::start_deletes_worker(queue, deps, config.queue.poll_interval());
    tokio::select! {
        _ = worker => {},
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping deletes worker");
        }
    }
}

async fn run_job(config: SweeperConfig, input: &str) {
    let deps = dependencies(&config).await;
    let contents = read_input(input);

    match jobs::process_json(&deps, &contents).await {
        Ok(Outcome::Completed(report)) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode report: {}", e),
        },
        Ok(Outcome::Skipped { reason }) => println!("Skipped: {}", reason),
        Err(e) => {
            eprintln!("Job failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_enqueue(config: SweeperConfig, input: &str) {
    let job = Job::from_json(&read_input(input)).unwrap_or_else(|e| {
        eprintln!("Invalid job: {}", e);
        std::process::exit(1);
    });
    let queue = open_queue(&config).await;

    match queue.push(job).await {
        Ok(queued) => println!("{}", queued.id),
        Err(e) => {
            eprintln!("Failed to enqueue job: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_maintenance(config: SweeperConfig, once: bool) {
    let queue = open_queue(&config).await;

    if once {
        match retention::enqueue_purges(queue.as_ref(), &config.retention, Utc::now()).await {
            Ok(jobs) => {
                for job in jobs {
                    println!("{} {}", job.id, job.job.kind());
                }
            }
            Err(e) => {
                eprintln!("Failed to enqueue purges: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let scheduler = retention::start_retention_worker(queue, config.retention.clone());
    tokio::select! {
        _ = scheduler => {},
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping retention scheduler");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
