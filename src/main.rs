//! crawlq binary: runs pipeline consumers and seeds the frontier.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crawlq::config::PipelineConfig;
use crawlq::consumers::{
    run_consumer, DlxReentryConsumer, FrontierAggregator, ResultAggregator, WorkConsumer,
};
use crawlq::messaging::queues::FRONTIER_QUEUE;
use crawlq::messaging::{BrokerClient, FrontierMessage, PgmqBroker};
use crawlq::scrape::HtmlScraper;
use crawlq::store::PgStore;

#[derive(Parser)]
#[command(name = "crawlq", about = "Queue-driven distributed crawl pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Component {
    All,
    Frontier,
    Dispatcher,
    Results,
    Dlx,
}

#[derive(Subcommand)]
enum Command {
    /// Run pipeline consumers until interrupted
    Run {
        /// Which consumers to run in this process
        #[arg(long, value_enum, default_value_t = Component::All)]
        component: Component,
        /// Store connection pool size
        #[arg(long, default_value_t = 10)]
        max_connections: u32,
    },
    /// Publish seed URLs to the frontier queue
    Seed {
        /// URLs to seed
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("loading configuration")?;

    match cli.command {
        Command::Run {
            component,
            max_connections,
        } => run(config, component, max_connections).await,
        Command::Seed { urls } => seed(config, urls).await,
    }
}

async fn run(config: PipelineConfig, component: Component, max_connections: u32) -> anyhow::Result<()> {
    let store = Arc::new(
        PgStore::connect(&config.database_url, max_connections)
            .await
            .context("connecting store")?,
    );
    let broker = Arc::new(
        PgmqBroker::connect(&config.database_url)
            .await
            .context("connecting broker")?,
    );
    broker.ensure_topology().await.context("declaring queues")?;
    let scraper = Arc::new(HtmlScraper::new().context("building scraper")?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    if matches!(component, Component::All | Component::Frontier) {
        let consumer =
            FrontierAggregator::new(Arc::clone(&store), Arc::clone(&broker), config.frontier);
        tasks.push(tokio::spawn(run_consumer(
            consumer,
            Arc::clone(&broker),
            config.consumer,
            shutdown_rx.clone(),
        )));
    }
    if matches!(component, Component::All | Component::Dispatcher) {
        let consumer = WorkConsumer::new(
            Arc::clone(&store),
            Arc::clone(&broker),
            Arc::clone(&scraper),
            config.retry,
        );
        tasks.push(tokio::spawn(run_consumer(
            consumer,
            Arc::clone(&broker),
            config.consumer,
            shutdown_rx.clone(),
        )));
    }
    if matches!(component, Component::All | Component::Results) {
        let consumer = ResultAggregator::new(Arc::clone(&store), config.results);
        tasks.push(tokio::spawn(run_consumer(
            consumer,
            Arc::clone(&broker),
            config.consumer,
            shutdown_rx.clone(),
        )));
    }
    if matches!(component, Component::All | Component::Dlx) {
        let consumer = DlxReentryConsumer::new(
            Arc::clone(&store),
            Arc::clone(&broker),
            Arc::clone(&scraper),
            config.retry,
        );
        tasks.push(tokio::spawn(run_consumer(
            consumer,
            Arc::clone(&broker),
            config.consumer,
            shutdown_rx.clone(),
        )));
    }

    info!(consumers = tasks.len(), "pipeline running; ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown signal received, draining consumers");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "consumer task panicked");
        }
    }

    info!("pipeline stopped");
    Ok(())
}

async fn seed(config: PipelineConfig, urls: Vec<String>) -> anyhow::Result<()> {
    let broker = PgmqBroker::connect(&config.database_url)
        .await
        .context("connecting broker")?;
    broker.ensure_topology().await.context("declaring queues")?;

    let count = urls.len();
    for url in urls {
        broker
            .publish(FRONTIER_QUEUE, &FrontierMessage::new(url.clone()))
            .await
            .with_context(|| format!("seeding {url}"))?;
        info!(url, "seed URL queued");
    }

    info!(count, "seeding complete");
    Ok(())
}
