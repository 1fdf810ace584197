use anyhow::{anyhow, Result};
use clap::Parser;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;
use tokio::sync::watch;

use crypto_rates_bot::api::{CoinGeckoClient, PriceSource};
use crypto_rates_bot::cli::{Cli, OnceCommand};
use crypto_rates_bot::clock::{Clock, SystemClock};
use crypto_rates_bot::config::{Config, StorageBackend};
use crypto_rates_bot::notifier::{LogNotifier, Notifier};
use crypto_rates_bot::scheduler::{Job, TickScheduler};
use crypto_rates_bot::services::{DispatchEngine, DispatchJob, IngestService, RateAnalytics, SubscriptionService};
use crypto_rates_bot::storage::{MemoryStore, PostgresStore, PriceHistoryStore, SubscriptionStore};
use crypto_rates_bot::telegram::{TelegramBot, TelegramNotifier};
use crypto_rates_bot::web::{self, ApiState};
use crypto_rates_bot::{logging, metrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .map_err(|e| anyhow!("Failed to load configuration from {:?}: {}", cli.config, e))?;
    logging::init(&config.logging, cli.debug)?;
    info!("Configuration loaded from {:?}", cli.config);
    metrics::init()?;

    let tracked = config.tracked_assets();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Storage
    let (prices, subscriptions, postgres): (
        Arc<dyn PriceHistoryStore>,
        Arc<dyn SubscriptionStore>,
        Option<Arc<PostgresStore>>,
    ) = match config.database.backend {
        StorageBackend::Postgres => {
            let store = PostgresStore::connect(&config.database).await?;
            if config.database.run_migrations {
                store.migrate().await?;
            }
            store.seed_coins(tracked.coins()).await?;
            let store = Arc::new(store);
            let prices: Arc<dyn PriceHistoryStore> = store.clone();
            let subscriptions: Arc<dyn SubscriptionStore> = store.clone();
            (prices, subscriptions, Some(store))
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory backend; collected data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            let prices: Arc<dyn PriceHistoryStore> = store.clone();
            let subscriptions: Arc<dyn SubscriptionStore> = store;
            (prices, subscriptions, None)
        }
    };

    // Services
    let source: Arc<dyn PriceSource> = Arc::new(CoinGeckoClient::new(&config.coingecko, &tracked)?);
    let analytics = Arc::new(RateAnalytics::new(tracked.clone(), prices.clone(), clock.clone()));
    let subscription_service = Arc::new(SubscriptionService::new(subscriptions.clone()));

    let bot = if config.telegram.enabled {
        Some(Bot::new(config.telegram.bot_token.clone()))
    } else {
        warn!("Telegram is disabled; digests will only be logged");
        None
    };
    let notifier: Arc<dyn Notifier> = match &bot {
        Some(bot) => Arc::new(TelegramNotifier::new(bot.clone())),
        None => Arc::new(LogNotifier),
    };

    let ingest: Arc<dyn Job> = Arc::new(IngestService::new(source, prices, tracked));
    let engine = Arc::new(DispatchEngine::new(
        subscriptions,
        analytics.clone(),
        notifier,
        config.dispatch.snapshot_timeout(),
    ));
    let dispatch: Arc<dyn Job> = Arc::new(DispatchJob::new(engine, clock));

    if let Some(once) = cli.once {
        let (job, limit) = match once {
            OnceCommand::Ingest => (ingest, config.ingestion.timeout()),
            OnceCommand::Dispatch => (dispatch, config.dispatch.timeout()),
        };
        info!("Running a single {} cycle", job.name());
        let outcome = tokio::time::timeout(limit, job.run()).await;
        close(postgres).await;
        return match outcome {
            Ok(result) => result.map_err(|e| anyhow!("{} cycle failed: {}", job.name(), e)),
            Err(_) => Err(anyhow!("{} cycle timed out after {:?}", job.name(), limit)),
        };
    }

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    if config.ingestion.enabled {
        let scheduler = TickScheduler::new(ingest, config.ingestion.interval(), config.ingestion.timeout());
        let rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { scheduler.start(rx).await }));
    }

    if config.dispatch.enabled {
        let scheduler = TickScheduler::new(dispatch, config.dispatch.interval(), config.dispatch.timeout());
        let rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { scheduler.start(rx).await }));
    }

    if config.server.enabled {
        let addr: SocketAddr = config.server.addr.parse()?;
        let state = ApiState {
            analytics: analytics.clone(),
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        };
        tasks.push(tokio::spawn(web::serve(addr, state, shutdown_rx.clone())));
    }

    let bot_task = bot.map(|bot| {
        let telegram = Arc::new(TelegramBot::new(
            bot,
            analytics.clone(),
            subscription_service.clone(),
            config.telegram.default_interval_minutes,
        ));
        tokio::spawn(async move {
            if let Err(e) = telegram.start().await {
                error!("Telegram bot error: {}", e);
            }
        })
    });

    info!("Service started");
    shutdown_signal().await;
    info!("Shutdown requested, waiting for in-flight work");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = bot_task {
        handle.abort();
    }
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Background task failed: {}", e),
            Err(e) => error!("Background task panicked: {}", e),
        }
    }
    close(postgres).await;

    info!("Shutdown complete");
    Ok(())
}

async fn close(postgres: Option<Arc<PostgresStore>>) {
    if let Some(store) = postgres {
        store.close().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
