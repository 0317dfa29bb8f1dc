//! TokenWatch - Headless Alert Server
//!
//! Evaluates alert configurations, aggregates multi-source sentiment and
//! scores KOL trade activity over tracked tokens, raising alerts to the
//! database and broadcast bus.

mod sim;
mod store;

use clap::Parser;
use sim::DemoFeed;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use store::MemorySampleStore;
use tokenwatch_alerts::{AlertDispatcher, Database, DispatchError, EventBus};
use tokenwatch_core::{
    Action, AlertConfig, AlertPriority, Condition, ConditionKind, ConditionValue, Operator,
    Timeframe,
};
use tokenwatch_engine::SampleStore;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// TokenWatch CLI
#[derive(Parser, Debug)]
#[command(name = "tokenwatch")]
#[command(about = "Token alert evaluation and scoring server", long_about = None)]
struct Args {
    /// SQLite database URL
    #[arg(short, long, default_value = "sqlite://tokenwatch.db")]
    database_url: String,

    /// Seconds between condition evaluation cycles
    #[arg(short, long, default_value_t = 10)]
    interval: u64,

    /// Seconds between sentiment aggregation cycles
    #[arg(short, long, default_value_t = 60)]
    sentiment_interval: u64,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Feed the store from the built-in demo simulator
    #[arg(long, default_value_t = true)]
    demo: bool,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Starter configs for a fresh database, one per wired condition kind.
fn default_configs() -> Vec<AlertConfig> {
    vec![
        AlertConfig {
            id: 0,
            owner_id: 0,
            name: "Price pump watch".to_string(),
            is_active: true,
            conditions: vec![Condition {
                kind: ConditionKind::PriceChange,
                operator: Operator::GreaterThan,
                value: ConditionValue::Scalar(50.0),
                timeframe: Timeframe::H1,
                token_scope: None,
            }],
            actions: vec![Action::notification()],
            cooldown_minutes: 30,
            priority: AlertPriority::High,
            tags: vec!["default".to_string()],
            last_triggered_at: None,
        },
        AlertConfig {
            id: 0,
            owner_id: 0,
            name: "Volume spike watch".to_string(),
            is_active: true,
            conditions: vec![Condition {
                kind: ConditionKind::VolumeSpike,
                operator: Operator::GreaterThan,
                value: ConditionValue::Scalar(5.0),
                timeframe: Timeframe::M15,
                token_scope: None,
            }],
            actions: vec![Action::notification()],
            cooldown_minutes: 15,
            priority: AlertPriority::Medium,
            tags: vec!["default".to_string()],
            last_triggered_at: None,
        },
    ]
}

async fn run_demo_feed(running: Arc<AtomicBool>, store: Arc<MemorySampleStore>) {
    info!("Starting demo feed");
    let mut feed = DemoFeed::new();

    while running.load(Ordering::Relaxed) {
        feed.step(&store, chrono::Utc::now());
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    info!("Demo feed stopped");
}

/// Polls tracked KOL wallets for fresh transactions and scores them.
async fn run_kol_loop(
    running: Arc<AtomicBool>,
    store: Arc<MemorySampleStore>,
    dispatcher: Arc<AlertDispatcher>,
) {
    info!("Starting KOL loop");
    let profiles = sim::kol_profiles();
    let mut last_seen = chrono::Utc::now();

    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_secs(5)).await;

        let mut newest = last_seen;
        for profile in &profiles {
            let txs = match store.kol_transactions(&profile.wallet_address, 16).await {
                Ok(txs) => txs,
                Err(e) => {
                    warn!(wallet = %profile.wallet_address, error = %e, "kol fetch failed");
                    continue;
                }
            };
            // Newest first from the store; process new ones oldest first.
            for tx in txs.iter().filter(|tx| tx.timestamp > last_seen).rev() {
                if let Err(e) = dispatcher.handle_kol_transaction(profile, tx).await {
                    error!(wallet = %profile.wallet_address, error = %e, "kol scoring failed");
                }
                if tx.timestamp > newest {
                    newest = tx.timestamp;
                }
            }
        }
        last_seen = newest;
    }
    info!("KOL loop stopped");
}

async fn run_evaluation_loop(
    running: Arc<AtomicBool>,
    dispatcher: Arc<AlertDispatcher>,
    interval: u64,
) {
    info!(interval, "Starting evaluation loop");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        match dispatcher.run_cycle(chrono::Utc::now()).await {
            Ok(summary) if summary.alerts_fired > 0 => {
                info!(
                    fired = summary.alerts_fired,
                    evaluated = summary.configs_evaluated,
                    "evaluation cycle fired alerts"
                );
            }
            Ok(_) => {}
            Err(DispatchError::CycleInProgress) => {
                warn!("previous evaluation cycle still running, tick skipped");
            }
            Err(e) => error!(error = %e, "evaluation cycle failed"),
        }
    }
    info!("Evaluation loop stopped");
}

async fn run_sentiment_loop(
    running: Arc<AtomicBool>,
    dispatcher: Arc<AlertDispatcher>,
    interval: u64,
) {
    info!(interval, "Starting sentiment loop");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        match dispatcher.run_sentiment_cycle(chrono::Utc::now()).await {
            Ok(summary) if summary.alerts_fired > 0 => {
                info!(
                    analyzed = summary.tokens_analyzed,
                    fired = summary.alerts_fired,
                    "sentiment cycle fired alerts"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "sentiment cycle failed"),
        }
    }
    info!("Sentiment loop stopped");
}

/// Logs every bus event; stands in for downstream notification clients.
async fn run_event_sink(running: Arc<AtomicBool>, bus: EventBus) {
    let mut events = bus.subscribe();
    while running.load(Ordering::Relaxed) {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!("event: {json}"),
                Err(e) => warn!(error = %e, "event serialization failed"),
            },
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "event sink lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("TokenWatch server starting");

    let db = Database::connect(&args.database_url)
        .await
        .expect("Failed to open database");

    let store = Arc::new(MemorySampleStore::new());
    for token in sim::demo_tokens() {
        store.register_token(token);
    }

    let bus = EventBus::default();
    let dispatcher = Arc::new(AlertDispatcher::new(db.clone(), store.clone(), bus.clone()));

    // Fresh databases get the starter configs.
    let existing = db.list_configs().await.expect("Failed to list configs");
    if existing.is_empty() {
        for config in default_configs() {
            if let Err(e) = dispatcher.create_config(config).await {
                error!(error = %e, "failed to seed default config");
            }
        }
    }
    dispatcher
        .reload_configs()
        .await
        .expect("Failed to load alert configs");

    let running = Arc::new(AtomicBool::new(true));

    let mut handles = vec![
        tokio::spawn(run_evaluation_loop(
            running.clone(),
            dispatcher.clone(),
            args.interval,
        )),
        tokio::spawn(run_sentiment_loop(
            running.clone(),
            dispatcher.clone(),
            args.sentiment_interval,
        )),
        tokio::spawn(run_event_sink(running.clone(), bus.clone())),
    ];
    if args.demo {
        handles.push(tokio::spawn(run_demo_feed(running.clone(), store.clone())));
        handles.push(tokio::spawn(run_kol_loop(
            running.clone(),
            store.clone(),
            dispatcher.clone(),
        )));
    }

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    info!("Shutdown signal received");
    running.store(false, Ordering::Relaxed);

    // Give loops one tick to observe the flag.
    tokio::time::sleep(Duration::from_millis(300)).await;
    for handle in handles {
        handle.abort();
    }
    info!("TokenWatch server stopped");
}
