//! Alert dispatch cycles.
//!
//! The dispatcher owns the in-memory set of active configs, drives the
//! evaluator/aggregator/scorer over store samples, and fans results out to
//! persistence and the broadcast bus. One evaluation cycle runs at a time;
//! an overlapping tick is rejected rather than queued.

use crate::broadcast::{AlertNotification, BroadcastEvent, EventBus};
use crate::db::{Database, DbError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use compact_str::CompactString;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokenwatch_core::{
    Action, ActionKind, Alert, AlertConfig, AlertKind, KolProfile, KolTransaction,
    ValidationError,
};
use tokenwatch_engine::{
    ConditionEvaluator, EngineError, KolSignalScorer, SampleStore, SampleWindow,
    SentimentAggregator,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Minimum gap between two sentiment-originated alerts for the same token.
const SENTIMENT_ALERT_GAP_MINUTES: i64 = 30;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid alert config: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("sample store error: {0}")]
    Store(#[from] EngineError),
    #[error("alert config not found: {0}")]
    ConfigNotFound(i64),
    #[error("an evaluation cycle is already running")]
    CycleInProgress,
}

/// Outcome counts for one condition evaluation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub tokens_scanned: usize,
    pub configs_evaluated: usize,
    pub configs_in_cooldown: usize,
    pub alerts_fired: usize,
    pub action_failures: usize,
}

/// Outcome counts for one sentiment cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCycleSummary {
    pub tokens_analyzed: usize,
    pub alerts_fired: usize,
    pub alerts_deduplicated: usize,
}

/// Executes delegated actions (email, webhook, auto-trade). Notification
/// actions never reach this seam; they go straight to the broadcast bus.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(
        &self,
        action: &Action,
        notification: &AlertNotification,
    ) -> Result<(), String>;
}

/// Default executor for deployments without delegated transports wired:
/// records the intent and succeeds.
#[derive(Debug, Default)]
pub struct LoggingActionExecutor;

#[async_trait]
impl ActionExecutor for LoggingActionExecutor {
    async fn execute(
        &self,
        action: &Action,
        notification: &AlertNotification,
    ) -> Result<(), String> {
        info!(
            kind = ?action.kind,
            target = action.target.as_deref().unwrap_or("-"),
            config = %notification.config_name,
            alert_id = notification.alert.id,
            "delegated action dispatched"
        );
        Ok(())
    }
}

/// Drives evaluation cycles over the active configs and routes results to
/// the database and broadcast bus.
pub struct AlertDispatcher {
    db: Database,
    store: Arc<dyn SampleStore>,
    bus: EventBus,
    executor: Arc<dyn ActionExecutor>,
    evaluator: ConditionEvaluator,
    aggregator: SentimentAggregator,
    scorer: KolSignalScorer,
    /// Active configs, keyed by ID. Mirrors the `is_active` rows in the
    /// database; cycles read a snapshot of this map.
    active_configs: DashMap<i64, AlertConfig>,
    /// Per-token timestamp of the last sentiment-originated alert.
    sentiment_alerted: DashMap<CompactString, DateTime<Utc>>,
    /// Single-flight guard: one evaluation cycle at a time.
    cycle_lock: Mutex<()>,
}

impl AlertDispatcher {
    pub fn new(db: Database, store: Arc<dyn SampleStore>, bus: EventBus) -> Self {
        Self::with_executor(db, store, bus, Arc::new(LoggingActionExecutor))
    }

    pub fn with_executor(
        db: Database,
        store: Arc<dyn SampleStore>,
        bus: EventBus,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            db,
            store,
            bus,
            executor,
            evaluator: ConditionEvaluator::new(),
            aggregator: SentimentAggregator::default(),
            scorer: KolSignalScorer::default(),
            active_configs: DashMap::new(),
            sentiment_alerted: DashMap::new(),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Load (or reload) the active config set from the database.
    pub async fn reload_configs(&self) -> Result<usize, DispatchError> {
        let configs = self.db.list_active_configs().await?;
        self.active_configs.clear();
        let count = configs.len();
        for config in configs {
            self.active_configs.insert(config.id, config);
        }
        info!(count, "active alert configs loaded");
        Ok(count)
    }

    /// Validate and persist a new config, activating it immediately if
    /// marked active.
    pub async fn create_config(&self, config: AlertConfig) -> Result<AlertConfig, DispatchError> {
        config.validate()?;
        if config.conditions.iter().any(|c| !c.kind.is_implemented()) {
            warn!(
                name = %config.name,
                "config references staged condition kinds; they never trigger"
            );
        }
        let created = self.db.create_config(&config).await?;
        if created.is_active {
            self.active_configs.insert(created.id, created.clone());
        }
        info!(id = created.id, name = %created.name, "alert config created");
        Ok(created)
    }

    /// Validate and persist changes to an existing config. The cooldown
    /// anchor survives the update.
    pub async fn update_config(&self, mut config: AlertConfig) -> Result<AlertConfig, DispatchError> {
        config.validate()?;
        let existing = self
            .db
            .get_config(config.id)
            .await?
            .ok_or(DispatchError::ConfigNotFound(config.id))?;
        config.last_triggered_at = existing.last_triggered_at;
        self.db.update_config(&config).await?;

        if config.is_active {
            self.active_configs.insert(config.id, config.clone());
        } else {
            self.active_configs.remove(&config.id);
        }
        Ok(config)
    }

    pub async fn delete_config(&self, id: i64) -> Result<(), DispatchError> {
        self.db.delete_config(id).await?;
        self.active_configs.remove(&id);
        Ok(())
    }

    pub fn active_config_count(&self) -> usize {
        self.active_configs.len()
    }

    /// One condition evaluation cycle over all tracked tokens.
    ///
    /// Per config: skipped while cooling down; conditions are evaluated in
    /// declared order and the first trigger wins, ending the config's cycle.
    /// Returns [`DispatchError::CycleInProgress`] if a cycle is already
    /// running.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleSummary, DispatchError> {
        let _guard = self
            .cycle_lock
            .try_lock()
            .map_err(|_| DispatchError::CycleInProgress)?;

        let tokens = self.store.tracked_tokens().await?;
        let mut summary = CycleSummary {
            tokens_scanned: tokens.len(),
            ..CycleSummary::default()
        };

        // Snapshot so config CRUD during the cycle cannot invalidate
        // iteration; ordered for reproducible logs.
        let mut configs: Vec<AlertConfig> =
            self.active_configs.iter().map(|e| e.value().clone()).collect();
        configs.sort_by_key(|c| c.id);

        for config in configs {
            if config.in_cooldown(now) {
                debug!(config_id = config.id, "config in cooldown, skipped");
                summary.configs_in_cooldown += 1;
                continue;
            }
            summary.configs_evaluated += 1;

            // One bad config must not halt the rest of the cycle.
            match self.evaluate_config(&config, &tokens, now).await {
                Ok(Some(failures)) => {
                    summary.alerts_fired += 1;
                    summary.action_failures += failures;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(config_id = config.id, error = %e, "config evaluation failed, continuing");
                }
            }
        }

        debug!(
            tokens = summary.tokens_scanned,
            evaluated = summary.configs_evaluated,
            fired = summary.alerts_fired,
            "evaluation cycle complete"
        );
        Ok(summary)
    }

    /// Evaluate one config against every tracked token. Returns the action
    /// failure count when a trigger fired, `None` otherwise.
    async fn evaluate_config(
        &self,
        config: &AlertConfig,
        tokens: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<usize>, DispatchError> {
        for token in tokens {
            for condition in &config.conditions {
                if let Some(scope) = &condition.token_scope {
                    if scope != token.as_str() {
                        continue;
                    }
                }

                let window = match self.sample_window(token, condition.timeframe).await {
                    Ok(window) => window,
                    // Missing samples fail closed for this condition only.
                    Err(e) if e.fails_closed() => {
                        warn!(token = %token, error = %e, "samples unavailable, condition skipped");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                if let Some(trigger) = self.evaluator.evaluate(condition, token, &window) {
                    let failures = self.fire(config, &trigger, now).await?;
                    return Ok(Some(failures));
                }
            }
        }
        Ok(None)
    }

    async fn sample_window(
        &self,
        token: &str,
        timeframe: tokenwatch_core::Timeframe,
    ) -> Result<SampleWindow, EngineError> {
        let prices = self.store.recent_price_samples(token, timeframe).await?;
        let volumes = self.store.recent_volume_samples(token, timeframe).await?;
        Ok(SampleWindow { prices, volumes })
    }

    /// Persist the alert, stamp the cooldown anchor, and fan out to every
    /// enabled action. One failing action never blocks the others.
    async fn fire(
        &self,
        config: &AlertConfig,
        trigger: &tokenwatch_core::Trigger,
        now: DateTime<Utc>,
    ) -> Result<usize, DispatchError> {
        let alert = Alert::from_trigger(trigger, config.priority, config.name.clone());
        let alert = self.db.insert_alert(&alert).await?;

        self.db.set_last_triggered(config.id, now).await?;
        if let Some(mut entry) = self.active_configs.get_mut(&config.id) {
            entry.last_triggered_at = Some(now);
        }

        info!(
            config_id = config.id,
            alert_id = alert.id,
            token = %alert.token_address,
            score = alert.score,
            "alert fired"
        );

        let token_symbol = self
            .store
            .token_display_info(trigger.token_address.as_str())
            .await
            .ok()
            .flatten()
            .map(|info| info.symbol);
        let notification = AlertNotification {
            config_id: config.id,
            config_name: config.name.clone(),
            priority: config.priority,
            token_symbol,
            data: trigger.data.clone(),
            alert: alert.clone(),
        };
        self.bus.publish(BroadcastEvent::NewAlert(alert));

        let mut failures = 0;
        for action in config.actions.iter().filter(|a| a.enabled) {
            let result = match action.kind {
                ActionKind::Notification => {
                    self.bus
                        .publish(BroadcastEvent::AlertNotification(notification.clone()));
                    Ok(())
                }
                ActionKind::Email | ActionKind::Webhook | ActionKind::AutoTrade => {
                    self.executor.execute(action, &notification).await
                }
            };
            if let Err(detail) = result {
                failures += 1;
                error!(
                    config_id = config.id,
                    kind = ?action.kind,
                    detail,
                    "action failed"
                );
            }
        }
        Ok(failures)
    }

    /// One sentiment cycle: aggregate samples per tracked token, persist and
    /// broadcast each analysis, and raise alerts for analyses that cross the
    /// emission gates. Per-token alerts are deduplicated within a 30 minute
    /// window.
    pub async fn run_sentiment_cycle(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SentimentCycleSummary, DispatchError> {
        let tokens = self.store.tracked_tokens().await?;
        let mut summary = SentimentCycleSummary::default();

        for token in &tokens {
            let samples = match self.store.sentiment_samples(token, 24).await {
                Ok(samples) => samples,
                Err(e) => {
                    warn!(token = %token, error = %e, "sentiment fetch failed, token skipped");
                    continue;
                }
            };

            let Some(analysis) = self.aggregator.analyze(token, &samples, now) else {
                continue;
            };
            summary.tokens_analyzed += 1;

            // History persistence is best-effort; the broadcast and alert
            // paths still run when it fails.
            if let Err(e) = self.db.record_sentiment_analysis(&analysis).await {
                error!(token = %token, error = %e, "sentiment history persistence failed");
            }
            self.bus
                .publish(BroadcastEvent::SentimentAnalysis(analysis.clone()));

            let Some(priority) = self.aggregator.alert_priority(&analysis) else {
                continue;
            };

            let recently_alerted = self
                .sentiment_alerted
                .get(analysis.token_address.as_str())
                .map(|last| now - *last < Duration::minutes(SENTIMENT_ALERT_GAP_MINUTES))
                .unwrap_or(false);
            if recently_alerted {
                summary.alerts_deduplicated += 1;
                continue;
            }

            let alert = Alert {
                id: 0,
                token_address: analysis.token_address.clone(),
                kind: AlertKind::Sentiment,
                title: format!("Sentiment shift: {}", analysis.token_address),
                message: format!(
                    "composite {:.1}, trend {:?}, risk {:?}",
                    analysis.sentiment_score, analysis.trend_direction, analysis.risk_level
                ),
                score: priority.base_score(),
                conditions: analysis.key_signals.clone(),
                timestamp: now,
                is_read: false,
            };
            let alert = match self.db.insert_alert(&alert).await {
                Ok(alert) => alert,
                Err(e) => {
                    error!(token = %token, error = %e, "sentiment alert persistence failed");
                    continue;
                }
            };
            self.sentiment_alerted
                .insert(analysis.token_address.clone(), now);
            summary.alerts_fired += 1;

            info!(
                token = %analysis.token_address,
                score = analysis.sentiment_score,
                alert_id = alert.id,
                "sentiment alert fired"
            );
            self.bus.publish(BroadcastEvent::NewAlert(alert));
        }

        Ok(summary)
    }

    /// Score one KOL transaction. The signal is always recorded; only
    /// signals passing the confidence gate are broadcast and alerted.
    pub async fn handle_kol_transaction(
        &self,
        profile: &KolProfile,
        tx: &KolTransaction,
    ) -> Result<bool, DispatchError> {
        let signal = self.scorer.score(profile, tx);
        let broadcast = self.scorer.should_broadcast(&signal);
        self.db.record_kol_signal(&signal, broadcast).await?;

        if !broadcast {
            debug!(
                wallet = %signal.wallet_address,
                confidence = signal.confidence,
                "kol signal below broadcast gate, recorded only"
            );
            return Ok(false);
        }

        let alert = Alert {
            id: 0,
            token_address: signal.token_address.clone(),
            kind: AlertKind::KolSignal,
            title: format!("KOL {:?}: {}", signal.side, signal.token_address),
            message: signal.reasoning.clone(),
            score: signal.confidence.round().clamp(0.0, 100.0) as u8,
            conditions: Vec::new(),
            timestamp: signal.timestamp,
            is_read: false,
        };
        let alert = self.db.insert_alert(&alert).await?;

        info!(
            wallet = %signal.wallet_address,
            token = %signal.token_address,
            confidence = signal.confidence,
            alert_id = alert.id,
            "kol signal broadcast"
        );
        self.bus.publish(BroadcastEvent::KolSignal(signal));
        self.bus.publish(BroadcastEvent::NewAlert(alert));
        Ok(true)
    }
}
