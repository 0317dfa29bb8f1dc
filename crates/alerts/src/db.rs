//! SQLite persistence for alert configs, alerts and signal history.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tokenwatch_core::{
    Action, Alert, AlertConfig, AlertKind, AlertPriority, Condition, KolSignal,
    SentimentAnalysis, TradeSide,
};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("alert config not found: {0}")]
    ConfigNotFound(i64),
    #[error("corrupt row {context}: {detail}")]
    CorruptRow { context: &'static str, detail: String },
}

fn priority_to_str(priority: AlertPriority) -> &'static str {
    match priority {
        AlertPriority::Low => "low",
        AlertPriority::Medium => "medium",
        AlertPriority::High => "high",
        AlertPriority::Critical => "critical",
    }
}

fn priority_from_str(s: &str) -> Result<AlertPriority, DbError> {
    match s {
        "low" => Ok(AlertPriority::Low),
        "medium" => Ok(AlertPriority::Medium),
        "high" => Ok(AlertPriority::High),
        "critical" => Ok(AlertPriority::Critical),
        other => Err(DbError::CorruptRow {
            context: "priority",
            detail: other.to_string(),
        }),
    }
}

fn kind_to_str(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::ConditionTrigger => "condition_trigger",
        AlertKind::Sentiment => "sentiment",
        AlertKind::KolSignal => "kol_signal",
    }
}

fn kind_from_str(s: &str) -> Result<AlertKind, DbError> {
    match s {
        "condition_trigger" => Ok(AlertKind::ConditionTrigger),
        "sentiment" => Ok(AlertKind::Sentiment),
        "kol_signal" => Ok(AlertKind::KolSignal),
        other => Err(DbError::CorruptRow {
            context: "alert kind",
            detail: other.to_string(),
        }),
    }
}

fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64, context: &'static str) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp_millis(ms).ok_or(DbError::CorruptRow {
        context,
        detail: format!("timestamp out of range: {ms}"),
    })
}

type ConfigRow = (
    i64,            // id
    i64,            // owner_id
    String,         // name
    bool,           // is_active
    String,         // conditions JSON
    String,         // actions JSON
    i64,            // cooldown_minutes
    String,         // priority
    String,         // tags JSON
    Option<i64>,    // last_triggered_at (unix ms)
);

fn config_from_row(row: ConfigRow) -> Result<AlertConfig, DbError> {
    let (id, owner_id, name, is_active, conditions, actions, cooldown, priority, tags, last) = row;

    let conditions: Vec<Condition> =
        serde_json::from_str(&conditions).map_err(|e| DbError::CorruptRow {
            context: "conditions",
            detail: e.to_string(),
        })?;
    let actions: Vec<Action> = serde_json::from_str(&actions).map_err(|e| DbError::CorruptRow {
        context: "actions",
        detail: e.to_string(),
    })?;
    let tags: Vec<String> = serde_json::from_str(&tags).unwrap_or_default();
    let last_triggered_at = last
        .map(|ms| from_millis(ms, "last_triggered_at"))
        .transpose()?;

    Ok(AlertConfig {
        id,
        owner_id,
        name,
        is_active,
        conditions,
        actions,
        cooldown_minutes: cooldown,
        priority: priority_from_str(&priority)?,
        tags,
        last_triggered_at,
    })
}

/// Database connection for alert configuration and history.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite at the given URL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_configs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                conditions TEXT NOT NULL,
                actions TEXT NOT NULL,
                cooldown_minutes INTEGER NOT NULL,
                priority TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                last_triggered_at INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_address TEXT NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                score INTEGER NOT NULL,
                conditions TEXT NOT NULL DEFAULT '[]',
                timestamp INTEGER NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sentiment_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_address TEXT NOT NULL,
                score REAL NOT NULL,
                risk_level TEXT NOT NULL,
                analysis TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kol_signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wallet_address TEXT NOT NULL,
                token_address TEXT NOT NULL,
                side TEXT NOT NULL,
                confidence REAL NOT NULL,
                reasoning TEXT NOT NULL,
                broadcast INTEGER NOT NULL DEFAULT 0,
                timestamp INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alerts_token_time ON alerts(token_address, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_kol_signals_wallet ON kol_signals(wallet_address, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new config, returning it with its assigned ID.
    pub async fn create_config(&self, config: &AlertConfig) -> Result<AlertConfig, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO alert_configs
                (owner_id, name, is_active, conditions, actions, cooldown_minutes, priority, tags, last_triggered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(config.owner_id)
        .bind(&config.name)
        .bind(config.is_active)
        .bind(serde_json::to_string(&config.conditions).unwrap_or_else(|_| "[]".to_string()))
        .bind(serde_json::to_string(&config.actions).unwrap_or_else(|_| "[]".to_string()))
        .bind(config.cooldown_minutes)
        .bind(priority_to_str(config.priority))
        .bind(serde_json::to_string(&config.tags).unwrap_or_else(|_| "[]".to_string()))
        .bind(config.last_triggered_at.map(millis))
        .execute(&self.pool)
        .await?;

        let mut created = config.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    /// Update an existing config in place.
    pub async fn update_config(&self, config: &AlertConfig) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE alert_configs
            SET owner_id = ?, name = ?, is_active = ?, conditions = ?, actions = ?,
                cooldown_minutes = ?, priority = ?, tags = ?, last_triggered_at = ?
            WHERE id = ?
            "#,
        )
        .bind(config.owner_id)
        .bind(&config.name)
        .bind(config.is_active)
        .bind(serde_json::to_string(&config.conditions).unwrap_or_else(|_| "[]".to_string()))
        .bind(serde_json::to_string(&config.actions).unwrap_or_else(|_| "[]".to_string()))
        .bind(config.cooldown_minutes)
        .bind(priority_to_str(config.priority))
        .bind(serde_json::to_string(&config.tags).unwrap_or_else(|_| "[]".to_string()))
        .bind(config.last_triggered_at.map(millis))
        .bind(config.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::ConfigNotFound(config.id));
        }
        Ok(())
    }

    pub async fn delete_config(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM alert_configs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::ConfigNotFound(id));
        }
        Ok(())
    }

    pub async fn get_config(&self, id: i64) -> Result<Option<AlertConfig>, DbError> {
        let row = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT id, owner_id, name, is_active, conditions, actions,
                   cooldown_minutes, priority, tags, last_triggered_at
            FROM alert_configs WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(config_from_row).transpose()
    }

    pub async fn list_configs(&self) -> Result<Vec<AlertConfig>, DbError> {
        let rows = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT id, owner_id, name, is_active, conditions, actions,
                   cooldown_minutes, priority, tags, last_triggered_at
            FROM alert_configs ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(config_from_row).collect()
    }

    /// Active configs only, for the dispatcher's in-memory set.
    pub async fn list_active_configs(&self) -> Result<Vec<AlertConfig>, DbError> {
        let rows = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT id, owner_id, name, is_active, conditions, actions,
                   cooldown_minutes, priority, tags, last_triggered_at
            FROM alert_configs WHERE is_active = 1 ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(config_from_row).collect()
    }

    /// Stamp a config's last trigger time (cooldown anchor).
    pub async fn set_last_triggered(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE alert_configs SET last_triggered_at = ? WHERE id = ?")
            .bind(millis(at))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Persist an alert, returning it with its assigned ID.
    pub async fn insert_alert(&self, alert: &Alert) -> Result<Alert, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO alerts (token_address, kind, title, message, score, conditions, timestamp, is_read)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.token_address.as_str())
        .bind(kind_to_str(alert.kind))
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(i64::from(alert.score))
        .bind(serde_json::to_string(&alert.conditions).unwrap_or_else(|_| "[]".to_string()))
        .bind(millis(alert.timestamp))
        .bind(alert.is_read)
        .execute(&self.pool)
        .await?;

        let mut persisted = alert.clone();
        persisted.id = result.last_insert_rowid();
        Ok(persisted)
    }

    /// Most recent alerts, newest first.
    pub async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, DbError> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, String, i64, String, i64, bool)>(
            r#"
            SELECT id, token_address, kind, title, message, score, conditions, timestamp, is_read
            FROM alerts ORDER BY timestamp DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, token, kind, title, message, score, conditions, ts, is_read)| {
                Ok(Alert {
                    id,
                    token_address: token.into(),
                    kind: kind_from_str(&kind)?,
                    title,
                    message,
                    score: score.clamp(0, 100) as u8,
                    conditions: serde_json::from_str(&conditions).unwrap_or_default(),
                    timestamp: from_millis(ts, "alert timestamp")?,
                    is_read,
                })
            })
            .collect()
    }

    pub async fn mark_alert_read(&self, id: i64) -> Result<(), DbError> {
        sqlx::query("UPDATE alerts SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record one sentiment analysis snapshot.
    pub async fn record_sentiment_analysis(
        &self,
        analysis: &SentimentAnalysis,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO sentiment_history (token_address, score, risk_level, analysis, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(analysis.token_address.as_str())
        .bind(analysis.sentiment_score)
        .bind(format!("{:?}", analysis.risk_level).to_lowercase())
        .bind(serde_json::to_string(analysis).unwrap_or_else(|_| "{}".to_string()))
        .bind(millis(analysis.timestamp))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a KOL signal and whether it passed the broadcast gate.
    pub async fn record_kol_signal(
        &self,
        signal: &KolSignal,
        broadcast: bool,
    ) -> Result<(), DbError> {
        let side = match signal.side {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        };
        sqlx::query(
            r#"
            INSERT INTO kol_signals (wallet_address, token_address, side, confidence, reasoning, broadcast, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signal.wallet_address.as_str())
        .bind(signal.token_address.as_str())
        .bind(side)
        .bind(signal.confidence)
        .bind(&signal.reasoning)
        .bind(broadcast)
        .bind(millis(signal.timestamp))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenwatch_core::{
        Action, AlertKind, Condition, ConditionKind, ConditionValue, Operator, Timeframe,
    };

    fn sample_config() -> AlertConfig {
        AlertConfig {
            id: 0,
            owner_id: 42,
            name: "volume watch".to_string(),
            is_active: true,
            conditions: vec![Condition {
                kind: ConditionKind::VolumeSpike,
                operator: Operator::GreaterThan,
                value: ConditionValue::Scalar(5.0),
                timeframe: Timeframe::M15,
                token_scope: None,
            }],
            actions: vec![Action::notification()],
            cooldown_minutes: 30,
            priority: AlertPriority::Medium,
            tags: vec!["demo".to_string()],
            last_triggered_at: None,
        }
    }

    #[tokio::test]
    async fn config_round_trip() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let created = db.create_config(&sample_config()).await.unwrap();
        assert!(created.id > 0);

        let fetched = db.get_config(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.conditions[0].timeframe, Timeframe::M15);
    }

    #[tokio::test]
    async fn update_and_delete_config() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let mut config = db.create_config(&sample_config()).await.unwrap();

        config.name = "renamed".to_string();
        config.is_active = false;
        db.update_config(&config).await.unwrap();

        let fetched = db.get_config(config.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "renamed");
        assert!(!fetched.is_active);
        assert!(db.list_active_configs().await.unwrap().is_empty());

        db.delete_config(config.id).await.unwrap();
        assert!(db.get_config(config.id).await.unwrap().is_none());

        let missing = db.delete_config(config.id).await;
        assert!(matches!(missing, Err(DbError::ConfigNotFound(_))));
    }

    #[tokio::test]
    async fn last_triggered_round_trip() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let config = db.create_config(&sample_config()).await.unwrap();

        let at = Utc::now();
        db.set_last_triggered(config.id, at).await.unwrap();

        let fetched = db.get_config(config.id).await.unwrap().unwrap();
        let stored = fetched.last_triggered_at.unwrap();
        // Millisecond precision survives the round trip.
        assert_eq!(stored.timestamp_millis(), at.timestamp_millis());
    }

    #[tokio::test]
    async fn alert_round_trip() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let alert = Alert {
            id: 0,
            token_address: "TokenDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD".into(),
            kind: AlertKind::ConditionTrigger,
            title: "volume watch".to_string(),
            message: "volume spiked to 6.0x the 15m average".to_string(),
            score: 70,
            conditions: vec!["VolumeSpike: 6.0 vs threshold 5.0".to_string()],
            timestamp: Utc::now(),
            is_read: false,
        };

        let persisted = db.insert_alert(&alert).await.unwrap();
        assert!(persisted.id > 0);

        let recent = db.recent_alerts(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].score, 70);
        assert_eq!(recent[0].kind, AlertKind::ConditionTrigger);

        db.mark_alert_read(persisted.id).await.unwrap();
        let recent = db.recent_alerts(10).await.unwrap();
        assert!(recent[0].is_read);
    }
}
