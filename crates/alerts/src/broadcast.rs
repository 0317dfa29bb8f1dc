//! Broadcast bus for real-time event fan-out to connected sinks.
//!
//! Event-driven: the dispatcher publishes as alerts fire and signals score;
//! sinks subscribe and render. Lagging subscribers drop messages rather than
//! backpressuring the evaluation cycle.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tokenwatch_core::{Alert, AlertPriority, KolSignal, SentimentAnalysis};
use tokio::sync::broadcast;
use tracing::trace;

/// An alert paired with the config that produced it, for notification sinks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertNotification {
    pub config_id: i64,
    pub config_name: String,
    pub priority: AlertPriority,
    /// Display symbol of the triggering token, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<CompactString>,
    /// Evaluation context from the trigger (measured values, thresholds).
    #[serde(default)]
    pub data: serde_json::Value,
    pub alert: Alert,
}

/// Event types published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BroadcastEvent {
    /// A persisted alert, from any producer.
    #[serde(rename = "new_alert")]
    NewAlert(Alert),
    /// Alert plus its config context (config-driven triggers only).
    #[serde(rename = "alert_notification")]
    AlertNotification(AlertNotification),
    /// A fresh sentiment composite for one token.
    #[serde(rename = "sentiment_analysis")]
    SentimentAnalysis(SentimentAnalysis),
    /// A KOL trade signal that passed the confidence gate.
    #[serde(rename = "kol_signal")]
    KolSignal(KolSignal),
}

/// Shared broadcast channel. Cheap to clone; all clones publish to the same
/// set of subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns the number of subscribers that received it;
    /// zero subscribers is not an error.
    pub fn publish(&self, event: BroadcastEvent) -> usize {
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(delivered, "event published");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokenwatch_core::{AlertKind, TradeSide};

    fn sample_alert() -> Alert {
        Alert {
            id: 7,
            token_address: "TokenAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into(),
            kind: AlertKind::ConditionTrigger,
            title: "price watch".to_string(),
            message: "price moved 60.0% over 1h".to_string(),
            score: 85,
            conditions: vec!["PriceChange: 60.0 vs threshold 50.0".to_string()],
            timestamp: Utc::now(),
            is_read: false,
        }
    }

    #[test]
    fn events_serialize_with_stable_tags() {
        let json = serde_json::to_value(BroadcastEvent::NewAlert(sample_alert())).unwrap();
        assert_eq!(json["type"], "new_alert");
        assert_eq!(json["data"]["score"], 85);

        let signal = KolSignal {
            wallet_address: "WalletKOL1111111111111111111111111111111111".into(),
            token_address: "TokenAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into(),
            side: TradeSide::Buy,
            confidence: 82.0,
            reasoning: "influence 80/100 (+24.0)".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(BroadcastEvent::KolSignal(signal)).unwrap();
        assert_eq!(json["type"], "kol_signal");
        assert_eq!(json["data"]["confidence"], 82.0);
    }

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let delivered = bus.publish(BroadcastEvent::NewAlert(sample_alert()));
        assert_eq!(delivered, 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                BroadcastEvent::NewAlert(alert) => assert_eq!(alert.id, 7),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(BroadcastEvent::NewAlert(sample_alert())), 0);
    }
}
