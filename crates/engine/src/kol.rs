//! KOL trade signal confidence scoring.

use chrono::Utc;
use tokenwatch_core::{KolCategory, KolProfile, KolSignal, KolTransaction, TradeSide};

/// Tunables for KOL signal scoring.
#[derive(Debug, Clone)]
pub struct KolScoringConfig {
    /// Transaction value (in the base asset) above which the size bonus
    /// is 10.
    pub large_trade_value: f64,
    /// Transaction value above which the size bonus is 5.
    pub medium_trade_value: f64,
    /// Minimum confidence for a signal to be surfaced to notification
    /// sinks. Lower-confidence signals are recorded but not broadcast.
    pub broadcast_min_confidence: f64,
}

impl Default for KolScoringConfig {
    fn default() -> Self {
        Self {
            large_trade_value: 50.0,
            medium_trade_value: 10.0,
            broadcast_min_confidence: 70.0,
        }
    }
}

/// Converts a KOL wallet transaction into a confidence-scored trade signal.
#[derive(Debug, Default)]
pub struct KolSignalScorer {
    config: KolScoringConfig,
}

impl KolSignalScorer {
    pub fn new(config: KolScoringConfig) -> Self {
        Self { config }
    }

    /// Score one transaction against the wallet's profile.
    ///
    /// confidence = clip(50 + influence*0.3 + success*0.2 + size bonus
    /// + verified bonus + category bonus, 0, 100). Purely derived, no side
    /// effects beyond the reasoning string attached to the signal.
    pub fn score(&self, profile: &KolProfile, tx: &KolTransaction) -> KolSignal {
        let mut confidence = 50.0;
        let mut reasons: Vec<String> = Vec::new();

        let influence = profile.influence_score * 0.3;
        confidence += influence;
        reasons.push(format!(
            "influence {:.0}/100 (+{:.1})",
            profile.influence_score, influence
        ));

        let track_record = profile.success_rate * 0.2;
        confidence += track_record;
        reasons.push(format!(
            "success rate {:.0}% (+{:.1})",
            profile.success_rate, track_record
        ));

        let size_bonus = if tx.value_in_base >= self.config.large_trade_value {
            10.0
        } else if tx.value_in_base >= self.config.medium_trade_value {
            5.0
        } else {
            0.0
        };
        if size_bonus > 0.0 {
            confidence += size_bonus;
            reasons.push(format!(
                "{:.1} base-asset position (+{:.0})",
                tx.value_in_base, size_bonus
            ));
        }

        if profile.verified {
            confidence += 10.0;
            reasons.push("verified wallet (+10)".to_string());
        }

        let category_bonus = match profile.category {
            KolCategory::Institution => 15.0,
            KolCategory::Trader => 5.0,
            KolCategory::Influencer => 0.0,
        };
        if category_bonus > 0.0 {
            confidence += category_bonus;
            reasons.push(format!("{:?} category (+{:.0})", profile.category, category_bonus));
        }

        let side = match tx.side {
            TradeSide::Buy => "bought",
            TradeSide::Sell => "sold",
        };
        let reasoning = format!(
            "{} {} {:.2} of {}: {}",
            profile.wallet_address,
            side,
            tx.value_in_base,
            tx.token_address,
            reasons.join(", ")
        );

        KolSignal {
            wallet_address: profile.wallet_address.clone(),
            token_address: tx.token_address.clone(),
            side: tx.side,
            confidence: confidence.clamp(0.0, 100.0),
            reasoning,
            timestamp: Utc::now(),
        }
    }

    /// Broadcast policy gate: only high-confidence signals reach sinks.
    pub fn should_broadcast(&self, signal: &KolSignal) -> bool {
        signal.confidence >= self.config.broadcast_min_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(category: KolCategory, influence: f64, success: f64, verified: bool) -> KolProfile {
        KolProfile {
            wallet_address: "WalletKOL1111111111111111111111111111111111".into(),
            category,
            influence_score: influence,
            success_rate: success,
            verified,
        }
    }

    fn buy(value_in_base: f64) -> KolTransaction {
        KolTransaction {
            wallet_address: "WalletKOL1111111111111111111111111111111111".into(),
            token_address: "TokenCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC".into(),
            side: TradeSide::Buy,
            amount: 1_000_000.0,
            price: 0.0001,
            value_in_base,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn confidence_formula() {
        let scorer = KolSignalScorer::default();
        // 50 + 80*0.3 + 90*0.2 + 10 (large) + 10 (verified) + 15 (institution) = 117 -> 100
        let signal = scorer.score(
            &profile(KolCategory::Institution, 80.0, 90.0, true),
            &buy(100.0),
        );
        assert_eq!(signal.confidence, 100.0);

        // 50 + 40*0.3 + 50*0.2 + 5 (medium) + 5 (trader) = 82
        let signal = scorer.score(&profile(KolCategory::Trader, 40.0, 50.0, false), &buy(20.0));
        assert_eq!(signal.confidence, 82.0);

        // 50 + 0 + 0 + 0 + 0 + 0 = 50 for an unverified influencer dust trade
        let signal = scorer.score(
            &profile(KolCategory::Influencer, 0.0, 0.0, false),
            &buy(0.5),
        );
        assert_eq!(signal.confidence, 50.0);
    }

    #[test]
    fn confidence_is_clipped_under_extreme_inputs() {
        let scorer = KolSignalScorer::default();

        let maxed = scorer.score(
            &profile(KolCategory::Institution, 1e9, 1e9, true),
            &buy(1e12),
        );
        assert!(maxed.confidence <= 100.0);

        let floored = scorer.score(
            &profile(KolCategory::Influencer, -1e9, -1e9, false),
            &buy(0.0),
        );
        assert!(floored.confidence >= 0.0);
    }

    #[test]
    fn broadcast_gate_at_70() {
        let scorer = KolSignalScorer::default();

        let strong = scorer.score(&profile(KolCategory::Trader, 50.0, 50.0, true), &buy(60.0));
        // 50 + 15 + 10 + 10 + 5 = 90
        assert!(scorer.should_broadcast(&strong));

        let weak = scorer.score(
            &profile(KolCategory::Influencer, 20.0, 20.0, false),
            &buy(1.0),
        );
        // 50 + 6 + 4 = 60
        assert_eq!(weak.confidence, 60.0);
        assert!(!scorer.should_broadcast(&weak));
    }

    #[test]
    fn reasoning_names_contributing_factors() {
        let scorer = KolSignalScorer::default();
        let signal = scorer.score(
            &profile(KolCategory::Institution, 80.0, 90.0, true),
            &buy(100.0),
        );

        assert!(signal.reasoning.contains("influence 80/100"));
        assert!(signal.reasoning.contains("success rate 90%"));
        assert!(signal.reasoning.contains("verified wallet"));
        assert!(signal.reasoning.contains("Institution category"));
        assert!(signal.reasoning.contains("bought"));
    }
}
