//! Multi-source sentiment aggregation with time decay.

use chrono::{DateTime, Utc};
use tokenwatch_core::{
    AlertPriority, OverallSentiment, Recommendation, RiskLevel, SentimentAnalysis,
    SentimentSample, TrendDirection,
};
use tracing::debug;

/// Keywords counted as bullish when scanning aggregated histograms.
const BULLISH_KEYWORDS: &[&str] = &["moon", "pump", "bullish", "gem", "100x", "breakout", "ath"];
/// Keywords counted as bearish.
const BEARISH_KEYWORDS: &[&str] = &["rug", "dump", "scam", "bearish", "crash", "exit", "honeypot"];

/// Tunables for sentiment aggregation.
#[derive(Debug, Clone)]
pub struct SentimentConfig {
    /// Exponential decay half-life for sample weights, in hours.
    pub decay_hours: f64,
    /// Number of most recent samples used for trend classification.
    pub trend_window: usize,
    /// Average consecutive delta beyond which a trend is rising/falling.
    pub trend_delta_threshold: f64,
    /// |composite score| above which an alert is always emitted.
    pub alert_score_threshold: f64,
    /// |composite score| that together with a matching trend counts as a
    /// fast-moving shift.
    pub fast_shift_score: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            decay_hours: 12.0,
            trend_window: 6,
            trend_delta_threshold: 5.0,
            alert_score_threshold: 80.0,
            fast_shift_score: 60.0,
        }
    }
}

/// Combines multi-source sentiment samples into one composite analysis
/// per token.
#[derive(Debug, Default)]
pub struct SentimentAggregator {
    config: SentimentConfig,
}

impl SentimentAggregator {
    pub fn new(config: SentimentConfig) -> Self {
        Self { config }
    }

    /// Aggregate up to 24h of samples into one analysis.
    /// Returns `None` when there are no samples for the token.
    pub fn analyze(
        &self,
        token: &str,
        samples: &[SentimentSample],
        now: DateTime<Utc>,
    ) -> Option<SentimentAnalysis> {
        if samples.is_empty() {
            debug!(token, "no sentiment samples, skipping analysis");
            return None;
        }

        let sentiment_score = self.composite_score(samples, now);
        let trend_direction = self.trend_direction(samples);
        let social_volume = self.social_volume(samples);
        let influencer_activity = self.influencer_activity(samples);
        let risk_level = risk_level(sentiment_score, social_volume, influencer_activity);
        let recommendation = recommendation(sentiment_score, trend_direction, risk_level);
        let confidence = self.confidence(samples.len(), social_volume, influencer_activity);
        let key_signals = self.key_signals(samples);

        Some(SentimentAnalysis {
            token_address: token.into(),
            overall_sentiment: OverallSentiment::from_score(sentiment_score),
            sentiment_score,
            confidence,
            trend_direction,
            social_volume,
            influencer_activity,
            key_signals,
            risk_level,
            recommendation,
            timestamp: now,
        })
    }

    /// Whether an analysis warrants a sentiment-originated alert, and at
    /// which priority. Emits on extreme composite score, a fast-moving
    /// shift, or high risk.
    pub fn alert_priority(&self, analysis: &SentimentAnalysis) -> Option<AlertPriority> {
        let score = analysis.sentiment_score;
        let extreme = score.abs() > self.config.alert_score_threshold;
        let fast_shift = (score > self.config.fast_shift_score
            && analysis.trend_direction == TrendDirection::Rising)
            || (score < -self.config.fast_shift_score
                && analysis.trend_direction == TrendDirection::Falling);

        if !extreme && !fast_shift && analysis.risk_level != RiskLevel::High {
            return None;
        }

        let priority = match (analysis.risk_level, extreme) {
            (RiskLevel::High, true) => AlertPriority::Critical,
            (RiskLevel::High, false) => AlertPriority::High,
            (_, true) => AlertPriority::High,
            (_, false) => AlertPriority::Medium,
        };
        Some(priority)
    }

    /// Weighted mean of sample scores.
    ///
    /// weight = source weight * exp(-hours_ago / decay) * max(1, mentions).
    /// A convex combination: the result always lies within the range of the
    /// input scores.
    fn composite_score(&self, samples: &[SentimentSample], now: DateTime<Utc>) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;

        for sample in samples {
            let hours_ago = (now - sample.timestamp).num_seconds().max(0) as f64 / 3600.0;
            let decay = (-hours_ago / self.config.decay_hours).exp();
            let mentions = f64::from(sample.total_mentions.max(1));
            let weight = sample.source.weight() * decay * mentions;

            weighted_sum += sample.score * weight;
            weight_sum += weight;
        }

        if weight_sum <= 0.0 {
            return 0.0;
        }
        (weighted_sum / weight_sum).clamp(-100.0, 100.0)
    }

    /// Average consecutive score delta over the most recent samples.
    fn trend_direction(&self, samples: &[SentimentSample]) -> TrendDirection {
        let mut recent: Vec<&SentimentSample> = samples.iter().collect();
        recent.sort_by_key(|s| s.timestamp);
        let window = if recent.len() > self.config.trend_window {
            &recent[recent.len() - self.config.trend_window..]
        } else {
            &recent[..]
        };

        if window.len() < 2 {
            return TrendDirection::Stable;
        }

        let delta_sum: f64 = window
            .windows(2)
            .map(|pair| pair[1].score - pair[0].score)
            .sum();
        let avg_delta = delta_sum / (window.len() - 1) as f64;

        if avg_delta > self.config.trend_delta_threshold {
            TrendDirection::Rising
        } else if avg_delta < -self.config.trend_delta_threshold {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        }
    }

    fn social_volume(&self, samples: &[SentimentSample]) -> f64 {
        let avg = samples.iter().map(|s| f64::from(s.total_mentions)).sum::<f64>()
            / samples.len() as f64;
        (avg * 2.0).clamp(0.0, 100.0)
    }

    fn influencer_activity(&self, samples: &[SentimentSample]) -> f64 {
        let avg = samples
            .iter()
            .map(|s| f64::from(s.influencer_mentions))
            .sum::<f64>()
            / samples.len() as f64;
        (avg * 10.0).clamp(0.0, 100.0)
    }

    fn confidence(&self, sample_count: usize, social_volume: f64, influencer_activity: f64) -> f64 {
        let sample_bonus = (2.0 * sample_count as f64).min(30.0);
        (50.0 + sample_bonus + 0.2 * social_volume + 0.1 * influencer_activity).clamp(0.0, 100.0)
    }

    /// Notable signal strings from keyword histograms, volume spikes and
    /// trending scores.
    fn key_signals(&self, samples: &[SentimentSample]) -> Vec<String> {
        let mut signals = Vec::new();

        let mut bullish = 0u64;
        let mut bearish = 0u64;
        for sample in samples {
            for (keyword, count) in &sample.keyword_histogram {
                let keyword = keyword.to_lowercase();
                if BULLISH_KEYWORDS.contains(&keyword.as_str()) {
                    bullish += u64::from(*count);
                } else if BEARISH_KEYWORDS.contains(&keyword.as_str()) {
                    bearish += u64::from(*count);
                }
            }
        }
        if bullish >= bearish.max(1) * 2 {
            signals.push(format!("bullish keyword dominance ({bullish} vs {bearish})"));
        } else if bearish >= bullish.max(1) * 2 {
            signals.push(format!("bearish keyword dominance ({bearish} vs {bullish})"));
        }

        if samples.iter().any(|s| s.volume_spike) {
            signals.push("social volume spike detected".to_string());
        }

        let avg_trending =
            samples.iter().map(|s| s.trending_score).sum::<f64>() / samples.len() as f64;
        if avg_trending > 70.0 {
            signals.push(format!("trending across platforms ({avg_trending:.0}/100)"));
        }

        signals
    }
}

fn risk_level(score: f64, social_volume: f64, influencer_activity: f64) -> RiskLevel {
    if (score.abs() > 70.0 && social_volume > 80.0) || influencer_activity > 90.0 {
        RiskLevel::High
    } else if score.abs() > 40.0 || social_volume > 50.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Fixed decision table mapping score/trend to a recommendation. Under high
/// risk the strong variants are clamped to their conservative counterparts.
fn recommendation(score: f64, trend: TrendDirection, risk: RiskLevel) -> Recommendation {
    let base = if score > 70.0 && trend == TrendDirection::Rising {
        Recommendation::StrongBuy
    } else if score > 40.0 {
        Recommendation::Buy
    } else if score < -70.0 && trend == TrendDirection::Falling {
        Recommendation::StrongSell
    } else if score < -40.0 {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    };

    if risk == RiskLevel::High {
        match base {
            Recommendation::StrongBuy => Recommendation::Buy,
            Recommendation::StrongSell => Recommendation::Sell,
            other => other,
        }
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;
    use tokenwatch_core::SentimentSource;

    const TOKEN: &str = "TokenBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";

    fn sample(score: f64, minutes_ago: i64, now: DateTime<Utc>) -> SentimentSample {
        SentimentSample {
            token_address: TOKEN.into(),
            source: SentimentSource::Twitter,
            score,
            positive_count: 10,
            negative_count: 5,
            neutral_count: 5,
            total_mentions: 20,
            keyword_histogram: HashMap::new(),
            influencer_mentions: 1,
            volume_spike: false,
            trending_score: 40.0,
            timestamp: now - Duration::minutes(minutes_ago),
        }
    }

    /// Build samples spaced a minute apart, oldest first.
    fn series(scores: &[f64], now: DateTime<Utc>) -> Vec<SentimentSample> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| sample(score, (scores.len() - i) as i64, now))
            .collect()
    }

    #[test]
    fn no_samples_no_analysis() {
        let aggregator = SentimentAggregator::default();
        assert!(aggregator.analyze(TOKEN, &[], Utc::now()).is_none());
    }

    #[test]
    fn composite_score_is_convex_combination() {
        let aggregator = SentimentAggregator::default();
        let now = Utc::now();
        let mut samples = series(&[-30.0, 80.0, 10.0, -75.0, 55.0], now);
        // Vary sources and mention counts to exercise the weighting.
        samples[1].source = SentimentSource::Discord;
        samples[1].total_mentions = 500;
        samples[3].source = SentimentSource::Reddit;
        samples[3].timestamp = now - Duration::hours(20);

        let analysis = aggregator.analyze(TOKEN, &samples, now).unwrap();
        let min = samples.iter().map(|s| s.score).fold(f64::MAX, f64::min);
        let max = samples.iter().map(|s| s.score).fold(f64::MIN, f64::max);
        assert!(analysis.sentiment_score >= min && analysis.sentiment_score <= max);
    }

    #[test]
    fn newer_samples_dominate_via_decay() {
        let aggregator = SentimentAggregator::default();
        let now = Utc::now();
        let samples = vec![sample(-80.0, 23 * 60, now), sample(80.0, 1, now)];

        let analysis = aggregator.analyze(TOKEN, &samples, now).unwrap();
        assert!(analysis.sentiment_score > 0.0);
    }

    #[test]
    fn trend_classification() {
        let aggregator = SentimentAggregator::default();
        let now = Utc::now();

        let rising = aggregator
            .analyze(TOKEN, &series(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0], now), now)
            .unwrap();
        assert_eq!(rising.trend_direction, TrendDirection::Rising);

        let falling = aggregator
            .analyze(TOKEN, &series(&[60.0, 50.0, 40.0, 30.0, 20.0, 10.0], now), now)
            .unwrap();
        assert_eq!(falling.trend_direction, TrendDirection::Falling);

        let stable = aggregator
            .analyze(TOKEN, &series(&[30.0, 30.0, 30.0], now), now)
            .unwrap();
        assert_eq!(stable.trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn single_sample_is_stable() {
        let aggregator = SentimentAggregator::default();
        let now = Utc::now();
        let analysis = aggregator.analyze(TOKEN, &series(&[90.0], now), now).unwrap();
        assert_eq!(analysis.trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn risk_level_table() {
        assert_eq!(risk_level(80.0, 90.0, 0.0), RiskLevel::High);
        assert_eq!(risk_level(0.0, 0.0, 95.0), RiskLevel::High);
        assert_eq!(risk_level(50.0, 10.0, 0.0), RiskLevel::Medium);
        assert_eq!(risk_level(10.0, 60.0, 0.0), RiskLevel::Medium);
        assert_eq!(risk_level(10.0, 10.0, 10.0), RiskLevel::Low);
    }

    #[test]
    fn recommendation_table() {
        use Recommendation::*;
        use TrendDirection::*;

        assert_eq!(recommendation(80.0, Rising, RiskLevel::Low), StrongBuy);
        assert_eq!(recommendation(80.0, Stable, RiskLevel::Low), Buy);
        assert_eq!(recommendation(50.0, Falling, RiskLevel::Medium), Buy);
        assert_eq!(recommendation(-80.0, Falling, RiskLevel::Low), StrongSell);
        assert_eq!(recommendation(-50.0, Stable, RiskLevel::Low), Sell);
        assert_eq!(recommendation(10.0, Rising, RiskLevel::Low), Hold);

        // High risk clamps the strong variants.
        assert_eq!(recommendation(80.0, Rising, RiskLevel::High), Buy);
        assert_eq!(recommendation(-80.0, Falling, RiskLevel::High), Sell);
    }

    #[test]
    fn confidence_is_clipped() {
        let aggregator = SentimentAggregator::default();
        let now = Utc::now();
        let mut samples = series(&[90.0; 40], now);
        for s in &mut samples {
            s.total_mentions = 10_000;
            s.influencer_mentions = 10_000;
        }

        let analysis = aggregator.analyze(TOKEN, &samples, now).unwrap();
        assert!(analysis.confidence <= 100.0);
        assert!(analysis.confidence >= 0.0);
        assert_eq!(analysis.social_volume, 100.0);
        assert_eq!(analysis.influencer_activity, 100.0);
    }

    #[test]
    fn key_signals_from_keywords_and_spikes() {
        let aggregator = SentimentAggregator::default();
        let now = Utc::now();
        let mut samples = series(&[50.0, 55.0], now);
        samples[0]
            .keyword_histogram
            .insert("moon".to_string(), 40);
        samples[0].keyword_histogram.insert("rug".to_string(), 5);
        samples[1].volume_spike = true;
        samples[0].trending_score = 90.0;
        samples[1].trending_score = 80.0;

        let analysis = aggregator.analyze(TOKEN, &samples, now).unwrap();
        assert_eq!(analysis.key_signals.len(), 3);
        assert!(analysis.key_signals[0].contains("bullish keyword dominance"));
        assert!(analysis.key_signals[1].contains("volume spike"));
        assert!(analysis.key_signals[2].contains("trending"));
    }

    #[test]
    fn alert_priority_gates() {
        let aggregator = SentimentAggregator::default();
        let now = Utc::now();

        // Calm analysis: no alert.
        let calm = aggregator
            .analyze(TOKEN, &series(&[10.0, 12.0, 11.0], now), now)
            .unwrap();
        assert_eq!(aggregator.alert_priority(&calm), None);

        // Extreme score: alert.
        let mut extreme = calm.clone();
        extreme.sentiment_score = 90.0;
        extreme.risk_level = RiskLevel::Medium;
        assert_eq!(aggregator.alert_priority(&extreme), Some(AlertPriority::High));

        // Extreme + high risk escalates.
        extreme.risk_level = RiskLevel::High;
        assert_eq!(
            aggregator.alert_priority(&extreme),
            Some(AlertPriority::Critical)
        );

        // Fast-moving shift: rising trend with strong score.
        let mut shift = calm.clone();
        shift.sentiment_score = 65.0;
        shift.trend_direction = TrendDirection::Rising;
        shift.risk_level = RiskLevel::Medium;
        assert_eq!(aggregator.alert_priority(&shift), Some(AlertPriority::Medium));

        // High risk alone still alerts.
        let mut risky = calm.clone();
        risky.risk_level = RiskLevel::High;
        assert_eq!(aggregator.alert_priority(&risky), Some(AlertPriority::High));
    }
}
