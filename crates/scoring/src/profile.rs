//! Per-agent performance profile: sample windows, sub-scores, trend.

use crate::PRIOR_SCORE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sliding window length for every metric series.
const WINDOW: usize = 50;

/// Minimum quality samples before consistency and trend carry signal.
const MIN_SAMPLES: usize = 5;

/// Coarse classification of an agent's recent quality trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTrend {
    Improving,
    Stable,
    Declining,
}

impl std::fmt::Display for PerformanceTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Stable => write!(f, "stable"),
            Self::Declining => write!(f, "declining"),
        }
    }
}

/// Metrics derived from one collected response.
#[derive(Debug, Clone, Copy)]
pub struct ResponseMetrics {
    /// Deterministic quality heuristic, [0, 1].
    pub quality: f64,
    /// Speed score, [0, 1] (1 = instant, 0 = at/after the horizon).
    pub speed: f64,
    /// Selection-time relevance, [0, 1].
    pub relevance: f64,
    /// Raw elapsed seconds.
    pub response_time: f64,
    /// Response length in characters.
    pub response_length: usize,
}

/// Durable per-agent performance record. Created on first use, mutated on
/// every answer, never deleted. Sample memory is bounded by the 50-entry
/// windows; profile count grows with the agent population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: String,
    pub agent_name: String,
    pub total_queries: u64,
    pub quality_window: Vec<f64>,
    pub speed_window: Vec<f64>,
    pub relevance_window: Vec<f64>,
    pub response_time_window: Vec<f64>,
    pub quality_score: f64,
    pub speed_score: f64,
    pub relevance_score: f64,
    pub consistency_score: f64,
    pub overall_score: f64,
    pub performance_trend: PerformanceTrend,
    pub last_used: DateTime<Utc>,
}

impl AgentProfile {
    /// Fresh profile with the benefit-of-the-doubt prior.
    pub fn seed(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            total_queries: 0,
            quality_window: Vec::new(),
            speed_window: Vec::new(),
            relevance_window: Vec::new(),
            response_time_window: Vec::new(),
            quality_score: PRIOR_SCORE,
            speed_score: PRIOR_SCORE,
            relevance_score: PRIOR_SCORE,
            consistency_score: 1.0,
            overall_score: PRIOR_SCORE,
            performance_trend: PerformanceTrend::Stable,
            last_used: Utc::now(),
        }
    }

    /// Fold one response's metrics into the profile and recompute all
    /// derived scores.
    pub fn record(&mut self, metrics: ResponseMetrics) {
        self.total_queries += 1;
        self.last_used = Utc::now();

        push_windowed(&mut self.quality_window, metrics.quality);
        push_windowed(&mut self.speed_window, metrics.speed);
        push_windowed(&mut self.relevance_window, metrics.relevance);
        push_windowed(&mut self.response_time_window, metrics.response_time);

        self.quality_score = recency_weighted_mean(&self.quality_window).min(1.0);
        self.speed_score = mean(&self.speed_window);
        self.relevance_score = mean(tail(&self.relevance_window, 10));
        self.consistency_score = if self.quality_window.len() < MIN_SAMPLES {
            1.0
        } else {
            1.0 - variance(&self.quality_window).min(1.0)
        };

        self.overall_score = 0.40 * self.quality_score
            + 0.25 * self.speed_score
            + 0.25 * self.relevance_score
            + 0.10 * self.consistency_score;

        self.performance_trend = self.compute_trend();
    }

    fn compute_trend(&self) -> PerformanceTrend {
        if self.quality_window.len() < MIN_SAMPLES {
            return PerformanceTrend::Stable;
        }
        let recent = tail(&self.quality_window, 10);
        let earlier_end = self.quality_window.len() - recent.len();
        let earlier_start = earlier_end.saturating_sub(10);
        let earlier = &self.quality_window[earlier_start..earlier_end];
        if earlier.is_empty() {
            return PerformanceTrend::Stable;
        }

        let diff = mean(recent) - mean(earlier);
        if diff > 0.1 {
            PerformanceTrend::Improving
        } else if diff < -0.1 {
            PerformanceTrend::Declining
        } else {
            PerformanceTrend::Stable
        }
    }
}

fn push_windowed(window: &mut Vec<f64>, sample: f64) {
    window.push(sample);
    if window.len() > WINDOW {
        let excess = window.len() - WINDOW;
        window.drain(..excess);
    }
}

fn tail(samples: &[f64], n: usize) -> &[f64] {
    &samples[samples.len().saturating_sub(n)..]
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Later samples weigh more: weight = 1.0 + 0.05 × index.
fn recency_weighted_mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (i, sample) in samples.iter().enumerate() {
        let weight = 1.0 + 0.05 * i as f64;
        weighted += sample * weight;
        total_weight += weight;
    }
    weighted / total_weight
}

fn variance(samples: &[f64]) -> f64 {
    let m = mean(samples);
    samples.iter().map(|s| (s - m).powi(2)).sum::<f64>() / samples.len() as f64
}
