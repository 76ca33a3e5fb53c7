//! `quorum scores` — Show agent performance rankings.

use quorum_config::AppConfig;
use quorum_scoring::profile::PerformanceTrend;
use quorum_scoring::store::ProfileStore;

pub async fn run(limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = ProfileStore::open(config.data_dir.join("profiles.json"));

    let mut ranked = store.ranked().await;
    if ranked.is_empty() {
        println!("No agents scored yet.");
        return Ok(());
    }
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    println!("Agent rankings\n");
    println!("{:<4} {:<24} {:>8} {:>7} {:>9}", "#", "agent", "overall", "trend", "queries");
    for (rank, profile) in ranked.iter().enumerate() {
        println!(
            "{:<4} {:<24} {:>8.3} {:>7} {:>9}",
            rank + 1,
            profile.agent_name,
            profile.overall_score,
            trend_glyph(profile.performance_trend),
            profile.total_queries,
        );
    }
    Ok(())
}

fn trend_glyph(trend: PerformanceTrend) -> &'static str {
    match trend {
        PerformanceTrend::Improving => "↑",
        PerformanceTrend::Stable => "→",
        PerformanceTrend::Declining => "↓",
    }
}
