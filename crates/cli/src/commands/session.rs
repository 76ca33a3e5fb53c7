//! `quorum session` — Show a session's ledger and payout split.

use quorum_config::AppConfig;
use quorum_core::event::EventBus;
use quorum_session::{SessionStore, SessionTracker};
use std::sync::Arc;

pub async fn run(id: &str, total: Option<f64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let tracker = SessionTracker::new(
        SessionStore::open(config.data_dir.join("sessions.json")),
        Arc::new(EventBus::default()),
    );

    let Some(summary) = tracker.summary(id).await else {
        return Err(format!("Unknown session: {id}").into());
    };

    println!("Session {} ({})", summary.session_id, summary.domain);
    println!("Iterations: {}\n", summary.iterations);

    println!("{:<24} {:>6} {:>10} {:>8}", "agent", "uses", "avg score", "share");
    for usage in &summary.agents {
        let avg = if usage.usage_count > 0 {
            usage.total_score / usage.usage_count as f64
        } else {
            0.0
        };
        println!(
            "{:<24} {:>6} {:>10.1} {:>7.2}%",
            usage.agent_name, usage.usage_count, avg, usage.contribution_percentage,
        );
    }

    let total = total.unwrap_or(config.payout.default_total);
    if let Some(shares) = tracker.prepare_payout(id, total).await {
        println!("\nPayout split for a total of {total}");
        for share in shares {
            println!(
                "  {:<24} {:>12.6}  (score {})",
                if share.wallet.is_empty() { &share.agent_id } else { &share.wallet },
                share.amount,
                share.score,
            );
        }
    }
    Ok(())
}
