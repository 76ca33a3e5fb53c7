//! `quorum doctor` — Diagnose configuration and stores.

use quorum_config::AppConfig;
use quorum_core::agent::AgentRegistry;
use quorum_scoring::store::ProfileStore;
use quorum_session::SessionStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Quorum Doctor\n");

    let config_path = AppConfig::config_dir().join("config.toml");
    match AppConfig::load() {
        Ok(config) => {
            println!("[ok] config: {}", config_path.display());

            if config.registry_path.exists() {
                let registry = AgentRegistry::load(&config.registry_path);
                if registry.is_empty() {
                    println!(
                        "[warn] registry has no active agents: {}",
                        config.registry_path.display()
                    );
                } else {
                    println!(
                        "[ok] registry: {} active agent(s) at {}",
                        registry.len(),
                        config.registry_path.display()
                    );
                }
            } else {
                println!(
                    "[warn] registry missing: {} (run `quorum onboard`)",
                    config.registry_path.display()
                );
            }

            let profiles = ProfileStore::open(config.data_dir.join("profiles.json"));
            println!("[ok] profile store: {} profile(s)", profiles.count().await);

            let sessions = SessionStore::open(config.data_dir.join("sessions.json"));
            println!("[ok] session store: {} session(s)", sessions.count().await);
        }
        Err(e) => {
            println!("[fail] config: {e}");
            println!("       Run `quorum onboard` to create a default config.");
        }
    }

    Ok(())
}
