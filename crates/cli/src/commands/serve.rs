//! `quorum serve` — Start the gateway and orchestration engine.

use quorum_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Quorum Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Registry:  {}", config.registry_path.display());
    println!("   Data dir:  {}", config.data_dir.display());

    quorum_gateway::start(config).await?;

    Ok(())
}
