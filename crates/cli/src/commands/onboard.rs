//! `quorum onboard` — First-time setup.

use quorum_config::AppConfig;

/// Sample registry written on first run so `serve` has something to route to.
const SAMPLE_REGISTRY: &str = r#"{
  "domain": {
    "financial": {
      "agents": [
        {
          "id": "debt-specialist",
          "name": "DebtSpecialist",
          "address": "agent1debtspecialist",
          "wallet": "",
          "specialty": "debt",
          "status": "active"
        },
        {
          "id": "savings-guru",
          "name": "SavingsGuru",
          "address": "agent1savingsguru",
          "wallet": "",
          "specialty": "savings",
          "status": "active"
        }
      ]
    }
  }
}
"#;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Quorum — First-Time Setup");
    println!("=========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("Config directory exists: {}", config_dir.display());
    }

    if !config_path.exists() {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("Created default config: {}", config_path.display());
    } else {
        println!("Config exists: {}", config_path.display());
    }

    let config = AppConfig::load()?;
    if !config.data_dir.exists() {
        std::fs::create_dir_all(&config.data_dir)?;
        println!("Created data directory: {}", config.data_dir.display());
    }

    if !config.registry_path.exists() {
        std::fs::write(&config.registry_path, SAMPLE_REGISTRY)?;
        println!("Created sample registry: {}", config.registry_path.display());
        println!("  Edit it to add your responder agents, then run `quorum serve`.");
    } else {
        println!("Registry exists: {}", config.registry_path.display());
    }

    println!("\nDone. Start the engine with `quorum serve`.");
    Ok(())
}
