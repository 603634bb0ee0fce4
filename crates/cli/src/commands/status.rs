//! `fieldscribe status`: Show configuration and store status.

use fieldscribe_config::AppConfig;

use super::{CmdResult, load_config, open_store};

pub async fn run() -> CmdResult {
    let config = load_config()?;

    println!("Field Scribe Status");
    println!("===================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!(
        "  Gateway:      timeout {}s, {} retries",
        config.model_gateway.timeout_secs, config.model_gateway.max_retries
    );
    println!("  History:      last {} interactions", config.pipeline.history_window);
    println!("  Unknown keys: {:?}", config.pipeline.unknown_fields);
    println!("  Store:        {}", config.store.backend);
    if config.store.backend == "sqlite" {
        println!("  Database:     {}", config.store.resolved_path());
    }

    match open_store(&config).await {
        Ok(store) => match store.count().await {
            Ok(n) => println!("  Interactions: {n}"),
            Err(e) => println!("  Interactions: unavailable ({e})"),
        },
        Err(e) => println!("  Interactions: unavailable ({e})"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `fieldscribe onboard` first");
    }

    Ok(())
}
