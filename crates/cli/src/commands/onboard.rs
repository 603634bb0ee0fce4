//! `fieldscribe onboard`: First-time setup.

use fieldscribe_config::AppConfig;

use super::CmdResult;

pub async fn run() -> CmdResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Field Scribe — First-Time Setup");
    println!("===============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set GROQ_API_KEY or add api_key to {}", config_path.display());
        println!("   2. Run: fieldscribe log \"Met Dr. Rossi today about OncoBoost, it went well\"");
        println!("   3. Or draft interactively: fieldscribe chat\n");
    }

    println!("🎉 Setup complete!\n");
    Ok(())
}
