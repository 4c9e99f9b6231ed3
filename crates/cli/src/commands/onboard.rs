//! `fincrew onboard`: First-time setup.

use fincrew_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("fincrew — First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. export OPENROUTER_API_KEY='sk-or-v1-...'");
    println!("  2. fincrew agents");
    println!("  3. fincrew chat --agent Market_Analyst --message \"How is NVDA doing?\"");
    println!();
    Ok(())
}
