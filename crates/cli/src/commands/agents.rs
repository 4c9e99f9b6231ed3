//! `fincrew agents`: Browse the agent library.

use fincrew_config::AppConfig;

pub async fn run(name: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let library = super::library(&config);

    let Some(name) = name else {
        println!("Available agents ({}):\n", library.len());
        let width = library.names().iter().map(String::len).max().unwrap_or(0);
        for spec in library.iter() {
            println!("  {:<width$}  {}", spec.name, spec.description);
        }
        return Ok(());
    };

    let spec = library.get(&name)?;
    println!("Name:        {}", spec.name);
    println!("Description: {}", spec.description);
    if spec.has_toolsets() {
        println!("Toolsets:    {}", spec.toolsets.join(", "));
    } else {
        println!("Toolsets:    (none)");
    }
    println!("\nInstructions:\n");
    for line in spec.instructions.lines() {
        println!("  {line}");
    }
    Ok(())
}
