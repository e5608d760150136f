//! Config command implementation.

use anyhow::Result;

use crate::config::Config;

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Shape-Tree CLI Configuration");
    println!("{:-<40}", "");
    println!("Rulesets Directory:  {}", config.rulesets_dir.display());
    println!("Output Directory:    {}", config.output_dir.display());
    println!("Max Layers:          {}", config.max_layers);
    println!("Max Nodes:           {}", config.max_nodes);
    println!("Poll Interval:       {} ms", config.poll_interval_ms);

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Print the path to the config file.
pub fn path() -> Result<()> {
    match Config::config_file_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("(no config file path available)"),
    }
    Ok(())
}
