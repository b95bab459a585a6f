//! View system configuration

use crate::system_config;
use anyhow::{Context, Result};

pub fn run(list: bool, get: Option<String>, path: bool, example: bool) -> Result<()> {
    if example {
        print!("{}", system_config::example_config());
        return Ok(());
    }

    if path {
        let path = system_config::config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine system config directory"))?;
        println!("{}", path.display());
        return Ok(());
    }

    let config = system_config::load()?;

    if let Some(key) = get {
        println!("{}", config.get(&key)?);
        return Ok(());
    }

    if !list {
        anyhow::bail!("Specify one of --list, --get <key>, --path or --example");
    }

    let rendered = toml::to_string_pretty(&config).context("Failed to serialize system config")?;
    print!("{}", rendered);
    if config.snapshot.ignore.is_none() {
        println!(
            "\n# snapshot.ignore not set; built-in list: {}",
            config.get("snapshot.ignore")?
        );
    }

    Ok(())
}
