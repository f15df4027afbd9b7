//! @acp:module "Init Command"
//! @acp:summary "Write a configuration file holding the default transform table"
//! @acp:domain cli
//! @acp:layer handler

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;

use crate::config::{Config, DEFAULT_CONFIG_FILE};

/// Options for the init command
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Where to write the configuration
    pub config_path: PathBuf,
    /// Force overwrite existing config
    pub force: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            force: false,
        }
    }
}

/// Execute the init command
pub fn execute_init(options: InitOptions) -> Result<()> {
    if options.config_path.exists() && !options.force {
        eprintln!(
            "{} Config file already exists. Use --force to overwrite.",
            style("✗").red()
        );
        std::process::exit(1);
    }

    let config = Config::default();
    config
        .save(&options.config_path)
        .with_context(|| format!("failed to write {}", options.config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        options.config_path.display()
    );

    for ancestor in config.transforms.ancestors() {
        if let Some(rules) = config.transforms.rules_for(ancestor) {
            let rules: Vec<String> = rules
                .iter()
                .map(|(attribute, kind)| format!("${} {}", attribute, kind))
                .collect();
            println!("  {} {}: {}", style("→").cyan(), ancestor, rules.join(", "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        execute_init(InitOptions {
            config_path: path.clone(),
            force: false,
        })
        .unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        // --force overwrites an edited file
        std::fs::write(&path, "{\"remove_unknown\": true}").unwrap();
        execute_init(InitOptions {
            config_path: path.clone(),
            force: true,
        })
        .unwrap();
        assert!(!Config::load(&path).unwrap().remove_unknown);
    }
}
