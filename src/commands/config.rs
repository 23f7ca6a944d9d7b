use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use ironlog::{
    config::{Config, KNOWN_KEYS},
    types::best_suggestion,
};

use crate::cli::ConfigCmd;

pub fn handle(cmd: ConfigCmd, config_path: &Path, mut cfg: Config) -> Result<()> {
    match cmd {
        ConfigCmd::List => {
            if cfg.map.is_empty() {
                println!("{}", "(no config set)".dimmed());
            } else {
                println!("{}", "Config:".cyan().bold());
                for (k, v) in &cfg.map {
                    println!("  {} = {}", k.green(), v);
                }
            }
            println!("{} {}", "file:".dimmed(), config_path.display());
        }

        ConfigCmd::Get { key } => match cfg.get(&key) {
            Some(val) => println!("{}", val),
            None => println!("{} key `{}` not found", "warning:".yellow().bold(), key),
        },

        ConfigCmd::Set { key, val } => {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                match best_suggestion(&key, KNOWN_KEYS.iter().copied()) {
                    Some(sug) => println!(
                        "{} `{}` is not a key ironlog reads -- did you mean: `{}`?",
                        "warning:".yellow().bold(),
                        key,
                        sug.green()
                    ),
                    None => println!(
                        "{} `{}` is not a key ironlog reads",
                        "warning:".yellow().bold(),
                        key
                    ),
                }
            }
            cfg.map.insert(key.clone(), val.clone());
            cfg.save(config_path)?;
            println!("{} set `{}` = `{}`", "info:".blue().bold(), key.green(), val);
        }

        ConfigCmd::Unset { key } => {
            if cfg.map.remove(&key).is_some() {
                cfg.save(config_path)?;
                println!("{} removed `{}`", "info:".blue().bold(), key.green());
            } else {
                println!("{} key `{}` not found", "warning:".yellow().bold(), key);
            }
        }
    }

    Ok(())
}
