use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;

use super::context::CliContext;
use super::output::{render, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (defaults, file and environment merged)
    Show,

    /// Print the configuration file location
    Path,

    /// Get one configuration value
    Get {
        /// Dotted key, e.g. `resolution.max_retries`
        key: String,
    },
}

pub fn cmd_config(args: ConfigArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            if format == OutputFormat::Human {
                let origin = if ctx.config_from_file() {
                    ctx.config_path().display().to_string()
                } else {
                    format!("defaults; no file at {}", ctx.config_path().display())
                };
                println!("Current configuration ({}):", origin);
            }
            print_value(ctx.config(), format)?;
        }
        ConfigAction::Path => {
            println!("{}", ctx.config_path().display());
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(ctx.config())?;
            let segments = split_key(&key)?;
            match get_json_value(&json, &segments) {
                Some(value) => print_value(value, format)?,
                None => bail!("{} not found in configuration", key),
            }
        }
    }

    Ok(())
}

fn print_value<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match render(format, value)? {
        Some(text) => text,
        None => serde_yaml::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use healwright::HealConfig;

    #[test]
    fn dotted_keys_reach_nested_settings() {
        let doc = serde_json::to_value(HealConfig::default()).unwrap();
        let segments = split_key("resolution.max_retries").unwrap();
        assert_eq!(
            get_json_value(&doc, &segments),
            Some(&JsonValue::from(HealConfig::default().resolution.max_retries))
        );
        assert_eq!(get_json_value(&doc, &["store", "missing"]), None);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(split_key("..").is_err());
    }
}
