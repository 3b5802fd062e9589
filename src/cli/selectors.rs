use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use healwright_core_types::{ElementKey, SuiteId};
use selector_store::{Discovery, PersistedElement};
use tracing::info;

use super::context::CliContext;
use super::output::{render, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct SelectorsArgs {
    #[command(subcommand)]
    pub action: SelectorsAction,
}

/// Identifies one stored element
#[derive(Args, Clone, Debug)]
pub struct KeyArgs {
    /// Element name
    pub name: String,

    /// Page URL the element was recorded on
    #[arg(long)]
    pub url: String,

    /// Suite scope; omit for the global scope
    #[arg(long)]
    pub suite: Option<String>,
}

impl KeyArgs {
    fn to_key(&self) -> Result<ElementKey> {
        ElementKey::new(
            self.suite.as_deref().map(SuiteId::new),
            self.url.as_str(),
            self.name.as_str(),
        )
        .with_context(|| format!("invalid element key for '{}'", self.name))
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum SelectorsAction {
    /// List stored elements
    List {
        /// Only show one suite; "global" lists unscoped records
        #[arg(long)]
        suite: Option<String>,
    },

    /// Show the full record of one element
    Show(KeyArgs),

    /// Delete the record of one element
    Forget(KeyArgs),

    /// Merge externally discovered selectors into a record
    Discover {
        #[command(flatten)]
        key: KeyArgs,

        /// AI-suggested selector (repeatable)
        #[arg(long = "ai")]
        ai_selectors: Vec<String>,

        /// Fallback selector (repeatable)
        #[arg(long = "fallback")]
        fallback_selectors: Vec<String>,

        /// Confidence reported for the AI selectors
        #[arg(long)]
        confidence: Option<f64>,
    },
}

pub async fn cmd_selectors(args: SelectorsArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let store = ctx.store().await?;

    match args.action {
        SelectorsAction::List { suite } => {
            let mut records = store.list(suite.as_deref()).await?;
            records.sort_by(|a, b| a.id.cmp(&b.id));
            match render(format, &records)? {
                Some(text) => println!("{}", text),
                None if records.is_empty() => println!("No stored selectors"),
                None => {
                    for record in &records {
                        println!(
                            "{:<10} {:<24} {:<40} {}",
                            record.scope(),
                            record.name,
                            record.url,
                            front_selector(record)
                        );
                    }
                }
            }
        }
        SelectorsAction::Show(key) => {
            let key = key.to_key()?;
            let Some(record) = store.get(&key).await? else {
                bail!("no stored selectors for {}", key);
            };
            print_record(&record, format)?;
        }
        SelectorsAction::Forget(key) => {
            let key = key.to_key()?;
            if !store.remove(&key).await? {
                bail!("no stored selectors for {}", key);
            }
            info!(key = %key, "Removed selector record");
            println!("Removed {}", key);
        }
        SelectorsAction::Discover {
            key,
            ai_selectors,
            fallback_selectors,
            confidence,
        } => {
            if ai_selectors.is_empty() && fallback_selectors.is_empty() {
                bail!("pass at least one --ai or --fallback selector");
            }
            if let Some(confidence) = confidence {
                if !(0.0..=1.0).contains(&confidence) {
                    bail!("confidence must be between 0 and 1, got {}", confidence);
                }
            }
            let key = key.to_key()?;
            let record = store
                .record_discovery(
                    &key,
                    Discovery {
                        ai_selectors,
                        fallback_selectors,
                        ai_confidence: confidence,
                    },
                )
                .await?;
            info!(key = %key, "Recorded discovered selectors");
            print_record(&record, format)?;
        }
    }

    Ok(())
}

fn front_selector(record: &PersistedElement) -> &str {
    if record.locator.is_empty() {
        "(unproven)"
    } else {
        &record.locator
    }
}

fn print_record(record: &PersistedElement, format: OutputFormat) -> Result<()> {
    if let Some(text) = render(format, record)? {
        println!("{}", text);
        return Ok(());
    }

    println!("{}", record.id);
    println!("  locator:   {}", front_selector(record));
    print_list("selectors", &record.selectors);
    print_list("ai", &record.ai_selectors);
    print_list("fallback", &record.fallback_selectors);
    if let Some(confidence) = record.ai_confidence {
        println!("  confidence: {:.2}", confidence);
    }
    println!("  updated:   {}", record.updated_at.to_rfc3339());
    Ok(())
}

fn print_list(label: &str, selectors: &[String]) {
    if selectors.is_empty() {
        return;
    }
    println!("  {}:", label);
    for (index, selector) in selectors.iter().enumerate() {
        println!("    {}. {}", index + 1, selector);
    }
}
