use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};
use storehouse_manager::{ManagerConfig, StoreManager};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let manager = build_manager(&cli)?;
    let result = dispatch(&manager, cli.command, cli.format);
    let closed = manager.close().context("failed to close stores");
    // A command failure is more useful to report than a close failure.
    result.and(closed)
}

fn build_manager(cli: &Cli) -> anyhow::Result<StoreManager> {
    let manager = StoreManager::new();
    if let Some(path) = &cli.config {
        let config = ManagerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?;
        manager.initialize(config);
    }
    Ok(manager)
}

fn dispatch(manager: &StoreManager, command: Command, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Get(args) => cmd_get(manager, args, format),
        Command::Set(args) => cmd_set(manager, args),
        Command::Delete(args) => cmd_delete(manager, args),
        Command::Keys(args) => cmd_keys(manager, args, format),
        Command::Resolve(args) => cmd_resolve(manager, args, format),
        Command::Backends => cmd_backends(manager, format),
    }
}

/// Accept JSON literals; anything else becomes a JSON string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn cmd_get(manager: &StoreManager, args: KeyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = manager.get_store(&args.store)?;
    let value = store.get(&args.key)?;
    match (format, value) {
        (OutputFormat::Json, value) => println!("{}", value.unwrap_or(Value::Null)),
        (OutputFormat::Text, Some(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
        (OutputFormat::Text, None) => {
            anyhow::bail!("key {} not found in {}", args.key, args.store)
        }
    }
    Ok(())
}

fn cmd_set(manager: &StoreManager, args: SetArgs) -> anyhow::Result<()> {
    let store = manager.get_store(&args.store)?;
    store.set(&args.key, parse_value(&args.value))?;
    println!("{} {}/{}", "✓".green().bold(), args.store.bold(), args.key.yellow());
    Ok(())
}

fn cmd_delete(manager: &StoreManager, args: KeyArgs) -> anyhow::Result<()> {
    let store = manager.get_store(&args.store)?;
    if store.delete(&args.key)? {
        println!("Deleted {}/{}", args.store.bold(), args.key.yellow());
    } else {
        println!("No key {} in {}", args.key.yellow(), args.store.bold());
    }
    Ok(())
}

fn cmd_keys(manager: &StoreManager, args: StoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = manager.get_store(&args.store)?;
    let keys = store.keys()?;
    match format {
        OutputFormat::Json => println!("{}", json!(keys)),
        OutputFormat::Text if keys.is_empty() => println!("Store {} is empty.", args.store.bold()),
        OutputFormat::Text => {
            for key in keys {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn cmd_resolve(manager: &StoreManager, args: StoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let resolved = manager.resolve(&args.store);
    let registered = manager.is_registered(&resolved.config.store_type);
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "name": resolved.name,
                "matched": resolved.matched,
                "key": resolved.key,
                "type": resolved.config.store_type,
                "options": resolved.config.options,
                "registered": registered,
            })
        ),
        OutputFormat::Text => {
            println!("Store: {}", resolved.name.bold());
            let key = resolved.key.as_deref().unwrap_or("(none)");
            println!("  Matched: {} ({})", resolved.matched.to_string().cyan(), key);
            let backend = if registered {
                resolved.config.store_type.green()
            } else {
                format!("{} (not registered)", resolved.config.store_type).red()
            };
            println!("  Backend: {backend}");
            for (option, value) in &resolved.config.options {
                println!("  {option} = {value}");
            }
        }
    }
    Ok(())
}

fn cmd_backends(manager: &StoreManager, format: OutputFormat) -> anyhow::Result<()> {
    let types = manager.registered_types();
    match format {
        OutputFormat::Json => println!("{}", json!(types)),
        OutputFormat::Text => {
            for t in types {
                println!("  {}", t.cyan());
            }
        }
    }
    Ok(())
}
