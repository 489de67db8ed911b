use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "storehouse",
    about = "Inspect and edit named key/value stores",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file mapping store names to backends
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read a key
    Get(KeyArgs),
    /// Write a key (value is parsed as JSON, else stored as a string)
    Set(SetArgs),
    /// Delete a key
    Delete(KeyArgs),
    /// List the keys in a store
    Keys(StoreArgs),
    /// Show which configuration and backend serve a store name
    Resolve(StoreArgs),
    /// List registered backend types
    Backends,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Logical store name, e.g. `jobs.emails`
    pub store: String,
}

#[derive(Args)]
pub struct KeyArgs {
    pub store: String,
    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub store: String,
    pub key: String,
    pub value: String,
}
