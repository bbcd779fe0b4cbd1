//! CLI argument definitions for cnpjx.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `validate` | Check identifiers offline |
//! | `lookup` | Resolve identifiers into profiles |
//! | `batch` | Resolve every identifier listed in a file |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | TOML configuration file |
//! | `--log-level` | `info` | Log filter when `RUST_LOG` is unset |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--memory-cache` | `false` | Keep the cache in memory instead of DuckDB |
//!
//! # Examples
//!
//! ```bash
//! cnpjx validate 11.222.333/0001-81
//! cnpjx lookup 11222333000181 --no-cache --pretty
//! cnpjx batch companies.txt --log-level debug
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Registry-ID lookup with provider fallback, caching and risk scoring.
#[derive(Debug, Parser)]
#[command(name = "cnpjx", author, version, about)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "CNPJX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Keep the result cache in memory for this process only.
    #[arg(long, global = true, default_value_t = false)]
    pub memory_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check identifiers without touching the network.
    Validate(ValidateArgs),
    /// Resolve identifiers into company profiles.
    Lookup(LookupArgs),
    /// Resolve every identifier in a file, one per line.
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Skip the cache read; the result is still cached.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Stop after the primary source.
    #[arg(long, default_value_t = false)]
    pub no_fallback: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Input file. Blank lines and lines starting with `#` are skipped.
    pub file: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Pause between lookups in milliseconds; overrides the configuration.
    #[arg(long)]
    pub delay_ms: Option<u64>,
}
