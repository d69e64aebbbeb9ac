//! Command-line interface for narrmix.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Assemble narration chunks and mix them over a music bed
#[derive(Parser, Debug)]
#[command(name = "narrmix", version, about = "Narration assembly and music bed mixing")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "PATH", env = "NARRMIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one mix request and print the response
    Mix(MixArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct MixArgs {
    /// Read the request body from FILE ("-" for stdin)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["chunk_keys", "bucket", "music"])]
    pub request: Option<String>,

    /// Narration chunk key, in playback order (repeatable)
    #[arg(long = "chunk-key", value_name = "KEY")]
    pub chunk_keys: Vec<String>,

    /// Bucket holding the narration chunks
    #[arg(long, value_name = "BUCKET")]
    pub bucket: Option<String>,

    /// Music bed key or URL
    #[arg(long, value_name = "MUSIC")]
    pub music: Option<String>,

    /// Bucket receiving the mix (overrides config and OUTPUT_BUCKET)
    #[arg(long, value_name = "BUCKET")]
    pub output_bucket: Option<String>,

    /// Bucket holding music beds (overrides config and MUSIC_BUCKET)
    #[arg(long, value_name = "BUCKET")]
    pub music_bucket: Option<String>,

    /// Root directory of the filesystem object store
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Fail on missing, empty or undownloadable chunks
    #[arg(long)]
    pub strict: bool,

    /// Print the full envelope (statusCode, headers, body) instead of the body
    #[arg(long)]
    pub envelope: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a config file with defaults (keeps existing values)
    Init,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}
