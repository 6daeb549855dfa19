use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skipwarden")]
#[command(author, version, about = "Operator-defined skip ranges for Jellyfin playback")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the segment API, host provider endpoint and client script
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Follow a Jellyfin playback session and enforce skips natively
    Watch {
        /// Only follow sessions on this device
        #[arg(long)]
        device: Option<String>,

        /// Skipwarden server to load segments from
        #[arg(long)]
        server: Option<String>,
    },

    /// Add the client script tag to a web client's index.html
    Inject {
        /// The index.html to modify in place
        #[arg(long, required = true)]
        index: PathBuf,

        /// Script URL (defaults to the configured public URL)
        #[arg(long)]
        url: Option<String>,
    },

    /// Flip, or set, the persisted enabled preference
    Toggle {
        /// Turn skipping on
        #[arg(long, conflicts_with = "off")]
        on: bool,

        /// Turn skipping off
        #[arg(long)]
        off: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
