//! Command-line interface for ollama-relay
//!
//! Provides argument parsing and subcommand handling for the relay binary.

use clap::{Parser, Subcommand};

/// Config path used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Stateless chat relay for a local Ollama server
#[derive(Parser)]
#[command(name = "ollama-relay")]
#[command(version)]
#[command(about = "Stateless chat relay for a local Ollama server")]
#[command(
    long_about = "ollama-relay accepts a chat message plus client-held history over HTTP, \
    rebuilds the conversation and forwards it to an Ollama model, returning the reply."
)]
pub struct Cli {
    /// Path to configuration file (defaults apply if the default path is absent)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# ollama-relay Configuration
# ==========================
#
# Every value below is the built-in default. Delete what you don't change.

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 5000

[ollama]
# Model to chat with; must already be pulled (`ollama pull phi3`)
# Overridden by OLLAMA_RELAY_MODEL_ID
model_id = "phi3"

# Base URL of the Ollama server (no /api suffix)
# Overridden by OLLAMA_RELAY_ENDPOINT
endpoint = "http://localhost:11434"

# HTTP timeout for a single completion, in seconds (1-600).
# Cold model loads can take a while on CPU-only hosts.
timeout_seconds = 120

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG takes precedence when set
log_level = "info"
"#
}
