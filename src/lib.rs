//! ollama-relay - stateless chat relay for a local Ollama server
//!
//! Accepts a message plus client-held history over HTTP, rebuilds the
//! conversation, forwards it to Ollama and returns the reply.

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod provider;
pub mod telemetry;
