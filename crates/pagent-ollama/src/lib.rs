//! Ollama integration for the private agent
//!
//! This crate provides the Ollama implementation of the LLMProvider trait:
//! one-shot generation, streaming generation and a cheap health probe.

mod client;
mod config;
mod stream;

#[cfg(test)]
mod tests;

pub use client::OllamaClient;
pub use config::OllamaConfig;
pub use stream::decode_fragments;

// Re-export core types for convenience
pub use pagent_core::{Error, GenerationConfig, LLMProvider, Result, TextStream};
