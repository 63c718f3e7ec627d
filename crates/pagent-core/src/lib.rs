//! Core traits and types for the private agent
//!
//! This crate defines the capability-facing interfaces the retrieval pipeline
//! is composed from (embedding providers, vector stores, LLM providers), the
//! data model shared across crates, the error taxonomy and the settings.

pub mod agent;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod rag;
pub mod vector_store;

pub use agent::{AgentPersona, ConversationTurn, DEFAULT_AGENT_ID};
pub use config::{EmbeddingBackend, Settings, VectorStoreBackend};
pub use embedding::{DIMENSION_PROBE, EmbeddingProvider};
pub use error::{Error, ErrorKind, Result};
pub use llm::{GenerationConfig, LLMProvider, TextStream};
pub use rag::{AskResponse, HealthReport, HealthStatus, IngestResult, MemoryItem, Source};
pub use vector_store::{ChunkRecord, Metadata, RetrievalHit, StoredChunk, VectorStore};
