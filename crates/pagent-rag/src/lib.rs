//! Retrieval-augmented generation pipeline for the private agent
//!
//! This crate provides the text chunker, embedding backends, vector stores,
//! document extraction, retrieval, prompt assembly, the agent registry and
//! conversational memory, tied together by [`RagEngine`].

mod agents;
mod chunker;
mod embeddings;
mod engine;
mod extract;
mod memory;
mod prompt;
mod qdrant;
mod retrieval;
mod vector_store;


pub use agents::AgentRegistry;
pub use chunker::{ChunkSpan, TextChunker, normalize_newlines};
pub use embeddings::{Embedder, LocalEmbedder, RemoteEmbedder, resolve_model};
pub use engine::{AskStream, RESERVED_METADATA_KEYS, RagEngine, open_store};
pub use extract::{DocumentFormat, SUPPORTED_EXTENSIONS, extract_from_bytes, extract_text};
pub use memory::ConversationMemoryWriter;
pub use prompt::{
    AssembledPrompt, HISTORY_WINDOW, NO_DOCUMENTS, build_prompt, format_sources, render_context,
    render_conversation, truncate_chars,
};
pub use qdrant::QdrantVectorStore;
pub use retrieval::Retriever;
pub use vector_store::LocalVectorStore;

// Re-export core types for convenience
pub use pagent_core::{
    AgentPersona, AskResponse, ChunkRecord, ConversationTurn, EmbeddingProvider, Error, HealthReport,
    HealthStatus, IngestResult, LLMProvider, MemoryItem, Metadata, Result, RetrievalHit, Settings, Source,
    StoredChunk, VectorStore,
};
