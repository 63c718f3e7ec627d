//! RAG engine: the pipeline-facing operations

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use pagent_core::{
    AgentPersona, AskResponse, ChunkRecord, ConversationTurn, EmbeddingProvider, Error, GenerationConfig,
    HealthReport, HealthStatus, IngestResult, LLMProvider, MemoryItem, Metadata, Result, Settings, Source,
    TextStream, VectorStore, VectorStoreBackend,
};

use crate::agents::AgentRegistry;
use crate::chunker::TextChunker;
use crate::embeddings::Embedder;
use crate::extract::extract_text;
use crate::memory::ConversationMemoryWriter;
use crate::prompt::{build_prompt, format_sources, AssembledPrompt};
use crate::qdrant::QdrantVectorStore;
use crate::retrieval::Retriever;
use crate::vector_store::LocalVectorStore;

/// Metadata keys the engine sets on every ingested chunk
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    "filename",
    "chunk_id",
    "chunk_index",
    "total_chunks",
    "file_path",
    "uploaded_at",
];

/// Answer of a streaming `ask`: sources are known up front, text arrives lazily
pub struct AskStream {
    pub sources: Vec<Source>,
    pub model: String,
    pub fragments: TextStream,
}

/// Prepared generation request shared by `ask` and `ask_stream`
struct PreparedAsk {
    prompt: AssembledPrompt,
    config: GenerationConfig,
    sources: Vec<Source>,
}

/// Local RAG engine.
///
/// Owns the capabilities the pipeline is built from. Everything that is
/// shared between requests (store handle, agent registry) lives here rather
/// than in globals, so tests can swap in fakes.
pub struct RagEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLMProvider>,
    agents: AgentRegistry,
    chunker: TextChunker,
    retriever: Retriever,
    memory: ConversationMemoryWriter,
    settings: Settings,
}

impl RagEngine {
    /// Create an engine over already-connected capabilities
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMProvider>,
        settings: Settings,
    ) -> Result<Self> {
        let chunker = TextChunker::new(settings.chunk_size, settings.chunk_overlap)?;
        let retriever = Retriever::new(embedder.clone(), store.clone(), settings.top_k);
        let memory = ConversationMemoryWriter::new(embedder.clone(), store.clone(), chunker);

        Ok(Self {
            embedder,
            store,
            llm,
            agents: AgentRegistry::new(),
            chunker,
            retriever,
            memory,
            settings,
        })
    }

    /// Build the embedder and the vector store named by `settings`
    pub async fn from_settings(settings: Settings, llm: Arc<dyn LLMProvider>) -> Result<Self> {
        settings.validate()?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(Embedder::from_settings(&settings)?);
        let store = open_store(&settings).await?;
        info!(
            collection = %store.collection_name(),
            embedding_model = %embedder.model_name(),
            "RAG engine ready"
        );
        Self::new(embedder, store, llm, settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Extract, chunk, embed and store one document
    pub async fn ingest_file(&self, path: &Path, metadata: Metadata) -> Result<IngestResult> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("'{}' is not a file path", path.display())))?;

        let text = extract_text(path, self.settings.max_file_size).await?;
        let file_path = path.display().to_string();
        self.ingest_chunks(&text, &filename, Some(&file_path), metadata).await
    }

    /// Chunk, embed and store raw text under `filename`
    pub async fn ingest_text(&self, text: &str, filename: &str) -> Result<IngestResult> {
        let mut metadata = Metadata::new();
        metadata.insert("type".into(), json!("text_input"));
        metadata.insert("original_filename".into(), json!(filename));
        metadata.insert("file_size".into(), json!(text.chars().count()));
        self.ingest_chunks(text, filename, None, metadata).await
    }

    async fn ingest_chunks(
        &self,
        text: &str,
        filename: &str,
        file_path: Option<&str>,
        mut extra: Metadata,
    ) -> Result<IngestResult> {
        for key in RESERVED_METADATA_KEYS {
            extra.remove(*key);
        }

        let chunks = self.chunker.split(text);
        if chunks.is_empty() {
            return Err(Error::InvalidInput(format!(
                "No text content could be extracted from {}",
                filename
            )));
        }

        let embeddings = self.embedder.embed(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "Provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let uploaded_at = Utc::now().to_rfc3339();
        let total = chunks.len();
        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| {
                let mut metadata = extra.clone();
                metadata.insert("filename".into(), json!(filename));
                metadata.insert("chunk_id".into(), json!(format!("chunk_{}", i)));
                metadata.insert("chunk_index".into(), json!(i));
                metadata.insert("total_chunks".into(), json!(total));
                metadata.insert("uploaded_at".into(), json!(uploaded_at));
                if let Some(path) = file_path {
                    metadata.insert("file_path".into(), json!(path));
                }
                ChunkRecord {
                    id: Uuid::new_v4().to_string(),
                    text: chunk,
                    embedding,
                    metadata,
                }
            })
            .collect();

        self.store.add(records).await.map_err(|e| {
            error!(filename, "Failed to store chunks: {}", e);
            e
        })?;

        info!(filename, chunks = total, "Ingested document");
        Ok(IngestResult {
            chunks_created: total,
            filename: filename.to_string(),
            file_size: text.chars().count(),
        })
    }

    async fn prepare_ask(
        &self,
        persona: &AgentPersona,
        user_input: &str,
        history: &[ConversationTurn],
    ) -> Result<PreparedAsk> {
        let hits = self.retriever.retrieve(user_input).await?;
        let prompt = build_prompt(persona, &hits, history, user_input);

        let model = persona.model_or(self.llm.default_model()).to_string();
        let mut config = GenerationConfig::for_model(model)
            .with_system_prompt(prompt.system_prompt.clone())
            .with_max_tokens(self.settings.max_context_tokens);
        config.timeout = self.settings.generation_timeout;

        debug!(agent_id = %persona.agent_id, hits = hits.len(), model = %config.model_id, "Prepared prompt");
        Ok(PreparedAsk {
            prompt,
            config,
            sources: format_sources(&hits),
        })
    }

    /// Answer a question with the given persona, then remember the exchange
    pub async fn ask(&self, agent_id: &str, user_input: &str, history: &[ConversationTurn]) -> Result<AskResponse> {
        let persona = self.agents.get(agent_id)?;
        let prepared = self.prepare_ask(&persona, user_input, history).await?;

        let answer = self
            .llm
            .generate(&prepared.prompt.user_prompt, &prepared.config)
            .await
            .map_err(|e| {
                error!(agent_id, "Generation failed: {}", e);
                e
            })?;

        self.memory.remember_best_effort(agent_id, user_input, &answer).await;

        Ok(AskResponse {
            answer,
            sources: prepared.sources,
            model: prepared.config.model_id,
            timestamp: Utc::now(),
        })
    }

    /// Like `ask`, but the answer arrives as a lazy fragment stream.
    ///
    /// The exchange is remembered once the stream has been read to its end
    /// without error. A stream that errors or is dropped early stores nothing.
    pub async fn ask_stream(
        &self,
        agent_id: &str,
        user_input: &str,
        history: &[ConversationTurn],
    ) -> Result<AskStream> {
        let persona = self.agents.get(agent_id)?;
        let prepared = self.prepare_ask(&persona, user_input, history).await?;

        let upstream = self
            .llm
            .generate_stream(&prepared.prompt.user_prompt, &prepared.config)
            .await?;

        let state = StreamState {
            upstream,
            answer: String::new(),
            done: false,
            memory: self.memory.clone(),
            agent_id: agent_id.to_string(),
            user_input: user_input.to_string(),
        };

        let fragments = stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            match state.upstream.next().await {
                Some(Ok(fragment)) => {
                    state.answer.push_str(&fragment);
                    Some((Ok(fragment), state))
                }
                Some(Err(e)) => {
                    state.done = true;
                    Some((Err(e), state))
                }
                None => {
                    state
                        .memory
                        .remember_best_effort(&state.agent_id, &state.user_input, &state.answer)
                        .await;
                    None
                }
            }
        })
        .boxed();

        Ok(AskStream {
            sources: prepared.sources,
            model: prepared.config.model_id,
            fragments,
        })
    }

    /// Every record in the knowledge base
    pub async fn list_memories(&self) -> Result<Vec<MemoryItem>> {
        Ok(self.store.list().await?.into_iter().map(MemoryItem::from).collect())
    }

    pub async fn delete_memory(&self, id: &str) -> Result<()> {
        if self.store.delete(id).await? {
            info!(id, "Deleted memory");
            Ok(())
        } else {
            Err(Error::MemoryNotFound(id.to_string()))
        }
    }

    /// Drop every record, documents and conversations alike
    pub async fn clear_memories(&self) -> Result<()> {
        self.store.clear().await
    }

    pub fn list_agents(&self) -> Result<Vec<AgentPersona>> {
        self.agents.list()
    }

    pub fn create_agent(
        &self,
        agent_id: &str,
        name: &str,
        system_prompt: &str,
        model_override: Option<String>,
    ) -> Result<AgentPersona> {
        self.agents.register(agent_id, name, system_prompt, model_override)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<AgentPersona> {
        self.agents.get(agent_id)
    }

    /// Vector length of the active embedding backend.
    ///
    /// Embeds one probe text, so a local model is loaded if it was not yet.
    pub async fn embedding_dimension(&self) -> Result<usize> {
        self.embedder.dimension().await
    }

    /// Probe the generation backend and the vector store
    pub async fn health(&self) -> HealthReport {
        let generation_connected = self.llm.health().await;
        let store_connected = self.store.is_connected() && self.store.count().await.is_ok();

        HealthReport {
            status: HealthStatus::from_probes(generation_connected, store_connected),
            generation_connected,
            store_connected,
            timestamp: Utc::now(),
        }
    }
}

struct StreamState {
    upstream: TextStream,
    answer: String,
    done: bool,
    memory: ConversationMemoryWriter,
    agent_id: String,
    user_input: String,
}

/// Open and connect the vector store named by `VECTOR_STORE_BACKEND`
pub async fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store_backend {
        VectorStoreBackend::Local => {
            let mut store = LocalVectorStore::new(settings.vector_store_dir.clone(), &settings.collection_name);
            store.connect().await?;
            Ok(Arc::new(store))
        }
        VectorStoreBackend::Qdrant => {
            let mut store = QdrantVectorStore::new(&settings.qdrant_url, &settings.collection_name);
            store.connect().await?;
            Ok(Arc::new(store))
        }
    }
}
