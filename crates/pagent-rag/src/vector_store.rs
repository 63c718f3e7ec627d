//! File-backed vector store implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

use pagent_core::{ChunkRecord, Error, Result, RetrievalHit, StoredChunk, VectorStore};

/// On-disk form of one collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collection {
    name: String,
    dimension: Option<usize>,
    records: Vec<ChunkRecord>,
}

/// Local vector store keeping one collection in memory and in a JSON file.
///
/// Every mutation is written through to `<dir>/<collection>.json` before it
/// returns; a failed write leaves the in-memory collection unchanged.
pub struct LocalVectorStore {
    dir: PathBuf,
    collection_name: String,
    collection: RwLock<Collection>,
    connected: bool,
}

impl LocalVectorStore {
    /// Create a store for `collection_name` under `dir`; call `connect` before use
    pub fn new(dir: impl Into<PathBuf>, collection_name: impl Into<String>) -> Self {
        let collection_name = collection_name.into();
        Self {
            dir: dir.into(),
            collection: RwLock::new(Collection {
                name: collection_name.clone(),
                ..Default::default()
            }),
            collection_name,
            connected: false,
        }
    }

    /// Path of the collection file
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.collection_name))
    }

    /// Cosine similarity of two equal-length vectors
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::VectorStore("Vector store not connected".to_string()))
        }
    }

    fn persist(&self, collection: &Collection) -> Result<()> {
        write_collection(&self.path(), collection)
    }
}

fn read_collection(path: &Path) -> Result<Collection> {
    let data = fs::read(path)
        .map_err(|e| Error::VectorStore(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_slice(&data)
        .map_err(|e| Error::VectorStore(format!("Corrupt collection file {}: {}", path.display(), e)))
}

/// Write to a sibling temp file, then rename over the target
fn write_collection(path: &Path, collection: &Collection) -> Result<()> {
    let data = serde_json::to_vec(collection)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| Error::VectorStore(format!("Failed to write {}: {}", path.display(), e)))
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn connect(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::VectorStore(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.path();
        let collection = if path.exists() {
            let mut loaded = read_collection(&path)?;
            loaded.name = self.collection_name.clone();
            info!(collection = %self.collection_name, records = loaded.records.len(), "Opened collection");
            loaded
        } else {
            let fresh = Collection {
                name: self.collection_name.clone(),
                ..Default::default()
            };
            write_collection(&path, &fresh)?;
            info!(collection = %self.collection_name, "Created collection");
            fresh
        };

        *self.collection.write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))? = collection;
        self.connected = true;
        Ok(())
    }

    async fn add(&self, records: Vec<ChunkRecord>) -> Result<()> {
        self.ensure_connected()?;
        if records.is_empty() {
            return Ok(());
        }

        let mut collection = self.collection.write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let expected = collection.dimension.unwrap_or(records[0].embedding.len());
        if expected == 0 {
            return Err(Error::VectorStore("Cannot store an empty embedding".to_string()));
        }
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        let previous_len = collection.records.len();
        let previous_dimension = collection.dimension;
        let added = records.len();
        collection.records.extend(records);
        collection.dimension = Some(expected);

        if let Err(e) = self.persist(&collection) {
            collection.records.truncate(previous_len);
            collection.dimension = previous_dimension;
            return Err(e);
        }

        debug!(collection = %self.collection_name, added, "Stored records");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        self.ensure_connected()?;
        let collection = self.collection.read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        if k == 0 || collection.records.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = collection.dimension {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut hits: Vec<RetrievalHit> = collection
            .records
            .iter()
            .map(|record| RetrievalHit {
                id: record.id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                distance: 1.0 - Self::cosine_similarity(vector, &record.embedding),
            })
            .collect();

        // Stable: equal distances keep insertion order.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn list(&self) -> Result<Vec<StoredChunk>> {
        self.ensure_connected()?;
        let collection = self.collection.read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(collection.records.iter().cloned().map(StoredChunk::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredChunk>> {
        self.ensure_connected()?;
        let collection = self.collection.read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(collection
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .map(StoredChunk::from))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.ensure_connected()?;
        let mut collection = self.collection.write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let Some(pos) = collection.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };

        let removed = collection.records.remove(pos);
        if let Err(e) = self.persist(&collection) {
            collection.records.insert(pos, removed);
            return Err(e);
        }
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_connected()?;
        let mut collection = self.collection.write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let fresh = Collection {
            name: self.collection_name.clone(),
            ..Default::default()
        };
        self.persist(&fresh)?;
        *collection = fresh;
        info!(collection = %self.collection_name, "Cleared collection");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.ensure_connected()?;
        let collection = self.collection.read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(collection.records.len())
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        self.ensure_connected()?;
        let collection = self.collection.read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(collection.dimension)
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
