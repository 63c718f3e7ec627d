//! Qdrant vector store implementation

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfig;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder,
    PointId, PointStruct, PointsIdsList, RetrievedPoint, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use tracing::{debug, info};

use pagent_core::{ChunkRecord, Error, Metadata, Result, RetrievalHit, StoredChunk, VectorStore};

const TEXT_KEY: &str = "document";
const METADATA_KEY: &str = "metadata";
const SCROLL_PAGE: u32 = 256;

/// Vector store backed by a Qdrant collection.
///
/// The collection is created on the first `add`, sized to the first vector
/// and using cosine distance. Hits report `1 - score` so lower means nearer.
pub struct QdrantVectorStore {
    url: String,
    collection_name: String,
    client: Option<Qdrant>,
}

impl QdrantVectorStore {
    pub fn new(url: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            collection_name: collection_name.into(),
            client: None,
        }
    }

    fn client(&self) -> Result<&Qdrant> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::VectorStore("Vector store not connected".to_string()))
    }

    async fn exists(&self) -> Result<bool> {
        self.client()?
            .collection_exists(&self.collection_name)
            .await
            .map_err(store_error)
    }

    async fn create(&self, dimension: usize) -> Result<()> {
        self.client()?
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(store_error)?;
        info!(collection = %self.collection_name, dimension, "Created Qdrant collection");
        Ok(())
    }
}

fn store_error(e: qdrant_client::QdrantError) -> Error {
    Error::VectorStore(format!("Qdrant error: {}", e))
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => "unknown".to_string(),
    }
}

/// Split a payload back into chunk text and metadata
fn from_payload(mut payload: HashMap<String, Value>) -> (String, Metadata) {
    let text = payload
        .remove(TEXT_KEY)
        .and_then(|v| v.into_json().as_str().map(str::to_string))
        .unwrap_or_default();
    let metadata = match payload.remove(METADATA_KEY).map(Value::into_json) {
        Some(serde_json::Value::Object(map)) => map,
        _ => Metadata::new(),
    };
    (text, metadata)
}

fn to_stored(point: RetrievedPoint) -> StoredChunk {
    let id = point_id_string(point.id);
    let (text, metadata) = from_payload(point.payload);
    StoredChunk { id, text, metadata }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn connect(&mut self) -> Result<()> {
        let client = Qdrant::from_url(&self.url).build().map_err(store_error)?;
        client.health_check().await.map_err(store_error)?;
        self.client = Some(client);
        info!(url = %self.url, collection = %self.collection_name, "Connected to Qdrant");
        Ok(())
    }

    async fn add(&self, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let expected = match self.dimension().await? {
            Some(dimension) => dimension,
            None => records[0].embedding.len(),
        };
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }
        if !self.exists().await? {
            self.create(expected).await?;
        }

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                let mut payload = serde_json::Map::new();
                payload.insert(TEXT_KEY.to_string(), serde_json::Value::String(record.text));
                payload.insert(METADATA_KEY.to_string(), serde_json::Value::Object(record.metadata));
                PointStruct::new(record.id, record.embedding, Payload::from(payload))
            })
            .collect();
        let added = points.len();

        self.client()?
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(store_error)?;
        debug!(collection = %self.collection_name, added, "Stored records");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        match self.dimension().await? {
            None => return Ok(Vec::new()),
            Some(expected) if expected != vector.len() => {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }

        let response = self
            .client()?
            .search_points(
                SearchPointsBuilder::new(&self.collection_name, vector.to_vec(), k as u64).with_payload(true),
            )
            .await
            .map_err(store_error)?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let id = point_id_string(point.id);
                let (text, metadata) = from_payload(point.payload);
                RetrievalHit {
                    id,
                    text,
                    metadata,
                    distance: 1.0 - point.score,
                }
            })
            .collect())
    }

    async fn list(&self) -> Result<Vec<StoredChunk>> {
        if !self.exists().await? {
            return Ok(Vec::new());
        }

        let mut chunks = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut request = ScrollPointsBuilder::new(&self.collection_name)
                .limit(SCROLL_PAGE)
                .with_payload(true);
            if let Some(next) = offset.take() {
                request = request.offset(next);
            }

            let page = self.client()?.scroll(request).await.map_err(store_error)?;
            chunks.extend(page.result.into_iter().map(to_stored));
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(chunks)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredChunk>> {
        if !self.exists().await? {
            return Ok(None);
        }
        let response = self
            .client()?
            .get_points(
                GetPointsBuilder::new(&self.collection_name, vec![PointId::from(id.to_string())])
                    .with_payload(true),
            )
            .await
            .map_err(store_error)?;
        Ok(response.result.into_iter().next().map(to_stored))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        if self.get(id).await?.is_none() {
            return Ok(false);
        }
        self.client()?
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(PointsIdsList {
                        ids: vec![PointId::from(id.to_string())],
                    })
                    .wait(true),
            )
            .await
            .map_err(store_error)?;
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        if self.exists().await? {
            self.client()?
                .delete_collection(&self.collection_name)
                .await
                .map_err(store_error)?;
        }
        info!(collection = %self.collection_name, "Cleared collection");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        if !self.exists().await? {
            return Ok(0);
        }
        let response = self
            .client()?
            .count(CountPointsBuilder::new(&self.collection_name).exact(true))
            .await
            .map_err(store_error)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        if !self.exists().await? {
            return Ok(None);
        }
        let info = self
            .client()?
            .collection_info(&self.collection_name)
            .await
            .map_err(store_error)?;

        let size = info
            .result
            .and_then(|i| i.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|config| match config {
                VectorsConfig::Params(params) => Some(params.size as usize),
                _ => None,
            });
        Ok(size)
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_id_string() {
        let uuid = "6f1c0a4e-3a57-4f8e-9b38-1d2b5c1e7a90".to_string();
        assert_eq!(point_id_string(Some(PointId::from(uuid.clone()))), uuid);
        assert_eq!(point_id_string(Some(PointId::from(42u64))), "42");
        assert_eq!(point_id_string(None), "unknown");
    }

    #[test]
    fn test_payload_round_trip() {
        let mut map = serde_json::Map::new();
        map.insert(TEXT_KEY.into(), json!("chunk text"));
        map.insert(METADATA_KEY.into(), json!({"filename": "a.txt", "chunk_index": 3}));
        let payload: HashMap<String, Value> = Payload::from(map).into();

        let (text, metadata) = from_payload(payload);
        assert_eq!(text, "chunk text");
        assert_eq!(metadata["filename"], json!("a.txt"));
        assert_eq!(metadata["chunk_index"], json!(3));
    }

    #[tokio::test]
    async fn test_unconnected_store() {
        let store = QdrantVectorStore::new("http://localhost:6334", "private_agent");
        assert!(!store.is_connected());
        assert_eq!(store.collection_name(), "private_agent");
        assert!(matches!(store.count().await.unwrap_err(), Error::VectorStore(_)));
    }
}
