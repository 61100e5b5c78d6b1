use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, ChunkMetadata, DocumentChunk, DomainError, Embedding, SearchResult,
};

/// Index backed by one Qdrant collection per running session.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorStore {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        store.ensure_collection().await?;
        tracing::info!(collection = %store.collection, "qdrant collection ready");

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(
                            self.dimension as u64,
                            Distance::Cosine,
                        )),
                )
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;
        }

        Ok(())
    }

    // Qdrant takes UUID point ids as strings.
    fn point_id(id: Uuid) -> PointId {
        id.to_string().into()
    }

    fn to_point(chunk: &DocumentChunk, embedding: &Embedding) -> Result<PointStruct, DomainError> {
        let payload: Payload = chunk_payload(chunk)
            .try_into()
            .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            Self::point_id(chunk.id),
            embedding.as_slice().to_vec(),
            payload,
        ))
    }
}

fn chunk_payload(chunk: &DocumentChunk) -> serde_json::Value {
    serde_json::json!({
        "chunk_id": chunk.id.to_string(),
        "document_id": chunk.document_id.to_string(),
        "content": chunk.content,
        "chunk_index": chunk.chunk_index,
        "page": chunk.metadata.page,
        "start_offset": chunk.metadata.start_offset,
        "end_offset": chunk.metadata.end_offset,
        "overlap": chunk.metadata.overlap,
    })
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, chunk: &DocumentChunk, embedding: &Embedding) -> Result<(), DomainError> {
        self.upsert_batch(std::slice::from_ref(chunk), std::slice::from_ref(embedding))
            .await
    }

    async fn upsert_batch(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError> {
        if chunks.len() != embeddings.len() {
            return Err(DomainError::internal(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Self::to_point(chunk, embedding))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(())
    }

    async fn search(&self, query: &Embedding, top_k: usize) -> Result<Vec<SearchResult>, DomainError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let search_results: Vec<SearchResult> = results
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload;

                let chunk_id: Uuid = payload
                    .get("chunk_id")?
                    .as_str()?
                    .parse()
                    .ok()?;
                let document_id: Uuid = payload
                    .get("document_id")?
                    .as_str()?
                    .parse()
                    .ok()?;
                let content = payload.get("content")?.as_str()?.to_string();
                let chunk_index = payload.get("chunk_index")?.as_integer()? as usize;
                let int = |key: &str| payload.get(key).and_then(|v| v.as_integer());

                let metadata = ChunkMetadata {
                    page: int("page").map(|p| p as usize),
                    start_offset: int("start_offset").unwrap_or_default() as usize,
                    end_offset: int("end_offset").unwrap_or_default() as usize,
                    overlap: int("overlap").unwrap_or_default() as usize,
                };

                Some(SearchResult {
                    chunk: DocumentChunk {
                        id: chunk_id,
                        document_id,
                        content,
                        chunk_index,
                        metadata,
                    },
                    score: point.score,
                })
            })
            .collect();

        Ok(search_results)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;
        self.ensure_collection().await
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or_default())
    }

    async fn teardown(&self) -> Result<(), DomainError> {
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;
        tracing::info!(collection = %self.collection, "qdrant collection dropped");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_chunk_metadata() {
        let chunk = DocumentChunk::new(Uuid::new_v4(), "Paris", 3).with_metadata(ChunkMetadata {
            page: Some(2),
            start_offset: 10,
            end_offset: 15,
            overlap: 200,
        });

        let payload = chunk_payload(&chunk);
        assert_eq!(payload["chunk_index"], 3);
        assert_eq!(payload["page"], 2);
        assert_eq!(payload["end_offset"], 15);
        assert_eq!(payload["content"], "Paris");
    }

    #[test]
    fn test_point_id_keeps_the_whole_uuid() {
        use qdrant_client::qdrant::point_id::PointIdOptions;

        let a = Uuid::parse_str("0123456789abcdef0000000000000001").unwrap();
        let b = Uuid::parse_str("0123456789abcdef0000000000000002").unwrap();

        assert_ne!(QdrantVectorStore::point_id(a), QdrantVectorStore::point_id(b));
        assert_eq!(
            QdrantVectorStore::point_id(a).point_id_options,
            Some(PointIdOptions::Uuid(a.to_string()))
        );
    }
}
