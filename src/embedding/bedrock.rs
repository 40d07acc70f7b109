//! Bedrock embeddings via `InvokeModel`.

use super::Embedder;
use crate::config::BedrockSettings;
use crate::error::{PdfragError, Result};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

/// Cohere accepts at most this many texts per request.
const COHERE_BATCH_SIZE: usize = 96;

/// Request/response shape of an embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingFamily {
    /// `amazon.titan-embed-text-v2`: one text, configurable dimensions.
    TitanV2,
    /// `amazon.titan-embed-text-v1` and `amazon.titan-embed-g1-text-02`: one text.
    TitanV1,
    /// `cohere.embed-*`: batched texts with an input type.
    Cohere,
}

impl EmbeddingFamily {
    /// Detect the family from a model ID, inference profile or ARN.
    pub fn from_model_id(model_id: &str) -> Result<Self> {
        let id = model_id.to_lowercase();
        if id.contains("amazon.titan-embed-text-v2") {
            Ok(Self::TitanV2)
        } else if id.contains("amazon.titan-embed") {
            Ok(Self::TitanV1)
        } else if id.contains("cohere.embed") {
            Ok(Self::Cohere)
        } else {
            Err(PdfragError::Config(format!(
                "Unsupported embedding model: {}",
                model_id
            )))
        }
    }
}

/// Titan v2 accepts only these output sizes.
pub const TITAN_V2_DIMENSIONS: [u32; 3] = [256, 512, 1024];

/// Vector size a model produces. Only Titan v2 honours the configured value.
pub fn embedding_dimensions(model_id: &str, configured: u32) -> Result<usize> {
    match EmbeddingFamily::from_model_id(model_id)? {
        EmbeddingFamily::TitanV2 => {
            if TITAN_V2_DIMENSIONS.contains(&configured) {
                Ok(configured as usize)
            } else {
                Err(PdfragError::Config(format!(
                    "embedding_dimensions must be 256, 512 or 1024 for {}, got {}",
                    model_id, configured
                )))
            }
        }
        EmbeddingFamily::TitanV1 => Ok(1536),
        EmbeddingFamily::Cohere if model_id.to_lowercase().contains("light") => Ok(384),
        EmbeddingFamily::Cohere => Ok(1024),
    }
}

/// Whether text is being indexed or used to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Document,
    Query,
}

impl InputType {
    fn as_cohere(self) -> &'static str {
        match self {
            InputType::Document => "search_document",
            InputType::Query => "search_query",
        }
    }
}

#[derive(Deserialize)]
struct TitanResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct CohereResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Build the JSON request bodies for a batch of texts.
pub fn request_bodies(
    family: EmbeddingFamily,
    texts: &[String],
    input_type: InputType,
    dimensions: usize,
) -> Vec<serde_json::Value> {
    match family {
        EmbeddingFamily::TitanV2 => texts
            .iter()
            .map(|t| json!({"inputText": t, "dimensions": dimensions, "normalize": true}))
            .collect(),
        EmbeddingFamily::TitanV1 => texts.iter().map(|t| json!({"inputText": t})).collect(),
        EmbeddingFamily::Cohere => texts
            .chunks(COHERE_BATCH_SIZE)
            .map(|chunk| json!({"texts": chunk, "input_type": input_type.as_cohere()}))
            .collect(),
    }
}

/// Parse a model response body into one or more embeddings.
pub fn parse_response(family: EmbeddingFamily, body: &[u8]) -> Result<Vec<Vec<f32>>> {
    match family {
        EmbeddingFamily::TitanV2 | EmbeddingFamily::TitanV1 => {
            let response: TitanResponse = serde_json::from_slice(body)
                .map_err(|e| PdfragError::Embedding(format!("Invalid Titan response: {}", e)))?;
            Ok(vec![response.embedding])
        }
        EmbeddingFamily::Cohere => {
            let response: CohereResponse = serde_json::from_slice(body)
                .map_err(|e| PdfragError::Embedding(format!("Invalid Cohere response: {}", e)))?;
            Ok(response.embeddings)
        }
    }
}

/// Bedrock-based embedder.
pub struct BedrockEmbedder {
    client: Client,
    model: String,
    family: EmbeddingFamily,
    dimensions: usize,
    max_concurrent: usize,
}

impl BedrockEmbedder {
    /// Create an embedder from Bedrock settings.
    pub fn new(client: Client, settings: &BedrockSettings) -> Result<Self> {
        Ok(Self {
            client,
            model: settings.embedding_model.clone(),
            family: EmbeddingFamily::from_model_id(&settings.embedding_model)?,
            dimensions: embedding_dimensions(&settings.embedding_model, settings.embedding_dimensions)?,
            max_concurrent: settings.max_concurrent_requests.max(1),
        })
    }

    async fn invoke(&self, body: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .invoke_model()
            .model_id(&self.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(serde_json::to_vec(&body)?))
            .send()
            .await
            .map_err(|e| {
                PdfragError::Bedrock(format!("Embedding call failed: {}", DisplayErrorContext(e)))
            })?;

        parse_response(self.family, response.body().as_ref())
    }

    async fn embed_all(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let bodies = request_bodies(self.family, texts, input_type, self.dimensions);
        debug!("Issuing {} embedding request(s)", bodies.len());

        // `buffered` keeps responses in request order.
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(bodies)
            .map(|body| self.invoke(body))
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        if embeddings.len() != texts.len() {
            return Err(PdfragError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for BedrockEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_all(&[text.to_string()], InputType::Document)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PdfragError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, query))]
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_all(&[query.to_string()], InputType::Query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PdfragError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embed_all(texts, InputType::Document).await?;
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
