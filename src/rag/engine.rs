//! Query engine: retrieve, then synthesize an answer.

use super::context::format_context_for_prompt;
use super::{ContextBuilder, ContextChunk};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{PdfragError, Result};
use crate::llm::{ChatMessage, ChatModel};
use crate::vector_store::VectorStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answer returned when retrieval finds nothing.
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Answers questions from the indexed documents.
pub struct QueryEngine {
    model: Arc<dyn ChatModel>,
    context_builder: ContextBuilder,
    prompts: Prompts,
}

impl QueryEngine {
    /// Create a new query engine.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        top_k: usize,
    ) -> Self {
        Self {
            model,
            context_builder: ContextBuilder::new(vector_store, embedder).with_top_k(top_k),
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Ignore retrieved chunks scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.context_builder = self.context_builder.with_min_score(min_score);
        self
    }

    /// Answer a single question.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn query(&self, question: &str) -> Result<QueryResponse> {
        info!("Querying documents: {}", question);

        let sources = self.context_builder.build(question).await?;

        if sources.is_empty() {
            debug!("No context retrieved");
            return Ok(QueryResponse {
                answer: EMPTY_RESPONSE.to_string(),
                sources,
            });
        }

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(&sources));
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.query.text_qa, &vars);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.query.system, &HashMap::new());

        let reply = self
            .model
            .converse(&system, &[ChatMessage::user(prompt)], &[])
            .await?;

        let answer = reply.message.text();
        if answer.trim().is_empty() {
            return Err(PdfragError::Rag("Empty response from model".to_string()));
        }

        debug!("Generated answer from {} sources", sources.len());
        Ok(QueryResponse {
            answer: answer.trim().to_string(),
            sources,
        })
    }
}

/// A query answer with the chunks it was built from.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer.
    pub sources: Vec<ContextChunk>,
}


#[cfg(test)]
mod tests {
    use super::testing::KeywordEmbedder;
    use super::*;
    use crate::llm::testing::{text_reply, ScriptedModel};
    use crate::vector_store::{test_node, MemoryVectorStore};

    async fn store_with_docs() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = KeywordEmbedder;
        let texts = [
            ("finance.pdf", "Q3 revenue grew 12 percent."),
            ("hr.pdf", "The holiday policy grants 25 days."),
            ("cars.pdf", "The engine and battery were replaced."),
        ];
        let mut nodes = Vec::new();
        for (file, text) in texts {
            nodes.push(test_node(file, 1, text, embedder.embed(text).await.unwrap()));
        }
        store.upsert_batch(&nodes).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_query_uses_retrieved_context() {
        let store = store_with_docs().await;
        let model = Arc::new(ScriptedModel::new(vec![text_reply(" 25 days. ")]));
        let engine = QueryEngine::new(store, Arc::new(KeywordEmbedder), model.clone(), 1);

        let response = engine.query("What is the holiday policy?").await.unwrap();

        assert_eq!(response.answer, "25 days.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].file_name, "hr.pdf");

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (system, messages, tools) = &calls[0];
        assert!(system.contains("Q&A system"));
        assert!(tools.is_empty());
        let prompt = messages[0].text();
        assert!(prompt.contains("The holiday policy grants 25 days."));
        assert!(prompt.contains("Query: What is the holiday policy?"));
        assert!(!prompt.contains("revenue"));
    }

    #[tokio::test]
    async fn test_empty_store_skips_model() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let engine = QueryEngine::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(KeywordEmbedder),
            model.clone(),
            2,
        );

        let response = engine.query("anything").await.unwrap();
        assert_eq!(response.answer, EMPTY_RESPONSE);
        assert!(response.sources.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_answer_is_an_error() {
        let store = store_with_docs().await;
        let model = Arc::new(ScriptedModel::new(vec![text_reply("   ")]));
        let engine = QueryEngine::new(store, Arc::new(KeywordEmbedder), model, 2);

        let err = engine.query("revenue?").await.unwrap_err();
        assert!(matches!(err, PdfragError::Rag(_)));
    }
}
