//! Pipeline orchestrator for pdfrag.
//!
//! Coordinates the workflow from loading PDFs to answering a question:
//! load documents, connect the store, index, build tools and agent, chat.

use crate::agent::{Agent, AgentResponse, ToolContext};
use crate::bedrock::create_client;
use crate::chunking::{ChunkingConfig, SentenceSplitter};
use crate::config::{Prompts, Settings, VectorStoreProvider};
use crate::document::{DirectoryLoader, SourceDocument};
use crate::embedding::{BedrockEmbedder, Embedder};
use crate::error::{PdfragError, Result};
use crate::llm::{BedrockChatModel, ChatModel};
use crate::rag::QueryEngine;
use crate::vector_store::{ElasticsearchStore, MemoryVectorStore, Node, VectorStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// The main orchestrator for the pdfrag pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    chat_model: Arc<dyn ChatModel>,
    vector_store: Arc<dyn VectorStore>,
}

impl Orchestrator {
    /// Create an orchestrator wired to Bedrock and the configured vector store.
    pub async fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client = create_client(&settings.bedrock).await;
        let embedder = Arc::new(BedrockEmbedder::new(client.clone(), &settings.bedrock)?);
        let chat_model = Arc::new(BedrockChatModel::new(client, &settings.bedrock));

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider {
            VectorStoreProvider::Elasticsearch => {
                info!(
                    "Using Elasticsearch index '{}' at {}",
                    settings.elastic.index_name, settings.elastic.host
                );
                Arc::new(ElasticsearchStore::new(&settings.elastic)?)
            }
            VectorStoreProvider::Memory => {
                info!("Using in-memory vector store");
                Arc::new(MemoryVectorStore::new())
            }
        };

        Ok(Self::with_components(
            settings,
            prompts,
            embedder,
            chat_model,
            vector_store,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        chat_model: Arc<dyn ChatModel>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            settings,
            prompts,
            embedder,
            chat_model,
            vector_store,
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Load documents from a folder. Parsing runs on the blocking pool.
    #[instrument(skip(self))]
    pub async fn load_documents(&self, dir: PathBuf, recursive: bool) -> Result<Vec<SourceDocument>> {
        let loader = DirectoryLoader::new(dir)
            .with_extensions(&self.settings.documents.extensions)
            .recursive(recursive);

        tokio::task::spawn_blocking(move || loader.load())
            .await
            .map_err(|e| PdfragError::Document(format!("Loader task failed: {}", e)))?
    }

    /// Chunk, embed and store documents. Existing chunks of a re-indexed file are replaced.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn index_documents(
        &self,
        documents: Vec<SourceDocument>,
        skip_existing: bool,
    ) -> Result<IndexReport> {
        let mut report = IndexReport {
            pages_loaded: documents.len(),
            ..IndexReport::default()
        };

        // Group pages by file path, keeping load order.
        let mut files: Vec<String> = Vec::new();
        let mut pages_by_file: HashMap<String, Vec<SourceDocument>> = HashMap::new();
        for doc in documents {
            let key = doc.file_path.display().to_string();
            if !pages_by_file.contains_key(&key) {
                files.push(key.clone());
            }
            pages_by_file.entry(key).or_default().push(doc);
        }
        report.files_loaded = files.len();

        self.vector_store
            .ensure_index(self.embedder.dimensions())
            .await?;

        let splitter = SentenceSplitter::new(ChunkingConfig::from(&self.settings.chunking))?;

        let mut to_index = Vec::new();
        for file in &files {
            if skip_existing && self.vector_store.is_source_indexed(file).await? {
                info!("{} is already indexed, skipping", file);
                report.files_skipped += 1;
                continue;
            }
            if let Some(pages) = pages_by_file.remove(file) {
                to_index.extend(pages);
            }
        }

        let chunks = splitter.split_documents(&to_index);
        if chunks.is_empty() {
            return Ok(report);
        }
        info!("Split {} page(s) into {} chunk(s)", to_index.len(), chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let nodes: Vec<Node> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Node::new(chunk, embedding))
            .collect();

        report.chunks_indexed = self.vector_store.upsert_batch(&nodes).await?;
        info!("Indexed {} chunk(s)", report.chunks_indexed);

        // Stale chunks go only after the new ones are stored, so a failed
        // upsert leaves the previous version searchable.
        for file in &files {
            let keep: Vec<Uuid> = nodes
                .iter()
                .filter(|n| &n.metadata.file_path == file)
                .map(|n| n.id)
                .collect();
            if keep.is_empty() {
                continue;
            }
            let removed = self.vector_store.delete_by_source(file, &keep).await?;
            if removed > 0 {
                info!("Replaced {} stale chunk(s) of {}", removed, file);
            }
        }

        Ok(report)
    }

    /// Build the query engine over the store.
    pub fn query_engine(&self) -> QueryEngine {
        QueryEngine::new(
            self.vector_store.clone(),
            self.embedder.clone(),
            self.chat_model.clone(),
            self.settings.retrieval.similarity_top_k,
        )
        .with_min_score(self.settings.retrieval.min_score)
        .with_prompts(self.prompts.clone())
    }

    /// Build the agent with the arithmetic tools and the retrieval tool.
    pub fn build_agent(&self) -> Agent {
        let tools = ToolContext::new(Arc::new(self.query_engine()))
            .with_query_tool_description(&self.prompts.agent.query_tool_description);

        let system_prompt = self
            .prompts
            .render_with_custom(&self.prompts.agent.system, &HashMap::new());

        Agent::new(tools, self.chat_model.clone())
            .with_system_prompt(&system_prompt)
            .with_max_iterations(self.settings.agent.max_iterations)
    }

    /// Run the whole workflow once: load, index, then answer one question.
    #[instrument(skip(self))]
    pub async fn run(&self, dir: PathBuf, recursive: bool, question: &str) -> Result<RunResult> {
        let documents = self.load_documents(dir, recursive).await?;
        let report = self.index_documents(documents, false).await?;
        let response = self.build_agent().chat(question).await?;

        Ok(RunResult { report, response })
    }
}

/// Result of an indexing pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexReport {
    /// Distinct files loaded.
    pub files_loaded: usize,
    /// Page documents loaded.
    pub pages_loaded: usize,
    /// Files skipped because they were already indexed.
    pub files_skipped: usize,
    /// Chunks written to the store.
    pub chunks_indexed: usize,
}

/// Result of a full run.
#[derive(Debug)]
pub struct RunResult {
    pub report: IndexReport,
    pub response: AgentResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{text_reply, tool_reply, ScriptedModel};
    use crate::rag::engine_testing::KeywordEmbedder;
    use crate::vector_store::{IndexedSource, SearchResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose writes can be switched off.
    struct FlakyStore {
        inner: MemoryVectorStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn ensure_index(&self, dimensions: usize) -> Result<()> {
            self.inner.ensure_index(dimensions).await
        }

        async fn upsert_batch(&self, nodes: &[Node]) -> Result<usize> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PdfragError::VectorStore("bulk rejected".to_string()));
            }
            self.inner.upsert_batch(nodes).await
        }

        async fn search_with_threshold(
            &self,
            query_embedding: &[f32],
            limit: usize,
            min_score: f32,
        ) -> Result<Vec<SearchResult>> {
            self.inner
                .search_with_threshold(query_embedding, limit, min_score)
                .await
        }

        async fn delete_by_source(&self, file_path: &str, keep: &[Uuid]) -> Result<usize> {
            self.inner.delete_by_source(file_path, keep).await
        }

        async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
            self.inner.list_sources().await
        }

        async fn is_source_indexed(&self, file_path: &str) -> Result<bool> {
            self.inner.is_source_indexed(file_path).await
        }

        async fn document_count(&self) -> Result<usize> {
            self.inner.document_count().await
        }
    }

    fn page(file: &str, page: u32, text: &str) -> SourceDocument {
        page_in("data", file, page, text)
    }

    fn page_in(dir: &str, file: &str, page: u32, text: &str) -> SourceDocument {
        SourceDocument {
            file_name: file.to_string(),
            file_path: PathBuf::from(dir).join(file),
            page_label: page,
            total_pages: 2,
            text: text.to_string(),
        }
    }

    fn orchestrator(model: Arc<ScriptedModel>) -> (Orchestrator, Arc<MemoryVectorStore>) {
        let store = Arc::new(MemoryVectorStore::new());
        let mut settings = Settings::default();
        settings.chunking.chunk_size = 8;
        settings.chunking.chunk_overlap = 0;
        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(KeywordEmbedder),
            model,
            store.clone(),
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_index_documents() {
        let (orchestrator, store) = orchestrator(Arc::new(ScriptedModel::new(vec![])));

        let report = orchestrator
            .index_documents(
                vec![
                    page("hr.pdf", 1, "The holiday policy grants 25 days. Carry-over is capped at five days."),
                    page("hr.pdf", 2, "Sick leave is separate."),
                    page("finance.pdf", 1, "Revenue grew."),
                ],
                false,
            )
            .await
            .unwrap();

        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.pages_loaded, 3);
        assert_eq!(report.files_skipped, 0);
        assert_eq!(report.chunks_indexed, 4);
        assert_eq!(store.document_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_reindex_replaces_and_skip_existing() {
        let (orchestrator, store) = orchestrator(Arc::new(ScriptedModel::new(vec![])));

        orchestrator
            .index_documents(vec![page("hr.pdf", 1, "Old holiday text.")], false)
            .await
            .unwrap();
        orchestrator
            .index_documents(vec![page("hr.pdf", 1, "New holiday policy text.")], false)
            .await
            .unwrap();

        assert_eq!(store.document_count().await.unwrap(), 1);
        let hits = store.search(&[0.0, 1.0, 1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits[0].node.content, "New holiday policy text.");

        let report = orchestrator
            .index_documents(
                vec![page("hr.pdf", 1, "Ignored."), page("cars.pdf", 1, "Battery swap.")],
                true,
            )
            .await
            .unwrap();
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.chunks_indexed, 1);
        assert_eq!(store.document_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_same_file_name_in_two_folders() {
        let (orchestrator, store) = orchestrator(Arc::new(ScriptedModel::new(vec![])));

        orchestrator
            .index_documents(vec![page_in("data/a", "report.pdf", 1, "Revenue grew.")], false)
            .await
            .unwrap();
        let report = orchestrator
            .index_documents(vec![page_in("data/b", "report.pdf", 1, "Battery swap.")], true)
            .await
            .unwrap();

        assert_eq!(report.files_skipped, 0);
        assert_eq!(store.document_count().await.unwrap(), 2);

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.file_name == "report.pdf"));
    }

    #[tokio::test]
    async fn test_failed_reindex_keeps_previous_chunks() {
        let store = Arc::new(FlakyStore {
            inner: MemoryVectorStore::new(),
            fail_writes: AtomicBool::new(false),
        });
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(KeywordEmbedder),
            Arc::new(ScriptedModel::new(vec![])),
            store.clone(),
        );

        orchestrator
            .index_documents(vec![page("hr.pdf", 1, "Old holiday text.")], false)
            .await
            .unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = orchestrator
            .index_documents(vec![page("hr.pdf", 1, "New holiday text.")], false)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfragError::VectorStore(_)));

        let hits = store.search(&[0.0, 1.0, 0.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.content, "Old holiday text.");
    }

    #[tokio::test]
    async fn test_agent_answers_from_index() {
        // Agent asks the retrieval tool, the engine calls the model once, then the agent answers.
        let model = Arc::new(ScriptedModel::new(vec![
            tool_reply(vec![("t1", "query_documents", json!({"input": "How many holiday days?"}))]),
            text_reply("25 days"),
            text_reply("Employees get 25 holiday days."),
        ]));
        let (orchestrator, _) = orchestrator(model.clone());

        orchestrator
            .index_documents(vec![page("hr.pdf", 1, "The holiday policy grants 25 days.")], false)
            .await
            .unwrap();

        let response = orchestrator
            .build_agent()
            .chat("How many holiday days do I get?")
            .await
            .unwrap();

        assert_eq!(response.content, "Employees get 25 holiday days.");
        assert_eq!(response.tool_calls[0].result, "25 days");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_directory() {
        let (orchestrator, _) = orchestrator(Arc::new(ScriptedModel::new(vec![])));
        let err = orchestrator
            .run(PathBuf::from("/no/such/dir"), false, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, PdfragError::NotFound(_)));
    }
}
