//! Instrumented collaborators shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use studymate::agent::{AgentServices, AgentSettings, Dispatcher};
use studymate::db::{Db, SharedDb};
use studymate::embedder::mock::MockEmbedder;
use studymate::embedder::{Embedder, EmbedderError};
use studymate::error::{Error, Result};
use studymate::indexer::{Indexer, TextChunker};
use studymate::llm::LanguageModel;
use studymate::retrieval::Retriever;
use studymate::search::{Reference, ReferenceSearch};
use studymate::speech::{AudioStore, SpeechSynthesizer};
use studymate::vector::VectorIndex;
use studymate::vector::store::{IndexStore, MemoryIndexStore};

/// Mock embeddings with call counters and an optional per-batch delay.
pub struct CountingEmbedder {
    inner: MockEmbedder,
    delay: Duration,
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            inner: MockEmbedder::default(),
            delay,
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst) + self.single_calls.load(Ordering::SeqCst)
    }

    /// Most batch embeddings that were ever running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedderError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, EmbedderError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let vectors = self.inner.embed_batch(texts);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        vectors
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Embedder whose backend is always down.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbedderError> {
        Err(EmbedderError::RequestFailed("connection refused".to_string()))
    }

    fn embed_batch(&self, _texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, EmbedderError> {
        Err(EmbedderError::RequestFailed("connection refused".to_string()))
    }

    fn dimensions(&self) -> usize {
        384
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// In-memory index store with call counters.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryIndexStore,
    pub persists: AtomicUsize,
    pub loads: AtomicUsize,
    pub deletes: AtomicUsize,
}

#[async_trait]
impl IndexStore for CountingStore {
    async fn persist(&self, key: &str, index: &VectorIndex) -> Result<()> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.inner.persist(key, index).await
    }

    async fn load(&self, key: &str) -> Result<Option<VectorIndex>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Index store that can read and delete but never write.
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: MemoryIndexStore,
    pub persist_attempts: AtomicUsize,
}

#[async_trait]
impl IndexStore for ReadOnlyStore {
    async fn persist(&self, _key: &str, _index: &VectorIndex) -> Result<()> {
        self.persist_attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Storage("disk is full".to_string()))
    }

    async fn load(&self, key: &str) -> Result<Option<VectorIndex>> {
        self.inner.load(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    fn name(&self) -> &str {
        "read-only"
    }
}

/// Language model that answers with a fixed reply and records prompts.
pub struct FakeLlm {
    reply: String,
    pub calls: AtomicUsize,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "fake-llm"
    }
}

/// Language model that is always unavailable.
pub struct FailingLlm;

#[async_trait]
impl LanguageModel for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::provider("fake-llm", "service unavailable"))
    }

    fn name(&self) -> &str {
        "fake-llm"
    }
}

#[derive(Default)]
pub struct FakeTts {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for FakeTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ID3{}", text.len()).into_bytes())
    }

    fn name(&self) -> &str {
        "fake-tts"
    }
}

/// Search backend with canned results; `fail_videos` makes video search error.
#[derive(Default)]
pub struct FakeSearch {
    pub fail_videos: bool,
    pub calls: AtomicUsize,
}

fn reference(title: &str, link: &str) -> Reference {
    Reference {
        title: title.to_string(),
        link: link.to_string(),
        snippet: format!("About {title}"),
    }
}

#[async_trait]
impl ReferenceSearch for FakeSearch {
    async fn web_search(&self, query: &str, max_results: usize) -> Result<Vec<Reference>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..10)
            .map(|i| reference(&format!("{query} {i}"), &format!("https://example.com/{i}")))
            .take(max_results)
            .collect())
    }

    async fn video_search(&self, query: &str, max_results: usize) -> Result<Vec<Reference>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_videos {
            return Err(Error::provider("fake-search", "rate limited"));
        }
        Ok(vec![
            reference(query, "https://www.youtube.com/watch?v=1"),
            reference(query, "https://www.youtube.com/channel/not-a-video"),
            reference(query, "https://youtu.be/2"),
        ]
        .into_iter()
        .take(max_results)
        .collect())
    }

    fn name(&self) -> &str {
        "fake-search"
    }
}

/// A fully faked set of collaborators, keeping handles to the fakes.
pub struct Harness {
    pub db: SharedDb,
    pub embedder: Arc<CountingEmbedder>,
    pub store: Arc<CountingStore>,
    pub llm: Arc<FakeLlm>,
    pub tts: Arc<FakeTts>,
    pub search: Arc<FakeSearch>,
    pub static_dir: tempfile::TempDir,
    pub services: AgentServices,
}

impl Harness {
    pub fn new(llm_reply: &str) -> Self {
        Self::with_search(llm_reply, FakeSearch::default())
    }

    pub fn with_search(llm_reply: &str, search: FakeSearch) -> Self {
        let db = Db::open_in_memory().unwrap().into_shared();
        let embedder = Arc::new(CountingEmbedder::new());
        let store = Arc::new(CountingStore::default());
        let llm = Arc::new(FakeLlm::new(llm_reply));
        let tts = Arc::new(FakeTts::default());
        let search = Arc::new(search);
        let static_dir = tempfile::tempdir().unwrap();

        let indexer = Indexer::new(
            embedder.clone(),
            TextChunker::new(200, 40).unwrap(),
            Duration::from_secs(5),
        );
        let retriever = Arc::new(Retriever::new(indexer, store.clone()));

        let services = AgentServices {
            db: db.clone(),
            retriever,
            llm: llm.clone(),
            tts: tts.clone(),
            audio: AudioStore::new(static_dir.path()),
            search: search.clone(),
        };

        Self {
            db,
            embedder,
            store,
            llm,
            tts,
            search,
            static_dir,
            services,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.services.clone(), AgentSettings::default())
    }

    pub async fn chat_turns(&self) -> usize {
        let db = self.db.lock().await;
        db.get_history("alice", "doc-1").unwrap().len()
    }
}

pub const STUDY_TEXT: &str = "Photosynthesis is the process plants use to turn light into chemical energy. \
It happens inside chloroplasts, which contain the green pigment chlorophyll.\n\n\
Cellular respiration releases that energy again. Mitochondria break glucose down and produce ATP, \
the energy currency of the cell.\n\n\
Newton's first law says an object keeps its state of motion unless a net force acts on it. \
The second law relates force, mass and acceleration.";
