use super::*;
use crate::chat::ChatMessage;
use crate::index::{CatalogDocument, SearchHit};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingProvider for CountingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0.1, 0.2, 0.3])
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
    }

    fn dimensions(&self) -> usize {
        3
    }
}

struct StubIndex {
    hits: Vec<SearchHit>,
    queried_k: Mutex<Option<usize>>,
}

impl StubIndex {
    fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            queried_k: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl VectorIndex for StubIndex {
    async fn upsert(&self, _documents: Vec<CatalogDocument>) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        *self.queried_k.lock().expect("queried_k lock poisoned") = Some(k);
        Ok(self.hits.clone())
    }
}

struct RecordingChat {
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    reply: String,
}

impl RecordingChat {
    fn replying(reply: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        }
    }
}

impl ChatProvider for RecordingChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

fn hit(id: &str, content: &str) -> SearchHit {
    SearchHit {
        id: id.to_string(),
        title: format!("Title {}", id),
        content: content.to_string(),
        score: 0.9,
    }
}

#[tokio::test]
async fn empty_question_makes_zero_provider_calls() {
    let embedder = Arc::new(CountingEmbedder::new());
    let chat = Arc::new(RecordingChat::replying("unused"));
    let answerer = Answerer::new(
        Arc::clone(&embedder) as _,
        Arc::new(StubIndex::with_hits(Vec::new())),
        Arc::clone(&chat) as _,
        3,
    );

    let result = answerer.answer("").await;
    assert!(matches!(result, Err(RagError::InvalidInput(_))));

    let result = answerer.answer("   \n").await;
    assert!(matches!(result, Err(RagError::InvalidInput(_))));

    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answer_returns_the_completion_verbatim() {
    let chat = Arc::new(RecordingChat::replying(
        "The Trail Tent (catalog 42) sleeps two. ⛺",
    ));
    let answerer = Answerer::new(
        Arc::new(CountingEmbedder::new()),
        Arc::new(StubIndex::with_hits(vec![hit("42", "A 2-person tent")])),
        Arc::clone(&chat) as _,
        3,
    );

    let answer = answerer
        .answer("lightweight tent")
        .await
        .expect("should answer");
    assert_eq!(answer, "The Trail Tent (catalog 42) sleeps two. ⛺");
}

#[tokio::test]
async fn configured_k_reaches_the_index() {
    let index = Arc::new(StubIndex::with_hits(Vec::new()));
    let answerer = Answerer::new(
        Arc::new(CountingEmbedder::new()),
        Arc::clone(&index) as _,
        Arc::new(RecordingChat::replying("ok")),
        7,
    );

    answerer.answer("anything").await.expect("should answer");

    assert_eq!(
        *index.queried_k.lock().expect("queried_k lock poisoned"),
        Some(7)
    );
}

#[tokio::test]
async fn prompt_carries_hits_in_retrieval_order() {
    let chat = Arc::new(RecordingChat::replying("ok"));
    let answerer = Answerer::new(
        Arc::new(CountingEmbedder::new()),
        Arc::new(StubIndex::with_hits(vec![
            hit("1", "first product"),
            hit("2", "second product"),
        ])),
        Arc::clone(&chat) as _,
        3,
    );

    answerer.answer("question").await.expect("should answer");

    let requests = chat.requests.lock().expect("requests lock poisoned");
    assert_eq!(requests.len(), 1);
    let system = &requests[0][0].content;
    let first = system.find("first product").expect("first hit in prompt");
    let second = system.find("second product").expect("second hit in prompt");
    assert!(first < second);

    assert_eq!(requests[0][1].content, "question");
}

#[tokio::test]
async fn zero_hits_still_produce_an_answer() {
    let chat = Arc::new(RecordingChat::replying(
        "I don't have enough information to answer that.",
    ));
    let answerer = Answerer::new(
        Arc::new(CountingEmbedder::new()),
        Arc::new(StubIndex::with_hits(Vec::new())),
        Arc::clone(&chat) as _,
        3,
    );

    let answer = answerer
        .answer("anything at all")
        .await
        .expect("zero hits must not error");
    assert_eq!(answer, "I don't have enough information to answer that.");
    assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
}
