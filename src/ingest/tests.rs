use super::*;
use crate::index::SearchHit;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct StubEmbedder {
    dimensions: usize,
    batch_calls: AtomicUsize,
}

impl StubEmbedder {
    fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            batch_calls: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![text.len() as f32; self.dimensions])
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32; self.dimensions])
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::ProviderUnavailable("stub outage".to_string()))
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::ProviderUnavailable("stub outage".to_string()))
    }

    fn dimensions(&self) -> usize {
        3
    }
}

#[derive(Default)]
struct RecordingIndex {
    upserts: Mutex<Vec<Vec<CatalogDocument>>>,
}

#[async_trait::async_trait]
impl VectorIndex for RecordingIndex {
    async fn upsert(&self, documents: Vec<CatalogDocument>) -> Result<()> {
        self.upserts
            .lock()
            .expect("upserts lock poisoned")
            .push(documents);
        Ok(())
    }

    async fn query(&self, _vector: &[f32], _k: usize) -> Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

fn product(id: &str, body: Option<&str>) -> ContentRecord {
    ContentRecord {
        id: id.to_string(),
        title: format!("Product {}", id),
        body: body.map(str::to_string),
        content_type: "product".to_string(),
    }
}

fn blog_post(id: &str) -> ContentRecord {
    ContentRecord {
        id: id.to_string(),
        title: format!("Post {}", id),
        body: Some("irrelevant".to_string()),
        content_type: "blogPost".to_string(),
    }
}

fn create_ingestor(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<RecordingIndex>,
) -> Ingestor {
    Ingestor::new(embedder, index, &IngestConfig::default())
}

#[tokio::test]
async fn eligible_records_are_upserted_in_one_batch() {
    let embedder = Arc::new(StubEmbedder::new(3));
    let index = Arc::new(RecordingIndex::default());
    let ingestor = create_ingestor(Arc::clone(&embedder) as _, Arc::clone(&index));

    let records = vec![
        product("1", Some("A tent")),
        product("2", Some("A backpack")),
        product("3", Some("A stove")),
    ];
    let report = ingestor.ingest(&records).await.expect("ingest succeeds");

    assert_eq!(report.succeeded, 3);
    assert_eq!(report.skipped, 0);

    let upserts = index.upserts.lock().expect("upserts lock poisoned");
    assert_eq!(upserts.len(), 1, "one ingest call makes one upsert call");
    assert_eq!(upserts[0].len(), 3);
    assert_eq!(upserts[0][0].id, "1");
    assert_eq!(upserts[0][0].content, "A tent");
    assert_eq!(upserts[0][0].vector.len(), 3);

    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ineligible_content_types_are_skipped() {
    let index = Arc::new(RecordingIndex::default());
    let ingestor = create_ingestor(Arc::new(StubEmbedder::new(3)), Arc::clone(&index));

    let records = vec![blog_post("1"), blog_post("2")];
    let report = ingestor.ingest(&records).await.expect("ingest succeeds");

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.skipped, records.len());

    let upserts = index.upserts.lock().expect("upserts lock poisoned");
    assert!(upserts.is_empty(), "all-skipped batch must not upsert");
}

#[tokio::test]
async fn content_type_matching_is_case_insensitive() {
    let index = Arc::new(RecordingIndex::default());
    let ingestor = create_ingestor(Arc::new(StubEmbedder::new(3)), Arc::clone(&index));

    let mut record = product("1", Some("A tent"));
    record.content_type = "Product".to_string();

    let report = ingestor.ingest(&[record]).await.expect("ingest succeeds");
    assert_eq!(report.succeeded, 1);
}

#[tokio::test]
async fn missing_body_skips_the_record_not_the_batch() {
    let index = Arc::new(RecordingIndex::default());
    let ingestor = create_ingestor(Arc::new(StubEmbedder::new(3)), Arc::clone(&index));

    let records = vec![
        product("1", Some("A tent")),
        product("2", None),
        product("3", Some("  ")),
        product("4", Some("A stove")),
    ];
    let report = ingestor.ingest(&records).await.expect("ingest succeeds");

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 2);

    let upserts = index.upserts.lock().expect("upserts lock poisoned");
    assert_eq!(upserts.len(), 1);
    let ids: Vec<&str> = upserts[0].iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["1", "4"]);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let embedder = Arc::new(StubEmbedder::new(3));
    let index = Arc::new(RecordingIndex::default());
    let ingestor = create_ingestor(Arc::clone(&embedder) as _, Arc::clone(&index));

    let report = ingestor.ingest(&[]).await.expect("ingest succeeds");

    assert_eq!(report, IngestReport::default());
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 0);
    assert!(
        index
            .upserts
            .lock()
            .expect("upserts lock poisoned")
            .is_empty()
    );
}

#[tokio::test]
async fn provider_outage_fails_the_whole_call() {
    let index = Arc::new(RecordingIndex::default());
    let ingestor = create_ingestor(Arc::new(FailingEmbedder), Arc::clone(&index));

    let result = ingestor.ingest(&[product("1", Some("A tent"))]).await;
    assert!(matches!(result, Err(RagError::ProviderUnavailable(_))));
    assert!(
        index
            .upserts
            .lock()
            .expect("upserts lock poisoned")
            .is_empty()
    );
}
