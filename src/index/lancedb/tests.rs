use super::*;
use tempfile::TempDir;

fn entry(id: &str, text: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        chunk: DocumentChunk {
            id: id.to_string(),
            text: text.to_string(),
        },
        source: "site.md".to_string(),
        vector,
    }
}

fn sample_entries() -> Vec<IndexEntry> {
    vec![
        entry("a", "A: refund policy...", vec![1.0, 0.0, 0.0]),
        entry("b", "B: course list...", vec![0.6, 0.8, 0.0]),
        entry("c", "C: blog posts...", vec![0.0, 0.0, 1.0]),
    ]
}

fn ids(results: &[ScoredChunk]) -> Vec<&str> {
    results.iter().map(|r| r.chunk.id.as_str()).collect()
}

#[tokio::test]
async fn create_then_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("index");

    let created = IndexStore::create(&index_path, 3, &sample_entries())
        .await
        .expect("should create index");
    assert_eq!(created.count().await.expect("should count"), 3);
    drop(created);

    let store = IndexStore::load(&index_path)
        .await
        .expect("should load index");
    assert_eq!(store.dimension(), 3);
    assert_eq!(store.count().await.expect("should count"), 3);
}

#[tokio::test]
async fn search_orders_by_similarity() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = IndexStore::create(temp_dir.path(), 3, &sample_entries())
        .await
        .expect("should create index");

    let results = store
        .search(&[0.9, 0.1, 0.0], 3)
        .await
        .expect("search should succeed");

    assert_eq!(ids(&results), vec!["a", "b", "c"]);
    assert_eq!(results[0].chunk.text, "A: refund policy...");
    assert!(results[0].score > results[1].score);
    assert!(results[1].score > results[2].score);
}

#[tokio::test]
async fn search_returns_at_most_k() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = IndexStore::create(temp_dir.path(), 3, &sample_entries())
        .await
        .expect("should create index");

    for k in 0..6 {
        let results = store
            .search(&[0.0, 1.0, 0.0], k)
            .await
            .expect("search should succeed");
        assert_eq!(results.len(), k.min(3));
    }
}

#[tokio::test]
async fn empty_index_search_is_empty() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    IndexStore::create(temp_dir.path(), 3, &[])
        .await
        .expect("should create empty index");

    let store = IndexStore::load(temp_dir.path())
        .await
        .expect("should load empty index");
    let results = store
        .search(&[1.0, 0.0, 0.0], 3)
        .await
        .expect("search should succeed");

    assert!(results.is_empty());
}

#[tokio::test]
async fn equal_distances_keep_insertion_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let entries = vec![
        entry("first", "same", vec![0.0, 1.0]),
        entry("second", "same", vec![0.0, 1.0]),
        entry("closest", "other", vec![1.0, 0.0]),
        entry("third", "same", vec![0.0, 1.0]),
    ];
    let store = IndexStore::create(temp_dir.path(), 2, &entries)
        .await
        .expect("should create index");

    let results = store
        .search(&[1.0, 0.0], 3)
        .await
        .expect("search should succeed");

    assert_eq!(ids(&results), vec!["closest", "first", "second"]);
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = IndexStore::create(temp_dir.path(), 3, &sample_entries())
        .await
        .expect("should create index");

    let first = store
        .search(&[0.2, 0.5, 0.3], 3)
        .await
        .expect("search should succeed");
    let second = store
        .search(&[0.2, 0.5, 0.3], 3)
        .await
        .expect("search should succeed");

    assert_eq!(first, second);
}

#[tokio::test]
async fn search_does_not_modify_the_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = IndexStore::create(temp_dir.path(), 3, &sample_entries())
        .await
        .expect("should create index");

    for _ in 0..3 {
        store
            .search(&[1.0, 1.0, 1.0], 2)
            .await
            .expect("search should succeed");
    }

    assert_eq!(store.count().await.expect("should count"), 3);
}

#[tokio::test]
async fn create_replaces_previous_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    IndexStore::create(temp_dir.path(), 3, &sample_entries())
        .await
        .expect("should create index");

    let store = IndexStore::create(
        temp_dir.path(),
        2,
        &[entry("only", "only chunk", vec![1.0, 0.0])],
    )
    .await
    .expect("should replace index");

    assert_eq!(store.count().await.expect("should count"), 1);
    assert_eq!(store.dimension(), 2);
}

#[tokio::test]
async fn load_missing_directory_is_unavailable() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let result = IndexStore::load(temp_dir.path().join("does-not-exist")).await;

    assert!(matches!(result, Err(RagError::IndexUnavailable(_))));
}

#[tokio::test]
async fn load_directory_without_table_is_unavailable() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let result = IndexStore::load(temp_dir.path()).await;

    assert!(matches!(result, Err(RagError::IndexUnavailable(_))));
}

#[tokio::test]
async fn load_file_path_is_unavailable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let file_path = temp_dir.path().join("index");
    std::fs::write(&file_path, b"not an index").expect("should write file");

    let result = IndexStore::load(&file_path).await;

    assert!(matches!(result, Err(RagError::IndexUnavailable(_))));
}

#[tokio::test]
async fn query_dimension_must_match() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = IndexStore::create(temp_dir.path(), 3, &sample_entries())
        .await
        .expect("should create index");

    let result = store.search(&[1.0, 0.0], 3).await;

    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn create_rejects_mismatched_vectors() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let result = IndexStore::create(
        temp_dir.path(),
        3,
        &[entry("short", "short vector", vec![1.0, 0.0])],
    )
    .await;

    assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
}

#[test]
fn schema_validation_rejects_foreign_tables() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("ordinal", DataType::UInt32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("vector", DataType::Utf8, false),
    ]);
    assert!(validate_schema(&schema).is_err());

    let schema = Schema::new(vec![Field::new("id", DataType::Utf8, false)]);
    assert!(validate_schema(&schema).is_err());

    let schema = create_schema(8).expect("should create schema");
    assert_eq!(validate_schema(&schema).expect("schema should validate"), 8);
}
