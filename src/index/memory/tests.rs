use super::*;

fn chunk(id: &str, text: &str) -> DocumentChunk {
    DocumentChunk {
        id: id.to_string(),
        text: text.to_string(),
    }
}

fn sample_index() -> InMemoryIndex {
    InMemoryIndex::from_entries([
        (chunk("a", "A: refund policy..."), vec![1.0, 0.0, 0.0]),
        (chunk("b", "B: course list..."), vec![0.6, 0.8, 0.0]),
        (chunk("c", "C: blog posts..."), vec![0.0, 0.0, 1.0]),
    ])
    .expect("sample index should build")
}

fn texts(results: &[ScoredChunk]) -> Vec<&str> {
    results.iter().map(|r| r.chunk.text.as_str()).collect()
}

#[tokio::test]
async fn nearest_chunk_comes_first() {
    let index = sample_index();

    let results = index
        .search(&[0.9, 0.1, 0.0], 3)
        .await
        .expect("search should succeed");

    assert_eq!(
        texts(&results),
        vec!["A: refund policy...", "B: course list...", "C: blog posts..."]
    );
    assert!(results[0].score >= results[1].score);
    assert!(results[1].score >= results[2].score);
}

#[tokio::test]
async fn returns_at_most_k_and_at_most_len() {
    let index = sample_index();

    for k in 0..6 {
        let results = index
            .search(&[0.0, 1.0, 0.0], k)
            .await
            .expect("search should succeed");
        assert_eq!(results.len(), k.min(index.len()));
    }
}

#[tokio::test]
async fn empty_index_returns_nothing() {
    let index = InMemoryIndex::new();

    let results = index
        .search(&[0.1, 0.2], 3)
        .await
        .expect("search should succeed");

    assert!(results.is_empty());
    assert!(index.is_empty());
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let index = InMemoryIndex::from_entries([
        (chunk("first", "same"), vec![0.0, 1.0]),
        (chunk("second", "same"), vec![0.0, 1.0]),
        (chunk("closest", "other"), vec![1.0, 0.0]),
        (chunk("third", "same"), vec![0.0, 1.0]),
    ])
    .expect("index should build");

    let results = index
        .search(&[1.0, 0.0], 4)
        .await
        .expect("search should succeed");

    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["closest", "first", "second", "third"]);
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let index = sample_index();
    let query = [0.3, 0.3, 0.3];

    let first = index.search(&query, 3).await.expect("search should succeed");
    let second = index.search(&query, 3).await.expect("search should succeed");

    assert_eq!(first, second);
}

#[tokio::test]
async fn query_dimension_must_match() {
    let index = sample_index();

    let result = index.search(&[1.0, 0.0], 3).await;

    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[test]
fn insert_rejects_mixed_dimensions() {
    let mut index = InMemoryIndex::new();
    index
        .insert(chunk("a", "a"), vec![1.0, 0.0])
        .expect("first insert should succeed");

    assert!(index.insert(chunk("b", "b"), vec![1.0]).is_err());
    assert_eq!(index.len(), 1);
    assert_eq!(index.dimension(), Some(2));
}
