#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// End-to-end tests for the offline build path: raw CSVs through the loader
/// into the vector index (embeddings stubbed with deterministic vectors)
use anirec::data;
use anirec::index::{Document, DocumentEmbedding, VectorStore};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const DIMENSION: usize = 32;

const SYNOPSIS_CSV: &str = "\
MAL_ID,Name,sypnopsis
16498,Shingeki no Kyojin,\"Centuries ago, mankind was slaughtered to near extinction by titans.\"
1535,Death Note,\"A notebook that kills anyone whose name is written in it.\"
5114,Fullmetal Alchemist: Brotherhood,\"Two brothers pay the price of forbidden alchemy.\"
9999,Obscure Entry,No synopsis information has been added to this title.
40000,Unjoined Show,\"This row has no matching metadata and must be dropped.\"
";

const METADATA_CSV: &str = "\
MAL_ID,Score,Genres,Type,Episodes,Members
16498,8.53,\"Action, Drama\",TV,25,3128574
1535,8.63,\"Supernatural, Suspense\",TV,37,3062223
5114,9.19,\"Action, Adventure, Fantasy\",TV,64,2744559
9999,6.12,Comedy,OVA,1,1523
";

fn write_sources(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
    let synopsis = dir.path().join("anime_with_synopsis.csv");
    let metadata = dir.path().join("anime_updated.csv");
    let output = dir.path().join("processed_anime.csv");
    fs::write(&synopsis, SYNOPSIS_CSV).expect("should write synopsis fixture");
    fs::write(&metadata, METADATA_CSV).expect("should write metadata fixture");
    (synopsis, metadata, output)
}

fn stub_vector(seed: u32) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| ((seed as f32) + i as f32).sin())
        .collect()
}

#[tokio::test]
async fn csv_sources_to_searchable_index() {
    let dir = TempDir::new().expect("should create temp dir");
    let (synopsis, metadata, output) = write_sources(&dir);

    let written = data::load_and_process(&synopsis, &metadata, &output)
        .expect("loader should succeed on valid sources");
    assert_eq!(written, output);

    let records = data::read_processed(&output).expect("processed file should read back");

    // Placeholder synopsis and unjoined rows are gone
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.mal_id != 9999));
    assert!(records.iter().all(|r| r.mal_id != 40000));

    let embeddings: Vec<DocumentEmbedding> = records
        .iter()
        .map(|record| DocumentEmbedding {
            document: Document::from_record(record),
            vector: stub_vector(record.mal_id),
        })
        .collect();

    let store = VectorStore::open(&dir.path().join("index"), DIMENSION)
        .await
        .expect("should open vector store");
    store
        .rebuild(&embeddings)
        .await
        .expect("should build the index");

    let count = store
        .count_documents()
        .await
        .expect("count should succeed");
    assert_eq!(count, records.len() as u64);

    // Querying with a document's own vector returns that document first
    let results = store
        .search_similar(&stub_vector(16498), 1)
        .await
        .expect("search should succeed");
    assert_eq!(results[0].document.mal_id, 16498);
    assert_eq!(results[0].document.title, "Shingeki no Kyojin");
    assert!(results[0].document.content.starts_with("Title: "));
}

#[test]
fn loader_failure_leaves_no_partial_output() {
    let dir = TempDir::new().expect("should create temp dir");
    let (synopsis, _metadata, output) = write_sources(&dir);
    let missing = dir.path().join("does_not_exist.csv");

    let result = data::load_and_process(&synopsis, &missing, &output);
    assert!(result.is_err());
    assert!(
        !output.exists(),
        "A failed run must not leave a partial output file"
    );
}

#[tokio::test]
async fn rebuilding_from_the_same_sources_is_stable() {
    let dir = TempDir::new().expect("should create temp dir");
    let (synopsis, metadata, output) = write_sources(&dir);

    data::load_and_process(&synopsis, &metadata, &output).expect("first run should succeed");
    let first = data::read_processed(&output).expect("should read back");

    data::load_and_process(&synopsis, &metadata, &output).expect("second run should succeed");
    let second = data::read_processed(&output).expect("should read back");

    assert_eq!(first, second);

    let embeddings: Vec<DocumentEmbedding> = second
        .iter()
        .map(|record| DocumentEmbedding {
            document: Document::from_record(record),
            vector: stub_vector(record.mal_id),
        })
        .collect();

    let store = VectorStore::open(&dir.path().join("index"), DIMENSION)
        .await
        .expect("should open vector store");
    store
        .rebuild(&embeddings)
        .await
        .expect("first build should succeed");
    store
        .rebuild(&embeddings)
        .await
        .expect("second build should succeed");

    let count = store
        .count_documents()
        .await
        .expect("count should succeed");
    assert_eq!(count, second.len() as u64, "Rebuild must not duplicate rows");
}
