use mockall::Sequence;
use rental_etl_core::clean::clean_record;
use rental_etl_core::contract::{DocumentSink, InsertOutcome, MockDocumentSink};
use rental_etl_core::document::{to_document, ListingDocument};
use rental_etl_core::error::{LoadError, SinkError};
use rental_etl_core::load::{load, EmptyInputPolicy, LoadConfig, LoadStrategy};
use rental_etl_core::memory_sink::MemorySink;
use rental_etl_core::record::RawRecord;

fn listing(id: i64, name: &str) -> ListingDocument {
    let raw = RawRecord::from_iter([
        ("id", id.to_string()),
        ("price", "$99".to_owned()),
        ("name", name.to_owned()),
    ]);
    to_document(&clean_record(&raw).expect("Fixture should clean").0)
}

fn config(strategy: LoadStrategy, on_empty_input: EmptyInputPolicy) -> LoadConfig {
    LoadConfig {
        collection: "listings".into(),
        strategy,
        on_empty_input,
    }
}

fn seeded_sink() -> MemorySink {
    MemorySink::new().with_collection(
        "listings",
        vec![listing(1, "old one"), listing(2, "old two")],
    )
}

fn ids(docs: &[ListingDocument]) -> Vec<i64> {
    docs.iter().filter_map(|d| d.id).collect()
}

#[tokio::test]
async fn test_load_replaces_previous_contents() {
    for strategy in [LoadStrategy::ClearThenInsert, LoadStrategy::StageAndSwap] {
        let sink = seeded_sink();
        let batch = vec![listing(3, "new three"), listing(1, "new one")];

        let report = load(&batch, &sink, &config(strategy, EmptyInputPolicy::Clear))
            .await
            .expect("Load should succeed");

        assert_eq!(report.attempted, 2);
        assert_eq!(report.inserted, 2);
        assert!(report.failures.is_empty());
        assert!(report.cleared);

        let count = sink.count_documents("listings").await.expect("Count");
        assert_eq!(count, batch.len() as u64);
        let stored = sink.documents("listings");
        assert_eq!(ids(&stored), vec![1, 3], "{strategy:?}: no union with the old run");
        assert_eq!(stored[0].name.as_deref(), Some("new one"));
    }
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let sink = seeded_sink();
    let batch = vec![listing(10, "a"), listing(11, "b")];
    let cfg = LoadConfig::default();

    load(&batch, &sink, &cfg).await.expect("First load");
    let after_first = sink.documents("listings");
    load(&batch, &sink, &cfg).await.expect("Second load");

    assert_eq!(sink.documents("listings"), after_first);
}

#[tokio::test]
async fn test_unreachable_store_leaves_destination_unchanged() {
    let sink = seeded_sink();
    let before = sink.documents("listings");
    let count_before = sink.count_documents("listings").await.expect("Count");
    sink.set_reachable(false);

    let err = load(&[listing(5, "x")], &sink, &LoadConfig::default())
        .await
        .expect_err("Load must fail when the store is unreachable");
    assert!(matches!(err, LoadError::Connectivity(SinkError::Connectivity(_))));

    sink.set_reachable(true);
    assert_eq!(sink.count_documents("listings").await.expect("Count"), count_before);
    assert_eq!(sink.documents("listings"), before);
}

#[tokio::test]
async fn test_duplicate_ids_are_reported_not_fatal() {
    let sink = MemorySink::new();
    let batch = vec![listing(7, "first"), listing(7, "second"), listing(8, "other")];

    let report = load(&batch, &sink, &LoadConfig::default())
        .await
        .expect("Duplicates must not fail the run");

    assert_eq!(report.inserted, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, Some(7));
    let stored = sink.documents("listings");
    assert_eq!(ids(&stored), vec![7, 8]);
    assert_eq!(stored[0].name.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_documents_without_id_are_all_stored() {
    let mut anonymous = listing(1, "no key");
    anonymous.id = None;
    let batch = vec![anonymous.clone(), anonymous, listing(2, "keyed")];

    let sink = seeded_sink();
    let report = load(&batch, &sink, &LoadConfig::default())
        .await
        .expect("Load should succeed");
    assert_eq!(report.inserted, 3);
    assert!(report.failures.is_empty());

    let stored = sink.documents("listings");
    assert_eq!(stored.len(), 3);
    assert_eq!(ids(&stored), vec![2], "Keyed documents sort first");
    assert!(stored[1..].iter().all(|d| d.id.is_none()));
}

#[tokio::test]
async fn test_empty_input_clears_by_default() {
    let sink = seeded_sink();
    let report = load(&[], &sink, &LoadConfig::default())
        .await
        .expect("Empty load should succeed");
    assert!(report.cleared);
    assert_eq!(report.inserted, 0);
    assert!(sink.documents("listings").is_empty());
}

#[tokio::test]
async fn test_empty_input_can_be_skipped() {
    let sink = seeded_sink();
    let report = load(
        &[],
        &sink,
        &config(LoadStrategy::ClearThenInsert, EmptyInputPolicy::Skip),
    )
    .await
    .expect("Empty load should succeed");
    assert!(!report.cleared);
    assert_eq!(ids(&sink.documents("listings")), vec![1, 2]);
}

#[tokio::test]
async fn test_stage_and_swap_leaves_no_staging_behind() {
    let sink = seeded_sink().with_collection("listings_staging_deadbeef", vec![listing(99, "stale")]);

    load(
        &[listing(4, "fresh")],
        &sink,
        &config(LoadStrategy::StageAndSwap, EmptyInputPolicy::Clear),
    )
    .await
    .expect("Load should succeed");

    let collections = sink.list_collections().await.expect("List collections");
    assert_eq!(collections, vec!["listings".to_owned()]);
    assert_eq!(ids(&sink.documents("listings")), vec![4]);
}

#[tokio::test]
async fn test_no_destructive_calls_when_ping_fails() {
    let mut sink = MockDocumentSink::new();
    sink.expect_ping()
        .times(1)
        .returning(|| Err(SinkError::Connectivity("connection refused".into())));
    sink.expect_drop_collection().never();
    sink.expect_insert_documents().never();
    sink.expect_rename_collection().never();

    let result = load(&[listing(1, "x")], &sink, &LoadConfig::default()).await;
    assert!(matches!(result, Err(LoadError::Connectivity(_))));
}

#[tokio::test]
async fn test_clear_then_insert_drops_before_inserting() {
    let mut seq = Sequence::new();
    let mut sink = MockDocumentSink::new();
    sink.expect_ping()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    sink.expect_drop_collection()
        .withf(|collection| collection == "listings")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    sink.expect_insert_documents()
        .withf(|collection, docs| collection == "listings" && docs.len() == 2)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, docs| {
            Ok(InsertOutcome {
                inserted: docs.len(),
                failures: vec![],
            })
        });

    let report = load(
        &[listing(1, "a"), listing(2, "b")],
        &sink,
        &LoadConfig::default(),
    )
    .await
    .expect("Load should succeed");
    assert_eq!(report.inserted, 2);
}

#[tokio::test]
async fn test_insert_failure_after_clear_is_a_load_error() {
    let mut sink = MockDocumentSink::new();
    sink.expect_ping().returning(|| Ok(()));
    sink.expect_drop_collection().times(1).returning(|_| Ok(()));
    sink.expect_insert_documents().times(1).returning(|_, _| {
        Err(SinkError::Operation {
            operation: "insert_documents",
            message: "write concern timeout".into(),
        })
    });

    let err = load(&[listing(1, "a")], &sink, &LoadConfig::default())
        .await
        .expect_err("Insert failure must be fatal");
    match err {
        LoadError::Insert { collection, .. } => assert_eq!(collection, "listings"),
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_staging_failure_never_touches_destination() {
    let mut sink = MockDocumentSink::new();
    sink.expect_ping().returning(|| Ok(()));
    sink.expect_list_collections()
        .returning(|| Ok(vec!["listings".to_owned()]));
    sink.expect_insert_documents()
        .withf(|collection, _| collection.starts_with("listings_staging_"))
        .times(1)
        .returning(|_, _| Err(SinkError::Connectivity("socket closed".into())));
    sink.expect_drop_collection()
        .withf(|collection| collection.starts_with("listings_staging_"))
        .times(1)
        .returning(|_| Ok(()));
    sink.expect_rename_collection().never();

    let err = load(
        &[listing(1, "a")],
        &sink,
        &config(LoadStrategy::StageAndSwap, EmptyInputPolicy::Clear),
    )
    .await
    .expect_err("Staging failure must be fatal");
    assert!(matches!(err, LoadError::Insert { .. }));
}

#[tokio::test]
async fn test_failed_promotion_is_reported() {
    let mut sink = MockDocumentSink::new();
    sink.expect_ping().returning(|| Ok(()));
    sink.expect_list_collections().returning(|| Ok(vec![]));
    sink.expect_insert_documents().returning(|_, docs| {
        Ok(InsertOutcome {
            inserted: docs.len(),
            failures: vec![],
        })
    });
    sink.expect_rename_collection()
        .withf(|from, to| from.starts_with("listings_staging_") && to == "listings")
        .times(1)
        .returning(|_, _| {
            Err(SinkError::Operation {
                operation: "rename_collection",
                message: "not authorized".into(),
            })
        });

    let err = load(
        &[listing(1, "a")],
        &sink,
        &config(LoadStrategy::StageAndSwap, EmptyInputPolicy::Clear),
    )
    .await
    .expect_err("Promotion failure must be fatal");
    match err {
        LoadError::Promote { collection, staging, .. } => {
            assert_eq!(collection, "listings");
            assert!(staging.starts_with("listings_staging_"));
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}
