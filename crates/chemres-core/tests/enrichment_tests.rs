//! Batch enrichment integration tests

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use chemres_core::{CancellationToken, ChemResError, Cid, Resolver, ResolverConfig};
use common::fixtures::{
    property_rows, requested_cids, response_fixture, test_config,
};
use common::transport::{refused, status, ScriptedTransport};

const PROPERTY: &str = "/property/";

fn cids(values: impl IntoIterator<Item = u64>) -> Vec<Cid> {
    values.into_iter().filter_map(Cid::new).collect()
}

fn resolver_with(
    config: ResolverConfig,
    transport: ScriptedTransport,
) -> Resolver<ScriptedTransport> {
    Resolver::with_transport(config, transport).unwrap()
}

fn echo_rows() -> ScriptedTransport {
    ScriptedTransport::new().on_with(PROPERTY, |url| Ok(property_rows(&requested_cids(url))))
}

fn transport(resolver: &Resolver<ScriptedTransport>) -> &ScriptedTransport {
    resolver.client().http().transport()
}

// === Partitioning ===

#[tokio::test(start_paused = true)]
async fn test_issues_ceil_n_over_b_batches() {
    for (n, batch_size, expected) in [(250u64, 100usize, 3usize), (200, 100, 2), (7, 3, 3), (1, 100, 1)] {
        let mut config = test_config();
        config.enrichment.batch_size = batch_size;
        let resolver = resolver_with(config, echo_rows());

        let run = resolver
            .enrich_detailed(cids(1..=n), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(run.batches, expected, "n={} b={}", n, batch_size);
        assert_eq!(transport(&resolver).calls_matching(PROPERTY), expected);
        assert_eq!(run.records.len() as u64, n);
    }
}

#[tokio::test(start_paused = true)]
async fn test_batches_never_exceed_batch_size() {
    let mut config = test_config();
    config.enrichment.batch_size = 40;
    let resolver = resolver_with(config, echo_rows());

    resolver.enrich(cids(1..=130)).await.unwrap();

    for url in transport(&resolver).calls() {
        assert!(requested_cids(&url).len() <= 40);
    }
}

#[tokio::test(start_paused = true)]
async fn test_duplicates_collapse_and_records_are_sorted() {
    let resolver = resolver_with(
        test_config(),
        ScriptedTransport::new().on(PROPERTY, Ok(response_fixture(200, "properties_partial.json"))),
    );

    let (records, diagnostics) = resolver.enrich(cids([7410, 6184, 7410])).await.unwrap();

    assert_eq!(transport(&resolver).call_count(), 1);
    let returned: Vec<u64> = records.iter().map(|r| r.cid.get()).collect();
    assert_eq!(returned, vec![6184, 7410]);
    assert!(diagnostics.is_clean());
}

#[tokio::test(start_paused = true)]
async fn test_empty_input_makes_no_call() {
    let resolver = resolver_with(test_config(), echo_rows());

    let (records, diagnostics) = resolver.enrich(Vec::new()).await.unwrap();

    assert!(records.is_empty());
    assert!(diagnostics.is_clean());
    assert_eq!(transport(&resolver).call_count(), 0);
}

// === Partial results ===

#[tokio::test(start_paused = true)]
async fn test_records_are_a_subset_of_the_request() {
    // Service answers with an extra row nobody asked for
    let resolver = resolver_with(
        test_config(),
        ScriptedTransport::new().on_with(PROPERTY, |url| {
            let mut rows = requested_cids(url);
            rows.push(999_999);
            Ok(property_rows(&rows))
        }),
    );
    let requested: BTreeSet<Cid> = cids([10, 20, 30]).into_iter().collect();

    let (records, _) = resolver.enrich(requested.clone()).await.unwrap();

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| requested.contains(&r.cid)));
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_cid_does_not_sink_its_batch() {
    let resolver = resolver_with(
        test_config(),
        ScriptedTransport::new().on(PROPERTY, Ok(response_fixture(200, "properties_partial.json"))),
    );

    let (records, diagnostics) = resolver
        .enrich(cids([7410, 6184, 99_999_999]))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].title.as_deref(), Some("Acetophenone"));
    assert_eq!(records[1].molecular_weight, Some(120.15));
    assert_eq!(diagnostics.unmatched, vec!["99999999"]);
    assert!(diagnostics.failures.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_not_found_batch_reports_every_cid_unmatched() {
    let resolver = resolver_with(test_config(), ScriptedTransport::new());

    let (records, diagnostics) = resolver.enrich(cids([3, 1, 2])).await.unwrap();

    assert!(records.is_empty());
    assert_eq!(diagnostics.unmatched, vec!["1", "2", "3"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_does_not_block_the_others() {
    let mut config = test_config();
    config.enrichment.batch_size = 2;
    let resolver = resolver_with(
        config,
        ScriptedTransport::new()
            .on("/cid/1,2/", status(503))
            .on_with(PROPERTY, |url| Ok(property_rows(&requested_cids(url)))),
    );

    let (records, diagnostics) = resolver.enrich(cids(1..=6)).await.unwrap();

    let returned: Vec<u64> = records.iter().map(|r| r.cid.get()).collect();
    assert_eq!(returned, vec![3, 4, 5, 6]);
    let failed: Vec<&str> = diagnostics
        .failures
        .iter()
        .map(|f| f.subject.as_str())
        .collect();
    assert_eq!(failed, vec!["1", "2"]);
    assert!(diagnostics.failures[0].reason.contains("503"));
    assert!(diagnostics.unmatched.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_service_is_fatal() {
    let resolver = resolver_with(test_config(), ScriptedTransport::new().on(PROPERTY, refused()));

    let result = resolver.enrich(cids([1, 2])).await;

    assert!(matches!(result, Err(ChemResError::ServiceUnreachable(_))));
}

// === Concurrency ===

#[tokio::test(start_paused = true)]
async fn test_batches_run_concurrently_within_the_rate_limit() {
    let mut config = test_config();
    config.enrichment.batch_size = 1;
    config.enrichment.concurrency = 4;
    let resolver = resolver_with(config, echo_rows().with_latency(Duration::from_secs(2)));

    let started = tokio::time::Instant::now();
    let (records, _) = resolver.enrich(cids(1..=4)).await.unwrap();

    assert_eq!(records.len(), 4);
    // Four overlapping 2s requests, started 200ms apart
    assert!(started.elapsed() < Duration::from_secs(4));
    let mut times = transport(&resolver).call_times();
    times.sort();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(200));
    }
}

// === Memoization and cancellation ===

#[tokio::test(start_paused = true)]
async fn test_memo_skips_known_cids() {
    let mut config = test_config();
    config.memoize = true;
    let resolver = resolver_with(config, echo_rows());

    resolver.enrich(cids([1, 2])).await.unwrap();
    let (records, _) = resolver.enrich(cids([1, 2, 3])).await.unwrap();

    assert_eq!(records.len(), 3);
    let calls = transport(&resolver).calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(requested_cids(&calls[1]), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_enrichment_lists_skipped_cids() {
    let resolver = resolver_with(test_config(), echo_rows());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (records, diagnostics) = resolver
        .enrich_with_cancel(cids([5, 4]), &cancel)
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(diagnostics.skipped, vec!["4", "5"]);
    assert!(diagnostics.cancelled);
    assert_eq!(transport(&resolver).call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_midway_keeps_fetched_records() {
    let mut config = test_config();
    config.enrichment.batch_size = 1;
    config.enrichment.concurrency = 1;
    let resolver = resolver_with(config, echo_rows().with_latency(Duration::from_secs(1)));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        trigger.cancel();
    });

    let (records, diagnostics) = resolver
        .enrich_with_cancel(cids([1, 2, 3]), &cancel)
        .await
        .unwrap();

    let fetched: Vec<u64> = records.iter().map(|r| r.cid.get()).collect();
    assert_eq!(fetched, vec![1]);
    assert_eq!(diagnostics.skipped, vec!["2", "3"]);
    assert!(diagnostics.unmatched.is_empty());
    assert!(diagnostics.failures.is_empty());
    assert!(diagnostics.cancelled);
}
