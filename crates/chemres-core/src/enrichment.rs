//! Batched retrieval of compound records
//!
//! CIDs are deduplicated, sorted and cut into fixed-size batches. Each batch
//! is one property request; up to `concurrency` batches are in flight at once
//! and a failing batch never blocks the others.

use std::collections::{BTreeMap, BTreeSet};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::cache::Memo;
use crate::domain::{ChemicalRecord, Cid, DiagnosticsReport, Failure};
use crate::error::LookupError;
use crate::http::HttpTransport;
use crate::sources::PubChemClient;

const TRACING_TARGET: &str = "chemres::enrichment";

/// Split CIDs into sorted, duplicate-free batches of at most `batch_size`
pub fn partition<I>(cids: I, batch_size: usize) -> Vec<Vec<Cid>>
where
    I: IntoIterator<Item = Cid>,
{
    let unique: Vec<Cid> = cids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    unique
        .chunks(batch_size.max(1))
        .map(<[Cid]>::to_vec)
        .collect()
}

/// Records plus diagnostics for one enrichment call
#[derive(Debug, Clone, Default)]
pub struct EnrichmentRun {
    /// One record per CID the service returned, sorted by CID
    pub records: Vec<ChemicalRecord>,
    pub diagnostics: DiagnosticsReport,
    /// Property requests issued (memo hits need none)
    pub batches: usize,
}

impl EnrichmentRun {
    pub fn into_parts(self) -> (Vec<ChemicalRecord>, DiagnosticsReport) {
        (self.records, self.diagnostics)
    }
}

pub struct BatchEnrichmentFetcher<'a, T> {
    client: &'a PubChemClient<T>,
    batch_size: usize,
    concurrency: usize,
    memo: Option<&'a Memo>,
}

impl<'a, T: HttpTransport> BatchEnrichmentFetcher<'a, T> {
    pub fn new(client: &'a PubChemClient<T>, batch_size: usize, concurrency: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: Option<&'a Memo>) -> Self {
        self.memo = memo;
        self
    }

    /// Fetch records for `cids`.
    ///
    /// Only an unreachable service is an `Err`. CIDs the service omits are
    /// reported as unmatched, CIDs of failed batches as failures.
    pub async fn fetch<I>(
        &self,
        cids: I,
        cancel: &CancellationToken,
    ) -> Result<EnrichmentRun, LookupError>
    where
        I: IntoIterator<Item = Cid>,
    {
        let requested: BTreeSet<Cid> = cids.into_iter().collect();
        let mut records: BTreeMap<Cid, ChemicalRecord> = BTreeMap::new();
        let mut pending = Vec::with_capacity(requested.len());

        for cid in &requested {
            match self.memo.and_then(|m| m.record(*cid)) {
                Some(record) => {
                    records.insert(*cid, record);
                }
                None => pending.push(*cid),
            }
        }

        let batches = partition(pending, self.batch_size);
        let batch_count = batches.len();

        tracing::debug!(
            target: TRACING_TARGET,
            requested = requested.len(),
            memoized = records.len(),
            batches = batch_count,
            "Starting enrichment"
        );

        let results: Vec<(Vec<Cid>, Result<Vec<ChemicalRecord>, LookupError>)> =
            stream::iter(batches)
                .map(|batch| async move {
                    let result = self.client.fetch_properties(&batch, cancel).await;
                    (batch, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut missing: BTreeSet<Cid> = BTreeSet::new();
        let mut skipped: BTreeSet<Cid> = BTreeSet::new();
        let mut failures: BTreeMap<Cid, String> = BTreeMap::new();

        for (batch, result) in results {
            match result {
                Ok(rows) => {
                    let mut returned = BTreeSet::new();
                    for row in rows {
                        if batch.binary_search(&row.cid).is_err() || !returned.insert(row.cid) {
                            tracing::debug!(
                                target: TRACING_TARGET,
                                cid = %row.cid,
                                "Ignoring row not requested in this batch"
                            );
                            continue;
                        }
                        if let Some(memo) = self.memo {
                            memo.store_records(std::slice::from_ref(&row));
                        }
                        records.insert(row.cid, row);
                    }
                    missing.extend(batch.iter().filter(|cid| !returned.contains(*cid)));
                }
                Err(LookupError::Cancelled) => skipped.extend(batch),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        first_cid = %batch[0],
                        size = batch.len(),
                        error = %e,
                        "Enrichment batch failed"
                    );
                    let reason = e.to_string();
                    failures.extend(batch.into_iter().map(|cid| (cid, reason.clone())));
                }
            }
        }

        let diagnostics = DiagnosticsReport {
            unmatched: missing.iter().map(Cid::to_string).collect(),
            ambiguous: Vec::new(),
            failures: failures
                .into_iter()
                .map(|(cid, reason)| Failure {
                    subject: cid.to_string(),
                    reason,
                })
                .collect(),
            skipped: skipped.iter().map(Cid::to_string).collect(),
            cancelled: cancel.is_cancelled(),
        };

        Ok(EnrichmentRun {
            records: records.into_values().collect(),
            diagnostics,
            batches: batch_count,
        })
    }
}
