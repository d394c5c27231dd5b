//! Optional in-process memoization of lookups

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{ChemicalRecord, Cid, OutcomeStatus, ResolutionOutcome};

/// Remembers completed lookups for the lifetime of a resolver.
///
/// Only definitive answers are kept: resolved, ambiguous and unmatched
/// outcomes, and records the service returned. Failures and skips are
/// always retried.
#[derive(Debug, Default)]
pub struct Memo {
    outcomes: Mutex<HashMap<String, ResolutionOutcome>>,
    records: Mutex<HashMap<Cid, ChemicalRecord>>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(&self, identifier: &str) -> Option<ResolutionOutcome> {
        self.outcomes
            .lock()
            .ok()
            .and_then(|map| map.get(identifier).cloned())
    }

    pub fn store_outcome(&self, outcome: &ResolutionOutcome) {
        let definitive = matches!(
            outcome.status(),
            OutcomeStatus::Resolved | OutcomeStatus::Ambiguous | OutcomeStatus::Unmatched
        );
        if !definitive {
            return;
        }
        if let Ok(mut map) = self.outcomes.lock() {
            map.insert(outcome.identifier.clone(), outcome.clone());
        }
    }

    pub fn record(&self, cid: Cid) -> Option<ChemicalRecord> {
        self.records
            .lock()
            .ok()
            .and_then(|map| map.get(&cid).cloned())
    }

    pub fn store_records(&self, records: &[ChemicalRecord]) {
        if let Ok(mut map) = self.records.lock() {
            for record in records {
                map.insert(record.cid, record.clone());
            }
        }
    }

    /// Number of memoized outcomes and records
    pub fn sizes(&self) -> (usize, usize) {
        let outcomes = self.outcomes.lock().map(|m| m.len()).unwrap_or(0);
        let records = self.records.lock().map(|m| m.len()).unwrap_or(0);
        (outcomes, records)
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.outcomes.lock() {
            map.clear();
        }
        if let Ok(mut map) = self.records.lock() {
            map.clear();
        }
    }
}
