//! Folds resolution outcomes into the map and the diagnostics report

use crate::domain::{
    AmbiguousMatch, DiagnosticsReport, Failure, OutcomeStatus, ResolutionMap, ResolutionOutcome,
};

/// Accumulates outcomes in input order. Never drops an identifier: the map
/// gets exactly one entry per pushed outcome.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    map: ResolutionMap,
    diagnostics: DiagnosticsReport,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: &ResolutionOutcome) {
        let identifier = outcome.identifier.clone();

        match outcome.status() {
            OutcomeStatus::Resolved => {}
            OutcomeStatus::Ambiguous => self.diagnostics.ambiguous.push(AmbiguousMatch {
                identifier: identifier.clone(),
                candidates: outcome.candidates.clone(),
            }),
            OutcomeStatus::Unmatched => self.diagnostics.unmatched.push(identifier.clone()),
            OutcomeStatus::Failed => self.diagnostics.failures.push(Failure {
                subject: identifier.clone(),
                reason: outcome.failure.clone().unwrap_or_default(),
            }),
            OutcomeStatus::Skipped => self.diagnostics.skipped.push(identifier.clone()),
        }

        // Ambiguous matches take the first candidate the service returned
        self.map.push(identifier, outcome.accepted());
    }

    pub fn finish(mut self, cancelled: bool) -> (ResolutionMap, DiagnosticsReport) {
        self.diagnostics.cancelled = cancelled;
        (self.map, self.diagnostics)
    }
}

/// Aggregate a complete list of outcomes
pub fn aggregate(
    outcomes: &[ResolutionOutcome],
    cancelled: bool,
) -> (ResolutionMap, DiagnosticsReport) {
    let mut aggregator = ResultAggregator::new();
    for outcome in outcomes {
        aggregator.push(outcome);
    }
    aggregator.finish(cancelled)
}
