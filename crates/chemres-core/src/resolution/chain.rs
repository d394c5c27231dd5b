//! Primary-then-fallback strategy orchestration for one identifier

use chemres_identifiers::{classify, IdentifierClass};
use tokio_util::sync::CancellationToken;

use super::strategy::{run_strategy, strategy_for, strategy_order};
use crate::domain::ResolutionOutcome;
use crate::error::LookupError;
use crate::http::HttpTransport;
use crate::sources::PubChemClient;

const TRACING_TARGET: &str = "chemres::resolution";

/// Runs the dispatch table for one identifier at a time.
///
/// The outcome depends only on the identifier and the service's answers, so
/// identical inputs against an unchanged database give identical outcomes.
pub struct ResolutionStrategyChain<'a, T> {
    client: &'a PubChemClient<T>,
    fallback: bool,
}

impl<'a, T: HttpTransport> ResolutionStrategyChain<'a, T> {
    pub fn new(client: &'a PubChemClient<T>, fallback: bool) -> Self {
        Self { client, fallback }
    }

    /// Strategies that will be tried for `raw`, in order
    pub fn plan(&self, raw: &str, class: IdentifierClass) -> Vec<IdentifierClass> {
        let compatible = strategy_order(class)
            .iter()
            .copied()
            .filter(|c| c.accepts(raw));
        if self.fallback {
            compatible.collect()
        } else {
            compatible.take(1).collect()
        }
    }

    /// Resolve one identifier.
    ///
    /// Stops at the first strategy with candidates, or at the first service
    /// error. Only an unreachable service is returned as `Err`; cancellation
    /// yields a skipped outcome.
    pub async fn resolve_one(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolutionOutcome, LookupError> {
        let class = classify(raw);
        let mut outcome = ResolutionOutcome::skipped(raw, class);

        for (position, strategy_class) in self.plan(raw, class).into_iter().enumerate() {
            let Some(strategy) = strategy_for(strategy_class) else {
                continue;
            };

            outcome.strategy = Some(strategy_class);
            outcome.used_fallback = position > 0;

            match run_strategy(strategy, self.client, raw, cancel).await {
                Ok(candidates) if candidates.is_empty() => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        identifier = raw,
                        strategy = strategy_class.as_str(),
                        "No match"
                    );
                }
                Ok(candidates) => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        identifier = raw,
                        strategy = strategy_class.as_str(),
                        candidates = candidates.len(),
                        fallback = outcome.used_fallback,
                        "Matched"
                    );
                    outcome.candidates = candidates;
                    outcome.attempted = true;
                    return Ok(outcome);
                }
                Err(LookupError::Cancelled) => {
                    return Ok(ResolutionOutcome::skipped(raw, class));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        identifier = raw,
                        strategy = strategy_class.as_str(),
                        error = %e,
                        "Lookup failed"
                    );
                    outcome.failure = Some(e.to_string());
                    outcome.attempted = true;
                    return Ok(outcome);
                }
            }
        }

        outcome.attempted = true;
        Ok(outcome)
    }
}
