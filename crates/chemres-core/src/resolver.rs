//! The resolver: entry point for `resolve` and `enrich`

use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::cache::Memo;
use crate::config::ResolverConfig;
use crate::domain::{ChemicalRecord, Cid, DiagnosticsReport, ResolutionMap, ResolutionOutcome};
use crate::enrichment::{BatchEnrichmentFetcher, EnrichmentRun};
use crate::error::{ChemResError, LookupError, Result};
use crate::http::{HttpTransport, RateLimitedClient};
use crate::resolution::{aggregate, ResolutionStrategyChain};
use crate::sources::PubChemClient;

const TRACING_TARGET: &str = "chemres::resolution";

/// Per-identifier outcomes alongside the aggregated map and diagnostics
#[derive(Debug, Clone, Default)]
pub struct ResolutionRun {
    /// One outcome per input identifier, in input order
    pub outcomes: Vec<ResolutionOutcome>,
    pub map: ResolutionMap,
    pub diagnostics: DiagnosticsReport,
}

impl ResolutionRun {
    pub fn into_parts(self) -> (ResolutionMap, DiagnosticsReport) {
        (self.map, self.diagnostics)
    }
}

/// Resolves identifiers to CIDs and enriches CIDs into records.
///
/// All calls share one rate-limited client, so concurrent `resolve` and
/// `enrich` calls on the same resolver respect a single call budget.
pub struct Resolver<T> {
    client: PubChemClient<T>,
    config: ResolverConfig,
    memo: Option<Memo>,
}

#[cfg(feature = "native")]
impl Resolver<crate::http::HttpClient> {
    /// Resolver backed by reqwest
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let transport = crate::http::HttpClient::new(
            &config.service.user_agent,
            config.service.request_timeout(),
        )
        .map_err(|e| ChemResError::Client(e.to_string()))?;
        Self::with_transport(config, transport)
    }
}

impl<T: HttpTransport> Resolver<T> {
    /// Resolver over any transport. Fails on invalid configuration.
    pub fn with_transport(config: ResolverConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let http = RateLimitedClient::from_config(transport, &config);
        let client = PubChemClient::new(http, &config.service.base_url)?;
        let memo = config.memoize.then(Memo::new);
        Ok(Self {
            client,
            config,
            memo,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn client(&self) -> &PubChemClient<T> {
        &self.client
    }

    pub fn memo(&self) -> Option<&Memo> {
        self.memo.as_ref()
    }

    /// Map every identifier to a CID or to nothing.
    ///
    /// The map has exactly one entry per input, in input order, duplicates
    /// included. Fails only when the service cannot be reached at all.
    pub async fn resolve<I, S>(&self, identifiers: I) -> Result<(ResolutionMap, DiagnosticsReport)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolve_with_cancel(identifiers, &CancellationToken::new())
            .await
    }

    /// `resolve` with cooperative cancellation.
    ///
    /// Identifiers not attempted before the token fires map to nothing and
    /// are listed under `skipped`.
    pub async fn resolve_with_cancel<I, S>(
        &self,
        identifiers: I,
        cancel: &CancellationToken,
    ) -> Result<(ResolutionMap, DiagnosticsReport)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.resolve_detailed(identifiers, cancel).await?.into_parts())
    }

    /// `resolve` keeping the per-identifier outcomes
    pub async fn resolve_detailed<I, S>(
        &self,
        identifiers: I,
        cancel: &CancellationToken,
    ) -> Result<ResolutionRun>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identifiers: Vec<String> = identifiers
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let chain = ResolutionStrategyChain::new(&self.client, self.config.resolution.fallback);

        tracing::info!(
            target: TRACING_TARGET,
            identifiers = identifiers.len(),
            concurrency = self.config.resolution.concurrency,
            fallback = self.config.resolution.fallback,
            "Resolving identifiers"
        );

        let outcomes: Vec<ResolutionOutcome> = stream::iter(identifiers.iter())
            .map(|raw| self.resolve_memoized(&chain, raw, cancel))
            .buffered(self.config.resolution.concurrency)
            .try_collect()
            .await
            .map_err(fatal)?;

        let (map, diagnostics) = aggregate(&outcomes, cancel.is_cancelled());

        tracing::info!(
            target: TRACING_TARGET,
            resolved = map.cids().len(),
            unmatched = diagnostics.unmatched.len(),
            ambiguous = diagnostics.ambiguous.len(),
            failures = diagnostics.failures.len(),
            skipped = diagnostics.skipped.len(),
            calls = self.client.http().calls_made(),
            "Resolution finished"
        );

        Ok(ResolutionRun {
            outcomes,
            map,
            diagnostics,
        })
    }

    async fn resolve_memoized(
        &self,
        chain: &ResolutionStrategyChain<'_, T>,
        raw: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<ResolutionOutcome, LookupError> {
        if let Some(hit) = self.memo.as_ref().and_then(|m| m.outcome(raw)) {
            tracing::trace!(target: TRACING_TARGET, identifier = raw, "Memo hit");
            return Ok(hit);
        }
        let outcome = chain.resolve_one(raw, cancel).await?;
        if let Some(memo) = &self.memo {
            memo.store_outcome(&outcome);
        }
        Ok(outcome)
    }

    /// Fetch one record per distinct CID, sorted by CID.
    ///
    /// CIDs the service does not return are listed under `unmatched`; CIDs
    /// of failed batches under `failures`.
    pub async fn enrich<I>(&self, cids: I) -> Result<(Vec<ChemicalRecord>, DiagnosticsReport)>
    where
        I: IntoIterator<Item = Cid>,
    {
        self.enrich_with_cancel(cids, &CancellationToken::new())
            .await
    }

    /// `enrich` with cooperative cancellation
    pub async fn enrich_with_cancel<I>(
        &self,
        cids: I,
        cancel: &CancellationToken,
    ) -> Result<(Vec<ChemicalRecord>, DiagnosticsReport)>
    where
        I: IntoIterator<Item = Cid>,
    {
        Ok(self.enrich_detailed(cids, cancel).await?.into_parts())
    }

    /// `enrich` reporting the number of batch requests issued
    pub async fn enrich_detailed<I>(
        &self,
        cids: I,
        cancel: &CancellationToken,
    ) -> Result<EnrichmentRun>
    where
        I: IntoIterator<Item = Cid>,
    {
        let fetcher = BatchEnrichmentFetcher::new(
            &self.client,
            self.config.enrichment.batch_size,
            self.config.enrichment.concurrency,
        )
        .with_memo(self.memo.as_ref());

        let run = fetcher.fetch(cids, cancel).await.map_err(fatal)?;

        tracing::info!(
            target: "chemres::enrichment",
            records = run.records.len(),
            batches = run.batches,
            unmatched = run.diagnostics.unmatched.len(),
            failures = run.diagnostics.failures.len(),
            skipped = run.diagnostics.skipped.len(),
            "Enrichment finished"
        );

        Ok(run)
    }

    /// Blocking `resolve` for synchronous callers. Must not be called from
    /// inside an async runtime.
    pub fn resolve_blocking<I, S>(&self, identifiers: I) -> Result<(ResolutionMap, DiagnosticsReport)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        block_on(self.resolve(identifiers))?
    }

    /// Blocking `enrich`. Must not be called from inside an async runtime.
    pub fn enrich_blocking<I>(&self, cids: I) -> Result<(Vec<ChemicalRecord>, DiagnosticsReport)>
    where
        I: IntoIterator<Item = Cid>,
    {
        block_on(self.enrich(cids))?
    }
}

fn fatal(error: LookupError) -> ChemResError {
    match error {
        LookupError::Unreachable(message) => ChemResError::ServiceUnreachable(message),
        other => ChemResError::ServiceUnreachable(other.to_string()),
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
