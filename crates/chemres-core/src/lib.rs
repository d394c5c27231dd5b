//! Chemres Core - Chemical identifier resolution and record enrichment
//!
//! This crate turns heterogeneous compound identifiers into PubChem compound
//! IDs (CIDs) and CIDs into standardized descriptive records:
//!
//! - **Classification**: Name, CAS number, SMILES or InChIKey (see `chemres-identifiers`)
//! - **Strategies**: One PubChem lookup per identifier class
//! - **Chain**: Primary strategy first, then less specific compatible ones
//! - **Rate limiting**: One shared client with call spacing, timeouts and bounded retries
//! - **Aggregation**: One map entry per input plus a diagnostics report
//! - **Enrichment**: Batched property retrieval with per-batch failure isolation
//! - **Config**: Every tunable passed in at construction
//!
//! # Architecture
//!
//! ```text
//! identifiers ─▶ classify ─▶ strategy chain ─▶ aggregator ─▶ (map, diagnostics)
//!                                  │
//!                        rate-limited client ◀── enrichment batches ◀── CIDs
//! ```
//!
//! Both operations report per-item problems through `DiagnosticsReport` and
//! fail as a whole only when the service cannot be reached.

pub mod cache;
pub mod config;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod http;
pub mod resolution;
pub mod resolver;
pub mod sources;

pub use cache::Memo;
pub use config::{
    ConfigError, EnrichmentConfig, RateLimitConfig, ResolutionConfig, ResolverConfig,
    ServiceConfig, DEFAULT_BASE_URL, MAX_BATCH,
};
pub use domain::{
    AmbiguousMatch, ChemicalRecord, Cid, DiagnosticsReport, Failure, OutcomeStatus,
    ResolutionEntry, ResolutionMap, ResolutionOutcome,
};
pub use enrichment::{partition, BatchEnrichmentFetcher, EnrichmentRun};
pub use error::{ChemResError, LookupError, Result};
pub use http::{HttpError, HttpResponse, HttpTransport, RateLimitedClient, RetryPolicy};
pub use resolution::{aggregate, ResolutionStrategyChain, ResultAggregator};
pub use resolver::{ResolutionRun, Resolver};
pub use sources::{PubChemClient, PubChemSource};

pub use chemres_identifiers::{classify, IdentifierClass};

pub use tokio_util::sync::CancellationToken;
