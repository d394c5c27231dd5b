//! Per-class lookup strategies and the fallback dispatch table

use chemres_identifiers::{is_valid_cas_checksum, normalize_cas, normalize_name, IdentifierClass};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::domain::Cid;
use crate::error::LookupError;
use crate::http::HttpTransport;
use crate::sources::{PubChemClient, PubChemSource, SourceError};

const TRACING_TARGET: &str = "chemres::resolution";

/// One way of turning an identifier into candidate CIDs
pub trait ResolutionStrategy: Send + Sync {
    /// Class this strategy understands
    fn class(&self) -> IdentifierClass;

    /// Put the raw identifier into the form the endpoint expects.
    ///
    /// `None` means no request can be made, which counts as no match.
    fn prepare(&self, raw: &str) -> Option<String>;

    fn request_url(&self, base: &Url, prepared: &str) -> Result<Url, SourceError>;
}

/// Case-insensitive free-text lookup; synonym collisions yield several CIDs
pub struct NameStrategy;

/// Registry-number cross-reference lookup
pub struct CasNumberStrategy;

/// Exact structure lookup
pub struct SmilesStrategy;

/// Exact hashed-key lookup
pub struct InChIKeyStrategy;

impl ResolutionStrategy for NameStrategy {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::Name
    }

    fn prepare(&self, raw: &str) -> Option<String> {
        let name = normalize_name(raw);
        (!name.is_empty()).then_some(name)
    }

    fn request_url(&self, base: &Url, prepared: &str) -> Result<Url, SourceError> {
        PubChemSource::cids_by_name_url(base, prepared)
    }
}

impl ResolutionStrategy for CasNumberStrategy {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::CasNumber
    }

    fn prepare(&self, raw: &str) -> Option<String> {
        let cas = normalize_cas(raw)?;
        if !is_valid_cas_checksum(&cas) {
            tracing::debug!(
                target: TRACING_TARGET,
                identifier = raw,
                cas = %cas,
                "CAS check digit mismatch, querying anyway"
            );
        }
        Some(cas)
    }

    fn request_url(&self, base: &Url, prepared: &str) -> Result<Url, SourceError> {
        PubChemSource::cids_by_registry_number_url(base, prepared)
    }
}

impl ResolutionStrategy for SmilesStrategy {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::Smiles
    }

    fn prepare(&self, raw: &str) -> Option<String> {
        let smiles = raw.trim();
        (!smiles.is_empty()).then(|| smiles.to_string())
    }

    fn request_url(&self, base: &Url, prepared: &str) -> Result<Url, SourceError> {
        PubChemSource::cids_by_smiles_url(base, prepared)
    }
}

impl ResolutionStrategy for InChIKeyStrategy {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::InChIKey
    }

    fn prepare(&self, raw: &str) -> Option<String> {
        let key = raw.trim();
        (!key.is_empty()).then(|| key.to_string())
    }

    fn request_url(&self, base: &Url, prepared: &str) -> Result<Url, SourceError> {
        PubChemSource::cids_by_inchikey_url(base, prepared)
    }
}

static NAME: NameStrategy = NameStrategy;
static CAS_NUMBER: CasNumberStrategy = CasNumberStrategy;
static SMILES: SmilesStrategy = SmilesStrategy;
static INCHIKEY: InChIKeyStrategy = InChIKeyStrategy;

/// Strategy implementation for a class; `Unknown` has none
pub fn strategy_for(class: IdentifierClass) -> Option<&'static dyn ResolutionStrategy> {
    match class {
        IdentifierClass::Name => Some(&NAME),
        IdentifierClass::CasNumber => Some(&CAS_NUMBER),
        IdentifierClass::Smiles => Some(&SMILES),
        IdentifierClass::InChIKey => Some(&INCHIKEY),
        IdentifierClass::Unknown => None,
    }
}

/// Primary class → strategies to try, in order.
///
/// Fallbacks follow InChIKey > CasNumber > Smiles > Name and only ever move
/// toward less specific classes. The chain additionally skips any entry whose
/// syntax the identifier does not satisfy.
pub const DISPATCH_TABLE: [(IdentifierClass, &[IdentifierClass]); 5] = [
    (
        IdentifierClass::InChIKey,
        &[
            IdentifierClass::InChIKey,
            IdentifierClass::CasNumber,
            IdentifierClass::Smiles,
            IdentifierClass::Name,
        ],
    ),
    (
        IdentifierClass::CasNumber,
        &[
            IdentifierClass::CasNumber,
            IdentifierClass::Smiles,
            IdentifierClass::Name,
        ],
    ),
    (
        IdentifierClass::Smiles,
        &[IdentifierClass::Smiles, IdentifierClass::Name],
    ),
    (IdentifierClass::Name, &[IdentifierClass::Name]),
    (IdentifierClass::Unknown, &[]),
];

/// Strategy order for an identifier whose primary class is `class`
pub fn strategy_order(class: IdentifierClass) -> &'static [IdentifierClass] {
    DISPATCH_TABLE
        .iter()
        .find(|(primary, _)| *primary == class)
        .map(|(_, order)| *order)
        .unwrap_or(&[])
}

/// Issue one strategy's lookup through the shared client
pub async fn run_strategy<T: HttpTransport>(
    strategy: &dyn ResolutionStrategy,
    client: &PubChemClient<T>,
    raw: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Cid>, LookupError> {
    let Some(prepared) = strategy.prepare(raw) else {
        return Ok(Vec::new());
    };
    let url = strategy.request_url(client.base_url(), &prepared)?;
    client.lookup_cids(&url, cancel).await
}
