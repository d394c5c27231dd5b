//! Domain types shared by resolution and enrichment

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chemres_identifiers::IdentifierClass;
use serde::{Deserialize, Serialize};

/// PubChem compound identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Cid(u64);

impl Cid {
    /// Returns `None` for zero, which PubChem uses to mean "no compound".
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Cid(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Cid {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Cid::new(value).ok_or_else(|| "CID must be a positive integer".to_string())
    }
}

impl From<Cid> for u64 {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl FromStr for Cid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|e| format!("Invalid CID '{}': {}", s, e))?;
        Cid::try_from(value)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a single identifier's resolution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Exactly one candidate
    Resolved,
    /// More than one candidate
    Ambiguous,
    /// Every compatible strategy answered with no candidates
    Unmatched,
    /// A strategy failed with a service error after retries
    Failed,
    /// Never attempted because the operation was cancelled
    Skipped,
}

/// Result of running the strategy chain for one raw identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// The raw identifier exactly as supplied
    pub identifier: String,
    /// Class assigned by the classifier
    pub class: IdentifierClass,
    /// Candidate CIDs in the order the service returned them
    pub candidates: Vec<Cid>,
    /// Strategy that produced the final answer, if any ran
    pub strategy: Option<IdentifierClass>,
    /// Whether a strategy other than the primary one was tried
    pub used_fallback: bool,
    /// Service failure message when the chain stopped on an error
    pub failure: Option<String>,
    /// False when cancellation prevented a complete attempt
    pub attempted: bool,
}

impl ResolutionOutcome {
    /// Outcome for an identifier the chain never got to finish
    pub fn skipped(identifier: impl Into<String>, class: IdentifierClass) -> Self {
        Self {
            identifier: identifier.into(),
            class,
            candidates: Vec::new(),
            strategy: None,
            used_fallback: false,
            failure: None,
            attempted: false,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        if !self.attempted {
            return OutcomeStatus::Skipped;
        }
        match self.candidates.len() {
            0 if self.failure.is_some() => OutcomeStatus::Failed,
            0 => OutcomeStatus::Unmatched,
            1 => OutcomeStatus::Resolved,
            _ => OutcomeStatus::Ambiguous,
        }
    }

    /// Candidate accepted into the map: the first one returned
    pub fn accepted(&self) -> Option<Cid> {
        self.candidates.first().copied()
    }
}

/// One entry of a `ResolutionMap`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionEntry {
    pub identifier: String,
    pub cid: Option<Cid>,
}

/// Identifier to CID mapping in input order.
///
/// Duplicated identifiers keep one entry each, so this is a sequence rather
/// than a hash map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionMap {
    entries: Vec<ResolutionEntry>,
}

impl ResolutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, identifier: impl Into<String>, cid: Option<Cid>) {
        self.entries.push(ResolutionEntry {
            identifier: identifier.into(),
            cid,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ResolutionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<Cid>)> {
        self.entries.iter().map(|e| (e.identifier.as_str(), e.cid))
    }

    /// CID for the first entry with this exact identifier.
    ///
    /// Outer `None`: identifier not in the map. Inner `None`: unresolved.
    pub fn get(&self, identifier: &str) -> Option<Option<Cid>> {
        self.entries
            .iter()
            .find(|e| e.identifier == identifier)
            .map(|e| e.cid)
    }

    /// Map values in input order, `None` for unresolved entries
    pub fn values(&self) -> Vec<Option<Cid>> {
        self.entries.iter().map(|e| e.cid).collect()
    }

    /// Distinct resolved CIDs, ready to feed into enrichment
    pub fn cids(&self) -> BTreeSet<Cid> {
        self.entries.iter().filter_map(|e| e.cid).collect()
    }
}

/// An identifier that matched several compounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousMatch {
    pub identifier: String,
    /// All candidates, in service order; the first is the one mapped
    pub candidates: Vec<Cid>,
}

/// An identifier or CID whose lookup failed with a service error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub subject: String,
    pub reason: String,
}

/// Everything a caller should look at besides the primary result.
///
/// Enrichment reports CIDs the service did not return under `unmatched`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub unmatched: Vec<String>,
    pub ambiguous: Vec<AmbiguousMatch>,
    pub failures: Vec<Failure>,
    /// Not attempted because of cancellation
    pub skipped: Vec<String>,
    pub cancelled: bool,
}

impl DiagnosticsReport {
    /// True when nothing needs the caller's attention
    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty()
            && self.ambiguous.is_empty()
            && self.failures.is_empty()
            && self.skipped.is_empty()
            && !self.cancelled
    }
}

/// Standardized descriptive record for one compound.
///
/// Field order is the column order of the tabular export; `cid` is the
/// primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalRecord {
    pub cid: Cid,
    pub molecular_weight: Option<f64>,
    /// Isomeric SMILES
    pub smiles: Option<String>,
    pub iupac_name: Option<String>,
    /// Common name (PubChem title)
    pub title: Option<String>,
}
