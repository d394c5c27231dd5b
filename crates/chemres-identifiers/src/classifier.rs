//! Identifier class inference

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::smiles::is_smiles_like;
use crate::validators::{is_cas_shaped, is_inchikey_shaped};

/// Syntactic class of a raw identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierClass {
    /// Common or systematic name, free text
    Name,
    /// CAS registry number
    CasNumber,
    /// SMILES structure string
    Smiles,
    /// Hashed InChI key
    #[serde(rename = "inchikey")]
    InChIKey,
    /// Blank input, no strategy applies
    Unknown,
}

impl IdentifierClass {
    /// Resolvable classes ordered from most to least specific.
    pub const SPECIFICITY_ORDER: [IdentifierClass; 4] = [
        IdentifierClass::InChIKey,
        IdentifierClass::CasNumber,
        IdentifierClass::Smiles,
        IdentifierClass::Name,
    ];

    /// Stable machine-readable tag
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierClass::Name => "name",
            IdentifierClass::CasNumber => "cas_number",
            IdentifierClass::Smiles => "smiles",
            IdentifierClass::InChIKey => "inchikey",
            IdentifierClass::Unknown => "unknown",
        }
    }

    /// Human-readable label
    pub fn display_name(&self) -> &'static str {
        match self {
            IdentifierClass::Name => "Name",
            IdentifierClass::CasNumber => "CAS number",
            IdentifierClass::Smiles => "SMILES",
            IdentifierClass::InChIKey => "InChIKey",
            IdentifierClass::Unknown => "Unknown",
        }
    }

    /// Whether `raw` is syntactically acceptable input for this class.
    ///
    /// Every non-blank string is an acceptable name.
    pub fn accepts(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return *self == IdentifierClass::Unknown;
        }
        match self {
            IdentifierClass::InChIKey => is_inchikey_shaped(trimmed),
            IdentifierClass::CasNumber => is_cas_shaped(trimmed),
            IdentifierClass::Smiles => is_smiles_like(trimmed),
            IdentifierClass::Name => true,
            IdentifierClass::Unknown => false,
        }
    }
}

impl fmt::Display for IdentifierClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Infer the class of a raw identifier.
///
/// Never fails. Blank input is `Unknown`; anything that matches no structured
/// pattern is a `Name`.
pub fn classify(raw: &str) -> IdentifierClass {
    compatible_classes(raw)
        .first()
        .copied()
        .unwrap_or(IdentifierClass::Unknown)
}

/// Every resolvable class whose syntax `raw` satisfies, most specific first.
///
/// The first element is the class `classify` returns. Empty for blank input.
pub fn compatible_classes(raw: &str) -> Vec<IdentifierClass> {
    IdentifierClass::SPECIFICITY_ORDER
        .iter()
        .copied()
        .filter(|class| class.accepts(raw))
        .collect()
}
