//! Syntactic classification of chemical identifiers
//!
//! This crate decides, without any network access, what kind of identifier
//! a raw user-supplied string most likely is:
//! - InChIKey (27-character full key or 25-character key without suffix)
//! - CAS registry number (dashed or bare digits)
//! - SMILES structure string
//! - free-text name (the permissive default)
//!
//! It also carries the small normalization helpers the lookup strategies need.

pub mod classifier;
pub mod smiles;
pub mod validators;

pub use classifier::*;
pub use smiles::is_smiles_like;
pub use validators::*;
