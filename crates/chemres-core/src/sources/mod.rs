//! Source plugins for the external compound database

pub mod pubchem;
pub mod traits;

pub use pubchem::*;
pub use traits::*;
