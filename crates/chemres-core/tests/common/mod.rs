//! Shared helpers for chemres-core integration tests
#![allow(dead_code)]

pub mod fixtures;
pub mod transport;
