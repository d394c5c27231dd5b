//! Shape checks and normalization for structured identifiers

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Full InChIKey: 14-char skeleton hash, 8-char stereo hash + flag + version,
    // optional single-char protonation suffix
    static ref INCHIKEY_REGEX: Regex =
        Regex::new(r"^[A-Z]{14}-[A-Z]{8}[SN]A(?:-[A-Z])?$").unwrap();

    // CAS registry number: 2-7 digits, 2 digits, 1 check digit
    static ref CAS_DASHED_REGEX: Regex = Regex::new(r"^(\d{2,7})-(\d{2})-(\d)$").unwrap();

    // CAS registry number written without dashes
    static ref CAS_BARE_REGEX: Regex = Regex::new(r"^\d{5,10}$").unwrap();

    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Check whether a string has InChIKey shape (27 or 25 characters)
pub fn is_inchikey_shaped(value: &str) -> bool {
    INCHIKEY_REGEX.is_match(value)
}

/// Check whether a string has CAS registry number shape, dashed or bare
pub fn is_cas_shaped(value: &str) -> bool {
    CAS_DASHED_REGEX.is_match(value) || CAS_BARE_REGEX.is_match(value)
}

/// Normalize a CAS number to its dashed form.
///
/// Bare digit strings are split into `body-NN-C`. Returns `None` if the input
/// has no CAS shape.
pub fn normalize_cas(value: &str) -> Option<String> {
    let value = value.trim();
    if CAS_DASHED_REGEX.is_match(value) {
        return Some(value.to_string());
    }
    if !CAS_BARE_REGEX.is_match(value) {
        return None;
    }
    let (head, check) = value.split_at(value.len() - 1);
    let (body, middle) = head.split_at(head.len() - 2);
    Some(format!("{}-{}-{}", body, middle, check))
}

/// Validate the CAS check digit.
///
/// The check digit equals the sum of the other digits, each weighted by its
/// position counted from the right, modulo 10.
pub fn is_valid_cas_checksum(value: &str) -> bool {
    let Some(dashed) = normalize_cas(value) else {
        return false;
    };
    let digits: Vec<u32> = dashed.chars().filter_map(|c| c.to_digit(10)).collect();
    let Some((&check, body)) = digits.split_last() else {
        return false;
    };

    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| d * (i as u32 + 1))
        .sum();
    sum % 10 == check
}

/// Normalize a free-text name for lookup: NFKC, trimmed, inner whitespace
/// collapsed to single spaces.
pub fn normalize_name(value: &str) -> String {
    let composed: String = value.nfkc().collect();
    WHITESPACE_RUN
        .replace_all(composed.trim(), " ")
        .into_owned()
}
