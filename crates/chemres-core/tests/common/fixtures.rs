//! Test fixture loading utilities

use std::path::PathBuf;

use chemres_core::{HttpResponse, PubChemSource, ResolverConfig, DEFAULT_BASE_URL};
use url::Url;

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Load a fixture file as a string
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// Load a mock API response fixture
pub fn load_response_fixture(name: &str) -> String {
    load_fixture(&format!("responses/{}", name))
}

/// Response with a fixture body
pub fn response_fixture(status: u16, name: &str) -> HttpResponse {
    HttpResponse::new(status, load_response_fixture(name))
}

/// `IdentifierList` body for the given CIDs
pub fn cid_list(cids: &[u64]) -> HttpResponse {
    let body = serde_json::json!({ "IdentifierList": { "CID": cids } });
    HttpResponse::new(200, body.to_string())
}

/// Property table with one synthetic row per CID
pub fn property_rows(cids: &[u64]) -> HttpResponse {
    let rows: Vec<_> = cids
        .iter()
        .map(|cid| {
            serde_json::json!({
                "CID": cid,
                "MolecularWeight": format!("{}.5", cid % 500),
                "IsomericSMILES": "C",
                "IUPACName": format!("compound-{}", cid),
                "Title": format!("Compound {}", cid),
            })
        })
        .collect();
    let body = serde_json::json!({ "PropertyTable": { "Properties": rows } });
    HttpResponse::new(200, body.to_string())
}

pub fn not_found() -> HttpResponse {
    response_fixture(404, "fault_not_found.json")
}

/// CIDs in a property request URL
pub fn requested_cids(url: &str) -> Vec<u64> {
    url.split("/cid/")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .map(|list| list.split(',').filter_map(|c| c.parse().ok()).collect())
        .unwrap_or_default()
}

fn base() -> Url {
    Url::parse(DEFAULT_BASE_URL).unwrap()
}

pub fn name_url(name: &str) -> String {
    PubChemSource::cids_by_name_url(&base(), name)
        .unwrap()
        .to_string()
}

pub fn cas_url(cas: &str) -> String {
    PubChemSource::cids_by_registry_number_url(&base(), cas)
        .unwrap()
        .to_string()
}

pub fn smiles_url(smiles: &str) -> String {
    PubChemSource::cids_by_smiles_url(&base(), smiles)
        .unwrap()
        .to_string()
}

pub fn inchikey_url(key: &str) -> String {
    PubChemSource::cids_by_inchikey_url(&base(), key)
        .unwrap()
        .to_string()
}

/// Default configuration with retries that finish quickly in paused time
pub fn test_config() -> ResolverConfig {
    let mut config = ResolverConfig::default();
    config.rate_limit.max_attempts = 3;
    config.rate_limit.initial_backoff_ms = 100;
    config.rate_limit.max_backoff_ms = 400;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_path() {
        let path = fixture_path("responses/fault_not_found.json");
        assert!(path.to_string_lossy().contains("test_fixtures"));
    }

    #[test]
    fn test_requested_cids() {
        let url = format!(
            "{}/compound/cid/7410,6184/property/MolecularWeight/JSON",
            DEFAULT_BASE_URL
        );
        assert_eq!(requested_cids(&url), vec![7410, 6184]);
    }
}
