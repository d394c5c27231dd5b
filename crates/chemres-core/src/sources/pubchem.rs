//! PubChem PUG REST source plugin
//!
//! API docs: https://pubchem.ncbi.nlm.nih.gov/docs/pug-rest
//! Rate limit: 5 requests/sec, 400 requests/min per client

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::traits::SourceError;
use crate::config::ConfigError;
use crate::domain::{ChemicalRecord, Cid};
use crate::error::LookupError;
use crate::http::{HttpResponse, HttpTransport, RateLimitedClient};

/// Properties requested for every enrichment batch
pub const PROPERTY_LIST: &str = "MolecularWeight,IsomericSMILES,IUPACName,Title";

const TRACING_TARGET: &str = "chemres::pubchem";

#[derive(Debug, Deserialize)]
struct IdentifierListResponse {
    #[serde(rename = "IdentifierList")]
    identifier_list: IdentifierList,
}

#[derive(Debug, Deserialize)]
struct IdentifierList {
    #[serde(rename = "CID", default)]
    cid: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct FaultResponse {
    #[serde(rename = "Fault")]
    fault: Fault,
}

#[derive(Debug, Deserialize)]
struct Fault {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct PropertyTableResponse {
    #[serde(rename = "PropertyTable")]
    property_table: PropertyTable,
}

#[derive(Debug, Deserialize)]
struct PropertyTable {
    #[serde(rename = "Properties", default)]
    properties: Vec<PropertyRow>,
}

#[derive(Debug, Deserialize)]
struct PropertyRow {
    #[serde(rename = "CID")]
    cid: u64,
    #[serde(rename = "MolecularWeight", default)]
    molecular_weight: Option<NumberOrText>,
    // Newer service versions report isomeric SMILES under "SMILES"
    #[serde(rename = "IsomericSMILES", alias = "SMILES", default)]
    smiles: Option<String>,
    #[serde(rename = "IUPACName", default)]
    iupac_name: Option<String>,
    #[serde(rename = "Title", default)]
    title: Option<String>,
}

/// Molecular weight arrives as a string in current responses, as a number in
/// older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|v| v.is_finite())
    }
}

/// URL construction and response parsing for PUG REST
pub struct PubChemSource;

impl PubChemSource {
    /// `compound/name/{name}/cids/JSON`
    pub fn cids_by_name_url(base: &Url, name: &str) -> Result<Url, SourceError> {
        endpoint(base, &["compound", "name", name, "cids", "JSON"])
    }

    /// `compound/xref/RN/{cas}/cids/JSON`
    pub fn cids_by_registry_number_url(base: &Url, cas: &str) -> Result<Url, SourceError> {
        endpoint(base, &["compound", "xref", "RN", cas, "cids", "JSON"])
    }

    /// `compound/smiles/cids/JSON?smiles=...`
    ///
    /// SMILES goes in the query string so `/`, `\` and `#` survive.
    pub fn cids_by_smiles_url(base: &Url, smiles: &str) -> Result<Url, SourceError> {
        let mut url = endpoint(base, &["compound", "smiles", "cids", "JSON"])?;
        url.query_pairs_mut().append_pair("smiles", smiles);
        Ok(url)
    }

    /// `compound/inchikey/{key}/cids/JSON`
    pub fn cids_by_inchikey_url(base: &Url, inchikey: &str) -> Result<Url, SourceError> {
        endpoint(base, &["compound", "inchikey", inchikey, "cids", "JSON"])
    }

    /// `compound/cid/{cid,cid,...}/property/{PROPERTY_LIST}/JSON`
    pub fn properties_url(base: &Url, cids: &[Cid]) -> Result<Url, SourceError> {
        if cids.is_empty() {
            return Err(SourceError::InvalidQuery("empty CID batch".to_string()));
        }
        let list = cids
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        endpoint(
            base,
            &["compound", "cid", &list, "property", PROPERTY_LIST, "JSON"],
        )
    }

    /// Parse a `cids` lookup response.
    ///
    /// 404 and 400 both mean the identifier is unknown to (or invalid for)
    /// this lookup, as does a successful response with a blank body. A CID
    /// of 0 is PubChem's "no structure" placeholder.
    pub fn parse_cid_response(response: &HttpResponse) -> Result<Vec<Cid>, SourceError> {
        match response.status {
            404 | 400 => return Err(SourceError::NotFound),
            s if !(200..300).contains(&s) => return Err(status_error(response)),
            _ => {}
        }
        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: IdentifierListResponse = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::Parse(format!("Invalid PubChem CID list JSON: {}", e)))?;

        let mut cids: Vec<Cid> = Vec::with_capacity(parsed.identifier_list.cid.len());
        for cid in parsed.identifier_list.cid.into_iter().filter_map(Cid::new) {
            if !cids.contains(&cid) {
                cids.push(cid);
            }
        }
        Ok(cids)
    }

    /// Parse a property table response. CIDs the service cannot resolve are
    /// simply absent; a 404 means none of them resolved.
    pub fn parse_property_response(
        response: &HttpResponse,
    ) -> Result<Vec<ChemicalRecord>, SourceError> {
        match response.status {
            404 => return Ok(Vec::new()),
            s if !(200..300).contains(&s) => return Err(status_error(response)),
            _ => {}
        }
        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: PropertyTableResponse = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::Parse(format!("Invalid PubChem property JSON: {}", e)))?;

        Ok(parsed
            .property_table
            .properties
            .into_iter()
            .filter_map(Self::parse_row)
            .collect())
    }

    fn parse_row(row: PropertyRow) -> Option<ChemicalRecord> {
        Some(ChemicalRecord {
            cid: Cid::new(row.cid)?,
            molecular_weight: row.molecular_weight.as_ref().and_then(NumberOrText::as_f64),
            smiles: non_empty(row.smiles),
            iupac_name: non_empty(row.iupac_name),
            title: non_empty(row.title),
        })
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, SourceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SourceError::InvalidQuery(format!("cannot append path to {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn status_error(response: &HttpResponse) -> SourceError {
    let message = serde_json::from_str::<FaultResponse>(&response.body)
        .map(|f| format!("{} {}", f.fault.code, f.fault.message).trim().to_string())
        .unwrap_or_else(|_| response.body.chars().take(200).collect());
    SourceError::Status {
        status: response.status,
        message,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// PubChem client: endpoint construction plus the shared rate-limited transport
pub struct PubChemClient<T> {
    http: RateLimitedClient<T>,
    base: Url,
}

impl<T: HttpTransport> PubChemClient<T> {
    pub fn new(http: RateLimitedClient<T>, base_url: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn http(&self) -> &RateLimitedClient<T> {
        &self.http
    }

    /// Run one CID lookup. An empty list is "no match", not an error.
    pub async fn lookup_cids(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Vec<Cid>, LookupError> {
        let response = self.http.get(url.as_str(), cancel).await?;
        match PubChemSource::parse_cid_response(&response) {
            Ok(cids) => Ok(cids),
            Err(SourceError::NotFound) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    url = %url,
                    status = response.status,
                    "No CID found"
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch property rows for one batch of CIDs
    pub async fn fetch_properties(
        &self,
        cids: &[Cid],
        cancel: &CancellationToken,
    ) -> Result<Vec<ChemicalRecord>, LookupError> {
        let url = PubChemSource::properties_url(&self.base, cids)?;
        let response = self.http.get(url.as_str(), cancel).await?;
        Ok(PubChemSource::parse_property_response(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BASE_URL;

    const SAMPLE_CIDS: &str = r#"{"IdentifierList": {"CID": [440917]}}"#;

    const SAMPLE_FAULT: &str = r#"{
  "Fault": {
    "Code": "PUGREST.NotFound",
    "Message": "No CID found",
    "Details": ["No CID found that matches the given name"]
  }
}"#;

    const SAMPLE_PROPERTIES: &str = r#"{
  "PropertyTable": {
    "Properties": [
      {
        "CID": 7410,
        "MolecularWeight": "120.15",
        "IsomericSMILES": "CC(=O)C1=CC=CC=C1",
        "IUPACName": "1-phenylethanone",
        "Title": "Acetophenone"
      },
      {
        "CID": 6184,
        "MolecularWeight": 100.16,
        "SMILES": "CCCCCC=O",
        "IUPACName": "hexanal",
        "Title": "Hexanal"
      }
    ]
  }
}"#;

    fn base() -> Url {
        Url::parse(DEFAULT_BASE_URL).unwrap()
    }

    fn cid(v: u64) -> Cid {
        Cid::new(v).unwrap()
    }

    #[test]
    fn test_name_url_encodes_segment() {
        let url = PubChemSource::cids_by_name_url(&base(), "acetic acid").unwrap();
        assert_eq!(
            url.as_str(),
            "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/name/acetic%20acid/cids/JSON"
        );
    }

    #[test]
    fn test_smiles_url_uses_query() {
        let url = PubChemSource::cids_by_smiles_url(&base(), "F/C=C/F").unwrap();
        assert!(url.path().ends_with("/compound/smiles/cids/JSON"));
        assert_eq!(
            url.query_pairs().next().map(|(k, v)| (k.into_owned(), v.into_owned())),
            Some(("smiles".to_string(), "F/C=C/F".to_string()))
        );
    }

    #[test]
    fn test_registry_number_url() {
        let url = PubChemSource::cids_by_registry_number_url(&base(), "98-86-2").unwrap();
        assert!(url.as_str().ends_with("/compound/xref/RN/98-86-2/cids/JSON"));
    }

    #[test]
    fn test_properties_url_joins_cids() {
        let url = PubChemSource::properties_url(&base(), &[cid(7410), cid(6184)]).unwrap();
        assert!(url
            .as_str()
            .ends_with("/compound/cid/7410,6184/property/MolecularWeight,IsomericSMILES,IUPACName,Title/JSON"));
        assert!(PubChemSource::properties_url(&base(), &[]).is_err());
    }

    #[test]
    fn test_parse_cid_response() {
        let cids = PubChemSource::parse_cid_response(&HttpResponse::new(200, SAMPLE_CIDS)).unwrap();
        assert_eq!(cids, vec![cid(440917)]);
    }

    #[test]
    fn test_parse_cid_response_drops_zero_and_duplicates() {
        let body = r#"{"IdentifierList": {"CID": [0]}}"#;
        assert!(PubChemSource::parse_cid_response(&HttpResponse::new(200, body))
            .unwrap()
            .is_empty());

        let body = r#"{"IdentifierList": {"CID": [5, 3, 5]}}"#;
        assert_eq!(
            PubChemSource::parse_cid_response(&HttpResponse::new(200, body)).unwrap(),
            vec![cid(5), cid(3)]
        );
    }

    #[test]
    fn test_parse_cid_not_found() {
        let resp = HttpResponse::new(404, SAMPLE_FAULT);
        assert_eq!(
            PubChemSource::parse_cid_response(&resp),
            Err(SourceError::NotFound)
        );
    }

    #[test]
    fn test_parse_cid_malformed() {
        let resp = HttpResponse::new(200, "<html>oops</html>");
        assert!(matches!(
            PubChemSource::parse_cid_response(&resp),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_blank_success_body_is_no_match() {
        for body in ["", "  \n"] {
            let resp = HttpResponse::new(200, body);
            assert_eq!(PubChemSource::parse_cid_response(&resp), Ok(Vec::new()));
            assert_eq!(
                PubChemSource::parse_property_response(&resp).map(|r| r.len()),
                Ok(0)
            );
        }
    }

    #[test]
    fn test_parse_cid_unexpected_status_keeps_fault_message() {
        let resp = HttpResponse::new(405, SAMPLE_FAULT);
        match PubChemSource::parse_cid_response(&resp) {
            Err(SourceError::Status { status, message }) => {
                assert_eq!(status, 405);
                assert!(message.contains("PUGREST.NotFound"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_property_response() {
        let records =
            PubChemSource::parse_property_response(&HttpResponse::new(200, SAMPLE_PROPERTIES))
                .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cid, cid(7410));
        assert_eq!(records[0].molecular_weight, Some(120.15));
        assert_eq!(records[0].title.as_deref(), Some("Acetophenone"));
        assert_eq!(records[1].molecular_weight, Some(100.16));
        assert_eq!(records[1].smiles.as_deref(), Some("CCCCCC=O"));
    }

    #[test]
    fn test_parse_property_not_found_is_empty() {
        let records =
            PubChemSource::parse_property_response(&HttpResponse::new(404, SAMPLE_FAULT)).unwrap();
        assert!(records.is_empty());
    }
}
