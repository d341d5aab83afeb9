//! Code lookup by free text within a value set (`ValueSet/$expand`)

use serde_json::Value;

use crate::errors::TerminologyError;
use crate::terminology_client::TerminologyClient;

pub const NO_MATCH_TEXT: &str = "No matching codes found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub filter: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Value),
    NoMatch,
}

impl LookupOutcome {
    pub fn render(&self) -> Result<String, TerminologyError> {
        match self {
            Self::Found(coding) => {
                serde_json::to_string_pretty(coding).map_err(TerminologyError::decode)
            }
            Self::NoMatch => Ok(NO_MATCH_TEXT.to_string()),
        }
    }
}

/// Runs one expansion and keeps only the top-ranked entry; the server's order is trusted.
pub async fn lookup_code(
    client: &dyn TerminologyClient,
    request: &LookupRequest,
) -> Result<LookupOutcome, TerminologyError> {
    let value_set = client.expand_value_set(request).await?;

    Ok(match value_set.first_match() {
        Some(coding) => LookupOutcome::Found(coding.clone()),
        None => LookupOutcome::NoMatch,
    })
}
