//! Code validation against a value set (`ValueSet/$validate-code`)

use serde::Serialize;

use crate::domain::fhir::ParameterMap;
use crate::errors::TerminologyError;
use crate::terminology_client::TerminologyClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub system: String,
    pub code: String,
    pub url: String,
    pub version: Option<String>,
}

/// Normalised answer of `$validate-code`. `valid: false` is an answer, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub code: String,
    pub system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl ValidationResult {
    /// `code` and `system` fall back to the request; `version` never does.
    pub fn project(parameters: &ParameterMap, request: &ValidationRequest) -> Self {
        Self {
            valid: parameters.boolean("result").unwrap_or(false),
            code: parameters
                .text("code")
                .map_or_else(|| request.code.clone(), str::to_string),
            system: parameters
                .text("system")
                .map_or_else(|| request.system.clone(), str::to_string),
            version: parameters.text("version").map(str::to_string),
            display: parameters.text("display").map(str::to_string),
        }
    }

    pub fn render(&self) -> Result<String, TerminologyError> {
        serde_json::to_string_pretty(self).map_err(TerminologyError::decode)
    }
}

pub async fn validate_code(
    client: &dyn TerminologyClient,
    request: &ValidationRequest,
) -> Result<ValidationResult, TerminologyError> {
    let parameters = client.validate_code(request).await?;
    Ok(ValidationResult::project(
        &ParameterMap::from(&parameters),
        request,
    ))
}
