use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::TerminologyConfig;
use crate::domain::{
    fhir::{Parameters, ValueSet},
    lookup::LookupRequest,
    validation::ValidationRequest,
};
use crate::errors::TerminologyError;

pub const FHIR_JSON: &str = "application/fhir+json";

#[async_trait]
pub trait TerminologyClient: Send + Sync {
    async fn expand_value_set(&self, request: &LookupRequest) -> Result<ValueSet, TerminologyError>;

    async fn validate_code(
        &self,
        request: &ValidationRequest,
    ) -> Result<Parameters, TerminologyError>;
}

/// Talks to a FHIR terminology server over plain HTTP GETs. One attempt per call.
#[derive(Debug, Clone)]
pub struct HttpTerminologyClient {
    http: reqwest::Client,
    config: TerminologyConfig,
}

impl HttpTerminologyClient {
    pub fn new(config: TerminologyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn get_resource<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TerminologyError> {
        let url = format!("{}/ValueSet/{operation}", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, FHIR_JSON)
            .query(query)
            .send()
            .await
            .map_err(|err| {
                warn!(operation, error = %err, "terminology request failed");
                TerminologyError::transport(err)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(TerminologyError::transport)?;
        debug!(operation, status = status.as_u16(), "terminology request completed");

        if !status.is_success() {
            warn!(operation, status = status.as_u16(), "terminology server rejected request");
            return Err(TerminologyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| {
            warn!(operation, error = %err, "terminology response could not be decoded");
            TerminologyError::decode(err)
        })
    }
}

#[async_trait]
impl TerminologyClient for HttpTerminologyClient {
    async fn expand_value_set(&self, request: &LookupRequest) -> Result<ValueSet, TerminologyError> {
        self.get_resource(
            "$expand",
            &[("url", request.url.as_str()), ("filter", request.filter.as_str())],
        )
        .await
    }

    async fn validate_code(
        &self,
        request: &ValidationRequest,
    ) -> Result<Parameters, TerminologyError> {
        let mut query = vec![
            ("url", request.url.as_str()),
            ("system", request.system.as_str()),
            ("code", request.code.as_str()),
        ];
        if let Some(version) = request.version.as_deref() {
            query.push(("version", version));
        }

        self.get_resource("$validate-code", &query).await
    }
}
