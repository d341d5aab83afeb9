use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod terminology_client;

use terminology_client::TerminologyClient;

#[derive(Clone)]
pub struct AppState {
    pub api_token: Option<Arc<str>>,
    pub terminology_base_url: Arc<str>,
    pub terminology: Arc<dyn TerminologyClient>,
}

impl AppState {
    pub fn new(
        api_token: Option<String>,
        terminology_base_url: impl Into<String>,
        terminology: Arc<dyn TerminologyClient>,
    ) -> Self {
        Self {
            api_token: api_token.map(Arc::<str>::from),
            terminology_base_url: Arc::<str>::from(terminology_base_url.into()),
            terminology,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::domain::{
        fhir::{Parameters, ValueSet},
        lookup::LookupRequest,
        validation::ValidationRequest,
    };
    use crate::errors::TerminologyError;

    use super::*;

    struct MockTerminology;

    #[async_trait::async_trait]
    impl TerminologyClient for MockTerminology {
        async fn expand_value_set(
            &self,
            request: &LookupRequest,
        ) -> Result<ValueSet, TerminologyError> {
            match request.filter.as_str() {
                "hypertension" => serde_json::from_value(json!({
                    "resourceType": "ValueSet",
                    "expansion": { "contains": [] }
                }))
                .map_err(TerminologyError::decode),
                "asthma" => serde_json::from_value(json!({
                    "resourceType": "ValueSet",
                    "expansion": {
                        "contains": [
                            { "system": "http://snomed.info/sct", "code": "195967001", "display": "Asthma" },
                            { "system": "http://snomed.info/sct", "code": "233678006", "display": "Childhood asthma" }
                        ]
                    }
                }))
                .map_err(TerminologyError::decode),
                _ => Err(TerminologyError::transport("error sending request")),
            }
        }

        async fn validate_code(
            &self,
            request: &ValidationRequest,
        ) -> Result<Parameters, TerminologyError> {
            if request.code == "offline" {
                return Err(TerminologyError::transport("error sending request"));
            }
            if request.url.contains("missing") {
                return Err(TerminologyError::Rejected {
                    status: 404,
                    body: "ValueSet not found".to_string(),
                });
            }

            serde_json::from_value(json!({
                "resourceType": "Parameters",
                "parameter": [
                    { "name": "result", "valueBoolean": true },
                    { "name": "code", "valueCode": "30371007" },
                    { "name": "system", "valueUri": "http://snomed.info/sct" },
                    { "name": "display", "valueString": "Abscess of tooth" }
                ]
            }))
            .map_err(TerminologyError::decode)
        }
    }

    fn app_with_token(token: Option<&str>) -> Router {
        let state = AppState::new(
            token.map(str::to_string),
            "https://tx.example.org/r4",
            Arc::new(MockTerminology),
        );
        build_app(state)
    }

    fn app() -> Router {
        app_with_token(None)
    }

    async fn post_mcp(app: Router, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let body_json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("valid json response")
        };
        (status, body_json)
    }

    fn tool_call(id: u64, name: &str, arguments: Value) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        })
        .to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app_with_token(Some("secret-token"))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(body, "{\"status\":\"ok\"}");
    }

    #[tokio::test]
    async fn discovery_reports_terminology_server() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/mcp")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let body_json: Value = serde_json::from_slice(&body).expect("valid json response");
        assert_eq!(body_json["mcp_endpoint"], "/mcp");
        assert_eq!(body_json["terminology_server"], "https://tx.example.org/r4");
    }

    #[tokio::test]
    async fn mcp_requires_token_when_configured() {
        let (status, _) = post_mcp(
            app_with_token(Some("secret-token")),
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn mcp_accepts_matching_token() {
        let response = app_with_token(Some("secret-token"))
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer secret-token")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mcp_unknown_method_returns_method_not_found() {
        let (status, body) =
            post_mcp(app(), r#"{"jsonrpc":"2.0","id":1,"method":"unknown"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn mcp_parse_error_is_reported() {
        let (status, body) = post_mcp(app(), "{not json").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn mcp_initialize_returns_result() {
        let (status, body) = post_mcp(
            app(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test-client","version":"1.0.0"},"capabilities":{}}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(body["result"]["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert!(body["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn mcp_notification_has_no_content() {
        let (status, body) = post_mcp(
            app(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn mcp_tools_list_returns_terminology_tools() {
        let (_, body) = post_mcp(
            app(),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
        )
        .await;

        let tools = &body["result"]["tools"];
        assert_eq!(tools[0]["name"], "lookup-code");
        assert_eq!(tools[1]["name"], "validate-code");
        assert!(tools[0]["inputSchema"]["properties"]["filter"].is_object());
        assert!(tools[1]["inputSchema"]["properties"]["version"].is_object());
        let required = tools[1]["inputSchema"]["required"]
            .as_array()
            .expect("required list");
        assert!(!required.contains(&json!("version")));
    }

    #[tokio::test]
    async fn lookup_without_matches_is_not_an_error() {
        let (_, body) = post_mcp(
            app(),
            &tool_call(
                3,
                "lookup-code",
                json!({ "filter": "hypertension", "url": "http://snomed.info/sct?fhir_vs" }),
            ),
        )
        .await;

        let result = &body["result"];
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "No matching codes found");
        assert!(result.get("isError").map_or(true, |value| value != &json!(true)));
    }

    #[tokio::test]
    async fn lookup_returns_first_match_pretty_printed() {
        let (_, body) = post_mcp(
            app(),
            &tool_call(
                4,
                "lookup-code",
                json!({ "filter": "asthma", "url": "http://snomed.info/sct?fhir_vs" }),
            ),
        )
        .await;

        let text = body["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        let expected = serde_json::to_string_pretty(&json!({
            "system": "http://snomed.info/sct",
            "code": "195967001",
            "display": "Asthma"
        }))
        .expect("serialize");
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn lookup_transport_failure_is_flagged() {
        let (_, body) = post_mcp(
            app(),
            &tool_call(
                5,
                "lookup-code",
                json!({ "filter": "offline", "url": "http://snomed.info/sct?fhir_vs" }),
            ),
        )
        .await;

        assert_eq!(body["result"]["isError"], true);
        assert_eq!(
            body["result"]["content"][0]["text"],
            "Error looking up codes: error sending request"
        );
    }

    #[tokio::test]
    async fn validate_returns_normalized_record() {
        let (_, body) = post_mcp(
            app(),
            &tool_call(
                6,
                "validate-code",
                json!({
                    "system": "http://snomed.info/sct",
                    "code": "30371007",
                    "url": "http://snomed.info/sct?fhir_vs"
                }),
            ),
        )
        .await;

        let text = body["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        let parsed: Value = serde_json::from_str(text).expect("json text");
        assert_eq!(
            parsed,
            json!({
                "valid": true,
                "code": "30371007",
                "system": "http://snomed.info/sct",
                "display": "Abscess of tooth"
            })
        );
    }

    #[tokio::test]
    async fn validate_remote_404_is_flagged() {
        let (_, body) = post_mcp(
            app(),
            &tool_call(
                7,
                "validate-code",
                json!({
                    "system": "http://snomed.info/sct",
                    "code": "30371007",
                    "url": "http://example.org/missing"
                }),
            ),
        )
        .await;

        assert_eq!(body["result"]["isError"], true);
        let text = body["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        assert!(text.contains("Terminology server error"));
        assert_eq!(text, "Terminology server error (404): ValueSet not found");
    }

    #[tokio::test]
    async fn validate_transport_failure_is_flagged() {
        let (_, body) = post_mcp(
            app(),
            &tool_call(
                10,
                "validate-code",
                json!({
                    "system": "http://snomed.info/sct",
                    "code": "offline",
                    "url": "http://snomed.info/sct?fhir_vs"
                }),
            ),
        )
        .await;

        assert_eq!(body["result"]["isError"], true);
        assert_eq!(
            body["result"]["content"][0]["text"],
            "Error validating code: error sending request"
        );
    }

    #[tokio::test]
    async fn missing_argument_is_invalid_params() {
        let (_, body) = post_mcp(
            app(),
            &tool_call(8, "lookup-code", json!({ "filter": "asthma" })),
        )
        .await;

        assert_eq!(body["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found() {
        let (_, body) = post_mcp(app(), &tool_call(9, "expand-everything", json!({}))).await;

        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["error"]["data"]["code"], "tool_not_found");
    }

    #[tokio::test]
    async fn batch_requests_return_each_response() {
        let batch = format!(
            "[{},{}]",
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            tool_call(
                2,
                "lookup-code",
                json!({ "filter": "hypertension", "url": "http://snomed.info/sct?fhir_vs" })
            )
        );
        let (status, body) = post_mcp(app(), &batch).await;

        assert_eq!(status, StatusCode::OK);
        let responses = body.as_array().expect("batch response");
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1]["id"], 2);
    }
}
