//! Terminology tools exposed via Model Context Protocol
//!
//! Provides `lookup-code` and `validate-code`. Arguments are validated here, the
//! handlers in `lookup` and `validation` do the remote call, and their results are
//! folded into a `CallToolResult` envelope. Terminology failures become tool
//! results with `isError` set; only malformed invocations become JSON-RPC errors.

use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::{
    lookup::{lookup_code, LookupRequest},
    utils::{normalize_optional, normalize_required},
    validation::{validate_code, ValidationRequest},
};
use crate::errors::{AppError, TerminologyError};
use crate::mcp::rpc::{
    app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result,
};
use crate::AppState;

pub const LOOKUP_CODE_TOOL: &str = "lookup-code";
pub const VALIDATE_CODE_TOOL: &str = "validate-code";

#[macros::mcp_tool(
    name = "lookup-code",
    description = "Look up a clinical terminology code by free text within a FHIR value set"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct LookupCodeTool {
    /// Text to search for, e.g. a condition or observation name
    pub filter: String,
    /// Canonical URL of the value set to search, e.g. http://snomed.info/sct?fhir_vs
    pub url: String,
}

#[macros::mcp_tool(
    name = "validate-code",
    description = "Validate that a code from a code system is a member of a FHIR value set"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ValidateCodeTool {
    /// Code system URI, e.g. http://snomed.info/sct
    pub system: String,
    /// The code to validate
    pub code: String,
    /// Canonical URL of the value set to validate against
    pub url: String,
    /// Code system version
    pub version: Option<String>,
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![LookupCodeTool::tool(), ValidateCodeTool::tool()]
}

impl LookupCodeTool {
    pub fn into_request(self) -> Result<LookupRequest, AppError> {
        Ok(LookupRequest {
            filter: normalize_required("filter", self.filter)?,
            url: normalize_required("url", self.url)?,
        })
    }
}

impl ValidateCodeTool {
    pub fn into_request(self) -> Result<ValidationRequest, AppError> {
        Ok(ValidationRequest {
            system: normalize_required("system", self.system)?,
            code: normalize_required("code", self.code)?,
            url: normalize_required("url", self.url)?,
            version: normalize_optional(self.version),
        })
    }
}

pub fn text_result(text: String, is_error: bool) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: is_error.then_some(true),
        meta: None,
        structured_content: None,
    }
}

/// Builds the error envelope; server rejections keep their own message, other
/// failures get the tool-specific prefix.
pub fn terminology_error_result(prefix: &str, err: &TerminologyError) -> CallToolResult {
    let text = match err {
        TerminologyError::Rejected { .. } => err.to_string(),
        TerminologyError::Transport(message) | TerminologyError::Decode(message) => {
            format!("{prefix}: {message}")
        }
    };
    text_result(text, true)
}

pub async fn run_lookup(state: &AppState, request: &LookupRequest) -> CallToolResult {
    match lookup_code(state.terminology.as_ref(), request)
        .await
        .and_then(|outcome| outcome.render())
    {
        Ok(text) => text_result(text, false),
        Err(err) => {
            warn!(tool = LOOKUP_CODE_TOOL, kind = err.kind(), error = %err, "tool call failed");
            terminology_error_result("Error looking up codes", &err)
        }
    }
}

pub async fn run_validation(state: &AppState, request: &ValidationRequest) -> CallToolResult {
    match validate_code(state.terminology.as_ref(), request)
        .await
        .and_then(|result| result.render())
    {
        Ok(text) => text_result(text, false),
        Err(err) => {
            warn!(tool = VALIDATE_CODE_TOOL, kind = err.kind(), error = %err, "tool call failed");
            terminology_error_result("Error validating code", &err)
        }
    }
}

pub async fn handle_tools_call(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };
    let arguments = json!(tool_call.arguments.unwrap_or_default());

    let result = match tool_call.name.as_str() {
        LOOKUP_CODE_TOOL => {
            let request = match serde_json::from_value::<LookupCodeTool>(arguments)
                .map_err(|err| AppError::bad_request("invalid_arguments", err.to_string()))
                .and_then(LookupCodeTool::into_request)
            {
                Ok(request) => request,
                Err(err) => return app_error_to_json_rpc(id, err),
            };
            run_lookup(state, &request).await
        }
        VALIDATE_CODE_TOOL => {
            let request = match serde_json::from_value::<ValidateCodeTool>(arguments)
                .map_err(|err| AppError::bad_request("invalid_arguments", err.to_string()))
                .and_then(ValidateCodeTool::into_request)
            {
                Ok(request) => request,
                Err(err) => return app_error_to_json_rpc(id, err),
            };
            run_validation(state, &request).await
        }
        _ => {
            return json_rpc_error_with_data(
                id,
                -32601,
                "Method not found",
                Some(json!({
                    "code": "tool_not_found",
                    "message": "unknown tool name",
                    "details": {
                        "name": tool_call.name,
                    },
                })),
            )
        }
    };

    match serde_json::to_value(result) {
        Ok(result) => json_rpc_result(id, result),
        Err(err) => app_error_to_json_rpc(
            id,
            AppError::internal(format!("tool result serialization failed: {err}")),
        ),
    }
}
