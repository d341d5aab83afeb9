//! Terminology domain: FHIR resource shapes, the lookup and validation handlers,
//! and their binding to MCP tools

pub mod fhir;
pub mod lookup;
pub mod tools;
pub mod utils;
pub mod validation;
