//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides JSON-RPC validation, protocol negotiation, response formatting, and tool routing.

pub mod rpc;
pub mod server;
