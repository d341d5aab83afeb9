//! HTTP transport layer for the Model Context Protocol
//!
//! Provides the `/mcp` listener plus health and discovery endpoints.

pub mod handlers;
