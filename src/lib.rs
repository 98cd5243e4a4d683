//! rerank-mcp: MCP server exposing document reranking as a tool
//!
//! This library adapts the ZeroEntropy rerank REST API to the Model Context
//! Protocol so that AI assistants can reorder candidate documents by
//! relevance to a query.
//!
//! # Architecture
//!
//! The server is a validated pass-through. The upstream API does the ranking:
//!
//! - **Protocol**: JSON-RPC 2.0 over newline-delimited stdio
//! - **Validation**: tool arguments are checked before any network call
//! - **Upstream**: one `POST` per tool call, response re-validated on return
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation
//! - [`rerank`] — Rerank request/response types and the HTTP client

pub mod config;
pub mod error;
pub mod mcp;
pub mod rerank;
