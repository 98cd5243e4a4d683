//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing document
//! reranking as a tool to AI assistants. The server communicates over stdio
//! transport using JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Handler   │───▶│    Tool     │    │
//! │   │   (stdio)   │    │  (dispatch) │    │ (reranking) │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌──────────────────────────┐      ┌────────────────┐     │
//! │   │    JSON-RPC Messages     │      │ Upstream HTTP  │     │
//! │   └──────────────────────────┘      └────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2025-06-18 and accepts
//! 2025-03-26 and 2024-11-05.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpHandler, McpServer, Session};
pub use transport::{LineReader, MessageWriter};
