//! Tool catalogue and tool-call payload types.
//!
//! The server exposes a single tool, `get_reranking`. Tool names are parsed
//! into [`Tool`] so that dispatch is an exhaustive match.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::rerank::types::{MAX_DOCUMENTS, MAX_QUERY_CHARS};

/// The tools this server provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Rerank documents against a query via the upstream API.
    GetReranking,
}

impl Tool {
    /// Every tool, in `tools/list` order.
    pub const ALL: &'static [Self] = &[Self::GetReranking];

    /// Looks a tool up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "get_reranking" => Some(Self::GetReranking),
            _ => None,
        }
    }

    /// The tool's wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetReranking => "get_reranking",
        }
    }

    /// The descriptor returned by `tools/list`.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        match self {
            Self::GetReranking => ToolDefinition {
                name: self.name().to_string(),
                description: Some(
                    "Get the reranked document listing. Scores each document by relevance \
                     to the query and returns one {index, relevance_score} entry per \
                     document, most relevant first. `index` refers to the position in the \
                     input `documents` array; scores are between 0 and 1."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "minLength": 1,
                            "maxLength": MAX_QUERY_CHARS,
                            "description": "The search query to rank documents against"
                        },
                        "documents": {
                            "type": "array",
                            "items": {
                                "type": "string",
                                "minLength": 1
                            },
                            "minItems": 1,
                            "maxItems": MAX_DOCUMENTS,
                            "description": "Candidate documents; none may be empty or whitespace only"
                        },
                        "api_key": {
                            "type": "string",
                            "minLength": 1,
                            "description": "ZeroEntropy API key used for this call"
                        }
                    },
                    "required": ["query", "documents", "api_key"]
                }),
            },
        }
    }
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}
