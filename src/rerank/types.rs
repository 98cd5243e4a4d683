//! Rerank request and response types.
//!
//! Requests are built from untrusted tool arguments and only exist in
//! validated form: [`RerankRequest::validate`] is the single constructor.
//! Responses are re-validated after they come back from the upstream API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RerankError, ValidationError};

/// Maximum query length in characters.
pub const MAX_QUERY_CHARS: usize = 10_000;

/// Maximum number of documents per request.
pub const MAX_DOCUMENTS: usize = 1000;

/// Maximum number of results accepted from upstream.
pub const MAX_RESULTS: usize = 1000;

/// Highest document index accepted from upstream.
pub const MAX_RESULT_INDEX: u32 = 1000;

/// Raw `get_reranking` arguments as they arrive from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct RerankArguments {
    /// Search query.
    pub query: String,
    /// Candidate documents, in caller order.
    pub documents: Vec<String>,
    /// Upstream API key.
    pub api_key: String,
}

impl RerankArguments {
    /// Decodes tool call arguments.
    ///
    /// Accepts the flat `{query, documents, api_key}` object as well as the
    /// same object wrapped under a single `request` key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] if fields are missing or have
    /// the wrong type.
    pub fn from_value(arguments: &Value) -> Result<Self, ValidationError> {
        let inner = match arguments.as_object() {
            Some(obj) if obj.len() == 1 && obj.get("request").is_some_and(Value::is_object) => {
                &obj["request"]
            }
            _ => arguments,
        };

        Self::deserialize(inner).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

/// A validated rerank request.
#[derive(Clone, PartialEq, Eq)]
pub struct RerankRequest {
    query: String,
    documents: Vec<String>,
    api_key: String,
}

/// Whether a document has no content besides whitespace or the ASCII
/// information separators U+001C..U+001F.
fn is_blank(document: &str) -> bool {
    document
        .chars()
        .all(|c| c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c))
}

impl RerankRequest {
    /// Validates raw arguments, failing on the first violated rule.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] for the first rule that does not hold,
    /// checked in the order query, documents, api key.
    pub fn validate(args: RerankArguments) -> Result<Self, ValidationError> {
        let query_len = args.query.chars().count();
        if query_len == 0 {
            return Err(ValidationError::EmptyQuery);
        }
        if query_len > MAX_QUERY_CHARS {
            return Err(ValidationError::QueryTooLong {
                len: query_len,
                max: MAX_QUERY_CHARS,
            });
        }

        if args.documents.is_empty() {
            return Err(ValidationError::NoDocuments);
        }
        if args.documents.len() > MAX_DOCUMENTS {
            return Err(ValidationError::TooManyDocuments {
                count: args.documents.len(),
                max: MAX_DOCUMENTS,
            });
        }
        if let Some(index) = args.documents.iter().position(|d| is_blank(d)) {
            return Err(ValidationError::BlankDocument { index });
        }

        if args.api_key.is_empty() {
            return Err(ValidationError::EmptyApiKey);
        }

        Ok(Self {
            query: args.query,
            documents: args.documents,
            api_key: args.api_key,
        })
    }

    /// Decodes and validates tool call arguments in one step.
    ///
    /// # Errors
    ///
    /// See [`RerankArguments::from_value`] and [`Self::validate`].
    pub fn from_arguments(arguments: &Value) -> Result<Self, ValidationError> {
        RerankArguments::from_value(arguments).and_then(Self::validate)
    }

    /// The search query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The candidate documents, in caller order.
    #[must_use]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// The caller's upstream API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

// Hand-written so the API key never ends up in logs.
impl std::fmt::Debug for RerankRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankRequest")
            .field("query", &self.query)
            .field("documents", &self.documents.len())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Relevance of one input document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RerankResult {
    /// Position of the document in the request.
    pub index: u32,
    /// Relevance in `[0, 1]`.
    pub relevance_score: f64,
}

/// Upstream ranking, in the order the upstream API returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankResponse {
    /// One entry per ranked document.
    pub results: Vec<RerankResult>,
}

/// Upstream result element before bounds checking.
#[derive(Debug, Deserialize)]
struct RawResult {
    index: i64,
    relevance_score: f64,
}

impl RerankResponse {
    /// Extracts and validates the ranking from an upstream response body.
    ///
    /// Any out-of-bounds element rejects the whole response.
    ///
    /// # Errors
    ///
    /// Returns [`RerankError::Schema`] if `results` is missing, malformed,
    /// has the wrong number of elements, or any element is out of bounds.
    pub fn from_upstream(body: &Value) -> Result<Self, RerankError> {
        let raw = body
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| RerankError::Schema("missing results".to_string()))?;

        if raw.is_empty() || raw.len() > MAX_RESULTS {
            return Err(RerankError::Schema(format!(
                "expected 1 to {MAX_RESULTS} results, got {}",
                raw.len()
            )));
        }

        let results = raw
            .iter()
            .enumerate()
            .map(|(pos, item)| {
                let parsed = RawResult::deserialize(item)
                    .map_err(|e| RerankError::Schema(format!("result {pos}: {e}")))?;
                check_result(pos, &parsed)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { results })
    }
}

fn check_result(pos: usize, raw: &RawResult) -> Result<RerankResult, RerankError> {
    let index = u32::try_from(raw.index)
        .ok()
        .filter(|i| *i <= MAX_RESULT_INDEX)
        .ok_or_else(|| {
            RerankError::Schema(format!(
                "result {pos}: index {} outside 0..={MAX_RESULT_INDEX}",
                raw.index
            ))
        })?;

    // NaN fails the range check too.
    if !(0.0..=1.0).contains(&raw.relevance_score) {
        return Err(RerankError::Schema(format!(
            "result {pos}: relevance_score {} outside 0..=1",
            raw.relevance_score
        )));
    }

    Ok(RerankResult {
        index,
        relevance_score: raw.relevance_score,
    })
}
