//! Document reranking via the upstream ZeroEntropy API.
//!
//! - [`types`] — validated request and response shapes
//! - [`client`] — the [`RerankClient`] seam and its HTTP implementation

pub mod client;
pub mod types;

pub use client::{HttpRerankClient, RerankClient, DEFAULT_ENDPOINT};
pub use types::{RerankArguments, RerankRequest, RerankResponse, RerankResult};
