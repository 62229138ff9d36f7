//! # contract: shared data types and trait seams
//!
//! This module holds the plain data types that flow between the content API,
//! the page synthesizer and the PDF extractor, plus the traits that let the
//! orchestration code run against real clients or `mockall` mocks.
//!
//! ## Trait seams
//! - [`ArticleSource`]: where published article summaries come from.
//!   The REST client lives in [`crate::fetch`]; tests use `MockArticleSource`.
//! - [`TextRecovery`]: how raw text fragments are recovered from PDF bytes.
//!   The default operator scan lives in [`crate::pdf_text`].
//!
//! ## Mocking
//! Both traits are annotated for `mockall`; mocks are exported when the
//! `test-export-mocks` feature is on (the default) so that downstream crates
//! can build deterministic tests.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::fetch::FetchError;

/// One published article, as needed for social-sharing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    /// URL-safe, unique, non-empty identifier; becomes the page directory name.
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    /// Dedicated social-sharing image (absolute or root-relative).
    pub og_image: Option<String>,
    pub cover_image: Option<String>,
}

/// Kind of page an Open Graph block describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OgType {
    Website,
    Article,
}

impl OgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OgType::Website => "website",
            OgType::Article => "article",
        }
    }
}

/// Per-page head metadata, computed on the fly and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadBlockSpec {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub og_type: OgType,
    pub og_image: String,
    pub og_url: String,
}

/// Trait for loading the list of published articles.
///
/// Implementations own transport, authentication and row filtering.
/// The synthesizer treats every error as a reason to skip, never to abort.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch every published article summary (capped by the implementation).
    async fn fetch_published(&self) -> Result<Vec<ArticleSummary>, FetchError>;
}

/// Strategy for recovering raw text fragments from an undecoded PDF.
///
/// Fragments are returned in document order with PDF string escapes still in
/// place; cleaning, thresholding and truncation happen in the caller.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait TextRecovery: Send + Sync {
    fn recover_fragments(&self, pdf: &[u8]) -> Vec<String>;
}

/// Body of a PDF parsing request: base64 payload plus an advisory file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsePdfRequest {
    #[serde(default)]
    pub pdf_base64: String,
    #[serde(default)]
    pub file_name: String,
}

/// Successful PDF parsing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsePdfResponse {
    pub content: String,
    pub file_name: String,
}

/// Structured error body returned alongside a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}
