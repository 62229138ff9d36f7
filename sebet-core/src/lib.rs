#![doc = "sebet-core: core logic for the Selo Šebet site tooling."]

//! This crate holds the domain logic shared by the `sebet` CLI and tests:
//! the build-time OG page synthesizer, the content API client it reads
//! articles from, and the best-effort PDF text extractor.
//!
//! # Usage
//! Depend on this crate for anything that touches article metadata or PDF
//! text; keep argument parsing and environment handling in the CLI crate.

pub mod config;
pub mod contract;
pub mod fetch;
pub mod pdf_text;
pub mod prerender;
