//! # sebet CLI interface
//!
//! Command parsing and orchestration for the `sebet` binary. All domain logic
//! (page synthesis, content API access, PDF text recovery) lives in
//! `sebet-core`; this module only wires configuration into it and turns
//! results into exit codes and printed output.
//!
//! ## Subcommands
//! - `prerender`: write OG-ready `blog/{slug}/index.html` pages into a built bundle.
//! - `extract-pdf`: recover text from a PDF, given either a JSON request
//!   (`{"pdfBase64", "fileName"}`) or a raw PDF file.
//!
//! For programmatic and integration use call [`run`] with a constructed [`Cli`].

use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sebet_core::contract::{ParsePdfRequest, ParsePdfResponse};
use sebet_core::fetch::RestArticleSource;
use sebet_core::pdf_text::{handle_parse_pdf, parse_pdf_bytes, ParsePdfError};
use sebet_core::prerender::{prerender_og_pages, PrerenderOutcome};
use std::io::Read;
use std::path::{Path, PathBuf};

/// CLI for sebet: Selo Šebet build and editor tooling.
#[derive(Parser)]
#[clap(
    name = "sebet",
    version,
    about = "Prerender OG pages for the Selo Šebet blog and extract text from PDFs"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate per-article HTML pages with Open Graph metadata in the build output
    Prerender {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Extract plain text from a PDF and print it as JSON
    ExtractPdf {
        /// JSON request file with `pdfBase64` and `fileName`; `-` reads stdin
        #[clap(long, conflicts_with = "pdf", required_unless_present = "pdf")]
        request: Option<PathBuf>,
        /// Raw PDF file to read directly
        #[clap(long)]
        pdf: Option<PathBuf>,
        /// File name to report; defaults to the PDF's own file name
        #[clap(long)]
        file_name: Option<String>,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Prerender { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "prerender", "Starting OG prerender");
            let options = config.prerender.to_options();
            let source = RestArticleSource::new(config.content_api);
            match prerender_og_pages(&options, &source).await {
                Ok(PrerenderOutcome::Generated(count)) => {
                    println!("Prerender complete: generated {count} OG-ready blog pages.");
                    Ok(())
                }
                Ok(PrerenderOutcome::Skipped(reason)) => {
                    println!("Prerender skipped: {reason:?}");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "prerender", error = %e, "Prerender failed");
                    Err(anyhow::Error::new(e).context("OG prerender failed"))
                }
            }
        }
        Commands::ExtractPdf {
            request,
            pdf,
            file_name,
        } => {
            let result = match (request, pdf) {
                (Some(request), _) => {
                    let mut request = read_request(&request)?;
                    if let Some(name) = file_name {
                        request.file_name = name;
                    }
                    handle_parse_pdf(&request)
                }
                (None, Some(pdf)) => {
                    let bytes = std::fs::read(&pdf)
                        .with_context(|| format!("Failed to read PDF file {}", pdf.display()))?;
                    let name = file_name.unwrap_or_else(|| display_name(&pdf));
                    parse_pdf_bytes(&bytes, &name)
                }
                (None, None) => anyhow::bail!("either --request or --pdf is required"),
            };
            print_parse_result(result)
        }
    }
}

fn read_request(path: &Path) -> Result<ParsePdfRequest> {
    let body = if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read request from stdin")?;
        body
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?
    };
    serde_json::from_str(&body).context("Failed to parse PDF request JSON")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_parse_result(result: Result<ParsePdfResponse, ParsePdfError>) -> Result<()> {
    match result {
        Ok(response) => {
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
        Err(e) => {
            let status = e.status();
            eprintln!("{}", serde_json::to_string(&e.payload())?);
            tracing::error!(status, error = %e, "PDF extraction request failed");
            Err(anyhow::Error::new(e).context(format!("PDF extraction failed with status {status}")))
        }
    }
}
