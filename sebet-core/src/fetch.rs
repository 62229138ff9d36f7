//! Content API client: loads published article summaries over REST.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::contract::{ArticleSource, ArticleSummary};

/// Columns requested from the articles table.
pub const ARTICLE_COLUMNS: &str = "slug,title,excerpt,og_image,cover_image";
/// Row cap for a single build.
pub const ARTICLE_LIMIT: u32 = 1000;

/// Connection details for the hosted content API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentApiConfig {
    /// REST root, e.g. `https://project.supabase.co/rest/v1`. No trailing slash needed.
    pub base_url: String,
    /// Sent both as `apikey` and as a bearer token.
    pub api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("content API URL or key not configured")]
    MissingCredentials,

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("content API returned {status}")]
    Status { status: u16 },

    #[error("could not decode article list: {0}")]
    Decode(String),
}

/// Raw row as returned by the API; every column may be null.
#[derive(Debug, Deserialize)]
struct ArticleRow {
    slug: Option<String>,
    title: Option<String>,
    excerpt: Option<String>,
    og_image: Option<String>,
    cover_image: Option<String>,
}

impl ArticleRow {
    fn into_summary(self) -> Option<ArticleSummary> {
        let slug = self.slug.filter(|s| !s.is_empty())?;
        Some(ArticleSummary {
            slug,
            title: self.title.unwrap_or_default(),
            excerpt: self.excerpt,
            og_image: self.og_image,
            cover_image: self.cover_image,
        })
    }
}

/// [`ArticleSource`] backed by the PostgREST-style articles endpoint.
///
/// Built with `None` when credentials are absent; every fetch then reports
/// [`FetchError::MissingCredentials`] so the caller can skip cleanly.
pub struct RestArticleSource {
    client: Client,
    config: Option<ContentApiConfig>,
}

impl RestArticleSource {
    pub fn new(config: Option<ContentApiConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn articles_url(config: &ContentApiConfig) -> String {
        format!("{}/articles", config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ArticleSource for RestArticleSource {
    async fn fetch_published(&self) -> Result<Vec<ArticleSummary>, FetchError> {
        let config = match &self.config {
            Some(c) => c,
            None => {
                warn!("[FETCH] Missing content API URL or key; nothing to fetch");
                return Err(FetchError::MissingCredentials);
            }
        };

        let url = Self::articles_url(config);
        let limit = ARTICLE_LIMIT.to_string();
        info!(url = %url, "[FETCH] Fetching published articles");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("select", ARTICLE_COLUMNS),
                ("status", "eq.published"),
                ("limit", limit.as_str()),
            ])
            .header("apikey", &config.api_key)
            .bearer_auth(&config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "[FETCH] Request to content API failed");
                FetchError::Transport {
                    url: url.clone(),
                    source: e,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "[FETCH] Content API returned error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            error!(error = ?e, url = %url, "[FETCH] Failed to read response body");
            FetchError::Transport {
                url: url.clone(),
                source: e,
            }
        })?;

        let articles = parse_article_rows(&body)?;
        debug!(count = articles.len(), "[FETCH] Decoded published articles");
        Ok(articles)
    }
}

/// Decode a JSON response body into article summaries.
///
/// A body that is valid JSON but not an array yields an empty list.
/// Rows without a slug are dropped.
pub fn parse_article_rows(body: &str) -> Result<Vec<ArticleSummary>, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    if !value.is_array() {
        warn!("[FETCH] Article response was not a JSON array; treating as empty");
        return Ok(Vec::new());
    }
    let rows: Vec<ArticleRow> =
        serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(rows.into_iter().filter_map(ArticleRow::into_summary).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP response and hands back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{addr}/rest/v1"), handle)
    }

    #[test]
    fn articles_url_ignores_trailing_slash() {
        let config = ContentApiConfig {
            base_url: "https://x.example/rest/v1/".into(),
            api_key: "k".into(),
        };
        assert_eq!(
            RestArticleSource::articles_url(&config),
            "https://x.example/rest/v1/articles"
        );
    }

    #[test]
    fn rows_without_slug_are_dropped() {
        let body = r#"[
            {"slug": "a", "title": "A", "excerpt": null, "og_image": null, "cover_image": null},
            {"slug": "", "title": "empty"},
            {"slug": null, "title": "null"},
            {"title": "missing"}
        ]"#;
        let articles = parse_article_rows(body).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].slug, "a");
    }

    #[test]
    fn non_array_body_is_empty() {
        assert!(parse_article_rows(r#"{"message": "nope"}"#).unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_decode_error() {
        assert!(matches!(
            parse_article_rows("<html>"),
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn missing_config_reports_missing_credentials() {
        let source = RestArticleSource::new(None);
        assert!(matches!(
            source.fetch_published().await,
            Err(FetchError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn sends_query_and_auth_headers() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"[{"slug":"hello","title":"Hello","excerpt":"Hi","og_image":null,"cover_image":"/img/a.jpg"}]"#,
        )
        .await;
        let source = RestArticleSource::new(Some(ContentApiConfig {
            base_url,
            api_key: "secret-key".into(),
        }));

        let articles = source.fetch_published().await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].cover_image.as_deref(), Some("/img/a.jpg"));
        assert!(request.starts_with("GET /rest/v1/articles?select=slug%2Ctitle%2Cexcerpt%2Cog_image%2Ccover_image&status=eq.published&limit=1000 "));
        let lower = request.to_ascii_lowercase();
        assert!(lower.contains("apikey: secret-key"));
        assert!(lower.contains("authorization: bearer secret-key"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let (base_url, server) = serve_once("HTTP/1.1 401 Unauthorized", "{}").await;
        let source = RestArticleSource::new(Some(ContentApiConfig {
            base_url,
            api_key: "bad".into(),
        }));

        let result = source.fetch_published().await;
        server.await.unwrap();
        assert!(matches!(result, Err(FetchError::Status { status: 401 })));
    }
}
