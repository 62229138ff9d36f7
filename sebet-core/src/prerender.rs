//! Build-time OG page synthesis.
//!
//! The site is a client-rendered single page app, so social crawlers only ever
//! see the metadata baked into `index.html`. After the bundle is built this
//! module takes that template, removes its generic head metadata, and writes
//! one copy per published article under `blog/{slug}/index.html` carrying the
//! article's own title, description, canonical URL and share image.
//!
//! # Failure model
//! - Missing template, missing credentials, failed fetch and an empty article
//!   list all end the run early with a [`PrerenderOutcome::Skipped`].
//! - Only filesystem write failures surface as [`PrerenderError`].
//!
//! # Navigation
//! - Entrypoint: [`prerender_og_pages`]
//! - Pure helpers: [`escape_html_attr`], [`pick_og_image`], [`strip_head_tags`],
//!   [`build_head_block`], [`inject_head_block`], [`head_block_for`]

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::future::try_join_all;
use regex::{NoExpand, Regex};
use tracing::{debug, info, warn};

use crate::contract::{ArticleSource, ArticleSummary, HeadBlockSpec, OgType};
use crate::fetch::FetchError;

pub const DEFAULT_OUT_DIR: &str = "dist";
pub const DEFAULT_SITE_NAME: &str = "Selo Šebet";
pub const DEFAULT_DESCRIPTION: &str = "Priče, fotografije i istorija sela Šebet.";

/// Share images are declared with fixed dimensions and a fixed JPEG type,
/// whatever the real file is.
pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;
pub const OG_IMAGE_TYPE: &str = "image/jpeg";

static HEAD_TAG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<title\b[^>]*>.*?</title>\s*",
        r#"(?is)<meta\b[^>]*name=["']description["'][^>]*>\s*"#,
        r#"(?is)<link\b[^>]*rel=["']canonical["'][^>]*>\s*"#,
        r#"(?is)<meta\b[^>]*property=["']og:[^"']+["'][^>]*>\s*"#,
        r#"(?is)<meta\b[^>]*name=["']twitter:[^"']+["'][^>]*>\s*"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("head tag pattern is valid"))
    .collect()
});

static HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head>").expect("head close pattern is valid"));

/// Options for one prerender run.
#[derive(Debug, Clone)]
pub struct PrerenderOptions {
    /// Absolute site origin, without trailing slash.
    pub site_url: String,
    /// Absolute image URL used when an article has none.
    pub default_og_image: String,
    /// Directory holding the built bundle (and its `index.html`).
    pub out_dir: PathBuf,
    pub site_name: String,
    pub default_description: String,
}

impl PrerenderOptions {
    pub fn new(site_url: impl Into<String>, default_og_image: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            default_og_image: default_og_image.into(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            site_name: DEFAULT_SITE_NAME.to_string(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }
}

/// Why a run ended without writing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingTemplate,
    MissingCredentials,
    FetchFailure,
    EmptyResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrerenderOutcome {
    /// Number of article pages written.
    Generated(usize),
    Skipped(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum PrerenderError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run the synthesizer once against an already-built bundle.
pub async fn prerender_og_pages<S>(
    options: &PrerenderOptions,
    source: &S,
) -> Result<PrerenderOutcome, PrerenderError>
where
    S: ArticleSource + ?Sized,
{
    let template_path = options.out_dir.join("index.html");
    let template = match tokio::fs::read_to_string(&template_path).await {
        Ok(html) => html,
        Err(e) => {
            warn!(
                error = %e,
                path = %template_path.display(),
                "[PRERENDER] Could not read template; skipping OG prerender"
            );
            return Ok(PrerenderOutcome::Skipped(SkipReason::MissingTemplate));
        }
    };

    let articles = match source.fetch_published().await {
        Ok(articles) => articles,
        Err(FetchError::MissingCredentials) => {
            warn!("[PRERENDER] Content API credentials missing; skipping OG prerender");
            return Ok(PrerenderOutcome::Skipped(SkipReason::MissingCredentials));
        }
        Err(e) => {
            warn!(error = %e, "[PRERENDER] Failed to fetch articles; skipping OG prerender");
            return Ok(PrerenderOutcome::Skipped(SkipReason::FetchFailure));
        }
    };

    if articles.is_empty() {
        info!("[PRERENDER] No published articles; nothing to generate");
        return Ok(PrerenderOutcome::Skipped(SkipReason::EmptyResult));
    }

    let cleaned = strip_head_tags(&template);
    if !HEAD_CLOSE.is_match(&cleaned) {
        warn!(
            path = %template_path.display(),
            "[PRERENDER] Template has no </head>; pages will carry no metadata"
        );
    }

    let blog_root = options.out_dir.join("blog");
    create_dir(&blog_root).await?;

    let writes = articles
        .iter()
        .filter(|a| {
            let safe = is_safe_slug(&a.slug);
            if !safe {
                warn!(slug = %a.slug, "[PRERENDER] Skipping article with unsafe slug");
            }
            safe
        })
        .map(|article| write_article_page(options, &cleaned, &blog_root, article));
    let written = try_join_all(writes).await?.len();

    info!(count = written, "[PRERENDER] Generated OG-ready blog pages");
    Ok(PrerenderOutcome::Generated(written))
}

async fn write_article_page(
    options: &PrerenderOptions,
    cleaned_template: &str,
    blog_root: &Path,
    article: &ArticleSummary,
) -> Result<(), PrerenderError> {
    let spec = head_block_for(options, article);
    let html = inject_head_block(cleaned_template, &build_head_block(&spec, &options.site_name));

    let page_dir = blog_root.join(&article.slug);
    create_dir(&page_dir).await?;
    let out_path = page_dir.join("index.html");
    tokio::fs::write(&out_path, html)
        .await
        .map_err(|e| PrerenderError::Write {
            path: out_path.clone(),
            source: e,
        })?;
    debug!(slug = %article.slug, path = %out_path.display(), "[PRERENDER] Wrote article page");
    Ok(())
}

async fn create_dir(path: &Path) -> Result<(), PrerenderError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| PrerenderError::Write {
            path: path.to_path_buf(),
            source: e,
        })
}

fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty() && slug != "." && slug != ".." && !slug.contains(['/', '\\'])
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_html_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Choose the share image: `og_image`, then `cover_image`, then the default.
/// Relative paths are resolved against `site_url`.
pub fn pick_og_image(
    site_url: &str,
    default_og_image: &str,
    og_image: Option<&str>,
    cover_image: Option<&str>,
) -> String {
    let raw = og_image
        .filter(|s| !s.is_empty())
        .or(cover_image.filter(|s| !s.is_empty()))
        .unwrap_or("")
        .trim();
    if raw.is_empty() {
        return default_og_image.to_string();
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    let sep = if raw.starts_with('/') { "" } else { "/" };
    format!("{site_url}{sep}{raw}")
}

/// Remove title, description, canonical, `og:*` and `twitter:*` tags.
pub fn strip_head_tags(html: &str) -> String {
    HEAD_TAG_PATTERNS
        .iter()
        .fold(html.to_string(), |out, re| re.replace_all(&out, "").into_owned())
}

/// Derive the head metadata for one article page.
pub fn head_block_for(options: &PrerenderOptions, article: &ArticleSummary) -> HeadBlockSpec {
    let canonical_url = format!("{}/blog/{}/", options.site_url, article.slug);
    let description = article
        .excerpt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(options.default_description.as_str())
        .to_string();

    HeadBlockSpec {
        title: format!("{} - {}", article.title, options.site_name),
        description,
        og_type: OgType::Article,
        og_image: pick_og_image(
            &options.site_url,
            &options.default_og_image,
            article.og_image.as_deref(),
            article.cover_image.as_deref(),
        ),
        og_url: canonical_url.clone(),
        canonical_url,
    }
}

/// Render the metadata block that goes right before `</head>`.
pub fn build_head_block(spec: &HeadBlockSpec, site_name: &str) -> String {
    let title = escape_html_attr(&spec.title);
    let description = escape_html_attr(&spec.description);
    let canonical_url = escape_html_attr(&spec.canonical_url);
    let og_image = escape_html_attr(&spec.og_image);
    let og_url = escape_html_attr(&spec.og_url);
    let site_name = escape_html_attr(site_name);
    let og_type = spec.og_type.as_str();

    format!(
        r#"
    <title>{title}</title>
    <meta name="description" content="{description}" />
    <link rel="canonical" href="{canonical_url}" />

    <meta property="og:type" content="{og_type}" />
    <meta property="og:site_name" content="{site_name}" />
    <meta property="og:title" content="{title}" />
    <meta property="og:description" content="{description}" />
    <meta property="og:image" content="{og_image}" />
    <meta property="og:image:secure_url" content="{og_image}" />
    <meta property="og:image:type" content="{OG_IMAGE_TYPE}" />
    <meta property="og:image:width" content="{OG_IMAGE_WIDTH}" />
    <meta property="og:image:height" content="{OG_IMAGE_HEIGHT}" />
    <meta property="og:image:alt" content="{title}" />
    <meta property="og:url" content="{og_url}" />

    <meta name="twitter:card" content="summary_large_image" />
    <meta name="twitter:title" content="{title}" />
    <meta name="twitter:description" content="{description}" />
    <meta name="twitter:image" content="{og_image}" />
  "#
    )
}

/// Insert `head_block` before the first `</head>`, matched case-insensitively.
pub fn inject_head_block(cleaned_template: &str, head_block: &str) -> String {
    let replacement = format!("{head_block}\n  </head>");
    HEAD_CLOSE
        .replacen(cleaned_template, 1, NoExpand(&replacement))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://sebet.example";
    const DEFAULT_IMG: &str = "https://sebet.example/og-images/default.jpg";

    #[test]
    fn escapes_ampersand_first() {
        assert_eq!(
            escape_html_attr(r#"Tom & "Jerry" <b>&amp;</b>"#),
            "Tom &amp; &quot;Jerry&quot; &lt;b&gt;&amp;amp;&lt;/b&gt;"
        );
    }

    #[test]
    fn relative_cover_image_is_prefixed() {
        assert_eq!(
            pick_og_image(SITE, DEFAULT_IMG, None, Some("/img/a.jpg")),
            "https://sebet.example/img/a.jpg"
        );
        assert_eq!(
            pick_og_image(SITE, DEFAULT_IMG, None, Some("img/a.jpg")),
            "https://sebet.example/img/a.jpg"
        );
    }

    #[test]
    fn absolute_og_image_wins() {
        assert_eq!(
            pick_og_image(SITE, DEFAULT_IMG, Some("https://x/y.jpg"), Some("/img/a.jpg")),
            "https://x/y.jpg"
        );
    }

    #[test]
    fn missing_images_fall_back_to_default() {
        assert_eq!(pick_og_image(SITE, DEFAULT_IMG, None, None), DEFAULT_IMG);
        assert_eq!(pick_og_image(SITE, DEFAULT_IMG, Some(""), Some("  ")), DEFAULT_IMG);
    }

    #[test]
    fn empty_og_image_falls_through_to_cover() {
        assert_eq!(
            pick_og_image(SITE, DEFAULT_IMG, Some(""), Some("http://cdn/c.png")),
            "http://cdn/c.png"
        );
    }

    #[test]
    fn strips_all_head_metadata_regardless_of_case() {
        let html = r#"<html><HEAD>
  <TITLE>Old</TITLE>
  <meta charset="utf-8">
  <META NAME="description" CONTENT="old">
  <link rel='canonical' href="/">
  <meta content="x" property="og:title" />
  <meta property="OG:image" content="y">
  <meta name="twitter:card"
        content="summary" />
  <link rel="icon" href="/favicon.ico">
</HEAD><body></body></html>"#;
        let cleaned = strip_head_tags(html);
        let lower = cleaned.to_lowercase();
        assert!(!lower.contains("<title"));
        assert!(!lower.contains("description"));
        assert!(!lower.contains("canonical"));
        assert!(!lower.contains("og:"));
        assert!(!lower.contains("twitter:"));
        assert!(cleaned.contains(r#"<meta charset="utf-8">"#));
        assert!(cleaned.contains(r#"<link rel="icon" href="/favicon.ico">"#));
    }

    #[test]
    fn injects_before_closing_head_once() {
        let out = inject_head_block("<head><x></HEAD><body></head></body>", "BLOCK $1");
        assert_eq!(out, "<head><x>BLOCK $1\n  </head><body></head></body>");
    }

    #[test]
    fn head_block_uses_canonical_url_and_default_description() {
        let options = PrerenderOptions::new(SITE, DEFAULT_IMG);
        let article = ArticleSummary {
            slug: "stara-crkva".into(),
            title: "Stara crkva".into(),
            excerpt: Some("   ".into()),
            og_image: None,
            cover_image: None,
        };
        let spec = head_block_for(&options, &article);
        assert_eq!(spec.canonical_url, "https://sebet.example/blog/stara-crkva/");
        assert_eq!(spec.og_url, spec.canonical_url);
        assert_eq!(spec.description, DEFAULT_DESCRIPTION);
        assert_eq!(spec.title, "Stara crkva - Selo Šebet");
        assert_eq!(spec.og_type, OgType::Article);

        let block = build_head_block(&spec, &options.site_name);
        assert!(block.contains(r#"<meta property="og:image:width" content="1200" />"#));
        assert!(block.contains(r#"<meta property="og:image:height" content="630" />"#));
        assert!(block.contains(r#"<meta property="og:image:type" content="image/jpeg" />"#));
        assert!(block.contains(r#"<meta property="og:type" content="article" />"#));
        assert!(block.contains(r#"<link rel="canonical" href="https://sebet.example/blog/stara-crkva/" />"#));
    }

    #[test]
    fn unsafe_slugs_are_rejected() {
        assert!(is_safe_slug("ok-slug"));
        assert!(!is_safe_slug(".."));
        assert!(!is_safe_slug("a/b"));
        assert!(!is_safe_slug(r"a\b"));
    }
}
