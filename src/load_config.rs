//! `load_config`: reads the static YAML config and injects content API secrets from the environment.
//!
//! The YAML file carries only public settings (site URL, default image,
//! output directory). The content API URL and key are looked up in the
//! environment, in the same order the site's build tooling has always used,
//! so one `.env` serves both the frontend build and this tool.
//!
//! Missing secrets are not an error here: the prerender step reports them as
//! a skip, which keeps a build without credentials green.

use anyhow::Result;
use sebet_core::config::PrerenderConfig;
use sebet_core::fetch::ContentApiConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Environment variables holding the hosted backend URL, first match wins.
pub const URL_ENV_VARS: [&str; 3] = ["SUPABASE_URL", "VITE_SUPABASE_URL", "VITE_PUBLIC_SUPABASE_URL"];

/// Environment variables holding the API key, first match wins.
pub const KEY_ENV_VARS: [&str; 4] = [
    "SUPABASE_SERVICE_ROLE_KEY",
    "SUPABASE_ANON_KEY",
    "VITE_SUPABASE_ANON_KEY",
    "VITE_SUPABASE_PUBLISHABLE_KEY",
];

#[derive(Debug)]
pub struct CliConfig {
    pub prerender: PrerenderConfig,
    /// `None` when the URL or the key is missing from the environment.
    pub content_api: Option<ContentApiConfig>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    prerender: PrerenderConfig,
}

/// Loads a static YAML config file (no secrets) and injects content API secrets from env.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.prerender.site_url.trim().is_empty() {
        anyhow::bail!("prerender.site_url must not be empty");
    }
    raw.prerender.trace_loaded();

    Ok(CliConfig {
        prerender: raw.prerender,
        content_api: content_api_from_env(),
    })
}

/// Resolve the content API connection from the environment.
pub fn content_api_from_env() -> Option<ContentApiConfig> {
    let url = first_env(&URL_ENV_VARS);
    let key = first_env(&KEY_ENV_VARS);
    match (url, key) {
        (Some(url), Some(api_key)) => {
            info!(url = %url, api_key_set = !api_key.is_empty(), "Content API configured from environment");
            Some(ContentApiConfig {
                base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
                api_key,
            })
        }
        (url, _) => {
            warn!(
                url_set = url.is_some(),
                "Content API URL or key missing from environment; prerender will be skipped"
            );
            None
        }
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}
