use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::prerender::{PrerenderOptions, DEFAULT_DESCRIPTION, DEFAULT_OUT_DIR, DEFAULT_SITE_NAME};

/// Non-secret prerender settings, as written in the YAML config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrerenderConfig {
    pub site_url: String,
    pub default_og_image: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_description")]
    pub default_description: String,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

fn default_site_name() -> String {
    DEFAULT_SITE_NAME.to_string()
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

impl PrerenderConfig {
    pub fn trace_loaded(&self) {
        info!(
            site_url = %self.site_url,
            out_dir = %self.out_dir.display(),
            "Loaded prerender config"
        );
        debug!(?self, "Prerender config loaded (full debug)");
    }

    pub fn to_options(&self) -> PrerenderOptions {
        PrerenderOptions {
            site_url: self.site_url.trim_end_matches('/').to_string(),
            default_og_image: self.default_og_image.clone(),
            out_dir: self.out_dir.clone(),
            site_name: self.site_name.clone(),
            default_description: self.default_description.clone(),
        }
    }
}
