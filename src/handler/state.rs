use anyhow::Result;
use reqwest::redirect::Policy;
use std::sync::Arc;

use crate::config::{ProxyConfig, ServerConfig};

#[derive(Clone)]
pub(crate) struct ProxyState {
    pub(crate) routes: Arc<[ProxyConfig]>,
    pub(crate) max_body_bytes: usize,
    pub(crate) http_client: reqwest::Client,
}

impl ProxyState {
    pub(crate) fn new(config: &ServerConfig, routes: Vec<ProxyConfig>) -> Result<Self> {
        Ok(ProxyState {
            routes: routes.into(),
            max_body_bytes: config.max_body_bytes,
            http_client: http_client(config)?,
        })
    }

    /// First route whose prefix starts `path`, with the prefix removed.
    pub(crate) fn route<'a>(&self, path: &'a str) -> Option<(&ProxyConfig, &'a str)> {
        self.routes
            .iter()
            .find_map(|route| route.relative_path(path).map(|relative_path| (route, relative_path)))
    }
}

fn http_client(config: &ServerConfig) -> Result<reqwest::Client> {
    let http_client = reqwest::Client::builder()
        .redirect(Policy::limited(config.max_redirects))
        .timeout(config.upstream_timeout())
        .build()?;
    Ok(http_client)
}
