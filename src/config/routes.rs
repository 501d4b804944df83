use anyhow::{Context, Result};
use url::Url;

pub(crate) const API_BASE_ENV: &str = "API_BASE";
pub(crate) const PLACES_BASE_ENV: &str = "PLACES_BASE";
pub(crate) const SERPAPI_BASE_ENV: &str = "SERPAPI_BASE";
pub(crate) const SERPAPI_KEY_ENV: &str = "SERPAPI_KEY";

const DEFAULT_API_BASE: &str = "https://721inkpci4.execute-api.us-east-2.amazonaws.com";
const DEFAULT_PLACES_BASE: &str = "https://places.geo.us-east-2.api.aws";
const DEFAULT_SERPAPI_BASE: &str = "https://serpapi.com";

const SERPAPI_KEY_QUERY_PARAM: &str = "api_key";

/// One proxied backend: requests under `route_prefix` go to `upstream_base_url`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ProxyConfig {
    pub(crate) name: &'static str,
    pub(crate) route_prefix: &'static str,
    pub(crate) upstream_base_url: String,
    /// Added to the forwarded query string unless the caller already sent the key.
    pub(crate) injected_query_params: Vec<(String, String)>,
}

impl ProxyConfig {
    /// Builds the API, Places and SerpAPI routes from the process environment.
    pub(crate) fn from_env() -> Result<Vec<Self>> {
        Self::load(|key| std::env::var(key).ok())
    }

    pub(crate) fn load<F>(lookup: F) -> Result<Vec<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        // An empty value counts as unset.
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let serpapi_key = var(SERPAPI_KEY_ENV);
        if serpapi_key.is_none() {
            tracing::warn!("{SERPAPI_KEY_ENV} not set, SerpAPI requests will not carry an api_key");
        }

        Ok(vec![
            Self::new(
                "api",
                "/api/",
                base_url(API_BASE_ENV, var(API_BASE_ENV), DEFAULT_API_BASE)?,
                vec![],
            ),
            Self::new(
                "places",
                "/places/",
                base_url(PLACES_BASE_ENV, var(PLACES_BASE_ENV), DEFAULT_PLACES_BASE)?,
                vec![],
            ),
            Self::new(
                "serpapi",
                "/serpapi/",
                base_url(SERPAPI_BASE_ENV, var(SERPAPI_BASE_ENV), DEFAULT_SERPAPI_BASE)?,
                serpapi_key
                    .map(|key| vec![(SERPAPI_KEY_QUERY_PARAM.to_string(), key)])
                    .unwrap_or_default(),
            ),
        ])
    }

    fn new(
        name: &'static str,
        route_prefix: &'static str,
        upstream_base_url: String,
        injected_query_params: Vec<(String, String)>,
    ) -> Self {
        tracing::info!(
            name,
            route_prefix,
            %upstream_base_url,
            injected_query_params = ?injected_query_params.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            "Configured proxy route"
        );
        Self {
            name,
            route_prefix,
            upstream_base_url,
            injected_query_params,
        }
    }

    /// Removes exactly one leading occurrence of the route prefix.
    pub(crate) fn relative_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.route_prefix)
    }
}

fn base_url(env_key: &str, value: Option<String>, default: &str) -> Result<String> {
    let value = value.unwrap_or_else(|| {
        tracing::info!("{env_key} not set, using default: {default}");
        default.to_string()
    });
    let url = Url::parse(&value).with_context(|| format!("{env_key} is not a valid URL: {value}"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "{env_key} must be an http or https URL, got scheme \"{}\"",
        url.scheme()
    );
    Ok(value.strip_suffix('/').unwrap_or(&value).to_string())
}
