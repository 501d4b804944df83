use anyhow::{Context, Result};
use serde::Deserialize;
use std::{net::IpAddr, net::Ipv4Addr, path::Path, time::Duration};

const fn _default_bind_address() -> IpAddr { IpAddr::V4(Ipv4Addr::LOCALHOST) }
const fn _default_proxy_port() -> u16 { 60061 }
const fn _default_metrics_port() -> u16 { 60062 }
const fn _default_upstream_timeout_secs() -> u64 { 30 }
const fn _default_max_redirects() -> usize { 10 }
// Plenty for the JSON payloads the trip planner sends.
const fn _default_max_body_bytes() -> usize { 10 * 1024 * 1024 }

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerConfig {
    #[serde(default = "_default_bind_address")]
    pub(crate) bind_address: IpAddr,
    #[serde(default = "_default_proxy_port")]
    pub(crate) proxy_port: u16,
    #[serde(default = "_default_metrics_port")]
    pub(crate) metrics_port: u16,
    #[serde(default = "_default_upstream_timeout_secs")]
    pub(crate) upstream_timeout_secs: u64,
    #[serde(default = "_default_max_redirects")]
    pub(crate) max_redirects: usize,
    #[serde(default = "_default_max_body_bytes")]
    pub(crate) max_body_bytes: usize,
}

impl ServerConfig {
    /// Reads the TOML config file, or falls back to defaults when no file is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let raw = match path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Couldn't read config file {}", path.display()))?,
            None => String::new(),
        };
        let config: ServerConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.proxy_port != self.metrics_port,
            "proxy_port and metrics_port must differ (both are {})",
            self.proxy_port
        );
        anyhow::ensure!(self.upstream_timeout_secs > 0, "upstream_timeout_secs must be non-zero");
        anyhow::ensure!(self.max_body_bytes > 0, "max_body_bytes must be non-zero");
        Ok(())
    }

    pub(crate) fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}
