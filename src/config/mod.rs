#[allow(clippy::module_inception)]
mod config;
mod routes;

pub(crate) use config::ServerConfig;
pub(crate) use routes::ProxyConfig;
