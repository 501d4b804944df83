use anyhow::{Context, Result};
use std::{net::SocketAddr, num::NonZero, time::Duration};

use metrics_exporter_prometheus::{self, PrometheusBuilder};

pub(crate) fn init(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_bucket_duration(Duration::from_secs(60))?
        .set_bucket_count(NonZero::new(5).context("Bucket count must be non-zero")?)
        .install()
        .with_context(|| format!("Couldn't install Prometheus exporter on {addr}"))?;
    Ok(())
}
