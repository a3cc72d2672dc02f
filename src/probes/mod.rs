// src/probes/mod.rs
//! Ready-made probes for common dependencies.
mod http;
mod tcp;

pub use http::HttpProbe;
pub use tcp::TcpProbe;

use std::sync::Arc;

use crate::config::{ProbeConfig, ProbeKind};
use crate::health::Probe;

/// Build the probe described by a configuration entry.
pub fn from_config(config: &ProbeConfig, client: &reqwest::Client) -> Arc<dyn Probe> {
    match &config.kind {
        ProbeKind::Http { url } => Arc::new(HttpProbe::with_client(client.clone(), url.clone())),
        ProbeKind::Tcp { addr } => Arc::new(TcpProbe::new(addr.clone())),
    }
}
