// src/probes/tcp.rs
use anyhow::Context;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use crate::health::{Probe, ProbeContext, ProbeResult};

/// Passes when a TCP connection to `addr` can be established before the
/// run's deadline. The connection is closed straight away.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self, ctx: ProbeContext) -> ProbeResult {
        debug!("TCP probe connecting to {}", self.addr);

        let _stream = ctx
            .within(TcpStream::connect(&self.addr))
            .await?
            .with_context(|| format!("connect to {}", self.addr))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn passes_when_port_accepts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let probe = TcpProbe::new(listener.local_addr().unwrap().to_string());

        let ctx = ProbeContext::with_timeout(Duration::from_secs(2));
        assert!(probe.check(ctx).await.is_ok());
    }

    #[tokio::test]
    async fn fails_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let probe = TcpProbe::new(addr.clone());
        let ctx = ProbeContext::with_timeout(Duration::from_secs(2));
        let err = probe.check(ctx).await.unwrap_err();

        assert!(format!("{:#}", err).starts_with(&format!("connect to {}", addr)));
    }
}
