// src/probes/http.rs
use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::health::{Probe, ProbeContext, ProbeResult};

/// Passes when a GET to `url` answers with a 2xx status before the run's
/// deadline.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: Url,
}

impl HttpProbe {
    pub fn new(url: Url) -> Self {
        Self::with_client(Client::new(), url)
    }

    /// Share one connection pool between several probes.
    pub fn with_client(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, ctx: ProbeContext) -> ProbeResult {
        debug!("HTTP probe requesting {}", self.url);

        let response = ctx
            .within(self.client.get(self.url.as_str()).send())
            .await?
            .with_context(|| format!("GET {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}", status);
        }

        Ok(())
    }
}
