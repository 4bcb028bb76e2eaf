//! HTTP infrastructure: `HttpProbe` and `MetadataClient` over `ureq`.
//!
//! `ureq` is blocking, so every request runs on the blocking pool with its
//! own agent-level timeout.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{HttpProbe, HttpResponse, MetadataClient};

const TOKEN_PATH: &str = "api/token";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Blocking HTTP client shared by the liveness probe and the metadata client.
#[derive(Clone)]
pub struct UreqHttp {
    agent: ureq::Agent,
    metadata_agent: ureq::Agent,
    metadata_endpoint: String,
}

impl UreqHttp {
    /// `timeout` bounds liveness probes; `metadata_timeout` bounds each
    /// metadata request.
    #[must_use]
    pub fn new(timeout: Duration, metadata_endpoint: &str, metadata_timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            metadata_agent: ureq::AgentBuilder::new()
                .timeout(metadata_timeout)
                .build(),
            metadata_endpoint: metadata_endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn metadata_url(&self, path: &str) -> String {
        format!("{}/{path}", self.metadata_endpoint)
    }
}

impl HttpProbe for UreqHttp {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let agent = self.agent.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || -> Result<HttpResponse> {
            match agent.get(&url).call() {
                Ok(resp) => Ok(HttpResponse {
                    status: resp.status(),
                    body: resp.into_string().context("reading response body")?,
                }),
                Err(ureq::Error::Status(code, resp)) => Ok(HttpResponse {
                    status: code,
                    body: resp.into_string().unwrap_or_default(),
                }),
                Err(e) => Err(anyhow::anyhow!("GET {url}: {e}")),
            }
        })
        .await
        .context("http probe task panicked")?
    }
}

impl MetadataClient for UreqHttp {
    async fn acquire_token(&self, ttl_secs: u64) -> Result<String> {
        let agent = self.metadata_agent.clone();
        let url = self.metadata_url(TOKEN_PATH);
        tokio::task::spawn_blocking(move || -> Result<String> {
            let resp = agent
                .put(&url)
                .set(TOKEN_TTL_HEADER, &ttl_secs.to_string())
                .call()
                .map_err(|e| anyhow::anyhow!("PUT {url}: {e}"))?;
            let token = resp.into_string().context("reading token")?;
            let token = token.trim();
            anyhow::ensure!(!token.is_empty(), "empty metadata token");
            Ok(token.to_string())
        })
        .await
        .context("metadata token task panicked")?
    }

    async fn fetch(&self, path: &str, token: Option<&str>) -> Result<String> {
        let agent = self.metadata_agent.clone();
        let url = self.metadata_url(&format!("meta-data/{path}"));
        let token = token.map(String::from);
        tokio::task::spawn_blocking(move || -> Result<String> {
            let req = agent.get(&url);
            let req = match &token {
                Some(t) => req.set(TOKEN_HEADER, t),
                None => req,
            };
            match req.call() {
                Ok(resp) => resp.into_string().context("reading metadata value"),
                Err(ureq::Error::Status(code, _)) => anyhow::bail!("GET {url}: HTTP {code}"),
                Err(e) => anyhow::bail!("GET {url}: {e}"),
            }
        })
        .await
        .context("metadata fetch task panicked")?
    }
}
