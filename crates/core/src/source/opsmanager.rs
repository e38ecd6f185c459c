use crate::config::Settings;
use crate::domain::snapshot::ClusterRef;
use crate::source::types::{ContinuousSnapshot, RetentionUpdateRequest, SnapshotPage};
use crate::source::SnapshotSource;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 500;

// Stops a server that ignores `pageNum` from looping forever.
const DEFAULT_MAX_PAGES: u32 = 1000;

/// Ops Manager public API client authenticating with an API key pair over HTTP Digest.
#[derive(Debug, Clone)]
pub struct OpsManagerClient {
    http: reqwest::Client,
    base_url: Url,
    public_key: String,
    private_key: String,
    page_size: u32,
    max_pages: u32,
}

impl OpsManagerClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let public_key = settings.require_public_key()?;
        let private_key = settings.require_private_key()?;

        let timeout_secs = std::env::var("OPSMANAGER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let page_size = std::env::var("OPSMANAGER_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Ok(Self::new(
            settings.base_url(),
            public_key,
            private_key,
            Duration::from_secs(timeout_secs),
        )?
        .with_page_size(page_size))
    }

    pub fn new(
        base_url: &str,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid Ops Manager base URL: {base_url}"))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Ops Manager http client")?;

        Ok(Self {
            http,
            base_url,
            public_key: public_key.into(),
            private_key: private_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = clamp_page_size(page_size);
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Ops Manager base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn snapshots_url(&self, cluster: &ClusterRef) -> Result<Url> {
        self.endpoint(&[
            "groups",
            cluster.project_id.as_str(),
            "clusters",
            cluster.cluster_id.as_str(),
            "snapshots",
        ])
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        payload: Option<&[u8]>,
        authorization: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(bytes) = payload {
            req = req
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.to_vec());
        }
        if let Some(value) = authorization {
            req = req.header(AUTHORIZATION, value);
        }
        req
    }

    /// Sends the request unauthenticated, answering a `401` digest challenge with one retry.
    async fn send_with_digest(
        &self,
        method: Method,
        url: Url,
        payload: Option<Vec<u8>>,
    ) -> Result<reqwest::Response> {
        let res = self
            .request(method.clone(), url.clone(), payload.as_deref(), None)
            .send()
            .await?;

        if res.status() != StatusCode::UNAUTHORIZED {
            return Ok(res);
        }

        let challenge = res
            .headers()
            .get(WWW_AUTHENTICATE)
            .context("Ops Manager answered 401 without a WWW-Authenticate challenge")?
            .to_str()
            .context("WWW-Authenticate header is not valid ASCII")?
            .to_string();

        let authorization =
            self.digest_authorization(&challenge, &method, &url, payload.as_deref())?;

        let res = self
            .request(method, url, payload.as_deref(), Some(&authorization))
            .send()
            .await?;
        Ok(res)
    }

    fn digest_authorization(
        &self,
        challenge: &str,
        method: &Method,
        url: &Url,
        payload: Option<&[u8]>,
    ) -> Result<String> {
        let mut prompt = digest_auth::parse(challenge)
            .map_err(|err| anyhow::anyhow!("failed to parse digest challenge: {err}"))?;

        let uri = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };

        let context = digest_auth::AuthContext::new_with_method(
            self.public_key.as_str(),
            self.private_key.as_str(),
            uri.as_str(),
            payload,
            digest_auth::HttpMethod::from(method.as_str()),
        );

        let answer = prompt
            .respond(&context)
            .map_err(|err| anyhow::anyhow!("failed to answer digest challenge: {err}"))?;
        Ok(answer.to_header_string())
    }

    async fn fetch_page(&self, cluster: &ClusterRef, page_num: u32) -> Result<SnapshotPage> {
        let mut url = self.snapshots_url(cluster)?;
        url.query_pairs_mut()
            .append_pair("pageNum", &page_num.to_string())
            .append_pair("itemsPerPage", &self.page_size.to_string());

        let res = self
            .send_with_digest(Method::GET, url, None)
            .await
            .context("Ops Manager list snapshots request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Ops Manager snapshot listing")?;
        if !status.is_success() {
            anyhow::bail!("Ops Manager list snapshots HTTP {status}: {text}");
        }

        serde_json::from_str::<SnapshotPage>(&text)
            .context("failed to parse Ops Manager snapshot listing")
    }
}

#[async_trait::async_trait]
impl SnapshotSource for OpsManagerClient {
    fn source_name(&self) -> &'static str {
        "ops_manager"
    }

    async fn list_snapshots(&self, cluster: &ClusterRef) -> Result<Vec<ContinuousSnapshot>> {
        let mut out = Vec::new();
        let mut page_num: u32 = 1;

        loop {
            let page = self.fetch_page(cluster, page_num).await?;
            let received = page.results.len();
            out.extend(page.results);

            tracing::debug!(
                page_num,
                received,
                total_count = ?page.total_count,
                collected = out.len(),
                "fetched snapshot page"
            );

            // Servers may cap itemsPerPage below what was asked, so a short page only
            // ends the listing when there is no totalCount to go by.
            let done = match page.total_count {
                Some(total) => received == 0 || out.len() as u64 >= total,
                None => received == 0 || received < self.page_size as usize,
            };
            if done {
                break;
            }

            anyhow::ensure!(
                page_num < self.max_pages,
                "snapshot listing exceeded {} pages of {} items",
                self.max_pages,
                self.page_size
            );
            page_num += 1;
        }

        tracing::info!(
            project_id = %cluster.project_id,
            cluster_id = %cluster.cluster_id,
            snapshots = out.len(),
            pages = page_num,
            "listed snapshots"
        );
        Ok(out)
    }

    async fn set_retention_flag(
        &self,
        cluster: &ClusterRef,
        snapshot_id: &str,
        exempt: bool,
    ) -> Result<()> {
        let mut url = self.snapshots_url(cluster)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Ops Manager base URL cannot carry a path"))?
            .push(snapshot_id);

        let payload = serde_json::to_vec(&RetentionUpdateRequest {
            do_not_delete: exempt,
        })
        .context("failed to encode retention update")?;

        let res = self
            .send_with_digest(Method::PATCH, url, Some(payload))
            .await
            .context("Ops Manager snapshot update request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Ops Manager snapshot update response")?;
        if !status.is_success() {
            anyhow::bail!("Ops Manager snapshot update HTTP {status}: {text}");
        }

        // The API echoes the snapshot; trust it only when it parses.
        if let Ok(updated) = serde_json::from_str::<ContinuousSnapshot>(&text) {
            if let Some(flag) = updated.do_not_delete {
                anyhow::ensure!(
                    flag == exempt,
                    "Ops Manager reported doNotDelete={flag} after update of snapshot {snapshot_id}"
                );
            }
        }

        Ok(())
    }
}

fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}
