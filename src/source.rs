//! # Source Fetcher
//!
//! Fetches the raw exposition payload of one exporter. [`Scrape`] is the seam between the fan-out
//! and the network so the pipeline can be driven without real exporters.

use exporter_merger_exposition::{
    parse,
    FamilyMap,
    ParseError,
};
use reqwest::{
    header,
    Client as HttpClient,
    StatusCode,
};
use std::{
    future::Future,
    pin::Pin,
    time::Duration,
};
use url::Url;

const ACCEPT: &str = "text/plain;version=0.0.4;q=1,*/*;q=0.1";

/// Why a single exporter contributed nothing to the merged document.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("HTTP connection failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("reading the response body failed: {0}")]
    Body(#[source] reqwest::Error),
    #[error("parsing the response body failed: {0}")]
    Parse(#[from] ParseError),
}

pub type ScrapeFuture<'a> = Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>>;

/// Fetches the raw text exposed by one exporter.
pub trait Scrape: Send + Sync {
    fn scrape<'a>(&'a self, url: &'a Url, timeout: Duration) -> ScrapeFuture<'a>;
}

/// Scrapes exporters over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpScraper {
    http_client: HttpClient,
}

impl HttpScraper {
    pub fn new() -> reqwest::Result<Self> {
        let http_client = HttpClient::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http_client })
    }
}

impl Scrape for HttpScraper {
    fn scrape<'a>(&'a self, url: &'a Url, timeout: Duration) -> ScrapeFuture<'a> {
        Box::pin(async move {
            debug!(%url, "getting remote metrics");
            let response = self
                .http_client
                .get(url.clone())
                .header(header::ACCEPT, ACCEPT)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify(e, timeout, SourceError::Request))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status(status));
            }

            response
                .text()
                .await
                .map_err(|e| classify(e, timeout, SourceError::Body))
        })
    }
}

fn classify(error: reqwest::Error, timeout: Duration, otherwise: fn(reqwest::Error) -> SourceError) -> SourceError {
    if error.is_timeout() {
        SourceError::Timeout(timeout)
    } else {
        otherwise(error)
    }
}

/// Fetch and parse one exporter.
pub async fn scrape_families(scraper: &dyn Scrape, url: &Url, timeout: Duration) -> Result<FamilyMap, SourceError> {
    let body = scraper.scrape(url, timeout).await?;
    Ok(parse(&body)?)
}
