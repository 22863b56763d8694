//! # Merger
//!
//! Ties the stages together for one aggregation request:
//!
//! ```text
//! fan_out ──► merge_families ──► deduplicate (optional) ──► write_families
//! ```

use crate::{
    dedup::deduplicate,
    fanout::fan_out,
    merge::{
        merge_families,
        MergedFamilySet,
    },
    serialize::{
        write_families,
        SerializeError,
    },
    source::{
        HttpScraper,
        Scrape,
    },
};
use exporter_merger_config::Config;
use std::{
    io,
    sync::Arc,
    time::Duration,
};
use url::Url;

/// Immutable pipeline settings. Every call starts from scratch, so one `Merger` can serve any
/// number of concurrent requests.
#[derive(Clone)]
pub struct Merger {
    sources: Vec<Url>,
    timeout: Duration,
    deduplicate: bool,
    scraper: Arc<dyn Scrape>,
}

impl std::fmt::Debug for Merger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merger")
            .field("sources", &self.sources)
            .field("timeout", &self.timeout)
            .field("deduplicate", &self.deduplicate)
            .finish_non_exhaustive()
    }
}

impl Merger {
    /// A merger scraping `sources` over HTTP.
    pub fn new(sources: Vec<Url>, timeout: Duration, deduplicate: bool) -> reqwest::Result<Self> {
        Ok(Self::with_scraper(sources, timeout, deduplicate, Arc::new(HttpScraper::new()?)))
    }

    pub fn with_scraper(sources: Vec<Url>, timeout: Duration, deduplicate: bool, scraper: Arc<dyn Scrape>) -> Self {
        Self {
            sources,
            timeout,
            deduplicate,
            scraper,
        }
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(config.exporter_urls(), config.exporters_timeout(), config.deduplicate)
    }

    pub fn sources(&self) -> &[Url] {
        &self.sources
    }

    /// Scrape, merge and, if enabled, deduplicate.
    pub async fn collect(&self) -> MergedFamilySet {
        let scraped = fan_out(Arc::clone(&self.scraper), &self.sources, self.timeout).await;
        debug!(
            sources = self.sources.len(),
            succeeded = scraped.len(),
            "scraped exporters"
        );

        let mut families = merge_families(scraped);
        if self.deduplicate {
            deduplicate(&mut families);
        }
        families
    }

    /// Run the whole pipeline and write the document to `writer`.
    pub async fn merge_into<W: io::Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        let families = self.collect().await;
        write_families(&families, writer)
    }

    /// Run the whole pipeline and return the document.
    pub async fn render(&self) -> Result<Vec<u8>, SerializeError> {
        let mut out = Vec::new();
        self.merge_into(&mut out).await?;
        Ok(out)
    }
}
