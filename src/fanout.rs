//! # Fan-out Coordinator
//!
//! One task per exporter, joined in the order the exporters are configured. Every task owns its
//! URL and a handle to the scraper, results come back through the join handles, so nothing is
//! shared between tasks or between two aggregation calls.

use crate::source::{
    scrape_families,
    Scrape,
    SourceError,
};
use exporter_merger_exposition::FamilyMap;
use futures::future::join_all;
use std::{
    sync::Arc,
    time::Duration,
};
use url::Url;

/// Used when no (or a zero) timeout is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Scrape and parse all `sources` concurrently.
///
/// Failed exporters are logged and skipped, the returned families are ordered like `sources`
/// minus the failures. If every exporter fails the result is empty.
pub async fn fan_out(scraper: Arc<dyn Scrape>, sources: &[Url], timeout: Duration) -> Vec<FamilyMap> {
    let timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };

    let handles = sources
        .iter()
        .cloned()
        .map(|url| {
            let scraper = Arc::clone(&scraper);
            tokio::spawn(async move {
                let scraped = tokio::time::timeout(timeout, scrape_families(scraper.as_ref(), &url, timeout)).await;
                let result = scraped.unwrap_or(Err(SourceError::Timeout(timeout)));
                (url, result)
            })
        })
        .collect::<Vec<_>>();

    let mut results = Vec::with_capacity(handles.len());
    for joined in join_all(handles).await {
        match joined {
            Ok((url, Ok(families))) => {
                debug!(%url, families = families.len(), "scraped exporter");
                results.push(families);
            }
            Ok((url, Err(e))) => {
                error!(%url, "scraping exporter failed: {e}");
            }
            Err(e) => {
                error!("scrape task did not complete: {e}");
            }
        }
    }
    results
}
