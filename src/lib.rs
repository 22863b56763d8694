//! # Exporter Merger
//!
//! Merges the metrics of several Prometheus exporters into a single response.
//!
//! ## Pipeline
//!
//! Each aggregation request runs the same stages from a clean slate:
//!
//! - **`source`**: fetches the text exposed by one exporter (`Scrape`, `HttpScraper`)
//! - **`fanout`**: scrapes and parses all exporters concurrently, skipping the ones that fail
//! - **`merge`**: combines same-named families, appending series in exporter order
//! - **`dedup`**: optionally drops series whose label set was already seen in the family
//! - **`serialize`**: writes the families in name order in the text exposition format
//! - **`merger`**: the `Merger` that runs the stages above
//!
//! ## Failure behaviour
//!
//! An exporter that cannot be reached, times out, answers with a non-2xx status or returns
//! something that is not exposition text contributes nothing. The document is still produced,
//! possibly empty. Only a failing writer is reported to the caller.
//!
//! ## Usage
//!
//! ```no_run
//! # async fn run() -> eyre::Result<()> {
//! use exporter_merger::Merger;
//! use std::time::Duration;
//!
//! let merger = Merger::new(
//!     vec!["http://localhost:9100/metrics".parse()?, "http://localhost:9256/metrics".parse()?],
//!     Duration::from_secs(10),
//!     true,
//! )?;
//! let document = merger.render().await?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod dedup;
pub mod fanout;
pub mod merge;
pub mod merger;
pub mod serialize;
pub mod source;

pub use dedup::{
    deduplicate,
    deduplicate_family,
    label_signature,
};
pub use exporter_merger_exposition as exposition;
pub use fanout::{
    fan_out,
    DEFAULT_TIMEOUT,
};
pub use merge::{
    merge_families,
    MergedFamilySet,
};
pub use merger::Merger;
pub use serialize::{
    write_families,
    SerializeError,
};
pub use source::{
    HttpScraper,
    Scrape,
    ScrapeFuture,
    SourceError,
};
