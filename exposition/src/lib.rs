//! # Text Exposition Format
//!
//! Reading and writing of the line-oriented Prometheus text format:
//!
//! ```text
//! # HELP http_requests_total Total number of HTTP requests.
//! # TYPE http_requests_total counter
//! http_requests_total{method="GET"} 1027 1395066363000
//! ```
//!
//! - **`model`**: metric families, series, label sets and typed sample values
//! - **`parser`**: text → [`FamilyMap`]
//! - **`encoder`**: [`MetricFamily`] → text

mod encoder;
mod error;
mod model;
mod parser;

pub use encoder::{
    encode,
    encode_family,
    format_float,
    CONTENT_TYPE,
};
pub use error::ParseError;
pub use model::{
    Bucket,
    FamilyMap,
    Histogram,
    LabelPair,
    Metric,
    MetricFamily,
    MetricType,
    MetricValue,
    Quantile,
    Summary,
};
pub use parser::parse;
