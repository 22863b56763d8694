#[macro_use]
extern crate tracing;

pub mod error;
pub mod logging;
mod metrics;
pub mod router;
