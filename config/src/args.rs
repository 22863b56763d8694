use clap::Parser;
use std::{
    net::SocketAddr,
    path::PathBuf,
};

/// Merges the metrics of several Prometheus exporters into one endpoint.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file.
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Exporter URL to scrape. Can be specified multiple times.
    ///   (env: MERGER_URLS, space separated)
    #[clap(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Address the HTTP server listens on.
    #[clap(long, value_name = "ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// Only override the port of the listen address.
    #[clap(long, value_name = "PORT")]
    pub listen_port: Option<u16>,

    /// HTTP client timeout for scraping a single exporter.
    #[clap(long, value_name = "SECONDS")]
    pub exporters_timeout: Option<u64>,

    /// Drop series whose label set was already exposed by another exporter.
    #[clap(long = "dedup", action)]
    pub deduplicate: bool,

    /// Enables debug logging.
    #[clap(short, long, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = Map::<String, Value>::new();
            if !self.urls.is_empty() {
                cache.insert("urls".to_string(), self.urls.clone().into());
            }
            if let Some(listen_address) = &self.listen_address {
                cache.insert("listen_address".to_string(), listen_address.to_string().into());
            }
            if let Some(listen_port) = self.listen_port {
                cache.insert("listen_port".to_string(), u64::from(listen_port).into());
            }
            if let Some(exporters_timeout) = self.exporters_timeout {
                cache.insert("exporters_timeout".to_string(), exporters_timeout.into());
            }
            if self.deduplicate {
                cache.insert("deduplicate".to_string(), true.into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}",
        clap::crate_version!()
    )
}
