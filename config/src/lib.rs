//! # Configuration
//!
//! Resolved once at startup, lowest precedence first:
//!
//! 1. built-in defaults (`default-config.yaml`)
//! 2. the YAML file given by `--config-path`, or `config.yaml` in the config directory
//! 3. `MERGER_*` environment variables (`MERGER_URLS` is space separated)
//! 4. command line flags

#[macro_use]
extern crate tracing;

mod app_config;
mod args;

pub use app_config::get_config_dir;
pub use args::Args;
use eyre::{
    eyre,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::SocketAddr,
    time::Duration,
};
use url::Url;

const ENV_PREFIX: &str = "MERGER";

/// One exporter entry of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exporter {
    pub url: Url,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Exporters listed in the configuration file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exporters: Vec<Exporter>,
    /// Exporters given through `MERGER_URLS` or `--url`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<Url>,
    pub listen_address: SocketAddr,
    #[serde(default, alias = "port", skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,
    /// Seconds.
    pub exporters_timeout: u64,
    #[serde(default)]
    pub deduplicate: bool,
    #[serde(default, skip_serializing)]
    pub verbose: bool,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl config::Source for Config {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = config::Map::<String, config::Value>::new();
        cache.insert("listen_address".to_string(), self.listen_address.to_string().into());
        cache.insert("exporters_timeout".to_string(), self.exporters_timeout.into());
        cache.insert("deduplicate".to_string(), self.deduplicate.into());
        if !self.exporters.is_empty() {
            cache.insert(
                "exporters".to_string(),
                self.exporters
                    .iter()
                    .map(|ea| {
                        config::ValueKind::Table(config::Map::from_iter([(
                            "url".to_string(),
                            ea.url.to_string().into(),
                        )]))
                    })
                    .collect::<Vec<_>>()
                    .into(),
            );
        }
        Ok(cache)
    }
}

impl Config {
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let file = match &args.config_path {
            Some(path) => config::File::from(path.as_path()).required(true),
            None => config::File::from(app_config::default_config_file()).required(false),
        };

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(" ")
            .with_list_parse_key("urls");

        let cfg: Self = config::Config::builder()
            .add_source(Config::default())
            .add_source(file.format(config::FileFormat::Yaml))
            .add_source(environment)
            .add_source(args)
            .build()?
            .try_deserialize()?;

        debug!(?cfg, "resolved configuration");
        Ok(cfg)
    }

    /// Exporters from the configuration file first, then the ones given on the command line or
    /// environment. Duplicates are kept.
    pub fn exporter_urls(&self) -> Vec<Url> {
        self.exporters
            .iter()
            .map(|exporter| exporter.url.clone())
            .chain(self.urls.iter().cloned())
            .collect()
    }

    pub fn listen_address(&self) -> SocketAddr {
        let mut address = self.listen_address;
        if let Some(port) = self.listen_port {
            address.set_port(port);
        }
        address
    }

    pub fn exporters_timeout(&self) -> Duration {
        Duration::from_secs(self.exporters_timeout)
    }

    /// An empty exporter list is fine, the merged document is empty then.
    pub fn validate(&self) -> Result<()> {
        if self.exporters_timeout == 0 {
            return Err(eyre!("exporters_timeout must be at least one second"));
        }
        if let Some(url) = self
            .exporter_urls()
            .into_iter()
            .find(|url| !matches!(url.scheme(), "http" | "https"))
        {
            return Err(eyre!("exporter URL {url} must use http or https"));
        }
        Ok(())
    }
}
