use std::collections::BTreeMap;

/// Metric families keyed by family name.
pub type FamilyMap = BTreeMap<String, MetricFamily>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    #[default]
    Untyped,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelPair {
    pub name: String,
    pub value: String,
}

impl LabelPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantile {
    pub quantile: f64,
    pub value: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    pub sample_count: u64,
    pub sample_sum: f64,
    pub quantiles: Vec<Quantile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub upper_bound: f64,
    pub cumulative_count: u64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Histogram {
    pub sample_count: u64,
    pub sample_sum: f64,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
    Untyped(f64),
    Summary(Summary),
    Histogram(Histogram),
}

impl MetricValue {
    /// An empty value of the shape `metric_type` expects.
    pub fn empty(metric_type: MetricType) -> Self {
        match metric_type {
            MetricType::Counter => Self::Counter(0.0),
            MetricType::Gauge => Self::Gauge(0.0),
            MetricType::Untyped => Self::Untyped(0.0),
            MetricType::Summary => Self::Summary(Summary::default()),
            MetricType::Histogram => Self::Histogram(Histogram::default()),
        }
    }

    pub fn simple(metric_type: MetricType, value: f64) -> Self {
        match metric_type {
            MetricType::Counter => Self::Counter(value),
            MetricType::Gauge => Self::Gauge(value),
            _ => Self::Untyped(value),
        }
    }
}

/// A single series: one label set and its sample value(s).
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub labels: Vec<LabelPair>,
    pub value: MetricValue,
    pub timestamp_ms: Option<i64>,
}

impl Metric {
    pub fn new(labels: Vec<LabelPair>, value: MetricValue) -> Self {
        Self {
            labels,
            value,
            timestamp_ms: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|pair| pair.name == name)
            .map(|pair| pair.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: Option<String>,
    pub metric_type: MetricType,
    pub metrics: Vec<Metric>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            help: None,
            metric_type,
            metrics: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn metric_type_keywords() {
        assert_eq!(MetricType::from_str("counter").unwrap(), MetricType::Counter);
        assert_eq!(MetricType::from_str("histogram").unwrap(), MetricType::Histogram);
        assert_eq!(MetricType::Untyped.to_string(), "untyped");
        assert_eq!(MetricType::Summary.to_string(), "summary");
        assert!(MetricType::from_str("gaugehistogram").is_err());
    }

    #[test]
    fn label_lookup() {
        let metric = Metric::new(
            vec![LabelPair::new("a", "1"), LabelPair::new("b", "2")],
            MetricValue::Gauge(1.0),
        );
        assert_eq!(metric.label("b"), Some("2"));
        assert_eq!(metric.label("c"), None);
    }
}
