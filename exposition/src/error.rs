use crate::MetricType;

/// A payload that is not valid text exposition format. `line` is 1-based.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: malformed sample {text:?}")]
    MalformedSample { line: usize, text: String },
    #[error("line {line}: invalid metric name {name:?}")]
    InvalidMetricName { line: usize, name: String },
    #[error("line {line}: duplicate label {label:?}")]
    DuplicateLabel { line: usize, label: String },
    #[error("line {line}: invalid sample value {value:?}")]
    InvalidValue { line: usize, value: String },
    #[error("line {line}: invalid timestamp {value:?}")]
    InvalidTimestamp { line: usize, value: String },
    #[error("line {line}: unknown metric type {value:?}")]
    UnknownType { line: usize, value: String },
    #[error("line {line}: second HELP line for metric {name:?}")]
    DuplicateHelp { line: usize, name: String },
    #[error("line {line}: second TYPE line for metric {name:?}")]
    DuplicateType { line: usize, name: String },
    #[error("line {line}: TYPE line for metric {name:?} must precede its samples")]
    TypeAfterSamples { line: usize, name: String },
    #[error("line {line}: {metric_type} sample {name:?} is missing the {label:?} label")]
    MissingLabel {
        line: usize,
        name: String,
        metric_type: MetricType,
        label: &'static str,
    },
    #[error("line {line}: unexpected sample {name:?} in {metric_type} metric")]
    UnexpectedSample {
        line: usize,
        name: String,
        metric_type: MetricType,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            Self::MalformedSample { line, .. }
            | Self::InvalidMetricName { line, .. }
            | Self::DuplicateLabel { line, .. }
            | Self::InvalidValue { line, .. }
            | Self::InvalidTimestamp { line, .. }
            | Self::UnknownType { line, .. }
            | Self::DuplicateHelp { line, .. }
            | Self::DuplicateType { line, .. }
            | Self::TypeAfterSamples { line, .. }
            | Self::MissingLabel { line, .. }
            | Self::UnexpectedSample { line, .. } => *line,
        }
    }
}
