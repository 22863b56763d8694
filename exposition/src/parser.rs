use crate::{
    error::ParseError,
    model::{
        Bucket,
        FamilyMap,
        LabelPair,
        Metric,
        MetricFamily,
        MetricType,
        MetricValue,
        Quantile,
    },
};
use nom::{
    branch::alt,
    bytes::complete::{
        escaped_transform,
        is_not,
        tag,
        take_till1,
    },
    character::complete::{
        alpha1,
        alphanumeric1,
        char as nom_char,
        space0,
        space1,
    },
    combinator::{
        all_consuming,
        map,
        opt,
        recognize,
        value,
    },
    multi::{
        many0,
        separated_list0,
    },
    sequence::{
        delimited,
        pair,
        preceded,
        terminated,
        tuple,
    },
    IResult,
};
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    str::FromStr,
};

const QUANTILE_LABEL: &str = "quantile";
const BUCKET_LABEL: &str = "le";
const BLANKS: &[char] = &[' ', '\t'];

/// Parse a text exposition payload into metric families keyed by name.
///
/// Families that only carry `# HELP`/`# TYPE` lines and no samples are dropped.
pub fn parse(text: &str) -> Result<FamilyMap, ParseError> {
    let mut parser = TextParser::default();
    for (index, line) in text.lines().enumerate() {
        parser.parse_line(index + 1, line)?;
    }
    Ok(parser.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffix {
    Bucket,
    Sum,
    Count,
}

struct FamilyState {
    family: MetricFamily,
    help_seen: bool,
    type_seen: bool,
    /// Summary and histogram series by label set (without `quantile`/`le`), as index into
    /// `family.metrics`.
    series: HashMap<String, usize>,
}

impl FamilyState {
    fn new(name: &str) -> Self {
        Self {
            family: MetricFamily::new(name, MetricType::Untyped),
            help_seen: false,
            type_seen: false,
            series: HashMap::new(),
        }
    }

    /// The series with `labels`, appended if not present yet.
    fn series_mut(&mut self, labels: Vec<LabelPair>, timestamp_ms: Option<i64>) -> &mut Metric {
        let metrics = &mut self.family.metrics;
        let metric_type = self.family.metric_type;
        let index = *self.series.entry(series_key(&labels)).or_insert_with(|| {
            metrics.push(Metric::new(labels, MetricValue::empty(metric_type)));
            metrics.len() - 1
        });
        let metric = &mut metrics[index];
        if timestamp_ms.is_some() {
            metric.timestamp_ms = timestamp_ms;
        }
        metric
    }
}

/// Order independent key of a label set.
fn series_key(labels: &[LabelPair]) -> String {
    let mut pairs = labels.iter().collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.name.cmp(&b.name));
    pairs
        .iter()
        .map(|pair| format!("{}={:?}", pair.name, pair.value))
        .collect::<Vec<_>>()
        .join(",")
}

/// A sample line after tokenization and value conversion.
struct Sample<'a> {
    line: usize,
    name: &'a str,
    labels: Vec<LabelPair>,
    value: f64,
    timestamp_ms: Option<i64>,
}

#[derive(Default)]
struct TextParser {
    families: BTreeMap<String, FamilyState>,
}

impl TextParser {
    fn parse_line(&mut self, line: usize, text: &str) -> Result<(), ParseError> {
        let text = text.trim_start_matches(BLANKS);
        if text.is_empty() {
            return Ok(());
        }
        match text.strip_prefix('#') {
            Some(comment) => self.parse_comment(line, comment),
            None => self.parse_sample(line, text),
        }
    }

    fn parse_comment(&mut self, line: usize, comment: &str) -> Result<(), ParseError> {
        let (keyword, rest) = split_token(comment);
        match keyword {
            "HELP" => {
                let (name, help) = split_token(rest);
                let state = self.family_state(line, name)?;
                if state.help_seen {
                    return Err(ParseError::DuplicateHelp {
                        line,
                        name: name.to_string(),
                    });
                }
                state.help_seen = true;
                state.family.help = Some(unescape_help(help));
                Ok(())
            }
            "TYPE" => {
                let (name, rest) = split_token(rest);
                let (keyword, _) = split_token(rest);
                let state = self.family_state(line, name)?;
                if state.type_seen {
                    return Err(ParseError::DuplicateType {
                        line,
                        name: name.to_string(),
                    });
                }
                if !state.family.metrics.is_empty() {
                    return Err(ParseError::TypeAfterSamples {
                        line,
                        name: name.to_string(),
                    });
                }
                state.family.metric_type = MetricType::from_str(keyword).map_err(|_| ParseError::UnknownType {
                    line,
                    value: keyword.to_string(),
                })?;
                state.type_seen = true;
                Ok(())
            }
            // Plain comment.
            _ => Ok(()),
        }
    }

    fn family_state(&mut self, line: usize, name: &str) -> Result<&mut FamilyState, ParseError> {
        if all_consuming(metric_name)(name).is_err() {
            return Err(ParseError::InvalidMetricName {
                line,
                name: name.to_string(),
            });
        }
        Ok(self
            .families
            .entry(name.to_string())
            .or_insert_with(|| FamilyState::new(name)))
    }

    fn parse_sample(&mut self, line: usize, text: &str) -> Result<(), ParseError> {
        let (_, tokens) = sample_line(text).map_err(|_| ParseError::MalformedSample {
            line,
            text: text.to_string(),
        })?;

        for (index, pair) in tokens.labels.iter().enumerate() {
            if tokens.labels[..index].iter().any(|seen| seen.name == pair.name) {
                return Err(ParseError::DuplicateLabel {
                    line,
                    label: pair.name.clone(),
                });
            }
        }

        let value = parse_float(tokens.value).ok_or_else(|| ParseError::InvalidValue {
            line,
            value: tokens.value.to_string(),
        })?;
        let timestamp_ms = tokens
            .timestamp
            .map(|raw| {
                raw.parse::<i64>().map_err(|_| ParseError::InvalidTimestamp {
                    line,
                    value: raw.to_string(),
                })
            })
            .transpose()?;

        let sample = Sample {
            line,
            name: tokens.name,
            labels: tokens.labels,
            value,
            timestamp_ms,
        };

        let (family_name, suffix) = self.resolve_family(sample.name);
        let state = self
            .families
            .entry(family_name.to_string())
            .or_insert_with(|| FamilyState::new(family_name));
        match state.family.metric_type {
            MetricType::Summary => add_summary_sample(state, sample, suffix),
            MetricType::Histogram => add_histogram_sample(state, sample, suffix),
            metric_type => {
                state.family.metrics.push(Metric {
                    labels: sample.labels,
                    value: MetricValue::simple(metric_type, sample.value),
                    timestamp_ms: sample.timestamp_ms,
                });
                Ok(())
            }
        }
    }

    /// Map `x_sum`, `x_count` and `x_bucket` onto a declared summary or histogram `x`.
    fn resolve_family<'n>(&self, name: &'n str) -> (&'n str, Option<Suffix>) {
        for (ending, suffix) in [("_bucket", Suffix::Bucket), ("_sum", Suffix::Sum), ("_count", Suffix::Count)] {
            let Some(base) = name.strip_suffix(ending) else {
                continue;
            };
            let accepts = self.families.get(base).is_some_and(|state| {
                matches!(
                    (state.family.metric_type, suffix),
                    (MetricType::Histogram, _) | (MetricType::Summary, Suffix::Sum | Suffix::Count)
                )
            });
            if accepts {
                return (base, Some(suffix));
            }
        }
        (name, None)
    }

    fn finish(self) -> FamilyMap {
        self.families
            .into_iter()
            .filter(|(_, state)| !state.family.metrics.is_empty())
            .map(|(name, state)| (name, state.family))
            .collect()
    }
}

/// `resolve_family` only maps `_sum` and `_count` onto a summary, `x_bucket` stays a family of its
/// own.
fn add_summary_sample(state: &mut FamilyState, mut sample: Sample<'_>, suffix: Option<Suffix>) -> Result<(), ParseError> {
    let quantile = match suffix {
        None => Some(take_bound(&state.family, &mut sample, QUANTILE_LABEL)?),
        _ => None,
    };

    let value = sample.value;
    let metric = state.series_mut(sample.labels, sample.timestamp_ms);
    if let MetricValue::Summary(summary) = &mut metric.value {
        match (suffix, quantile) {
            (Some(Suffix::Sum), _) => summary.sample_sum = value,
            (Some(Suffix::Count), _) => summary.sample_count = value as u64,
            (_, Some(quantile)) => summary.quantiles.push(Quantile { quantile, value }),
            _ => {}
        }
    }
    Ok(())
}

fn add_histogram_sample(
    state: &mut FamilyState,
    mut sample: Sample<'_>,
    suffix: Option<Suffix>,
) -> Result<(), ParseError> {
    let upper_bound = match suffix {
        Some(Suffix::Bucket) => Some(take_bound(&state.family, &mut sample, BUCKET_LABEL)?),
        Some(Suffix::Sum | Suffix::Count) => None,
        None => return Err(unexpected(&state.family, &sample)),
    };

    let value = sample.value;
    let metric = state.series_mut(sample.labels, sample.timestamp_ms);
    if let MetricValue::Histogram(histogram) = &mut metric.value {
        match (suffix, upper_bound) {
            (Some(Suffix::Sum), _) => histogram.sample_sum = value,
            (Some(Suffix::Count), _) => histogram.sample_count = value as u64,
            (_, Some(upper_bound)) => histogram.buckets.push(Bucket {
                upper_bound,
                cumulative_count: value as u64,
            }),
            _ => {}
        }
    }
    Ok(())
}

/// Remove the `quantile`/`le` label from the sample and parse its value.
fn take_bound(family: &MetricFamily, sample: &mut Sample<'_>, label: &'static str) -> Result<f64, ParseError> {
    let Some(position) = sample.labels.iter().position(|pair| pair.name == label) else {
        return Err(ParseError::MissingLabel {
            line: sample.line,
            name: sample.name.to_string(),
            metric_type: family.metric_type,
            label,
        });
    };
    let raw = sample.labels.remove(position).value;
    parse_float(&raw).ok_or(ParseError::InvalidValue {
        line: sample.line,
        value: raw,
    })
}

fn unexpected(family: &MetricFamily, sample: &Sample<'_>) -> ParseError {
    ParseError::UnexpectedSample {
        line: sample.line,
        name: sample.name.to_string(),
        metric_type: family.metric_type,
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok()
}

fn split_token(input: &str) -> (&str, &str) {
    let input = input.trim_start_matches(BLANKS);
    match input.find(BLANKS) {
        Some(at) => (&input[..at], input[at..].trim_start_matches(BLANKS)),
        None => (input, ""),
    }
}

fn unescape_help(raw: &str) -> String {
    let mut help = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            help.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => help.push('\\'),
            Some('n') => help.push('\n'),
            Some(other) => {
                help.push('\\');
                help.push(other);
            }
            None => help.push('\\'),
        }
    }
    help
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// Sample line grammar

struct SampleTokens<'a> {
    name: &'a str,
    labels: Vec<LabelPair>,
    value: &'a str,
    timestamp: Option<&'a str>,
}

fn metric_name(input: &str) -> IResult<&str, &str> {
    // [a-zA-Z_:][a-zA-Z0-9_:]*
    recognize(pair(
        alt((alpha1, tag("_"), tag(":"))),
        many0(alt((alphanumeric1, tag("_"), tag(":")))),
    ))(input)
}

fn label_name(input: &str) -> IResult<&str, &str> {
    // [a-zA-Z_][a-zA-Z0-9_]*
    recognize(pair(alt((alpha1, tag("_"))), many0(alt((alphanumeric1, tag("_"))))))(input)
}

fn label_value(input: &str) -> IResult<&str, String> {
    delimited(
        nom_char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")), value("\n", tag("n")))),
            )),
            |unescaped: Option<String>| unescaped.unwrap_or_default(),
        ),
        nom_char('"'),
    )(input)
}

fn label_pair(input: &str) -> IResult<&str, LabelPair> {
    map(
        tuple((label_name, delimited(space0, nom_char('='), space0), label_value)),
        |(name, _, value)| LabelPair::new(name, value),
    )(input)
}

fn label_set(input: &str) -> IResult<&str, Vec<LabelPair>> {
    // {name="value", ...} with an optional trailing comma
    delimited(
        terminated(nom_char('{'), space0),
        terminated(
            separated_list0(delimited(space0, nom_char(','), space0), label_pair),
            opt(preceded(space0, nom_char(','))),
        ),
        preceded(space0, nom_char('}')),
    )(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ' ' || c == '\t')(input)
}

fn sample_line(input: &str) -> IResult<&str, SampleTokens<'_>> {
    map(
        all_consuming(tuple((
            metric_name,
            opt(preceded(space0, label_set)),
            preceded(space1, token),
            opt(preceded(space1, token)),
            space0,
        ))),
        |(name, labels, value, timestamp, _)| SampleTokens {
            name,
            labels: labels.unwrap_or_default(),
            value,
            timestamp,
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Histogram,
        Summary,
    };
    use pretty_assertions::assert_eq;

    fn labels(pairs: &[(&str, &str)]) -> Vec<LabelPair> {
        pairs.iter().map(|(name, value)| LabelPair::new(*name, *value)).collect()
    }

    #[test]
    fn parses_counter_with_help_and_type() {
        let text = "\
# HELP http_requests_total The total number of HTTP requests.
# TYPE http_requests_total counter
http_requests_total{method=\"post\",code=\"200\"} 1027 1395066363000
http_requests_total{method=\"post\",code=\"400\"}    3 1395066363000
";
        let families = parse(text).unwrap();
        let family = &families["http_requests_total"];

        assert_eq!(family.help.as_deref(), Some("The total number of HTTP requests."));
        assert_eq!(family.metric_type, MetricType::Counter);
        assert_eq!(
            family.metrics,
            vec![
                Metric::new(
                    labels(&[("method", "post"), ("code", "200")]),
                    MetricValue::Counter(1027.0)
                )
                .with_timestamp(1395066363000),
                Metric::new(
                    labels(&[("method", "post"), ("code", "400")]),
                    MetricValue::Counter(3.0)
                )
                .with_timestamp(1395066363000),
            ]
        );
    }

    #[test]
    fn samples_without_type_are_untyped() {
        let families = parse("metric_without_timestamp_and_labels 12.47\n").unwrap();
        let family = &families["metric_without_timestamp_and_labels"];

        assert_eq!(family.metric_type, MetricType::Untyped);
        assert_eq!(family.help, None);
        assert_eq!(family.metrics, vec![Metric::new(vec![], MetricValue::Untyped(12.47))]);
    }

    #[test]
    fn label_values_are_unescaped() {
        let text = r#"msdos_file_access_time_seconds{path="C:\\DIR\\FILE.TXT",error="Cannot find file:\n\"FILE.TXT\""} 1.458255915e9"#;
        let families = parse(text).unwrap();
        let metric = &families["msdos_file_access_time_seconds"].metrics[0];

        assert_eq!(metric.label("path"), Some(r"C:\DIR\FILE.TXT"));
        assert_eq!(metric.label("error"), Some("Cannot find file:\n\"FILE.TXT\""));
        assert_eq!(metric.value, MetricValue::Untyped(1.458255915e9));
    }

    #[test]
    fn help_text_is_unescaped() {
        let families = parse("# HELP a Line one\\nwith a \\\\ backslash\na 1\n").unwrap();
        assert_eq!(families["a"].help.as_deref(), Some("Line one\nwith a \\ backslash"));
    }

    #[test]
    fn special_values_and_blank_tolerance() {
        let text = "\
# A plain comment
  gauge_a +Inf

gauge_b{ a = \"1\" , } -Inf
gauge_c NaN
";
        let families = parse(text).unwrap();

        assert_eq!(families["gauge_a"].metrics[0].value, MetricValue::Untyped(f64::INFINITY));
        assert_eq!(families["gauge_b"].metrics[0].labels, labels(&[("a", "1")]));
        assert_eq!(families["gauge_b"].metrics[0].value, MetricValue::Untyped(f64::NEG_INFINITY));
        match families["gauge_c"].metrics[0].value {
            MetricValue::Untyped(value) => assert!(value.is_nan()),
            ref other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn empty_label_value_and_empty_braces() {
        let families = parse("a{x=\"\"} 1\nb{} 2\n").unwrap();
        assert_eq!(families["a"].metrics[0].labels, labels(&[("x", "")]));
        assert!(families["b"].metrics[0].labels.is_empty());
    }

    #[test]
    fn groups_summary_samples_by_label_set() {
        let text = "\
# TYPE rpc_duration_seconds summary
rpc_duration_seconds{service=\"a\",quantile=\"0.5\"} 4773
rpc_duration_seconds{quantile=\"0.9\",service=\"a\"} 9001
rpc_duration_seconds_sum{service=\"a\"} 1.7560473e+07
rpc_duration_seconds_count{service=\"a\"} 2693
rpc_duration_seconds{service=\"b\",quantile=\"0.5\"} 1
";
        let families = parse(text).unwrap();
        let family = &families["rpc_duration_seconds"];

        assert!(!families.contains_key("rpc_duration_seconds_sum"));
        assert_eq!(family.metrics.len(), 2);
        assert_eq!(family.metrics[0].labels, labels(&[("service", "a")]));
        assert_eq!(
            family.metrics[0].value,
            MetricValue::Summary(Summary {
                sample_count: 2693,
                sample_sum: 1.7560473e7,
                quantiles: vec![
                    Quantile {
                        quantile: 0.5,
                        value: 4773.0
                    },
                    Quantile {
                        quantile: 0.9,
                        value: 9001.0
                    },
                ],
            })
        );
        assert_eq!(family.metrics[1].labels, labels(&[("service", "b")]));
    }

    #[test]
    fn groups_histogram_samples() {
        let text = "\
# HELP http_request_duration_seconds A histogram of the request duration.
# TYPE http_request_duration_seconds histogram
http_request_duration_seconds_bucket{le=\"0.05\"} 24054
http_request_duration_seconds_bucket{le=\"0.1\"} 33444
http_request_duration_seconds_bucket{le=\"+Inf\"} 144320
http_request_duration_seconds_sum 53423
http_request_duration_seconds_count 144320
";
        let families = parse(text).unwrap();

        assert_eq!(families.len(), 1);
        assert_eq!(
            families["http_request_duration_seconds"].metrics,
            vec![Metric::new(
                vec![],
                MetricValue::Histogram(Histogram {
                    sample_count: 144320,
                    sample_sum: 53423.0,
                    buckets: vec![
                        Bucket {
                            upper_bound: 0.05,
                            cumulative_count: 24054
                        },
                        Bucket {
                            upper_bound: 0.1,
                            cumulative_count: 33444
                        },
                        Bucket {
                            upper_bound: f64::INFINITY,
                            cumulative_count: 144320
                        },
                    ],
                })
            )]
        );
    }

    #[test]
    fn suffixes_without_declared_base_are_separate_families() {
        let families = parse("foo_sum 1\nfoo_count 2\n").unwrap();
        assert_eq!(families.keys().collect::<Vec<_>>(), vec!["foo_count", "foo_sum"]);
    }

    #[test]
    fn families_without_samples_are_dropped() {
        let families = parse("# HELP lonely Nothing here.\n# TYPE lonely gauge\nx 1\n").unwrap();
        assert_eq!(families.keys().collect::<Vec<_>>(), vec!["x"]);
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases = [
            ("<html>not metrics</html>", 1),
            ("ok 1\nbroken{a=\"1\" 1\n", 2),
            ("a{b=\"1\",b=\"2\"} 1", 1),
            ("a one", 1),
            ("a 1 soon", 1),
            ("# TYPE a bogus", 1),
            ("# HELP a x\n# HELP a y", 2),
            ("# TYPE a gauge\n# TYPE a counter", 2),
            ("a 1\n# TYPE a gauge", 2),
            ("# TYPE s summary\ns 1", 2),
            ("# TYPE h histogram\nh_bucket 1", 2),
            ("# TYPE h histogram\nh 1", 2),
            ("# HELP 1abc text", 1),
            ("a{b=\"\\t\"} 1", 1),
        ];

        for (text, line) in cases {
            match parse(text) {
                Ok(families) => panic!("expected error for {text:?}, got {families:?}"),
                Err(e) => assert_eq!(e.line(), line, "wrong line for {text:?}: {e}"),
            }
        }
    }

    fn histogram_payload(series: usize) -> String {
        let mut text = String::from("# TYPE latency histogram\n");
        for i in 0..series {
            let labels = format!("pod=\"pod-{i}\",namespace=\"ns-{}\"", i % 7);
            for le in ["0.1", "1", "+Inf"] {
                text.push_str(&format!("latency_bucket{{{labels},le=\"{le}\"}} {i}\n"));
            }
            text.push_str(&format!("latency_sum{{{labels}}} {i}.5\n"));
            text.push_str(&format!("latency_count{{{labels}}} {i}\n"));
        }
        text
    }

    #[test]
    fn many_histogram_series_parse_in_linear_time() {
        let series = 20_000;
        let text = histogram_payload(series);

        let started = std::time::Instant::now();
        let families = parse(&text).unwrap();
        let elapsed = started.elapsed();

        let latency = &families["latency"];
        assert_eq!(latency.metrics.len(), series);
        let last = &latency.metrics[series - 1];
        assert_eq!(last.label("pod"), Some("pod-19999"));
        let MetricValue::Histogram(histogram) = &last.value else {
            panic!("unexpected value {:?}", last.value);
        };
        assert_eq!(histogram.buckets.len(), 3);
        assert_eq!(histogram.sample_count, 19_999);
        assert_eq!(histogram.sample_sum, 19_999.5);
        assert!(elapsed < std::time::Duration::from_secs(10), "took {elapsed:?}");
    }

    #[test]
    fn summary_series_are_found_regardless_of_label_order() {
        let text = "\
# TYPE rpc summary
rpc{a=\"1\",b=\"2\",quantile=\"0.5\"} 3
rpc{b=\"2\",quantile=\"0.9\",a=\"1\"} 7
rpc_sum{b=\"2\",a=\"1\"} 40
rpc_count{a=\"1\",b=\"2\"} 5
rpc{a=\"1\",b=\"3\",quantile=\"0.5\"} 1
";
        let families = parse(text).unwrap();
        let rpc = &families["rpc"];

        assert_eq!(rpc.metrics.len(), 2);
        assert_eq!(
            rpc.metrics[0].value,
            MetricValue::Summary(Summary {
                sample_count: 5,
                sample_sum: 40.0,
                quantiles: vec![
                    Quantile {
                        quantile: 0.5,
                        value: 3.0,
                    },
                    Quantile {
                        quantile: 0.9,
                        value: 7.0,
                    },
                ],
            })
        );
        assert_eq!(rpc.metrics[1].label("b"), Some("3"));
    }
}
