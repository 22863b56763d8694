use crate::model::{
    LabelPair,
    Metric,
    MetricFamily,
    MetricValue,
};
use std::{
    fmt::Write as _,
    io,
};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode the families one after the other; the first write error aborts.
pub fn encode<'a, W, I>(writer: &mut W, families: I) -> io::Result<()>
where
    W: io::Write,
    I: IntoIterator<Item = &'a MetricFamily>,
{
    for family in families {
        encode_family(writer, family)?;
    }
    Ok(())
}

/// Write one family block (`# HELP`, `# TYPE`, samples). Returns the number of bytes written.
pub fn encode_family<W: io::Write>(writer: &mut W, family: &MetricFamily) -> io::Result<usize> {
    if family.metrics.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("metric family {:?} has no metrics", family.name),
        ));
    }

    let block = render_family(family);
    writer.write_all(block.as_bytes())?;
    Ok(block.len())
}

fn render_family(family: &MetricFamily) -> String {
    let name = family.name.as_str();
    let mut out = String::new();

    if let Some(help) = &family.help {
        let _ = writeln!(out, "# HELP {name} {}", escape_help(help));
    }
    let _ = writeln!(out, "# TYPE {name} {}", family.metric_type);

    for metric in &family.metrics {
        match &metric.value {
            MetricValue::Counter(value) | MetricValue::Gauge(value) | MetricValue::Untyped(value) => {
                write_sample(&mut out, name, "", metric, None, &format_float(*value));
            }
            MetricValue::Summary(summary) => {
                for quantile in &summary.quantiles {
                    write_sample(
                        &mut out,
                        name,
                        "",
                        metric,
                        Some(("quantile", quantile.quantile)),
                        &format_float(quantile.value),
                    );
                }
                write_sample(&mut out, name, "_sum", metric, None, &format_float(summary.sample_sum));
                write_sample(&mut out, name, "_count", metric, None, &summary.sample_count.to_string());
            }
            MetricValue::Histogram(histogram) => {
                let mut inf_seen = false;
                for bucket in &histogram.buckets {
                    inf_seen |= bucket.upper_bound == f64::INFINITY;
                    write_sample(
                        &mut out,
                        name,
                        "_bucket",
                        metric,
                        Some(("le", bucket.upper_bound)),
                        &bucket.cumulative_count.to_string(),
                    );
                }
                if !inf_seen {
                    write_sample(
                        &mut out,
                        name,
                        "_bucket",
                        metric,
                        Some(("le", f64::INFINITY)),
                        &histogram.sample_count.to_string(),
                    );
                }
                write_sample(&mut out, name, "_sum", metric, None, &format_float(histogram.sample_sum));
                write_sample(&mut out, name, "_count", metric, None, &histogram.sample_count.to_string());
            }
        }
    }

    out
}

fn write_sample(out: &mut String, name: &str, suffix: &str, metric: &Metric, extra: Option<(&str, f64)>, value: &str) {
    out.push_str(name);
    out.push_str(suffix);
    write_labels(out, &metric.labels, extra);
    out.push(' ');
    out.push_str(value);
    if let Some(timestamp_ms) = metric.timestamp_ms {
        let _ = write!(out, " {timestamp_ms}");
    }
    out.push('\n');
}

fn write_labels(out: &mut String, labels: &[LabelPair], extra: Option<(&str, f64)>) {
    if labels.is_empty() && extra.is_none() {
        return;
    }

    out.push('{');
    let mut separator = "";
    for pair in labels {
        let _ = write!(out, "{separator}{}=\"{}\"", pair.name, escape_label_value(&pair.value));
        separator = ",";
    }
    if let Some((name, bound)) = extra {
        let _ = write!(out, "{separator}{name}=\"{}\"", format_float(bound));
    }
    out.push('}');
}

/// Render a sample value the way the exposition format expects it: `+Inf`, `-Inf`, `NaN`, or the
/// shortest round-trip representation, in exponent notation (`1e+06`) when the decimal exponent is
/// below -4 or at least 6.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..6).contains(&exponent) {
        value.to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', r"\\").replace('\n', r"\n")
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', "\\\"").replace('\n', r"\n")
}
