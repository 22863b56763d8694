//! # Serializer

use crate::merge::MergedFamilySet;
use exporter_merger_exposition::encode_family;
use std::io;

#[derive(thiserror::Error, Debug)]
pub enum SerializeError {
    #[error("writing metric family {family:?} failed: {source}")]
    Write {
        family: String,
        #[source]
        source: io::Error,
    },
}

/// Write all families in ascending name order. The first failing family aborts the output, what
/// was written before stays written.
pub fn write_families<W: io::Write>(families: &MergedFamilySet, writer: &mut W) -> Result<(), SerializeError> {
    for (name, family) in families {
        encode_family(writer, family).map_err(|source| SerializeError::Write {
            family: name.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exporter_merger_exposition::{
        LabelPair,
        Metric,
        MetricFamily,
        MetricType,
        MetricValue,
    };
    use pretty_assertions::assert_eq;

    fn gauge(name: &str, value: f64) -> MetricFamily {
        MetricFamily::new(name, MetricType::Gauge).with_metric(Metric::new(
            vec![LabelPair::new("instance", "a")],
            MetricValue::Gauge(value),
        ))
    }

    fn family_set(families: Vec<MetricFamily>) -> MergedFamilySet {
        families.into_iter().map(|family| (family.name.clone(), family)).collect()
    }

    /// Accepts `budget` writes, then fails.
    struct FailingWriter {
        budget: usize,
        written: Vec<u8>,
    }

    impl io::Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
            }
            self.budget -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn families_are_written_in_name_order() {
        let families = family_set(vec![gauge("zeta", 1.0), gauge("alpha", 2.0), gauge("Mid", 3.0)]);
        let mut out = Vec::new();

        write_families(&families, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\
# TYPE Mid gauge
Mid{instance=\"a\"} 3
# TYPE alpha gauge
alpha{instance=\"a\"} 2
# TYPE zeta gauge
zeta{instance=\"a\"} 1
"
        );
    }

    #[test]
    fn empty_set_writes_nothing() {
        let mut out = Vec::new();
        write_families(&MergedFamilySet::new(), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn write_failure_aborts_remaining_families() {
        let families = family_set(vec![gauge("a", 1.0), gauge("b", 2.0), gauge("c", 3.0)]);
        let mut writer = FailingWriter {
            budget: 1,
            written: Vec::new(),
        };

        let err = write_families(&families, &mut writer).unwrap_err();

        assert!(matches!(err, SerializeError::Write { ref family, .. } if family == "b"));
        assert_eq!(String::from_utf8(writer.written).unwrap(), "# TYPE a gauge\na{instance=\"a\"} 1\n");
    }
}
