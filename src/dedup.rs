//! # Deduplicator
//!
//! Identity of a series is its label set only: label order does not matter, values compare as
//! exact strings, sample values are ignored. The first series with a given identity stays.

use crate::merge::MergedFamilySet;
use exporter_merger_exposition::{
    LabelPair,
    MetricFamily,
};
use std::collections::HashSet;

/// Canonical key of a label set: sorted `name="value"` pairs joined by `,`, e.g.
/// `instance="a",job="node"`.
///
/// Values are always quoted, with `"` and `\` escaped, unlike a bare `name=value` form. A `,` or
/// `=` inside a value therefore cannot make two different label sets produce the same key. Only
/// equality of keys is meaningful, the exact text is not a stable format.
pub fn label_signature(labels: &[LabelPair]) -> String {
    let mut pairs = labels
        .iter()
        .map(|pair| format!("{}={:?}", pair.name, pair.value))
        .collect::<Vec<_>>();
    pairs.sort();
    pairs.join(",")
}

/// Drop every series whose label set was already seen earlier in the family. Returns the number of
/// dropped series.
pub fn deduplicate_family(family: &mut MetricFamily) -> usize {
    let before = family.metrics.len();
    let mut seen = HashSet::with_capacity(before);
    family
        .metrics
        .retain(|metric| seen.insert(label_signature(&metric.labels)));
    before - family.metrics.len()
}

/// Deduplicate each family on its own.
pub fn deduplicate(families: &mut MergedFamilySet) {
    for family in families.values_mut() {
        let dropped = deduplicate_family(family);
        if dropped > 0 {
            debug!(family = %family.name, dropped, "dropped duplicate series");
        }
    }
}
