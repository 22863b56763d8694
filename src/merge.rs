//! # Family Merger

use exporter_merger_exposition::{
    FamilyMap,
    MetricFamily,
};
use std::collections::{
    btree_map::Entry,
    BTreeMap,
};

/// All families of one aggregation, keyed and therefore ordered by name.
pub type MergedFamilySet = BTreeMap<String, MetricFamily>;

/// Combine per-exporter families into one set.
///
/// The first exporter exposing a family decides its help text and type, later exporters only
/// append their series. Series keep their order within an exporter and exporters are appended in
/// the order they are passed in.
pub fn merge_families<I>(sources: I) -> MergedFamilySet
where
    I: IntoIterator<Item = FamilyMap>,
{
    let mut merged = MergedFamilySet::new();
    for families in sources {
        for (name, family) in families {
            match merged.entry(name) {
                Entry::Vacant(entry) => {
                    entry.insert(family);
                }
                Entry::Occupied(mut entry) => {
                    entry.get_mut().metrics.extend(family.metrics);
                }
            }
        }
    }
    merged
}
