//! Response assembly from merged per-SPLIT-key results.
//!
//! SPLIT keys with equal results are reported together. Entries are numbered
//! from 1 in order of first appearance; list elements are numbered from 1 in
//! their natural order.
//!
//! The keys of one entry are then collapsed by [`SliceMerger`], one SPLIT
//! property at a time, among keys that agree on every other property:
//!
//! ```text
//! discrete selection   series "S1", "S2"         -> series ["S1", "S2"]
//! interval selection   version 1, 6, 9 of 1,5,6,9 -> version [1 - 4], [6 - 9]
//! ```
//!
//! An interval window runs from the first value of a run of neighbouring
//! values to the end of the last value's segment, clipped to the selection.

use super::computation::{ListComputation, SingleComputation};
use crate::api::{ComputationElement, ComputationElementResult, SliceComputationResult, SplitComputationDetail, SplitDetails};
use crate::definition::PropertyStore;
use crate::property::{Property, PropertyRange, PropertyValue};
use crate::slice::{Slice, SliceSelection, SliceType};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub(crate) fn group_by_result<R: PartialEq>(entries: impl IntoIterator<Item = (Slice, R)>) -> Vec<SliceComputationResult<R>> {
    let mut out: Vec<SliceComputationResult<R>> = Vec::new();
    for (slice, result) in entries {
        match out.iter_mut().find(|r| r.result == result) {
            Some(existing) => existing.slices.push(slice),
            None => {
                let id = out.len() + 1;
                out.push(SliceComputationResult { id, result, slices: vec![slice] });
            }
        }
    }
    out
}

/// Entries of a single computation plus the details of every SPLIT key, filed
/// under the id of the entry the key ended up in.
pub(crate) fn single_results<C: SingleComputation>(
    computation: &C,
    merged: Vec<(Slice, C::Result)>,
    merger: &SliceMerger,
) -> (Vec<SliceComputationResult<C::Main>>, SplitDetails<C::Detail>) {
    let mut details: SplitDetails<C::Detail> = BTreeMap::new();
    let mut entries =
        group_by_result(merged.iter().map(|(slice, result)| (slice.clone(), computation.extract_main_result(result))));

    for (slice, result) in &merged {
        let Some(detail) = computation.extract_detail(result) else { continue };
        let main = computation.extract_main_result(result);
        if let Some(entry) = entries.iter().find(|e| e.result == main) {
            details.entry(entry.id).or_default().push(SplitComputationDetail { slice: slice.clone(), detail });
        }
    }
    for entry in &mut entries {
        entry.slices = merger.merge(std::mem::take(&mut entry.slices));
    }
    (entries, details)
}

pub(crate) fn list_results<C: ListComputation>(
    computation: &C,
    merged: Vec<(Slice, C::Result)>,
    merger: &SliceMerger,
) -> Vec<ComputationElementResult<C::Element, C::ElementResult>> {
    let elements: BTreeSet<C::Element> = merged.iter().flat_map(|(_, r)| computation.extract_elements(r)).collect();
    elements
        .into_iter()
        .enumerate()
        .map(|(idx, element)| {
            let per_key = merged.iter().map(|(slice, result)| {
                let value = computation
                    .extract_internal_result(&element, result)
                    .unwrap_or_else(|| computation.default_element_result());
                (slice.clone(), value)
            });
            let mut results = group_by_result(per_key);
            for entry in &mut results {
                entry.slices = merger.merge(std::mem::take(&mut entry.slices));
            }
            ComputationElementResult { element: ComputationElement { id: idx + 1, content: element }, results }
        })
        .collect()
}

// --- Slice merging -----------------------------------------------------------

/// Collapses the SPLIT keys of one response entry into as few slices as the
/// SPLIT selections allow.
#[derive(Debug, Clone, Default)]
pub(crate) struct SliceMerger {
    properties: Vec<SplitProperty>,
}

#[derive(Debug, Clone)]
struct SplitProperty {
    name: String,
    /// Set for interval selections only.
    windows: Option<Windows>,
}

#[derive(Debug, Clone)]
struct Windows {
    /// Every value any SPLIT key carries for the property, ascending.
    occurring: Vec<PropertyValue>,
    /// Last value covered by each occurring value, clipped to the selection.
    ends: BTreeMap<PropertyValue, PropertyValue>,
}

impl SliceMerger {
    /// Prepare merging for the SPLIT selections among `selections`. `keys` are
    /// all SPLIT keys of the request, whatever their result.
    pub(crate) fn new<'a>(
        selections: &[SliceSelection],
        store: &PropertyStore,
        keys: impl IntoIterator<Item = &'a Slice> + Clone,
    ) -> Self {
        let properties = selections
            .iter()
            .filter(|s| s.slice_type == SliceType::Split)
            .filter_map(|selection| {
                let definition = store.get(selection.name()).filter(|d| !d.is_unused())?;
                let range = selection.property.range();
                let windows = match (range.is_continuous(), range.last_value()) {
                    (true, Some(upper)) => {
                        let occurring: BTreeSet<PropertyValue> = keys
                            .clone()
                            .into_iter()
                            .filter_map(|key| key.property(selection.name()).and_then(Property::value))
                            .collect();
                        let ends = occurring
                            .iter()
                            .map(|value| {
                                let end = definition.segment_end(value).unwrap_or_else(|| value.clone());
                                (value.clone(), end.min(upper.clone()))
                            })
                            .collect();
                        Some(Windows { occurring: occurring.into_iter().collect(), ends })
                    }
                    _ => None,
                };
                Some(SplitProperty { name: selection.name().to_string(), windows })
            })
            .collect();
        SliceMerger { properties }
    }

    /// Merge the keys of one entry, property by property in selection order.
    pub(crate) fn merge(&self, slices: Vec<Slice>) -> Vec<Slice> {
        let mut current = slices;
        for property in &self.properties {
            let mut groups: Vec<(Slice, Vec<PropertyRange>)> = Vec::new();
            let mut index: HashMap<Slice, usize> = HashMap::new();
            for slice in &current {
                let rest = slice.without(&property.name);
                let idx = *index.entry(rest.clone()).or_insert_with(|| {
                    groups.push((rest, Vec::new()));
                    groups.len() - 1
                });
                if let Some(p) = slice.property(&property.name) {
                    groups[idx].1.push(p.range().clone());
                }
            }

            current = Vec::with_capacity(groups.len());
            for (rest, ranges) in groups {
                let merged = match &property.windows {
                    Some(windows) => windows.collapse(&ranges),
                    None => union(&ranges).into_iter().collect(),
                };
                if merged.is_empty() {
                    current.push(rest.clone());
                }
                for range in merged {
                    current.push(rest.with_property(Property::new(property.name.clone(), range), SliceType::Split));
                }
            }
        }
        current
    }
}

fn union(ranges: &[PropertyRange]) -> Option<PropertyRange> {
    let ty = ranges.first()?.property_type();
    Some(PropertyRange::from_values(ty, ranges.iter().flat_map(PropertyRange::listed_values)))
}

impl Windows {
    fn collapse(&self, ranges: &[PropertyRange]) -> Vec<PropertyRange> {
        let values: BTreeSet<PropertyValue> = ranges.iter().filter_map(PropertyRange::single_value).collect();
        let position = |v: &PropertyValue| self.occurring.binary_search(v).ok();

        let mut runs: Vec<(PropertyValue, PropertyValue)> = Vec::new();
        let mut previous: Option<usize> = None;
        for value in values {
            let at = position(&value);
            let extends = matches!((previous, at), (Some(p), Some(a)) if a == p + 1);
            match runs.last_mut() {
                Some(run) if extends => run.1 = value,
                _ => runs.push((value.clone(), value)),
            }
            previous = at;
        }

        runs.into_iter()
            .filter_map(|(start, last)| {
                let end = self.ends.get(&last).cloned().unwrap_or(last);
                PropertyRange::window(start, end)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{PropertyType, Range};

    fn key(version: i64) -> Slice {
        Slice::of([(Property::single("version", PropertyValue::Int(version)), SliceType::Split)])
    }

    fn series_key(series: &str, version: i64) -> Slice {
        key(version).with_property(Property::single("series", PropertyValue::Enum(series.into())), SliceType::Split)
    }

    fn store() -> PropertyStore {
        let mut store = PropertyStore::new();
        store.declare("series", PropertyType::Enum).unwrap();
        store.declare("version", PropertyType::Int).unwrap();
        for s in ["S1", "S2", "S3"] {
            store.add_property(&Property::single("series", PropertyValue::Enum(s.into()))).unwrap();
        }
        store.add_property(&Property::new("version", PropertyRange::Int(Range::interval(1, 9)))).unwrap();
        store.add_property(&Property::single("version", PropertyValue::Int(5))).unwrap();
        store
    }

    fn split(name: &str, range: PropertyRange) -> SliceSelection {
        SliceSelection::new(Property::new(name, range), SliceType::Split)
    }

    fn interval(min: i64, max: i64) -> PropertyRange {
        PropertyRange::Int(Range::interval(min, max))
    }

    #[test]
    fn equal_results_share_an_entry() {
        let out = group_by_result(vec![(key(1), true), (key(2), false), (key(3), true)]);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].id, out[0].result), (1, true));
        assert_eq!(out[0].slices, vec![key(1), key(3)]);
        assert_eq!((out[1].id, out[1].result), (2, false));
    }

    #[test]
    fn interval_keys_merge_into_windows() {
        // relevant versions 1, 5, 6, 9 with segments [1-4] [5] [6-8] [9]
        let keys: Vec<Slice> = [1, 5, 6, 9].into_iter().map(key).collect();
        let merger = SliceMerger::new(&[split("version", interval(1, 9))], &store(), &keys);

        assert_eq!(
            merger.merge(vec![key(1), key(6), key(9)]),
            vec![
                Slice::of([(Property::new("version", interval(1, 4)), SliceType::Split)]),
                Slice::of([(Property::new("version", interval(6, 9)), SliceType::Split)]),
            ]
        );
        assert_eq!(merger.merge(vec![key(5)]), vec![key(5)]);
    }

    #[test]
    fn windows_stay_inside_the_selection() {
        let keys = vec![key(2)];
        let merger = SliceMerger::new(&[split("version", interval(2, 3))], &store(), &keys);
        assert_eq!(merger.merge(keys.clone()), vec![Slice::of([(Property::new("version", interval(2, 3)), SliceType::Split)])]);

        let merger = SliceMerger::new(&[split("version", interval(2, 2))], &store(), &keys);
        assert_eq!(merger.merge(keys), vec![key(2)]);
    }

    #[test]
    fn discrete_keys_merge_per_remaining_properties() {
        let keys = vec![series_key("S1", 5), series_key("S2", 5), series_key("S3", 5), series_key("S1", 6)];
        let series = PropertyRange::Enum(Range::list(["S1", "S2", "S3"].map(String::from)));
        let versions = PropertyRange::Int(Range::list([5, 6]));
        let merger = SliceMerger::new(&[split("series", series), split("version", versions)], &store(), &keys);

        let merged = merger.merge(vec![series_key("S1", 5), series_key("S2", 5), series_key("S1", 6)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].to_string(), "series=[\"S1\", \"S2\"], version=5");
        assert_eq!(merged[1].to_string(), "series=\"S1\", version=6");
    }

    #[test]
    fn without_split_selections_keys_are_kept() {
        let merger = SliceMerger::default();
        assert_eq!(merger.merge(vec![Slice::empty()]), vec![Slice::empty()]);
    }
}
