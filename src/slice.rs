//! Slices: coordinates in the configuration space.
//!
//! A [`Slice`] assigns one concrete value to every slicing property that takes
//! part in factorization, together with the discipline ([`SliceType`]) the
//! caller asked for on that property. Slices are small sorted vectors and are
//! immutable: extending one produces a new slice.
//!
//! ```text
//! Slice { series = "S1" (SPLIT), version = 2 (ALL), export = true (ANY) }
//!   filter(SPLIT)          -> { series = "S1" }
//!   filter(SPLIT | ALL)    -> { series = "S1", version = 2 }
//! ```

use crate::property::{Property, PropertySpec};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// How results are combined across the values of one slicing property.
///
/// - `Any`: one witness value is enough.
/// - `All`: the result must hold for every value.
/// - `Split`: every value is reported on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SliceType {
    #[default]
    Any,
    All,
    Split,
}

impl SliceType {
    pub fn as_set(self) -> SliceTypeSet {
        match self {
            SliceType::Any => SliceTypeSet::ANY,
            SliceType::All => SliceTypeSet::ALL,
            SliceType::Split => SliceTypeSet::SPLIT,
        }
    }
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SliceType::Any => "ANY",
            SliceType::All => "ALL",
            SliceType::Split => "SPLIT",
        })
    }
}

bitflags::bitflags! {
    /// A set of slice disciplines, e.g. the ones a computation accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SliceTypeSet: u8 {
        const ANY   = 1 << 0;
        const ALL   = 1 << 1;
        const SPLIT = 1 << 2;
    }
}

impl SliceTypeSet {
    pub fn allows(self, slice_type: SliceType) -> bool {
        self.contains(slice_type.as_set())
    }
}

// --- Slice -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SliceEntry {
    pub property: Property,
    pub slice_type: SliceType,
}

/// Ordered association from property name to `(Property, SliceType)`.
///
/// Entries are kept sorted by property name and names are unique, so the
/// derived ordering compares slices lexicographically by name and value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slice {
    entries: Vec<SliceEntry>,
}

impl Slice {
    pub fn empty() -> Self {
        Slice::default()
    }

    /// Build a slice from `(property, discipline)` pairs. A later pair for the
    /// same property name replaces an earlier one.
    pub fn of(properties: impl IntoIterator<Item = (Property, SliceType)>) -> Self {
        let mut entries: Vec<SliceEntry> = Vec::new();
        for (property, slice_type) in properties {
            insert_sorted(&mut entries, SliceEntry { property, slice_type });
        }
        Slice { entries }
    }

    /// Functional update: a copy of this slice with `property` added or replaced.
    pub fn with_property(&self, property: Property, slice_type: SliceType) -> Slice {
        let mut entries = self.entries.clone();
        insert_sorted(&mut entries, SliceEntry { property, slice_type });
        Slice { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[SliceEntry] {
        &self.entries
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.entries.iter().map(|e| &e.property)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.entry(name).map(|e| &e.property)
    }

    pub fn slice_type(&self, name: &str) -> Option<SliceType> {
        self.entry(name).map(|e| e.slice_type)
    }

    fn entry(&self, name: &str) -> Option<&SliceEntry> {
        self.entries.binary_search_by(|e| e.property.name().cmp(name)).ok().map(|idx| &self.entries[idx])
    }

    /// Project onto the properties whose discipline is in `types`.
    pub fn filter(&self, types: SliceTypeSet) -> Slice {
        Slice { entries: self.entries.iter().filter(|e| types.allows(e.slice_type)).cloned().collect() }
    }

    /// A copy of this slice without the property `name`.
    pub fn without(&self, name: &str) -> Slice {
        Slice { entries: self.entries.iter().filter(|e| e.property.name() != name).cloned().collect() }
    }

    /// Turn this slice back into one selection per property.
    pub fn selector(&self) -> Vec<SliceSelection> {
        self.entries.iter().map(|e| SliceSelection::new(e.property.clone(), e.slice_type)).collect()
    }

    pub fn to_wire(&self) -> Vec<PropertySpec> {
        self.properties().map(Property::to_spec).collect()
    }
}

fn insert_sorted(entries: &mut Vec<SliceEntry>, entry: SliceEntry) {
    match entries.binary_search_by(|e| e.property.name().cmp(entry.property.name())) {
        Ok(idx) => entries[idx] = entry,
        Err(idx) => entries.insert(idx, entry),
    }
}

impl Serialize for Slice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_wire())
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("(no slicing)");
        }
        for (idx, e) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", e.property.name(), e.property.range())?;
        }
        Ok(())
    }
}

// --- Selection ---------------------------------------------------------------

/// Caller-side filter on one slicing property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSelection {
    pub property: Property,
    pub slice_type: SliceType,
}

impl SliceSelection {
    pub fn new(property: Property, slice_type: SliceType) -> Self {
        SliceSelection { property, slice_type }
    }

    pub fn name(&self) -> &str {
        self.property.name()
    }

    /// Whether the property map holds a property of this name whose range
    /// intersects the selected range.
    pub fn evaluate(&self, properties: &BTreeMap<String, Property>) -> bool {
        properties.get(self.name()).is_some_and(|p| p.intersects(&self.property))
    }
}

/// Whether every selection holds for `properties`.
pub fn evaluate_properties(properties: &BTreeMap<String, Property>, selections: &[SliceSelection]) -> bool {
    selections.iter().all(|s| s.evaluate(properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{PropertyRange, PropertyValue, Range};

    fn enum_prop(name: &str, value: &str) -> Property {
        Property::single(name, PropertyValue::Enum(value.to_string()))
    }

    fn int_prop(name: &str, value: i64) -> Property {
        Property::single(name, PropertyValue::Int(value))
    }

    #[test]
    fn entries_are_sorted_and_unique() {
        let slice = Slice::of([
            (int_prop("version", 1), SliceType::All),
            (enum_prop("series", "S1"), SliceType::Split),
            (int_prop("version", 2), SliceType::All),
        ]);
        let names: Vec<&str> = slice.properties().map(Property::name).collect();
        assert_eq!(names, vec!["series", "version"]);
        assert_eq!(slice.property("version"), Some(&int_prop("version", 2)));
    }

    #[test]
    fn extension_leaves_original_untouched() {
        let base = Slice::empty().with_property(enum_prop("series", "S1"), SliceType::Split);
        let extended = base.with_property(int_prop("version", 3), SliceType::Any);
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.without("version"), base);
        assert_eq!(extended.without("market"), extended);
    }

    #[test]
    fn filter_by_discipline() {
        let slice = Slice::of([
            (enum_prop("series", "S1"), SliceType::Split),
            (int_prop("version", 2), SliceType::All),
            (Property::single("export", PropertyValue::Boolean(true)), SliceType::Any),
        ]);
        assert_eq!(slice.filter(SliceTypeSet::SPLIT), Slice::of([(enum_prop("series", "S1"), SliceType::Split)]));
        assert_eq!(slice.filter(SliceTypeSet::SPLIT | SliceTypeSet::ALL).len(), 2);
        assert!(slice.filter(SliceTypeSet::empty()).is_empty());
    }

    #[test]
    fn ordering_is_by_value() {
        let a = Slice::of([(int_prop("version", 1), SliceType::Split)]);
        let b = Slice::of([(int_prop("version", 2), SliceType::Split)]);
        assert!(a < b);
    }

    #[test]
    fn selection_evaluates_against_ranges() {
        let selection =
            SliceSelection::new(Property::new("version", PropertyRange::Int(Range::interval(1, 3))), SliceType::Any);
        let mut props = BTreeMap::new();
        props.insert("version".to_string(), int_prop("version", 2));
        assert!(selection.evaluate(&props));
        props.insert("version".to_string(), int_prop("version", 4));
        assert!(!selection.evaluate(&props));
        assert!(!evaluate_properties(&BTreeMap::new(), &[selection]));
    }

    #[test]
    fn wire_form_is_sorted_by_name() {
        let slice = Slice::of([(int_prop("version", 1), SliceType::Split), (enum_prop("series", "S1"), SliceType::Split)]);
        let json = serde_json::to_value(&slice).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "name": "series", "type": "ENUM", "range": { "values": ["S1"] } },
                { "name": "version", "type": "INT", "range": { "values": [1] } }
            ])
        );
    }
}
