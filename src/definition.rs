//! Slicing property definitions.
//!
//! A compiled model declares a handful of *slicing properties* (e.g. `INT
//! version`, `ENUM series`). Their domains are not declared explicitly; they
//! are accumulated from the ranges that features and rules attach to them.
//!
//! Relevant values are what the factorizer iterates over:
//!
//! ```text
//! BOOLEAN  {false, true} once any value was declared
//! ENUM     every declared value
//! INT/DATE breakpoints of the declared ranges
//!
//!   declared: [1 - 5]  7          breakpoints: 1  6  7
//!             |-----|  |                       |  |  |
//!   segment:  1 ... 5  6  7                    1..5 6 7
//! ```
//!
//! Each INT/DATE breakpoint stands for the segment up to the next breakpoint;
//! no declared range starts or ends inside a segment, so one value per segment
//! suffices to reach every distinct activation. Restricted to a selection, an
//! interval keeps one value per segment it overlaps (the first one inside the
//! selection), and a value list keeps every listed value inside the domain.

use crate::property::{Property, PropertyRange, PropertyType, PropertyValue, Range, Step};
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicingPropertyDefinition {
    name: String,
    domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Domain {
    Boolean(BTreeSet<bool>),
    Int(Breakpoints<i64>),
    Enum(BTreeSet<String>),
    Date(Breakpoints<NaiveDate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Breakpoints<V> {
    starts: BTreeSet<V>,
    ends: BTreeSet<V>,
    singles: BTreeSet<V>,
}

impl<V> Default for Breakpoints<V> {
    fn default() -> Self {
        Breakpoints { starts: BTreeSet::new(), ends: BTreeSet::new(), singles: BTreeSet::new() }
    }
}

impl<V: Ord + Clone + Step> Breakpoints<V> {
    fn add(&mut self, range: &Range<V>) {
        match range {
            Range::Empty => {}
            Range::List(values) => self.singles.extend(values.iter().cloned()),
            Range::Interval { min, max } => {
                self.starts.insert(min.clone());
                self.ends.insert(max.clone());
            }
        }
    }

    fn min(&self) -> Option<&V> {
        [self.starts.first(), self.ends.first(), self.singles.first()].into_iter().flatten().min()
    }

    fn max(&self) -> Option<&V> {
        [self.starts.last(), self.ends.last(), self.singles.last()].into_iter().flatten().max()
    }

    fn relevant(&self) -> BTreeSet<V> {
        let Some(max) = self.max().cloned() else {
            return BTreeSet::new();
        };
        let mut out: BTreeSet<V> = self.starts.iter().chain(self.singles.iter()).cloned().collect();
        out.extend(self.singles.iter().chain(self.ends.iter()).filter_map(|v| v.successor()).filter(|v| *v < max));
        out.insert(max);
        out
    }

    /// `(first, last)` of every segment, ascending.
    fn segments(&self) -> Vec<(V, V)> {
        let points: Vec<V> = self.relevant().into_iter().collect();
        points
            .iter()
            .enumerate()
            .map(|(idx, start)| {
                let end = points.get(idx + 1).and_then(|next| next.predecessor()).unwrap_or_else(|| start.clone());
                (start.clone(), end)
            })
            .collect()
    }

    fn relevant_in(&self, filter: &Range<V>) -> BTreeSet<V> {
        match filter {
            Range::Empty => BTreeSet::new(),
            Range::List(values) => match (self.min(), self.max()) {
                (Some(min), Some(max)) => values.iter().filter(|v| min <= *v && *v <= max).cloned().collect(),
                _ => BTreeSet::new(),
            },
            Range::Interval { .. } => self
                .segments()
                .into_iter()
                .filter_map(|(start, end)| filter.intersection(&Range::interval(start, end)).first().cloned())
                .collect(),
        }
    }

    /// Last value of the segment holding `value`.
    fn segment_end(&self, value: &V) -> Option<V> {
        self.segments().into_iter().find(|(start, end)| start <= value && value <= end).map(|(_, end)| end)
    }
}

impl SlicingPropertyDefinition {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        let domain = match property_type {
            PropertyType::Boolean => Domain::Boolean(BTreeSet::new()),
            PropertyType::Int => Domain::Int(Breakpoints::default()),
            PropertyType::Enum => Domain::Enum(BTreeSet::new()),
            PropertyType::Date => Domain::Date(Breakpoints::default()),
        };
        SlicingPropertyDefinition { name: name.into(), domain }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> PropertyType {
        match self.domain {
            Domain::Boolean(_) => PropertyType::Boolean,
            Domain::Int(_) => PropertyType::Int,
            Domain::Enum(_) => PropertyType::Enum,
            Domain::Date(_) => PropertyType::Date,
        }
    }

    /// Record a range declared by a feature or rule.
    pub fn add_range(&mut self, range: &PropertyRange) -> Result<(), String> {
        match (&mut self.domain, range) {
            (Domain::Boolean(values), PropertyRange::Boolean(r)) => values.extend(r.listed_values()),
            (Domain::Enum(values), PropertyRange::Enum(r)) => values.extend(r.listed_values()),
            (Domain::Int(points), PropertyRange::Int(r)) => points.add(r),
            (Domain::Date(points), PropertyRange::Date(r)) => points.add(r),
            _ => {
                return Err(format!(
                    "slicing property '{}' is declared as {} but used with a {} range",
                    self.name,
                    self.property_type(),
                    range.property_type()
                ));
            }
        }
        Ok(())
    }

    /// The full relevant domain, in natural order.
    pub fn relevant_values(&self) -> Vec<PropertyValue> {
        match &self.domain {
            Domain::Boolean(values) if values.is_empty() => Vec::new(),
            Domain::Boolean(_) => vec![PropertyValue::Boolean(false), PropertyValue::Boolean(true)],
            Domain::Enum(values) => values.iter().cloned().map(PropertyValue::Enum).collect(),
            Domain::Int(points) => points.relevant().into_iter().map(PropertyValue::Int).collect(),
            Domain::Date(points) => points.relevant().into_iter().map(PropertyValue::Date).collect(),
        }
    }

    /// The relevant values for a selection of `filter`.
    ///
    /// BOOLEAN and ENUM keep the relevant values inside `filter`. INT and DATE
    /// keep one value per segment an interval overlaps, or every listed value
    /// inside `[min - max]`.
    pub fn relevant_values_in(&self, filter: &PropertyRange) -> Vec<PropertyValue> {
        match (&self.domain, filter) {
            (Domain::Int(points), PropertyRange::Int(f)) => {
                points.relevant_in(f).into_iter().map(PropertyValue::Int).collect()
            }
            (Domain::Date(points), PropertyRange::Date(f)) => {
                points.relevant_in(f).into_iter().map(PropertyValue::Date).collect()
            }
            _ => self.relevant_values().into_iter().filter(|v| filter.contains(v)).collect(),
        }
    }

    /// Last value of the INT/DATE segment `value` falls into; `None` for other
    /// types or values outside the domain.
    pub fn segment_end(&self, value: &PropertyValue) -> Option<PropertyValue> {
        match (&self.domain, value) {
            (Domain::Int(points), PropertyValue::Int(v)) => points.segment_end(v).map(PropertyValue::Int),
            (Domain::Date(points), PropertyValue::Date(v)) => points.segment_end(v).map(PropertyValue::Date),
            _ => None,
        }
    }

    /// Whether no feature or rule ever used this property.
    pub fn is_unused(&self) -> bool {
        self.relevant_values().is_empty()
    }

    pub fn min(&self) -> Option<PropertyValue> {
        match &self.domain {
            Domain::Int(points) => points.min().cloned().map(PropertyValue::Int),
            Domain::Date(points) => points.min().cloned().map(PropertyValue::Date),
            Domain::Boolean(_) | Domain::Enum(_) => self.relevant_values().into_iter().next(),
        }
    }

    pub fn max(&self) -> Option<PropertyValue> {
        match &self.domain {
            Domain::Int(points) => points.max().cloned().map(PropertyValue::Int),
            Domain::Date(points) => points.max().cloned().map(PropertyValue::Date),
            Domain::Boolean(_) | Domain::Enum(_) => self.relevant_values().into_iter().last(),
        }
    }

    /// The widest range a selection on this property can ask for: all values
    /// for BOOLEAN and ENUM, `[min - max]` for INT and DATE.
    pub fn full_range(&self) -> PropertyRange {
        match &self.domain {
            Domain::Int(points) => match (points.min(), points.max()) {
                (Some(min), Some(max)) => PropertyRange::Int(Range::interval(*min, *max)),
                _ => PropertyRange::Int(Range::Empty),
            },
            Domain::Date(points) => match (points.min(), points.max()) {
                (Some(min), Some(max)) => PropertyRange::Date(Range::interval(*min, *max)),
                _ => PropertyRange::Date(Range::Empty),
            },
            Domain::Boolean(_) | Domain::Enum(_) => {
                PropertyRange::from_values(self.property_type(), self.relevant_values())
            }
        }
    }
}

/// The slicing property definitions of a model, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    definitions: Vec<SlicingPropertyDefinition>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, property_type: PropertyType) -> Result<(), String> {
        if self.get(name).is_some() {
            return Err(format!("slicing property '{name}' is declared twice"));
        }
        self.definitions.push(SlicingPropertyDefinition::new(name, property_type));
        Ok(())
    }

    /// Feed a feature or rule property into the matching definition.
    ///
    /// Properties that are not slicing properties are ignored.
    pub fn add_property(&mut self, property: &Property) -> Result<(), String> {
        match self.definitions.iter_mut().find(|d| d.name == property.name()) {
            Some(definition) => definition.add_range(property.range()),
            None => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SlicingPropertyDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn definitions(&self) -> &[SlicingPropertyDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<PropertyValue> {
        values.iter().copied().map(PropertyValue::Int).collect()
    }

    #[test]
    fn int_breakpoints() {
        let mut def = SlicingPropertyDefinition::new("version", PropertyType::Int);
        def.add_range(&PropertyRange::Int(Range::interval(1, 5))).unwrap();
        def.add_range(&PropertyRange::Int(Range::single(7))).unwrap();
        assert_eq!(def.relevant_values(), ints(&[1, 6, 7]));
        assert_eq!(def.min(), Some(PropertyValue::Int(1)));
        assert_eq!(def.max(), Some(PropertyValue::Int(7)));
    }

    #[test]
    fn date_breakpoints() {
        let day = |m: u32, d: u32| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        let mut def = SlicingPropertyDefinition::new("sop", PropertyType::Date);
        def.add_range(&PropertyRange::Date(Range::interval(day(1, 1), day(1, 31)))).unwrap();
        def.add_range(&PropertyRange::Date(Range::interval(day(1, 15), day(2, 1)))).unwrap();
        // 01-31 + 1 coincides with the max, 02-01 + 1 lies past it
        let dates: Vec<_> = [day(1, 1), day(1, 15), day(2, 1)].into_iter().map(PropertyValue::Date).collect();
        assert_eq!(def.relevant_values(), dates);
        assert_eq!(def.segment_end(&PropertyValue::Date(day(1, 20))), Some(PropertyValue::Date(day(1, 31))));
        assert_eq!(def.segment_end(&PropertyValue::Date(day(2, 1))), Some(PropertyValue::Date(day(2, 1))));
    }

    #[test]
    fn selection_inside_one_segment_keeps_a_value() {
        let mut def = SlicingPropertyDefinition::new("version", PropertyType::Int);
        def.add_range(&PropertyRange::Int(Range::interval(1, 5))).unwrap();
        assert_eq!(def.relevant_values(), ints(&[1, 5]));
        assert_eq!(def.relevant_values_in(&PropertyRange::Int(Range::interval(2, 4))), ints(&[2]));
        assert_eq!(def.relevant_values_in(&PropertyRange::Int(Range::interval(3, 9))), ints(&[3, 5]));
        assert_eq!(def.relevant_values_in(&PropertyRange::Int(Range::list([3, 4, 12]))), ints(&[3, 4]));
        assert!(def.relevant_values_in(&PropertyRange::Int(Range::interval(6, 9))).is_empty());
        assert_eq!(def.segment_end(&PropertyValue::Int(2)), Some(PropertyValue::Int(4)));
    }

    #[test]
    fn int_singles_do_not_add_values_past_max() {
        let mut def = SlicingPropertyDefinition::new("version", PropertyType::Int);
        def.add_range(&PropertyRange::Int(Range::list([1, 2, 3]))).unwrap();
        assert_eq!(def.relevant_values(), ints(&[1, 2, 3]));
        assert_eq!(def.relevant_values_in(&PropertyRange::Int(Range::interval(2, 9))), ints(&[2, 3]));
    }

    #[test]
    fn boolean_domain_is_complete_once_used() {
        let mut def = SlicingPropertyDefinition::new("export", PropertyType::Boolean);
        assert!(def.is_unused());
        def.add_range(&PropertyRange::Boolean(Range::single(true))).unwrap();
        assert_eq!(def.relevant_values(), vec![PropertyValue::Boolean(false), PropertyValue::Boolean(true)]);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut def = SlicingPropertyDefinition::new("series", PropertyType::Enum);
        assert!(def.add_range(&PropertyRange::Int(Range::single(1))).is_err());
    }

    #[test]
    fn store_ignores_non_slicing_properties() {
        let mut store = PropertyStore::new();
        store.declare("series", PropertyType::Enum).unwrap();
        assert!(store.declare("series", PropertyType::Enum).is_err());
        store.add_property(&Property::single("series", PropertyValue::Enum("S1".into()))).unwrap();
        store.add_property(&Property::single("color", PropertyValue::Enum("red".into()))).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("series").unwrap().relevant_values(), vec![PropertyValue::Enum("S1".into())]);
        assert_eq!(
            store.get("series").unwrap().full_range(),
            PropertyRange::Enum(Range::single("S1".to_string()))
        );
    }
}
