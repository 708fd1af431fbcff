//! Properties and property ranges.
//!
//! Every feature and rule of a model can carry properties such as
//! `version 1-3` or `series "S1"`. A property is a name plus a
//! [`PropertyRange`]. The four primitive property types form a closed set, so
//! ranges and values are tagged unions with one variant per type:
//!
//! ```text
//! PropertyRange ──┬─ Boolean(Range<bool>)        discrete only
//!                 ├─ Int(Range<i64>)             discrete or interval
//!                 ├─ Enum(Range<String>)         discrete only
//!                 └─ Date(Range<NaiveDate>)      discrete or interval
//! ```
//!
//! [`Range`] itself is generic over the value and is either empty, an ordered
//! value list or a closed interval. A range can never hold an explicit value
//! list and interval bounds at the same time.
//!
//! The JSON wire form of a range is [`RangeSpec`] (`{ values?, min?, max? }`);
//! conversion validates it against a [`PropertyType`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    Boolean,
    Int,
    Enum,
    Date,
}

impl PropertyType {
    pub fn name(self) -> &'static str {
        match self {
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::Int => "INT",
            PropertyType::Enum => "ENUM",
            PropertyType::Date => "DATE",
        }
    }

    /// Whether ranges of this type may be given as `[min, max]` intervals.
    pub fn supports_intervals(self) -> bool {
        matches!(self, PropertyType::Int | PropertyType::Date)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values with a well-defined next and previous value.
///
/// Slicing property definitions use the successor for the breakpoint right
/// after a declared value or interval end, and the predecessor for the last
/// value of a segment.
pub trait Step: Sized {
    fn successor(&self) -> Option<Self>;
    fn predecessor(&self) -> Option<Self>;
}

impl Step for i64 {
    fn successor(&self) -> Option<Self> {
        self.checked_add(1)
    }

    fn predecessor(&self) -> Option<Self> {
        self.checked_sub(1)
    }
}

impl Step for NaiveDate {
    fn successor(&self) -> Option<Self> {
        self.succ_opt()
    }

    fn predecessor(&self) -> Option<Self> {
        self.pred_opt()
    }
}

// --- Range -------------------------------------------------------------------

/// A range of values of one primitive type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Range<V> {
    Empty,
    List(BTreeSet<V>),
    Interval { min: V, max: V },
}

impl<V: Ord + Clone> Range<V> {
    pub fn empty() -> Self {
        Range::Empty
    }

    pub fn single(value: V) -> Self {
        Range::List(BTreeSet::from([value]))
    }

    /// Build a discrete range; an empty input yields [`Range::Empty`].
    pub fn list(values: impl IntoIterator<Item = V>) -> Self {
        let values: BTreeSet<V> = values.into_iter().collect();
        if values.is_empty() { Range::Empty } else { Range::List(values) }
    }

    /// Build a closed interval; `max < min` yields [`Range::Empty`].
    pub fn interval(min: V, max: V) -> Self {
        if max < min { Range::Empty } else { Range::Interval { min, max } }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Range::Empty)
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Range::Empty | Range::List(_))
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Range::Empty | Range::Interval { .. })
    }

    pub fn contains(&self, value: &V) -> bool {
        match self {
            Range::Empty => false,
            Range::List(values) => values.contains(value),
            Range::Interval { min, max } => min <= value && value <= max,
        }
    }

    pub fn first(&self) -> Option<&V> {
        match self {
            Range::Empty => None,
            Range::List(values) => values.first(),
            Range::Interval { min, .. } => Some(min),
        }
    }

    pub fn last(&self) -> Option<&V> {
        match self {
            Range::Empty => None,
            Range::List(values) => values.last(),
            Range::Interval { max, .. } => Some(max),
        }
    }

    /// The explicitly listed values (empty for intervals).
    pub fn listed_values(&self) -> Vec<V> {
        match self {
            Range::List(values) => values.iter().cloned().collect(),
            Range::Empty | Range::Interval { .. } => Vec::new(),
        }
    }

    pub fn intersection(&self, other: &Range<V>) -> Range<V> {
        match (self, other) {
            (Range::Empty, _) | (_, Range::Empty) => Range::Empty,
            (Range::Interval { min: a, max: b }, Range::Interval { min: c, max: d }) => {
                Range::interval(a.max(c).clone(), b.min(d).clone())
            }
            (Range::List(values), other) => Range::list(values.iter().filter(|v| other.contains(v)).cloned()),
            (Range::Interval { .. }, Range::List(values)) => {
                Range::list(values.iter().filter(|v| self.contains(v)).cloned())
            }
        }
    }

    pub fn intersects(&self, other: &Range<V>) -> bool {
        match (self, other) {
            (Range::Empty, _) | (_, Range::Empty) => false,
            (Range::Interval { min: a, max: b }, Range::Interval { min: c, max: d }) => a <= d && b >= c,
            (Range::List(values), other) => values.iter().any(|v| other.contains(v)),
            (Range::Interval { .. }, Range::List(values)) => values.iter().any(|v| self.contains(v)),
        }
    }
}

impl<V: fmt::Display + Ord> fmt::Display for Range<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Empty => f.write_str("[]"),
            Range::List(values) if values.len() == 1 => match values.first() {
                Some(v) => write!(f, "{v}"),
                None => f.write_str("[]"),
            },
            Range::List(values) => {
                f.write_str("[")?;
                for (idx, v) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Range::Interval { min, max } => write!(f, "[{min} - {max}]"),
        }
    }
}

// --- Values ------------------------------------------------------------------

/// A single concrete property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyValue {
    Boolean(bool),
    Int(i64),
    Enum(String),
    Date(NaiveDate),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Enum(_) => PropertyType::Enum,
            PropertyValue::Date(_) => PropertyType::Date,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Boolean(b) => Value::Bool(*b),
            PropertyValue::Int(i) => Value::from(*i),
            PropertyValue::Enum(s) => Value::String(s.clone()),
            PropertyValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        }
    }

    /// Read a JSON value as a value of type `ty`.
    pub fn from_json(ty: PropertyType, value: &Value) -> Result<Self, String> {
        let parsed = match ty {
            PropertyType::Boolean => value.as_bool().map(PropertyValue::Boolean),
            PropertyType::Int => value.as_i64().map(PropertyValue::Int),
            PropertyType::Enum => value.as_str().map(|s| PropertyValue::Enum(s.to_string())),
            PropertyType::Date => value
                .as_str()
                .filter(|s| regex!(r"^\d{4}-\d{2}-\d{2}$").is_match(s))
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
                .map(PropertyValue::Date),
        };
        parsed.ok_or_else(|| format!("'{value}' is not a valid {ty} value"))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Enum(s) => write!(f, "\"{s}\""),
            PropertyValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

// --- PropertyRange -----------------------------------------------------------

/// A typed range: one [`Range`] per primitive property type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyRange {
    Boolean(Range<bool>),
    Int(Range<i64>),
    Enum(Range<String>),
    Date(Range<NaiveDate>),
}

/// Apply the same generic expression to whichever `Range` a `PropertyRange` holds.
macro_rules! on_range {
    ($range:expr, $r:ident => $body:expr) => {
        match $range {
            PropertyRange::Boolean($r) => $body,
            PropertyRange::Int($r) => $body,
            PropertyRange::Enum($r) => $body,
            PropertyRange::Date($r) => $body,
        }
    };
}

impl PropertyRange {
    pub fn empty(ty: PropertyType) -> Self {
        match ty {
            PropertyType::Boolean => PropertyRange::Boolean(Range::Empty),
            PropertyType::Int => PropertyRange::Int(Range::Empty),
            PropertyType::Enum => PropertyRange::Enum(Range::Empty),
            PropertyType::Date => PropertyRange::Date(Range::Empty),
        }
    }

    pub fn single(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Boolean(b) => PropertyRange::Boolean(Range::single(b)),
            PropertyValue::Int(i) => PropertyRange::Int(Range::single(i)),
            PropertyValue::Enum(s) => PropertyRange::Enum(Range::single(s)),
            PropertyValue::Date(d) => PropertyRange::Date(Range::single(d)),
        }
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyRange::Boolean(_) => PropertyType::Boolean,
            PropertyRange::Int(_) => PropertyType::Int,
            PropertyRange::Enum(_) => PropertyType::Enum,
            PropertyRange::Date(_) => PropertyType::Date,
        }
    }

    pub fn is_empty(&self) -> bool {
        on_range!(self, r => r.is_empty())
    }

    pub fn is_discrete(&self) -> bool {
        on_range!(self, r => r.is_discrete())
    }

    pub fn is_continuous(&self) -> bool {
        on_range!(self, r => r.is_continuous())
    }

    /// Whether `value` lies in this range. Values of another type never do.
    pub fn contains(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (PropertyRange::Boolean(r), PropertyValue::Boolean(v)) => r.contains(v),
            (PropertyRange::Int(r), PropertyValue::Int(v)) => r.contains(v),
            (PropertyRange::Enum(r), PropertyValue::Enum(v)) => r.contains(v),
            (PropertyRange::Date(r), PropertyValue::Date(v)) => r.contains(v),
            _ => false,
        }
    }

    /// Whether both ranges share at least one value. Ranges of different
    /// types never intersect.
    pub fn intersects(&self, other: &PropertyRange) -> bool {
        match (self, other) {
            (PropertyRange::Boolean(a), PropertyRange::Boolean(b)) => a.intersects(b),
            (PropertyRange::Int(a), PropertyRange::Int(b)) => a.intersects(b),
            (PropertyRange::Enum(a), PropertyRange::Enum(b)) => a.intersects(b),
            (PropertyRange::Date(a), PropertyRange::Date(b)) => a.intersects(b),
            _ => false,
        }
    }

    /// The common part of both ranges, or `None` on a type mismatch.
    pub fn intersection(&self, other: &PropertyRange) -> Option<PropertyRange> {
        match (self, other) {
            (PropertyRange::Boolean(a), PropertyRange::Boolean(b)) => Some(PropertyRange::Boolean(a.intersection(b))),
            (PropertyRange::Int(a), PropertyRange::Int(b)) => Some(PropertyRange::Int(a.intersection(b))),
            (PropertyRange::Enum(a), PropertyRange::Enum(b)) => Some(PropertyRange::Enum(a.intersection(b))),
            (PropertyRange::Date(a), PropertyRange::Date(b)) => Some(PropertyRange::Date(a.intersection(b))),
            _ => None,
        }
    }

    /// The value of a range holding exactly one listed value.
    pub fn single_value(&self) -> Option<PropertyValue> {
        fn only<V: Clone + Ord>(range: &Range<V>) -> Option<V> {
            match range {
                Range::List(values) if values.len() == 1 => values.first().cloned(),
                _ => None,
            }
        }
        match self {
            PropertyRange::Boolean(r) => only(r).map(PropertyValue::Boolean),
            PropertyRange::Int(r) => only(r).map(PropertyValue::Int),
            PropertyRange::Enum(r) => only(r).map(PropertyValue::Enum),
            PropertyRange::Date(r) => only(r).map(PropertyValue::Date),
        }
    }

    /// Every explicitly listed value, in order (none for intervals).
    pub fn listed_values(&self) -> Vec<PropertyValue> {
        match self {
            PropertyRange::Boolean(r) => r.listed_values().into_iter().map(PropertyValue::Boolean).collect(),
            PropertyRange::Int(r) => r.listed_values().into_iter().map(PropertyValue::Int).collect(),
            PropertyRange::Enum(r) => r.listed_values().into_iter().map(PropertyValue::Enum).collect(),
            PropertyRange::Date(r) => r.listed_values().into_iter().map(PropertyValue::Date).collect(),
        }
    }

    /// The greatest value in the range.
    pub fn last_value(&self) -> Option<PropertyValue> {
        match self {
            PropertyRange::Boolean(r) => r.last().cloned().map(PropertyValue::Boolean),
            PropertyRange::Int(r) => r.last().cloned().map(PropertyValue::Int),
            PropertyRange::Enum(r) => r.last().cloned().map(PropertyValue::Enum),
            PropertyRange::Date(r) => r.last().cloned().map(PropertyValue::Date),
        }
    }

    /// The closed interval `[min - max]`, collapsed to a single value when both
    /// bounds coincide. `None` unless both values are INT or both are DATE.
    pub fn window(min: PropertyValue, max: PropertyValue) -> Option<PropertyRange> {
        fn compact<V: Ord + Clone>(min: V, max: V) -> Range<V> {
            if min == max { Range::single(min) } else { Range::interval(min, max) }
        }
        match (min, max) {
            (PropertyValue::Int(a), PropertyValue::Int(b)) => Some(PropertyRange::Int(compact(a, b))),
            (PropertyValue::Date(a), PropertyValue::Date(b)) => Some(PropertyRange::Date(compact(a, b))),
            _ => None,
        }
    }

    /// Convert the wire form into a typed range.
    ///
    /// A range spec may list values or give `min`/`max` bounds, never both. Bounds
    /// are only accepted for INT and DATE and must be complete. A range spec with
    /// neither yields the empty range.
    pub fn from_spec(ty: PropertyType, spec: &RangeSpec) -> Result<Self, String> {
        if spec.has_values() && spec.has_bounds() {
            return Err("a range cannot list values and interval bounds at the same time".to_string());
        }
        if spec.has_bounds() {
            if !ty.supports_intervals() {
                return Err(format!("interval bounds are not supported for {ty} properties"));
            }
            let (Some(min), Some(max)) = (&spec.min, &spec.max) else {
                return Err("an interval needs both 'min' and 'max'".to_string());
            };
            let min = PropertyValue::from_json(ty, min)?;
            let max = PropertyValue::from_json(ty, max)?;
            return Ok(match (min, max) {
                (PropertyValue::Int(a), PropertyValue::Int(b)) => PropertyRange::Int(Range::interval(a, b)),
                (PropertyValue::Date(a), PropertyValue::Date(b)) => PropertyRange::Date(Range::interval(a, b)),
                _ => PropertyRange::empty(ty),
            });
        }

        let values = spec
            .values
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|v| PropertyValue::from_json(ty, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PropertyRange::from_values(ty, values))
    }

    /// Build a discrete range of type `ty`; values of other types are ignored.
    pub fn from_values(ty: PropertyType, values: impl IntoIterator<Item = PropertyValue>) -> Self {
        let values = values.into_iter();
        match ty {
            PropertyType::Boolean => PropertyRange::Boolean(Range::list(values.filter_map(|v| match v {
                PropertyValue::Boolean(b) => Some(b),
                _ => None,
            }))),
            PropertyType::Int => PropertyRange::Int(Range::list(values.filter_map(|v| match v {
                PropertyValue::Int(i) => Some(i),
                _ => None,
            }))),
            PropertyType::Enum => PropertyRange::Enum(Range::list(values.filter_map(|v| match v {
                PropertyValue::Enum(s) => Some(s),
                _ => None,
            }))),
            PropertyType::Date => PropertyRange::Date(Range::list(values.filter_map(|v| match v {
                PropertyValue::Date(d) => Some(d),
                _ => None,
            }))),
        }
    }

    pub fn to_spec(&self) -> RangeSpec {
        fn spec_of<V: Clone>(range: &Range<V>, to_json: impl Fn(V) -> Value) -> RangeSpec {
            match range {
                Range::Empty => RangeSpec { values: Some(Vec::new()), min: None, max: None },
                Range::List(values) => {
                    RangeSpec { values: Some(values.iter().cloned().map(&to_json).collect()), min: None, max: None }
                }
                Range::Interval { min, max } => {
                    RangeSpec { values: None, min: Some(to_json(min.clone())), max: Some(to_json(max.clone())) }
                }
            }
        }
        match self {
            PropertyRange::Boolean(r) => spec_of(r, |v| PropertyValue::Boolean(v).to_json()),
            PropertyRange::Int(r) => spec_of(r, |v| PropertyValue::Int(v).to_json()),
            PropertyRange::Enum(r) => spec_of(r, |v| PropertyValue::Enum(v).to_json()),
            PropertyRange::Date(r) => spec_of(r, |v| PropertyValue::Date(v).to_json()),
        }
    }
}

impl fmt::Display for PropertyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyRange::Boolean(r) => write!(f, "{r}"),
            PropertyRange::Int(r) => write!(f, "{r}"),
            PropertyRange::Enum(r) => match r {
                Range::List(values) => {
                    let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
                    if quoted.len() == 1 { f.write_str(&quoted[0]) } else { write!(f, "[{}]", quoted.join(", ")) }
                }
                other => write!(f, "{other}"),
            },
            PropertyRange::Date(r) => match r {
                Range::List(values) => {
                    let dates: Vec<String> = values.iter().map(|d| d.format(DATE_FORMAT).to_string()).collect();
                    if dates.len() == 1 { f.write_str(&dates[0]) } else { write!(f, "[{}]", dates.join(", ")) }
                }
                other => write!(f, "{other}"),
            },
        }
    }
}

// --- Property ----------------------------------------------------------------

/// A named property range. Equality and ordering are by `(name, range)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Property {
    name: String,
    range: PropertyRange,
}

impl Property {
    pub fn new(name: impl Into<String>, range: PropertyRange) -> Self {
        Property { name: name.into(), range }
    }

    pub fn single(name: impl Into<String>, value: PropertyValue) -> Self {
        Property::new(name, PropertyRange::single(value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &PropertyRange {
        &self.range
    }

    pub fn property_type(&self) -> PropertyType {
        self.range.property_type()
    }

    /// The value of a single-valued property.
    pub fn value(&self) -> Option<PropertyValue> {
        self.range.single_value()
    }

    /// Whether both properties have the same name and overlapping ranges.
    pub fn intersects(&self, other: &Property) -> bool {
        self.name == other.name && self.range.intersects(&other.range)
    }

    pub fn to_spec(&self) -> PropertySpec {
        PropertySpec { name: self.name.clone(), property_type: self.property_type(), range: self.range.to_spec() }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.range)
    }
}

// --- Wire form ---------------------------------------------------------------

/// JSON form of a range: `{ "values": [...] }` or `{ "min": .., "max": .. }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
}

impl RangeSpec {
    pub fn has_values(&self) -> bool {
        self.values.as_ref().is_some_and(|v| !v.is_empty())
    }

    pub fn has_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

/// JSON form of a property: `{ "name", "type", "range" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default)]
    pub range: RangeSpec,
}

impl PropertySpec {
    pub fn to_property(&self) -> Result<Property, String> {
        let range = PropertyRange::from_spec(self.property_type, &self.range)
            .map_err(|reason| format!("property '{}': {reason}", self.name))?;
        Ok(Property::new(self.name.clone(), range))
    }
}
