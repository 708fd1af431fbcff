//! Request validation and selection augmentation.
//!
//! Before anything is factorized, the request's slice selection is checked
//! against the model's slicing property definitions and completed:
//!
//! ```text
//! request.sliceSelection ──┬─ validate each entry (name, type, discipline, range)
//!                          ├─ fill empty ranges from the definition
//!                          └─ add a default selection for every unselected definition
//!                                  │
//!                                  v
//!                    Vec<SliceSelection> in declaration order
//! ```
//!
//! Every problem found here is fatal for the request.

use crate::api::{ComputationRequest, PropertySelection};
use crate::definition::{PropertyStore, SlicingPropertyDefinition};
use crate::error::{EngineError, Result};
use crate::property::{Property, PropertyRange, RangeSpec};
use crate::slice::{SliceSelection, SliceType, SliceTypeSet};
use std::collections::HashMap;

/// Validate `request` and return one selection per slicing property, in
/// declaration order.
pub(crate) fn validate_and_augment(
    request: &ComputationRequest,
    store: &PropertyStore,
    allowed: SliceTypeSet,
    default_type: SliceType,
) -> Result<Vec<SliceSelection>> {
    if request.rule_file_id.trim().is_empty() {
        return Err(EngineError::InvalidRequest("missing rule file id".to_string()));
    }

    let mut requested: HashMap<&str, &PropertySelection> = HashMap::new();
    for selection in &request.slice_selection {
        if store.get(&selection.property).is_none() {
            bail_selection!("unknown slicing property '{}'", selection.property);
        }
        if requested.insert(selection.property.as_str(), selection).is_some() {
            bail_selection!("property '{}' is selected more than once", selection.property);
        }
    }

    let mut out = Vec::with_capacity(store.len());
    for definition in store.definitions() {
        let selection = match requested.get(definition.name()) {
            Some(selection) => augment(selection, definition, allowed, default_type)?,
            None => SliceSelection::new(Property::new(definition.name(), definition.full_range()), default_type),
        };
        out.push(selection);
    }
    Ok(out)
}

fn augment(
    selection: &PropertySelection,
    definition: &SlicingPropertyDefinition,
    allowed: SliceTypeSet,
    default_type: SliceType,
) -> Result<SliceSelection> {
    let name = definition.name();
    if selection.property_type != definition.property_type() {
        bail_selection!(
            "property '{name}' is of type {} but was selected as {}",
            definition.property_type(),
            selection.property_type
        );
    }

    let slice_type = selection.slice_type.unwrap_or(default_type);
    if !allowed.allows(slice_type) {
        bail_selection!("slice type {slice_type} is not allowed for property '{name}' in this computation");
    }

    let spec = &selection.range;
    if spec.has_values() && spec.has_bounds() {
        bail_selection!("property '{name}' lists values and interval bounds at the same time");
    }

    let range = if !spec.has_values() && !spec.has_bounds() {
        definition.full_range()
    } else if spec.has_bounds() && definition.property_type().supports_intervals() {
        let filled = RangeSpec {
            values: None,
            min: spec.min.clone().or_else(|| definition.min().map(|v| v.to_json())),
            max: spec.max.clone().or_else(|| definition.max().map(|v| v.to_json())),
        };
        PropertyRange::from_spec(definition.property_type(), &filled)
            .map_err(|reason| EngineError::selection(format!("property '{name}': {reason}")))?
    } else {
        PropertyRange::from_spec(definition.property_type(), spec)
            .map_err(|reason| EngineError::selection(format!("property '{name}': {reason}")))?
    };

    Ok(SliceSelection::new(Property::new(name, range), slice_type))
}
