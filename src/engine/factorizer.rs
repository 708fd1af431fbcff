//! Slice factorization.
//!
//! Builds every concrete [`Slice`] by multiplying the relevant values of all
//! slicing properties, one definition at a time:
//!
//! ```text
//! definitions: series {S1, S2} × version {1, 2}
//!
//! after series:   [S1]          [S2]
//! after version:  [S1,1] [S1,2] [S2,1] [S2,2]
//! ```
//!
//! The running product is checked against `max_slices` before each extension
//! is materialised, so an exploding request fails before the remaining
//! definitions are touched.

use crate::definition::SlicingPropertyDefinition;
use crate::error::{EngineError, Result};
use crate::property::Property;
use crate::slice::{Slice, SliceSelection, SliceType};
use tracing::debug;

/// Default upper bound on the number of slices of one request.
pub const DEFAULT_MAX_SLICES: usize = 10_000;

/// Compute all slices for `selections` over `definitions`.
///
/// Definitions without a selection contribute their full domain with the
/// `ANY` discipline. Definitions nothing ever used contribute no dimension.
/// No definitions at all yield the single empty slice.
pub fn compute_all_slices(
    selections: &[SliceSelection],
    definitions: &[SlicingPropertyDefinition],
    max_slices: usize,
) -> Result<Vec<Slice>> {
    let mut slices = vec![Slice::empty()];

    for definition in definitions {
        if definition.is_unused() {
            debug!(property = definition.name(), "skipping unused slicing property");
            continue;
        }

        let selection = selections.iter().find(|s| s.name() == definition.name());
        let (values, slice_type) = match selection {
            Some(s) => (definition.relevant_values_in(s.property.range()), s.slice_type),
            None => (definition.relevant_values(), SliceType::Any),
        };
        if values.is_empty() {
            bail_selection!("selection on '{}' leaves no relevant value", definition.name());
        }

        let count = slices.len().checked_mul(values.len()).unwrap_or(usize::MAX);
        if count > max_slices {
            return Err(EngineError::SliceExplosion { count, max: max_slices });
        }

        let mut next = Vec::with_capacity(count);
        for slice in &slices {
            for value in &values {
                next.push(slice.with_property(Property::single(definition.name(), value.clone()), slice_type));
            }
        }
        debug!(property = definition.name(), values = values.len(), slices = next.len(), "extended slices");
        slices = next;
    }

    Ok(slices)
}
