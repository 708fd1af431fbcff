//! Shipped computations.
//!
//! - `consistency.rs`: single result per SPLIT key, `true` when the rules
//!   (and additional constraints) admit a configuration. Details carry an
//!   example configuration or, on request, a minimal conflicting rule set.
//! - `buildability.rs`: one MANDATORY/OPTIONAL/FORBIDDEN status per feature
//!   and SPLIT key.

#[path = "computations/buildability.rs"]
mod buildability;
#[path = "computations/consistency.rs"]
mod consistency;

pub use buildability::{BuildabilityComputation, BuildabilityResult, FeatureStatus};
pub use consistency::{ConsistencyComputation, ConsistencyDetail, ConsistencyResult};
