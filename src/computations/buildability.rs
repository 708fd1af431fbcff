//! Feature buildability: for every active feature, must it, may it or can it
//! never be part of a valid configuration?
//!
//! ```text
//! can be true? can be false?   status
//!     no           yes         FORBIDDEN
//!     yes          no          MANDATORY
//!     yes          yes         OPTIONAL
//! ```
//!
//! Only SPLIT and ALL are meaningful disciplines here; properties the request
//! does not select are folded with ALL.

use crate::engine::{Computation, ListComputation, SliceContext, StatusBuilder};
use crate::error::Result;
use crate::formula::Literal;
use crate::slice::{SliceType, SliceTypeSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureStatus {
    Mandatory,
    Optional,
    Forbidden,
}

impl FeatureStatus {
    /// Equal statuses stay, differing ones become optional.
    pub fn combine(self, other: FeatureStatus) -> FeatureStatus {
        if self == other { self } else { FeatureStatus::Optional }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureStatus::Mandatory => "MANDATORY",
            FeatureStatus::Optional => "OPTIONAL",
            FeatureStatus::Forbidden => "FORBIDDEN",
        })
    }
}

/// Feature code -> status for one slice set.
pub type BuildabilityResult = BTreeMap<String, FeatureStatus>;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildabilityComputation;

impl Computation for BuildabilityComputation {
    type Result = BuildabilityResult;

    fn name(&self) -> &'static str {
        "buildability"
    }

    fn allowed_slice_types(&self) -> SliceTypeSet {
        SliceTypeSet::SPLIT | SliceTypeSet::ALL
    }

    fn default_slice_type(&self) -> SliceType {
        SliceType::All
    }

    fn compute_for_slice(&self, ctx: &SliceContext<'_>, status: &mut StatusBuilder) -> Result<BuildabilityResult> {
        let features = &ctx.translation.features;
        let mut solver = ctx.rule_solver();
        for constraint in ctx.additional_constraints()? {
            solver.add(constraint);
        }
        if solver.solve(&[])?.is_none() {
            status.add_warning(format!("rule set for slice {} is inconsistent, all features are forbidden", ctx.slice()));
            return Ok(features.iter().map(|f| (f.clone(), FeatureStatus::Forbidden)).collect());
        }

        let mut out = BuildabilityResult::new();
        for feature in features {
            let can_be_true = solver.solve(&[Literal { variable: feature.clone(), phase: true }])?.is_some();
            let can_be_false = solver.solve(&[Literal { variable: feature.clone(), phase: false }])?.is_some();
            let feature_status = match (can_be_true, can_be_false) {
                (true, false) => FeatureStatus::Mandatory,
                (false, _) => FeatureStatus::Forbidden,
                (true, true) => FeatureStatus::Optional,
            };
            out.insert(feature.clone(), feature_status);
        }
        Ok(out)
    }

    /// Missing features count as forbidden on their side.
    fn merge_internal_result(
        &self,
        existing: BuildabilityResult,
        new: BuildabilityResult,
        _slice_type: SliceType,
    ) -> BuildabilityResult {
        let codes: BTreeSet<&String> = existing.keys().chain(new.keys()).collect();
        codes
            .into_iter()
            .map(|code| {
                let a = existing.get(code).copied().unwrap_or(FeatureStatus::Forbidden);
                let b = new.get(code).copied().unwrap_or(FeatureStatus::Forbidden);
                (code.clone(), a.combine(b))
            })
            .collect()
    }

    fn default_result(&self) -> BuildabilityResult {
        BuildabilityResult::new()
    }
}

impl ListComputation for BuildabilityComputation {
    type Element = String;
    type ElementResult = FeatureStatus;

    fn extract_elements(&self, result: &BuildabilityResult) -> BTreeSet<String> {
        result.keys().cloned().collect()
    }

    fn extract_internal_result(&self, element: &String, result: &BuildabilityResult) -> Option<FeatureStatus> {
        result.get(element).copied()
    }

    fn default_element_result(&self) -> FeatureStatus {
        FeatureStatus::Forbidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(entries: &[(&str, FeatureStatus)]) -> BuildabilityResult {
        entries.iter().map(|(c, s)| (c.to_string(), *s)).collect()
    }

    #[test]
    fn merge_keeps_agreement_and_relaxes_disagreement() {
        use FeatureStatus::*;
        let c = BuildabilityComputation;
        let merged = c.merge_internal_result(
            result(&[("A", Mandatory), ("B", Forbidden), ("C", Mandatory)]),
            result(&[("A", Mandatory), ("B", Forbidden), ("D", Optional)]),
            SliceType::All,
        );
        assert_eq!(merged, result(&[("A", Mandatory), ("B", Forbidden), ("C", Optional), ("D", Optional)]));
    }

    #[test]
    fn absent_feature_with_forbidden_stays_forbidden() {
        use FeatureStatus::*;
        let c = BuildabilityComputation;
        let merged = c.merge_internal_result(result(&[("A", Forbidden)]), result(&[]), SliceType::All);
        assert_eq!(merged, result(&[("A", Forbidden)]));
        assert_eq!(Mandatory.combine(Forbidden), Optional);
    }
}
