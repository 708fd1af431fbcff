//! Grouping of slices into slice sets.
//!
//! Many slices activate exactly the same feature definitions and rules. Those
//! slices share one [`SliceSet`] and are solved once. The grouping key is the
//! identity of the activated objects (their [`ObjectId`](crate::model::ObjectId)s),
//! never their structure: two rules that look the same but were compiled from
//! different declarations keep their slices apart.

use crate::model::{Activation, ActivationKey, FeatureDefinition, Rule, RuleModel};
use crate::slice::Slice;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Slices that activate the same objects, plus those objects.
#[derive(Debug, Clone)]
pub struct SliceSet {
    pub slices: Vec<Slice>,
    pub activation: Activation,
}

impl SliceSet {
    /// The first slice of the set; every slice sees the same rules.
    pub fn representative(&self) -> &Slice {
        &self.slices[0]
    }

    pub fn features(&self) -> &[Arc<FeatureDefinition>] {
        &self.activation.features
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.activation.rules
    }
}

/// Group `slices` by activated objects. Sets appear in the order their first
/// slice appears.
pub fn compute_slice_sets(slices: Vec<Slice>, model: &RuleModel) -> Vec<SliceSet> {
    let mut index: HashMap<ActivationKey, usize> = HashMap::new();
    let mut sets: Vec<SliceSet> = Vec::new();

    for slice in slices {
        let activation = model.activation(&slice);
        match index.get(&activation.key()) {
            Some(&idx) => sets[idx].slices.push(slice),
            None => {
                index.insert(activation.key(), sets.len());
                sets.push(SliceSet { slices: vec![slice], activation });
            }
        }
    }

    debug!(slice_sets = sets.len(), "grouped slices");
    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{Property, PropertyValue};
    use crate::slice::SliceType;

    fn series(value: &str) -> Slice {
        Slice::of([(Property::single("series", PropertyValue::Enum(value.into())), SliceType::Split)])
    }

    #[test]
    fn slices_with_same_objects_share_a_set() {
        let model = RuleModel::from_json(
            r#"{ "slicingProperties": [{ "name": "series", "type": "ENUM" }],
                 "features": [{ "code": "A", "properties": [{ "name": "series", "type": "ENUM", "range": { "values": ["S1", "S2"] } }] },
                              { "code": "B", "properties": [{ "name": "series", "type": "ENUM", "range": { "values": ["S3"] } }] }] }"#,
        )
        .unwrap();
        let sets = compute_slice_sets(vec![series("S1"), series("S3"), series("S2")], &model);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].slices, vec![series("S1"), series("S2")]);
        assert_eq!(sets[1].representative(), &series("S3"));
        assert_eq!(sets[1].features()[0].code, "B");
    }

    #[test]
    fn structurally_equal_rules_stay_apart() {
        let model = RuleModel::from_json(
            r#"{ "slicingProperties": [{ "name": "series", "type": "ENUM" }],
                 "features": [{ "code": "A" }],
                 "rules": [
                    { "formula": { "var": "A" }, "properties": [{ "name": "series", "type": "ENUM", "range": { "values": ["S1"] } }] },
                    { "formula": { "var": "A" }, "properties": [{ "name": "series", "type": "ENUM", "range": { "values": ["S2"] } }] }
                 ] }"#,
        )
        .unwrap();
        let sets = compute_slice_sets(vec![series("S1"), series("S2")], &model);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].rules()[0].formula, sets[1].rules()[0].formula);
        assert_ne!(sets[0].rules()[0].id, sets[1].rules()[0].id);
    }
}
