//! The compiled rule model.
//!
//! A [`RuleModel`] is what a rule-file compiler hands to the engine: the
//! slicing property declarations, the feature definitions and the rules.
//! Every feature definition and rule receives a synthetic [`ObjectId`] at
//! compile time. Grouping of slices works on these ids, so two objects that
//! happen to be structurally equal still count as different objects.
//!
//! The JSON document accepted by [`RuleModel::from_json`]:
//!
//! ```text
//! { "slicingProperties": [{ "name": "series", "type": "ENUM" }],
//!   "features": [{ "code": "A", "properties": [{ "name", "type", "range" }] }],
//!   "rules":    [{ "id"?, "description"?, "formula": {..}, "properties": [..] }] }
//! ```

use crate::definition::PropertyStore;
use crate::error::{EngineError, Result};
use crate::formula::Formula;
use crate::property::{Property, PropertySpec, PropertyType};
use crate::slice::Slice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identity of a compiled feature definition or rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub struct FeatureDefinition {
    pub id: ObjectId,
    pub code: String,
    pub properties: Vec<Property>,
}

#[derive(Debug)]
pub struct Rule {
    pub id: ObjectId,
    pub label: String,
    pub formula: Formula,
    pub properties: Vec<Property>,
}

/// An object is active in a slice when every property the slice constrains
/// intersects the slice's value. Properties the slice does not mention never
/// exclude.
fn is_active(properties: &[Property], slice: &Slice) -> bool {
    properties.iter().all(|p| slice.property(p.name()).is_none_or(|sp| sp.range().intersects(p.range())))
}

/// The feature definitions and rules one slice activates.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    pub features: Vec<Arc<FeatureDefinition>>,
    pub rules: Vec<Arc<Rule>>,
}

/// Identity key of an [`Activation`]: the sorted object ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivationKey {
    features: Vec<ObjectId>,
    rules: Vec<ObjectId>,
}

impl Activation {
    pub fn key(&self) -> ActivationKey {
        let mut features: Vec<ObjectId> = self.features.iter().map(|f| f.id).collect();
        let mut rules: Vec<ObjectId> = self.rules.iter().map(|r| r.id).collect();
        features.sort_unstable();
        rules.sort_unstable();
        ActivationKey { features, rules }
    }

    /// Distinct codes of the active features, sorted.
    pub fn feature_codes(&self) -> BTreeSet<String> {
        self.features.iter().map(|f| f.code.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct RuleModel {
    store: PropertyStore,
    features: Vec<Arc<FeatureDefinition>>,
    rules: Vec<Arc<Rule>>,
}

impl RuleModel {
    pub fn from_json(input: &str) -> Result<Self> {
        let document: RuleFileDocument =
            serde_json::from_str(input).map_err(|e| EngineError::model(format!("cannot read model: {e}")))?;
        RuleModel::compile(document)
    }

    /// Compile a document: declare slicing properties, feed every feature and
    /// rule property into the definitions and hand out object ids.
    pub fn compile(document: RuleFileDocument) -> Result<Self> {
        let mut store = PropertyStore::new();
        for decl in &document.slicing_properties {
            store.declare(&decl.name, decl.property_type).map_err(EngineError::model)?;
        }

        let mut next_id = 0u32;
        let mut fresh_id = || {
            next_id += 1;
            ObjectId(next_id)
        };

        let mut features = Vec::with_capacity(document.features.len());
        for feature in document.features {
            if feature.code.trim().is_empty() {
                return Err(EngineError::model("feature with an empty code"));
            }
            let properties = convert_properties(&feature.properties, &mut store)
                .map_err(|e| EngineError::model(format!("feature '{}': {e}", feature.code)))?;
            features.push(Arc::new(FeatureDefinition { id: fresh_id(), code: feature.code, properties }));
        }

        let known: BTreeSet<&str> = features.iter().map(|f| f.code.as_str()).collect();
        let mut rules = Vec::with_capacity(document.rules.len());
        for (idx, rule) in document.rules.into_iter().enumerate() {
            let label = rule.id.or(rule.description).unwrap_or_else(|| format!("rule {}", idx + 1));
            if let Some(unknown) = rule.formula.variables().iter().find(|v| !known.contains(v.as_str())) {
                return Err(EngineError::model(format!("{label}: unknown feature '{unknown}'")));
            }
            let properties = convert_properties(&rule.properties, &mut store)
                .map_err(|e| EngineError::model(format!("{label}: {e}")))?;
            rules.push(Arc::new(Rule { id: fresh_id(), label, formula: rule.formula, properties }));
        }

        Ok(RuleModel { store, features, rules })
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    pub fn features(&self) -> &[Arc<FeatureDefinition>] {
        &self.features
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Resolve the objects a slice activates, in model order.
    pub fn activation(&self, slice: &Slice) -> Activation {
        Activation {
            features: self.features.iter().filter(|f| is_active(&f.properties, slice)).cloned().collect(),
            rules: self.rules.iter().filter(|r| is_active(&r.properties, slice)).cloned().collect(),
        }
    }
}

fn convert_properties(specs: &[PropertySpec], store: &mut PropertyStore) -> std::result::Result<Vec<Property>, String> {
    let mut properties = Vec::with_capacity(specs.len());
    for spec in specs {
        let property = spec.to_property()?;
        store.add_property(&property)?;
        properties.push(property);
    }
    Ok(properties)
}

// --- Document ----------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFileDocument {
    #[serde(default)]
    pub slicing_properties: Vec<SlicingPropertyDecl>,
    #[serde(default)]
    pub features: Vec<FeatureDocument>,
    #[serde(default)]
    pub rules: Vec<RuleDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicingPropertyDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDocument {
    pub code: String,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub formula: Formula,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;
    use crate::slice::SliceType;

    const MODEL: &str = r#"{
        "slicingProperties": [{ "name": "series", "type": "ENUM" }],
        "features": [
            { "code": "A" },
            { "code": "B", "properties": [{ "name": "series", "type": "ENUM", "range": { "values": ["S1"] } }] }
        ],
        "rules": [
            { "id": "r1", "formula": { "var": "A" } },
            { "formula": { "not": { "var": "B" } },
              "properties": [{ "name": "series", "type": "ENUM", "range": { "values": ["S2"] } }] }
        ]
    }"#;

    fn series(value: &str) -> Slice {
        Slice::of([(Property::single("series", PropertyValue::Enum(value.into())), SliceType::Split)])
    }

    #[test]
    fn compile_assigns_ids_and_domains() {
        let model = RuleModel::from_json(MODEL).unwrap();
        assert_eq!(model.features().iter().map(|f| f.id).collect::<Vec<_>>(), vec![ObjectId(1), ObjectId(2)]);
        assert_eq!(model.rules()[1].id, ObjectId(4));
        assert_eq!(model.rules()[1].label, "rule 2");
        let def = model.store().get("series").unwrap();
        assert_eq!(def.relevant_values().len(), 2);
    }

    #[test]
    fn activation_respects_slice_properties() {
        let model = RuleModel::from_json(MODEL).unwrap();
        let s1 = model.activation(&series("S1"));
        assert_eq!(s1.feature_codes().into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(s1.rules.len(), 1);
        let s2 = model.activation(&series("S2"));
        assert_eq!(s2.features.len(), 1);
        assert_eq!(s2.rules.len(), 2);
        assert_ne!(s1.key(), s2.key());
        assert_eq!(model.activation(&Slice::empty()).rules.len(), 2);
    }

    #[test]
    fn unknown_feature_in_rule_is_a_model_error() {
        let err = RuleModel::from_json(r#"{ "rules": [{ "id": "r", "formula": { "var": "X" } }] }"#).unwrap_err();
        assert!(matches!(err, EngineError::Model(msg) if msg.contains("'X'")));
    }

    #[test]
    fn conflicting_property_type_is_a_model_error() {
        let doc = r#"{
            "slicingProperties": [{ "name": "version", "type": "INT" }],
            "features": [{ "code": "A", "properties": [{ "name": "version", "type": "ENUM", "range": { "values": ["x"] } }] }]
        }"#;
        assert!(matches!(RuleModel::from_json(doc), Err(EngineError::Model(_))));
    }
}
