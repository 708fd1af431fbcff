use proptest::prelude::*;
use slicewise::{
    EngineError, Property, PropertyRange, PropertyType, PropertyValue, Range, Slice, SliceSelection, SliceType,
    SlicingPropertyDefinition, compute_all_slices, evaluate_properties,
};
use std::collections::{BTreeMap, HashSet};

fn enum_definition(name: &str, count: usize) -> SlicingPropertyDefinition {
    let mut definition = SlicingPropertyDefinition::new(name, PropertyType::Enum);
    let values = (0..count).map(|i| format!("v{i}"));
    definition.add_range(&PropertyRange::Enum(Range::list(values))).unwrap();
    definition
}

fn slice_type_strategy() -> impl Strategy<Value = SliceType> {
    prop_oneof![Just(SliceType::Any), Just(SliceType::All), Just(SliceType::Split)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn slice_count_is_the_product_of_relevant_values(counts in prop::collection::vec(1usize..5, 0..5)) {
        let definitions: Vec<_> = counts.iter().enumerate().map(|(i, c)| enum_definition(&format!("p{i}"), *c)).collect();
        let slices = compute_all_slices(&[], &definitions, 10_000).unwrap();

        let expected: usize = counts.iter().product();
        prop_assert_eq!(slices.len(), expected);

        let distinct: HashSet<&Slice> = slices.iter().collect();
        prop_assert_eq!(distinct.len(), slices.len());
        prop_assert!(slices.iter().all(|s| s.len() == counts.len()));
    }

    #[test]
    fn exceeding_the_limit_fails(counts in prop::collection::vec(2usize..5, 2..5)) {
        let definitions: Vec<_> = counts.iter().enumerate().map(|(i, c)| enum_definition(&format!("p{i}"), *c)).collect();
        let total: usize = counts.iter().product();
        let max = total - 1;

        let err = compute_all_slices(&[], &definitions, max).unwrap_err();
        match err {
            EngineError::SliceExplosion { count, max: reported } => {
                prop_assert_eq!(reported, max);
                prop_assert!(count > max);
                // the first product past the limit is reported, not the total
                let first_over = counts.iter().scan(1usize, |acc, c| { *acc *= c; Some(*acc) }).find(|p| *p > max);
                prop_assert_eq!(Some(count), first_over);
            }
            other => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    #[test]
    fn selector_matches_its_own_properties(
        series in "[A-Z][0-9]",
        version in -50i64..50,
        flag in any::<bool>(),
        types in prop::collection::vec(slice_type_strategy(), 3),
    ) {
        let properties = vec![
            Property::single("series", PropertyValue::Enum(series)),
            Property::single("version", PropertyValue::Int(version)),
            Property::single("flag", PropertyValue::Boolean(flag)),
        ];
        let slice = Slice::of(properties.iter().cloned().zip(types));
        let map: BTreeMap<String, Property> = properties.into_iter().map(|p| (p.name().to_string(), p)).collect();

        prop_assert!(evaluate_properties(&map, &slice.selector()));
    }
}

#[test]
fn zero_definitions_yield_one_empty_slice() {
    let slices = compute_all_slices(&[], &[], 1).unwrap();
    assert_eq!(slices.len(), 1);
    assert!(slices[0].is_empty());
}

#[test]
fn two_split_properties_yield_four_slices() {
    let mut version = SlicingPropertyDefinition::new("version", PropertyType::Int);
    version.add_range(&PropertyRange::Int(Range::list([1, 2]))).unwrap();
    let series = enum_definition("series", 2);
    let selections = vec![
        SliceSelection::new(Property::new("version", version.full_range()), SliceType::Split),
        SliceSelection::new(Property::new("series", series.full_range()), SliceType::Split),
    ];

    let slices = compute_all_slices(&selections, &[version, series], 100).unwrap();
    assert_eq!(slices.len(), 4);
    assert!(slices.iter().all(|s| s.slice_type("version") == Some(SliceType::Split)));
}

#[test]
fn selector_rejects_a_different_value() {
    let slice = Slice::of([(Property::single("series", PropertyValue::Enum("S1".into())), SliceType::Split)]);
    let mut map = BTreeMap::new();
    map.insert("series".to_string(), Property::single("series", PropertyValue::Enum("S2".into())));
    assert!(!evaluate_properties(&map, &slice.selector()));
}
