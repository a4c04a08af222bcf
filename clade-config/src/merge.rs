//! Configuration merge logic.
//!
//! Merge semantics:
//! - Objects: deep-merge by key (recursive); keys unique to either side
//!   are preserved
//! - Arrays: REPLACE (overlay wins entirely)
//! - Scalars: override (overlay wins)

use serde_json::Value;

/// Deep merge two JSON values without mutating either input.
///
/// The overlay takes precedence at every conflicting leaf; mappings are
/// merged additively at every level.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        // Both objects: deep merge
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }

        // Arrays, scalars and any other case: overlay wins
        (_, overlay) => overlay.clone(),
    }
}

/// Merge config layers in order (first is base, last has highest precedence).
pub fn merge_layers(layers: &[Value]) -> Value {
    layers
        .iter()
        .fold(Value::Null, |acc, layer| deep_merge(&acc, layer))
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_tree() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn arb_mapping() -> impl Strategy<Value = Value> {
        proptest::collection::btree_map("[a-z]{1,4}", arb_tree(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// merge(B, {}) == B for any mapping B.
        #[test]
        fn prop_empty_overlay_identity(base in arb_mapping()) {
            prop_assert_eq!(deep_merge(&base, &json!({})), base);
        }

        /// merge({}, O) == O for any mapping O.
        #[test]
        fn prop_empty_base_identity(overlay in arb_mapping()) {
            prop_assert_eq!(deep_merge(&json!({}), &overlay), overlay);
        }

        /// Self-merge is the identity.
        #[test]
        fn prop_self_merge_identity(tree in arb_mapping()) {
            prop_assert_eq!(deep_merge(&tree, &tree), tree);
        }

        /// Every key of the overlay wins at the top level when its value
        /// is not a mapping; keys unique to the base survive.
        #[test]
        fn prop_right_bias(base in arb_mapping(), overlay in arb_mapping()) {
            let merged = deep_merge(&base, &overlay);
            let merged_map = merged.as_object().unwrap();
            let base_map = base.as_object().unwrap();
            let overlay_map = overlay.as_object().unwrap();

            for (key, overlay_value) in overlay_map {
                if !overlay_value.is_object() {
                    prop_assert_eq!(&merged_map[key], overlay_value);
                }
            }
            for (key, base_value) in base_map {
                if !overlay_map.contains_key(key) {
                    prop_assert_eq!(&merged_map[key], base_value);
                }
            }
        }
    }
}
