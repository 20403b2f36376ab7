//! Property-based tests for key construction and injection.
//!
//! # Properties Tested
//!
//! 1. **Shape Property**: CRUD keys carry exactly the documented fields for any entity and id
//! 2. **Merge Property**: injected fields win, base fields survive, the source is untouched
//! 3. **Match Property**: a key always partially matches its own subsets
//! 4. **Canonical Property**: equal keys render to the same slot string

use proptest::prelude::*;
use query_key_kit::{build_crud_group, inject_extra_fields, CacheKey, ExtraFields, Method};
use serde_json::{json, Value};

// ============================================================================
// Strategies
// ============================================================================

fn entity_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,15}"
}

fn field_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,10}"
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9-]{0,12}".prop_map(Value::from),
    ]
}

fn extra_fields() -> impl Strategy<Value = ExtraFields> {
    prop::collection::btree_map(field_name(), field_value(), 0..5).prop_map(|fields| {
        fields
            .into_iter()
            .fold(ExtraFields::new(), |extra, (name, value)| extra.with(name, value))
    })
}

// ============================================================================
// Shape
// ============================================================================

proptest! {
    #[test]
    fn prop_static_keys_shape(entity in entity_name()) {
        let group = build_crud_group::<String>(&entity);

        prop_assert_eq!(
            serde_json::to_value(group.all.query_key.as_static()).unwrap(),
            json!({"entity": entity})
        );
        prop_assert_eq!(
            serde_json::to_value(group.list.query_key.as_static()).unwrap(),
            json!({"entity": entity, "method": "list"})
        );
        prop_assert_eq!(
            serde_json::to_value(group.create.query_key.as_static()).unwrap(),
            json!({"entity": entity, "method": "create"})
        );
    }

    #[test]
    fn prop_dynamic_keys_shape(entity in entity_name(), id in any::<u64>()) {
        let group = build_crud_group::<u64>(&entity);

        for (name, method) in [("detail", Method::Detail), ("update", Method::Update), ("remove", Method::Remove)] {
            let op = group.operation(name).unwrap();
            let key = op.query_key.resolve(&id);
            prop_assert_eq!(key.len(), 3);
            prop_assert_eq!(key.entity(), Some(entity.as_str()));
            prop_assert_eq!(key.method(), Some(method));
            prop_assert_eq!(key.id(), Some(&json!(id)));
        }
    }

    #[test]
    fn prop_invalidation_sets(entity in entity_name(), id in "[a-z0-9]{1,12}") {
        let group = build_crud_group::<String>(&entity);
        let expected = vec![
            CacheKey::new(entity.as_str()).with_id(&id),
            CacheKey::new(entity.as_str()).with_method(Method::List),
        ];

        prop_assert_eq!(group.update.invalidates.as_ref().unwrap().resolve(&id), expected.clone());
        prop_assert_eq!(group.remove.invalidates.as_ref().unwrap().resolve(&id), expected);
    }
}

// ============================================================================
// Merge and match
// ============================================================================

proptest! {
    #[test]
    fn prop_injection_merges_extra_on_top(
        entity in entity_name(),
        id in "[a-z0-9]{1,12}",
        extra in extra_fields(),
    ) {
        let base = build_crud_group::<String>(&entity);
        let injected = inject_extra_fields(&base, &extra);

        let base_key = base.detail.query_key.resolve(&id);
        let injected_key = injected.detail.query_key.resolve(&id);

        for (name, value) in extra.iter() {
            prop_assert_eq!(injected_key.get(name), Some(value));
        }
        for (name, value) in base_key.fields() {
            if extra.iter().all(|(extra_name, _)| extra_name != name) {
                prop_assert_eq!(injected_key.get(name), Some(value));
            }
        }
        // source untouched
        prop_assert_eq!(base.detail.query_key.resolve(&id), base_key);
    }

    #[test]
    fn prop_merge_with_empty_is_identity(entity in entity_name(), id in any::<i32>()) {
        let key = CacheKey::new(entity.as_str()).with_method(Method::Detail).with_id(&id);
        prop_assert_eq!(key.merged(&ExtraFields::new()), key);
    }

    #[test]
    fn prop_merge_is_idempotent(entity in entity_name(), extra in extra_fields()) {
        let key = CacheKey::new(entity.as_str()).with_method(Method::List);
        let once = key.merged(&extra);
        prop_assert_eq!(once.merged(&extra), once);
    }

    #[test]
    fn prop_key_matches_its_subsets(
        entity in entity_name(),
        id in any::<u32>(),
        extra in extra_fields(),
    ) {
        let key = CacheKey::new(entity.as_str())
            .with_method(Method::Detail)
            .with_id(&id)
            .merged(&extra);

        prop_assert!(key.matches(&key));
        prop_assert!(key.matches(&CacheKey::from_fields(Default::default())));

        // Any base key keeps matching the slot it was merged into, unless a
        // merged field overwrote one of its own fields.
        let entity_only = CacheKey::new(entity.as_str());
        if extra.iter().all(|(name, _)| name != "entity") {
            prop_assert!(key.matches(&entity_only));
        }
    }

    #[test]
    fn prop_equal_keys_share_a_slot(entity in entity_name(), extra in extra_fields()) {
        let a = CacheKey::new(entity.as_str()).with_method(Method::List).merged(&extra);
        let b = CacheKey::from_fields(a.fields().clone());

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.to_string(), b.to_string());

        let parsed: CacheKey = serde_json::from_str(&a.to_string()).unwrap();
        prop_assert_eq!(parsed, a);
    }
}
