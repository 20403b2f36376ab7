//! Per-entity operation groups.
//!
//! [`build_crud_group`] produces the six standard operations for one entity:
//!
//! | name | query key | invalidates | normalize |
//! |------|-----------|-------------|-----------|
//! | `all` | `{entity}` | - | - |
//! | `list` | `{entity, method:"list"}` | - | - |
//! | `detail` | `id -> {entity, method:"detail", id}` | - | replace item in list |
//! | `create` | `{entity, method:"create"}` | `{entity, method:"list"}` | append to list, set detail |
//! | `update` | `id -> {entity, method:"update", id}` | `id -> [{entity, id}, {entity, method:"list"}]` | replace item in list, set detail |
//! | `remove` | `id -> {entity, method:"remove", id}` | `id -> [{entity, id}, {entity, method:"list"}]` | drop item from list, clear detail |
//!
//! Only `create` may create a list cache from nothing. List items are matched by
//! value equality of their `id` field.

use crate::client::QueryClient;
use crate::error::{Error, Result};
use crate::key::{CacheKey, KeyId, Method, ID_FIELD};
use crate::operation::{NormalizeContext, Operation};
use crate::resolver::{Invalidates, KeySource};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ALL: &str = "all";
pub const LIST: &str = "list";
pub const DETAIL: &str = "detail";
pub const CREATE: &str = "create";
pub const UPDATE: &str = "update";
pub const REMOVE: &str = "remove";

/// Names of the built-in operations, in iteration order.
pub const BUILTIN_OPERATIONS: [&str; 6] = [ALL, LIST, DETAIL, CREATE, UPDATE, REMOVE];

/// Named bundle of operations for one entity.
///
/// # Example
///
/// ```
/// use query_key_kit::group::build_crud_group;
/// use query_key_kit::key::{CacheKey, Method};
///
/// let accounts = build_crud_group::<String>("accounts");
///
/// assert_eq!(
///     accounts.list.query_key.as_static(),
///     Some(&CacheKey::new("accounts").with_method(Method::List))
/// );
/// assert_eq!(
///     accounts.detail.query_key.resolve(&"42".to_string()),
///     CacheKey::new("accounts").with_method(Method::Detail).with_id(&"42".to_string())
/// );
/// ```
pub struct QueryGroup<T> {
    entity: String,
    pub all: Operation<T>,
    pub list: Operation<T>,
    pub detail: Operation<T>,
    pub create: Operation<T>,
    pub update: Operation<T>,
    pub remove: Operation<T>,
    custom: BTreeMap<String, Operation<T>>,
}

/// Build the standard CRUD group for `entity`.
pub fn build_crud_group<T: KeyId>(entity: &str) -> QueryGroup<T> {
    QueryGroup::crud(entity)
}

impl<T: KeyId> QueryGroup<T> {
    /// Build the standard CRUD group for `entity`.
    pub fn crud(entity: impl Into<String>) -> Self {
        let entity = entity.into();

        let list_key = CacheKey::new(entity.as_str()).with_method(Method::List);

        let all = Operation::query(CacheKey::new(entity.as_str()));
        let list = Operation::query(list_key.clone());

        let detail = Operation::query(method_with_id(&entity, Method::Detail))
            .with_normalize(replace_in_list);

        let create = Operation::mutation(
            CacheKey::new(entity.as_str()).with_method(Method::Create),
        )
        .invalidating(Invalidates::fixed(list_key))
        .with_normalize(normalize_create);

        let update = Operation::mutation(method_with_id(&entity, Method::Update))
            .invalidating(item_and_list(&entity))
            .with_normalize(normalize_update);

        let remove = Operation::mutation(method_with_id(&entity, Method::Remove))
            .invalidating(item_and_list(&entity))
            .with_normalize(normalize_remove);

        debug!("Built CRUD query group for {}", entity);

        QueryGroup {
            entity,
            all,
            list,
            detail,
            create,
            update,
            remove,
            custom: BTreeMap::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Look up a built-in or custom operation.
    pub fn operation(&self, name: &str) -> Option<&Operation<T>> {
        match name {
            ALL => Some(&self.all),
            LIST => Some(&self.list),
            DETAIL => Some(&self.detail),
            CREATE => Some(&self.create),
            UPDATE => Some(&self.update),
            REMOVE => Some(&self.remove),
            other => self.custom.get(other),
        }
    }

    /// Override a built-in operation or add a custom one.
    pub fn with_operation(mut self, name: impl Into<String>, operation: Operation<T>) -> Self {
        let name = name.into();
        match name.as_str() {
            ALL => self.all = operation,
            LIST => self.list = operation,
            DETAIL => self.detail = operation,
            CREATE => self.create = operation,
            UPDATE => self.update = operation,
            REMOVE => self.remove = operation,
            _ => {
                self.custom.insert(name, operation);
            }
        }
        self
    }

    /// All operations: built-ins first, then custom ones by name.
    pub fn operations(&self) -> impl Iterator<Item = (&str, &Operation<T>)> {
        let builtins: [(&str, &Operation<T>); 6] = [
            (ALL, &self.all),
            (LIST, &self.list),
            (DETAIL, &self.detail),
            (CREATE, &self.create),
            (UPDATE, &self.update),
            (REMOVE, &self.remove),
        ];
        builtins
            .into_iter()
            .chain(self.custom.iter().map(|(name, op)| (name.as_str(), op)))
    }

    /// Run the named operation's normalizer against `client`.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownOperation`: `name` is not in the group
    /// - `Error::ValidationError`: `data` carries no usable `id`
    /// - any error from `client.set_entry`, unchanged
    pub fn normalize(&self, name: &str, client: &dyn QueryClient, data: &Value) -> Result<()> {
        let operation = self
            .operation(name)
            .ok_or_else(|| Error::UnknownOperation(format!("{}.{}", self.entity, name)))?;

        let ctx = NormalizeContext {
            client,
            entity: &self.entity,
            list: &self.list.query_key,
            detail: &self.detail.query_key,
        };
        operation.run_normalize(&ctx, data)
    }

    /// Rebuild the group with every operation mapped through `f`.
    pub(crate) fn map_operations<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Operation<T>) -> Operation<T>,
    {
        QueryGroup {
            entity: self.entity.clone(),
            all: f(&self.all),
            list: f(&self.list),
            detail: f(&self.detail),
            create: f(&self.create),
            update: f(&self.update),
            remove: f(&self.remove),
            custom: self
                .custom
                .iter()
                .map(|(name, op)| (name.clone(), f(op)))
                .collect(),
        }
    }
}

impl<T> Clone for QueryGroup<T> {
    fn clone(&self) -> Self {
        QueryGroup {
            entity: self.entity.clone(),
            all: self.all.clone(),
            list: self.list.clone(),
            detail: self.detail.clone(),
            create: self.create.clone(),
            update: self.update.clone(),
            remove: self.remove.clone(),
            custom: self.custom.clone(),
        }
    }
}

impl<T> std::fmt::Debug for QueryGroup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryGroup")
            .field("entity", &self.entity)
            .field("all", &self.all)
            .field("list", &self.list)
            .field("detail", &self.detail)
            .field("create", &self.create)
            .field("update", &self.update)
            .field("remove", &self.remove)
            .field("custom", &self.custom)
            .finish()
    }
}

fn method_with_id<T: KeyId>(entity: &str, method: Method) -> KeySource<T> {
    let entity = entity.to_string();
    KeySource::dynamic(move |id: &T| {
        CacheKey::new(entity.as_str())
            .with_method(method.clone())
            .with_id(id)
    })
}

fn item_and_list<T: KeyId>(entity: &str) -> Invalidates<T> {
    let entity = entity.to_string();
    Invalidates::dynamic(move |id: &T| {
        vec![
            CacheKey::new(entity.as_str()).with_id(id),
            CacheKey::new(entity.as_str()).with_method(Method::List),
        ]
    })
}

// ============================================================================
// Built-in normalizers
// ============================================================================

fn is_item(item: &Value, id: &Value) -> bool {
    item.get(ID_FIELD) == Some(id)
}

/// Apply `edit` to the cached list if it is an array; leave anything else alone.
fn edit_list<T: KeyId, F>(ctx: &NormalizeContext<'_, T>, id: &T, edit: F) -> Result<()>
where
    F: Fn(Vec<Value>) -> Vec<Value>,
{
    let list_key = ctx.list.resolve(id);
    ctx.client.set_entry(&list_key, &|current| match current {
        Some(Value::Array(items)) => Some(Value::Array(edit(items))),
        Some(other) => {
            warn!(
                "list cache for {} is not an array, leaving it untouched",
                ctx.entity
            );
            Some(other)
        }
        None => None,
    })
}

fn replace_in_list<T: KeyId>(ctx: &NormalizeContext<'_, T>, data: &Value) -> Result<()> {
    let (raw_id, id) = ctx.result_id(data)?;
    replace_item(ctx, &raw_id, &id, data)
}

fn replace_item<T: KeyId>(
    ctx: &NormalizeContext<'_, T>,
    raw_id: &Value,
    id: &T,
    data: &Value,
) -> Result<()> {
    edit_list(ctx, id, |items| {
        items
            .into_iter()
            .map(|item| {
                if is_item(&item, raw_id) {
                    data.clone()
                } else {
                    item
                }
            })
            .collect()
    })
}

fn normalize_create<T: KeyId>(ctx: &NormalizeContext<'_, T>, data: &Value) -> Result<()> {
    let (_, id) = ctx.result_id(data)?;

    let list_key = ctx.list.resolve(&id);
    ctx.client.set_entry(&list_key, &|current| match current {
        None => Some(Value::Array(vec![data.clone()])),
        Some(Value::Array(mut items)) => {
            items.push(data.clone());
            Some(Value::Array(items))
        }
        Some(other) => {
            warn!(
                "list cache for {} is not an array, leaving it untouched",
                ctx.entity
            );
            Some(other)
        }
    })?;

    ctx.client.set_data(&ctx.detail.resolve(&id), data.clone())
}

fn normalize_update<T: KeyId>(ctx: &NormalizeContext<'_, T>, data: &Value) -> Result<()> {
    let (raw_id, id) = ctx.result_id(data)?;
    replace_item(ctx, &raw_id, &id, data)?;
    ctx.client.set_data(&ctx.detail.resolve(&id), data.clone())
}

fn normalize_remove<T: KeyId>(ctx: &NormalizeContext<'_, T>, data: &Value) -> Result<()> {
    let (raw_id, id) = ctx.result_id(data)?;
    edit_list(ctx, &id, |items| {
        items
            .into_iter()
            .filter(|item| !is_item(item, &raw_id))
            .collect()
    })?;

    ctx.client.set_entry(&ctx.detail.resolve(&id), &|_| None)
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::client::InMemoryQueryClient;
    use serde_json::json;

    fn accounts() -> QueryGroup<String> {
        build_crud_group("accounts")
    }

    fn id(s: &str) -> String {
        s.to_string()
    }

    fn list_key() -> CacheKey {
        CacheKey::new("accounts").with_method(Method::List)
    }

    fn detail_key(s: &str) -> CacheKey {
        CacheKey::new("accounts")
            .with_method(Method::Detail)
            .with_id(&id(s))
    }

    #[test]
    fn test_static_keys() {
        let group = accounts();
        assert_eq!(group.entity(), "accounts");
        assert_eq!(
            group.all.query_key.as_static(),
            Some(&CacheKey::new("accounts"))
        );
        assert_eq!(group.list.query_key.as_static(), Some(&list_key()));
        assert_eq!(
            group.create.query_key.as_static(),
            Some(&CacheKey::new("accounts").with_method(Method::Create))
        );
    }

    #[test]
    fn test_dynamic_keys() {
        let group = accounts();
        let i = id("42");

        assert_eq!(group.detail.query_key.resolve(&i), detail_key("42"));
        assert_eq!(
            group.update.query_key.resolve(&i),
            CacheKey::new("accounts")
                .with_method(Method::Update)
                .with_id(&i)
        );
        assert_eq!(
            group.remove.query_key.resolve(&i),
            CacheKey::new("accounts")
                .with_method(Method::Remove)
                .with_id(&i)
        );
    }

    #[test]
    fn test_invalidation_sets() {
        let group = accounts();
        let i = id("7");
        let expected = vec![CacheKey::new("accounts").with_id(&i), list_key()];

        let update = group.update.invalidates.as_ref().expect("update invalidates");
        assert_eq!(update.resolve(&i), expected);

        let remove = group.remove.invalidates.as_ref().expect("remove invalidates");
        assert_eq!(remove.resolve(&i), expected);

        let create = group.create.invalidates.as_ref().expect("create invalidates");
        assert_eq!(create.as_static(), Some(&list_key()));

        assert!(group.all.invalidates.is_none());
        assert!(group.list.invalidates.is_none());
        assert!(group.detail.invalidates.is_none());
    }

    #[test]
    fn test_operation_kinds() {
        use crate::operation::OperationKind::{Mutation, Query};

        let group = accounts();
        let kinds: Vec<_> = group.operations().map(|(_, op)| op.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Some(Query),
                Some(Query),
                Some(Query),
                Some(Mutation),
                Some(Mutation),
                Some(Mutation)
            ]
        );
    }

    #[test]
    fn test_create_initializes_missing_list() {
        let client = InMemoryQueryClient::new();
        let group = accounts();
        let data = json!({"id": "x", "name": "Xavier"});

        group
            .normalize(CREATE, &client, &data)
            .expect("Failed to normalize");

        assert_eq!(client.get_entry(&list_key()), Some(json!([data.clone()])));
        assert_eq!(client.get_entry(&detail_key("x")), Some(data));
    }

    #[test]
    fn test_create_appends_to_existing_list() {
        let client = InMemoryQueryClient::new();
        let group = accounts();
        client
            .set_data(&list_key(), json!([{"id": "a"}]))
            .expect("Failed to set");

        group
            .normalize(CREATE, &client, &json!({"id": "x", "name": "Xavier"}))
            .expect("Failed to normalize");

        assert_eq!(
            client.get_entry(&list_key()),
            Some(json!([{"id": "a"}, {"id": "x", "name": "Xavier"}]))
        );
    }

    #[test]
    fn test_update_replaces_matching_item_only() {
        let client = InMemoryQueryClient::new();
        let group = accounts();
        client
            .set_data(&list_key(), json!([{"id": "a", "name": "old"}, {"id": "b"}]))
            .expect("Failed to set");

        let data = json!({"id": "a", "name": "new"});
        group
            .normalize(UPDATE, &client, &data)
            .expect("Failed to normalize");

        assert_eq!(
            client.get_entry(&list_key()),
            Some(json!([{"id": "a", "name": "new"}, {"id": "b"}]))
        );
        assert_eq!(client.get_entry(&detail_key("a")), Some(data));
    }

    #[test]
    fn test_update_without_list_does_not_fabricate_one() {
        let client = InMemoryQueryClient::new();
        let group = accounts();

        group
            .normalize(UPDATE, &client, &json!({"id": "a", "name": "new"}))
            .expect("Failed to normalize");

        assert_eq!(client.get_entry(&list_key()), None);
        assert!(client.get_entry(&detail_key("a")).is_some());
    }

    #[test]
    fn test_remove_filters_item_and_clears_detail() {
        let client = InMemoryQueryClient::new();
        let group = accounts();
        client
            .set_data(&list_key(), json!([{"id": "a"}, {"id": "b"}]))
            .expect("Failed to set");
        client
            .set_data(&detail_key("a"), json!({"id": "a"}))
            .expect("Failed to set");

        group
            .normalize(REMOVE, &client, &json!({"id": "a"}))
            .expect("Failed to normalize");

        assert_eq!(client.get_entry(&list_key()), Some(json!([{"id": "b"}])));
        assert_eq!(client.get_entry(&detail_key("a")), None);
    }

    #[test]
    fn test_detail_normalize_replaces_in_list() {
        let client = InMemoryQueryClient::new();
        let group = accounts();
        client
            .set_data(&list_key(), json!([{"id": "a", "v": 1}, {"id": "b", "v": 1}]))
            .expect("Failed to set");

        group
            .normalize(DETAIL, &client, &json!({"id": "b", "v": 2}))
            .expect("Failed to normalize");

        assert_eq!(
            client.get_entry(&list_key()),
            Some(json!([{"id": "a", "v": 1}, {"id": "b", "v": 2}]))
        );
        // detail normalize never writes the detail slot itself
        assert_eq!(client.get_entry(&detail_key("b")), None);
    }

    #[test]
    fn test_non_array_list_left_untouched() {
        let client = InMemoryQueryClient::new();
        let group = accounts();
        let paged = json!({"pages": [[{"id": "a"}]], "cursor": 1});
        client.set_data(&list_key(), paged.clone()).expect("Failed to set");

        group
            .normalize(CREATE, &client, &json!({"id": "x"}))
            .expect("Failed to normalize");
        group
            .normalize(REMOVE, &client, &json!({"id": "a"}))
            .expect("Failed to normalize");

        assert_eq!(client.get_entry(&list_key()), Some(paged));
    }

    #[test]
    fn test_result_without_id_is_rejected() {
        let client = InMemoryQueryClient::new();
        let group = accounts();

        let result = group.normalize(CREATE, &client, &json!({"name": "nameless"}));

        assert!(matches!(result, Err(Error::ValidationError(_))));
        assert!(client.is_empty());
    }

    #[test]
    fn test_update_with_mistyped_id_writes_nothing() {
        let client = InMemoryQueryClient::new();
        let group = accounts();
        let cached = json!([{"id": 7, "name": "old"}]);
        client.set_data(&list_key(), cached.clone()).expect("Failed to set");

        let result = group.normalize(UPDATE, &client, &json!({"id": 7, "name": "new"}));

        assert!(matches!(result, Err(Error::ValidationError(_))));
        assert_eq!(client.get_entry(&list_key()), Some(cached));
        assert_eq!(client.len(), 1);
    }

    #[test]
    fn test_numeric_ids_match_by_value() {
        let client = InMemoryQueryClient::new();
        let group: QueryGroup<u64> = build_crud_group("invoices");
        let list = CacheKey::new("invoices").with_method(Method::List);
        client
            .set_data(&list, json!([{"id": 1, "paid": false}, {"id": 2, "paid": false}]))
            .expect("Failed to set");

        group
            .normalize(UPDATE, &client, &json!({"id": 2, "paid": true}))
            .expect("Failed to normalize");

        assert_eq!(
            client.get_entry(&list),
            Some(json!([{"id": 1, "paid": false}, {"id": 2, "paid": true}]))
        );
    }

    #[test]
    fn test_unknown_operation() {
        let client = InMemoryQueryClient::new();
        let result = accounts().normalize("archive", &client, &json!({"id": "a"}));
        assert!(matches!(result, Err(Error::UnknownOperation(name)) if name == "accounts.archive"));
    }

    #[test]
    fn test_query_operations_normalize_as_noop() {
        let client = InMemoryQueryClient::new();
        accounts()
            .normalize(LIST, &client, &json!({"id": "a"}))
            .expect("noop");
        assert!(client.is_empty());
    }

    #[test]
    fn test_with_operation_adds_and_overrides() {
        let archive = Operation::mutation(
            CacheKey::new("accounts").with_method("archive"),
        );
        let custom_list = Operation::query(
            CacheKey::new("accounts")
                .with_method(Method::List)
                .with_field("archived", false),
        );

        let group = accounts()
            .with_operation("archive", archive)
            .with_operation(LIST, custom_list);

        assert!(group.operation("archive").is_some());
        assert_eq!(
            group
                .list
                .query_key
                .as_static()
                .and_then(|k| k.get("archived")),
            Some(&json!(false))
        );

        let names: Vec<_> = group.operations().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["all", "list", "detail", "create", "update", "remove", "archive"]
        );
    }

    #[test]
    fn test_overridden_list_is_used_by_normalizers() {
        let client = InMemoryQueryClient::new();
        let scoped_list = CacheKey::new("accounts")
            .with_method(Method::List)
            .with_field("scope", "mine");
        let group = accounts().with_operation(LIST, Operation::query(scoped_list.clone()));

        group
            .normalize(CREATE, &client, &json!({"id": "x"}))
            .expect("Failed to normalize");

        assert_eq!(client.get_entry(&scoped_list), Some(json!([{"id": "x"}])));
        assert_eq!(client.get_entry(&list_key()), None);
    }

    #[test]
    fn test_group_is_send_and_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<QueryGroup<String>>();
    }
}
