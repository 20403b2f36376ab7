//! Structured cache keys.
//!
//! A [`CacheKey`] is an open mapping. It always names an `entity` and may carry a
//! `method`, an `id` and any number of caller-injected fields (`auth`, `tenantId`, ...).
//! Two keys address the same cache slot iff all their fields are equal.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Field holding the resource collection name.
pub const ENTITY_FIELD: &str = "entity";
/// Field holding the operation method.
pub const METHOD_FIELD: &str = "method";
/// Field holding the resource identifier.
pub const ID_FIELD: &str = "id";

/// Method tag stored in a key's `method` field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    List,
    Detail,
    Create,
    Update,
    Remove,
    /// Application-defined operation (e.g. `"archive"`).
    Custom(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::List => "list",
            Method::Detail => "detail",
            Method::Create => "create",
            Method::Update => "update",
            Method::Remove => "remove",
            Method::Custom(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Method::from(s))
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s {
            "list" => Method::List,
            "detail" => Method::Detail,
            "create" => Method::Create,
            "update" => Method::Update,
            "remove" => Method::Remove,
            other => Method::Custom(other.to_string()),
        }
    }
}

/// Identifier types usable as key arguments.
///
/// Blanket-implemented for every serde round-trippable type, so `String`, integers,
/// `uuid::Uuid` and tuples all work. `()` stands for "no argument".
///
/// Identifiers must serialize to JSON. A value that does not (for example a map
/// with non-string keys) is stored as `null` and logged at `warn`, so every such
/// value addresses the same `{.., "id": null}` slot.
pub trait KeyId: Clone + Send + Sync + 'static {
    /// Convert into the JSON value stored in a key's `id` field.
    fn to_key_value(&self) -> Value;

    /// Decode from a JSON value, typically a mutation result's `id`.
    fn from_key_value(value: &Value) -> Option<Self>;
}

impl<T> KeyId for T
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn to_key_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            warn!("identifier could not be serialized into a key: {}", e);
            Value::Null
        })
    }

    fn from_key_value(value: &Value) -> Option<Self> {
        T::deserialize(value).ok()
    }
}

/// Structured cache key.
///
/// Fields are kept in sorted order, so [`Display`](fmt::Display) renders a canonical
/// compact JSON string that engines can use as a slot identifier.
///
/// # Example
///
/// ```
/// use query_key_kit::key::{CacheKey, Method};
///
/// let key = CacheKey::new("accounts")
///     .with_method(Method::Detail)
///     .with_id(&"42".to_string());
/// assert_eq!(key.entity(), Some("accounts"));
/// assert_eq!(key.method(), Some(Method::Detail));
/// assert_eq!(key.to_string(), r#"{"entity":"accounts","id":"42","method":"detail"}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey {
    fields: Map<String, Value>,
}

impl CacheKey {
    /// Key naming a whole resource collection: `{entity}`.
    pub fn new(entity: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ENTITY_FIELD.to_string(), Value::String(entity.into()));
        CacheKey { fields }
    }

    /// Build a key from raw fields. No field is required.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        CacheKey { fields }
    }

    pub fn with_method(self, method: impl Into<Method>) -> Self {
        let method = method.into();
        self.with_field(METHOD_FIELD, method.as_str())
    }

    pub fn with_id<T: KeyId>(self, id: &T) -> Self {
        self.with_field(ID_FIELD, id.to_key_value())
    }

    /// Set an arbitrary field, replacing any previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn entity(&self) -> Option<&str> {
        self.fields.get(ENTITY_FIELD).and_then(Value::as_str)
    }

    pub fn method(&self) -> Option<Method> {
        self.fields
            .get(METHOD_FIELD)
            .and_then(Value::as_str)
            .map(Method::from)
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Return a new key with `extra` merged on top. Extra fields win on conflict.
    pub fn merged(&self, extra: &ExtraFields) -> Self {
        let mut fields = self.fields.clone();
        for (name, value) in extra.iter() {
            fields.insert(name.clone(), value.clone());
        }
        CacheKey { fields }
    }

    /// Partial match: every field of `filter` is present here with an equal value.
    ///
    /// `{entity:"a"}` matches `{entity:"a", method:"list", auth:true}`, not the reverse.
    pub fn matches(&self, filter: &CacheKey) -> bool {
        filter
            .fields
            .iter()
            .all(|(name, value)| self.fields.get(name) == Some(value))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Map<String, Value> always serializes.
        match serde_json::to_string(&self.fields) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<Map<String, Value>> for CacheKey {
    fn from(fields: Map<String, Value>) -> Self {
        CacheKey { fields }
    }
}

/// Fixed set of fields stamped onto keys by injection.
///
/// # Example
///
/// ```
/// use query_key_kit::key::ExtraFields;
///
/// let extra = ExtraFields::new().with("auth", true).with("tenantId", "t-1");
/// assert_eq!(extra.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraFields {
    fields: Map<String, Value>,
}

impl ExtraFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for ExtraFields {
    fn from(fields: Map<String, Value>) -> Self {
        ExtraFields { fields }
    }
}

impl TryFrom<Value> for ExtraFields {
    type Error = crate::error::Error;

    fn try_from(value: Value) -> crate::error::Result<Self> {
        match value {
            Value::Object(fields) => Ok(ExtraFields { fields }),
            other => Err(crate::error::Error::ValidationError(format!(
                "extra fields must be an object, got {}",
                other
            ))),
        }
    }
}
