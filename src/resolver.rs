//! Field resolution against the cache snapshot.
//!
//! The executor is generic over a [`FieldResolver`]; [`CacheResolver`] is the
//! store-backed implementation. "Missing" is always expressed as `None`,
//! never as an error.

use std::collections::HashMap;

use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::store::CacheSnapshot;
use crate::store::EntityRef;
use crate::store::StoreObject;
use crate::store::StoreValue;

/// Resolves one query field against cached data.
///
/// `parent` is either a reference marker for the entity being selected or
/// the synthetic root marker; `args` is the field's argument object with
/// variables already substituted.
pub trait FieldResolver {
    fn resolve(
        &self,
        field_name: &str,
        parent: &EntityRef,
        args: Option<&Object>,
        ctx: &ResolutionContext<'_>,
    ) -> Option<StoreValue>;
}

/// A resolver registered for a single typename + field name pair, invoked
/// when the direct store lookup misses. Whatever it returns substitutes for
/// the missing field.
pub type RedirectFn =
    Box<dyn Fn(&StoreObject, Option<&Object>, &RedirectContext<'_>) -> Option<StoreValue> + Send + Sync>;

/// Derives a store identifier from a raw cached object, the way the external
/// cache did when it normalized the data.
pub type DataIdFn = dyn Fn(&StoreObject) -> Option<String> + Send + Sync;

/// Cache-redirect resolvers keyed by typename, then field name.
#[derive(Default)]
pub struct CacheRedirects {
    by_type: HashMap<String, HashMap<String, RedirectFn>>,
}

impl CacheRedirects {
    pub fn insert(
        &mut self,
        typename: impl Into<String>,
        field_name: impl Into<String>,
        resolver: RedirectFn,
    ) {
        self.by_type
            .entry(typename.into())
            .or_default()
            .insert(field_name.into(), resolver);
    }

    fn get(&self, typename: &str, field_name: &str) -> Option<&RedirectFn> {
        self.by_type.get(typename)?.get(field_name)
    }
}

/// Everything a resolver may consult: the snapshot plus the optional
/// redirect machinery.
///
/// Defaults: no redirects, and [`default_data_id`] for identifier
/// derivation.
pub struct ResolutionContext<'a> {
    store: &'a CacheSnapshot,
    redirects: Option<&'a CacheRedirects>,
    data_id: &'a DataIdFn,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(store: &'a CacheSnapshot) -> Self {
        ResolutionContext {
            store,
            redirects: None,
            data_id: &default_data_id,
        }
    }

    pub fn with_redirects(mut self, redirects: &'a CacheRedirects) -> Self {
        self.redirects = Some(redirects);
        self
    }

    pub fn with_data_id(mut self, data_id: &'a DataIdFn) -> Self {
        self.data_id = data_id;
        self
    }

    pub fn store(&self) -> &'a CacheSnapshot {
        self.store
    }
}

/// Helper handed to redirect resolvers so they can turn raw cached objects
/// back into reference markers.
pub struct RedirectContext<'a> {
    data_id: &'a DataIdFn,
}

impl RedirectContext<'_> {
    pub fn cache_key(&self, object: &StoreObject) -> Option<StoreValue> {
        let id = (self.data_id)(object)?;
        Some(StoreValue::Reference(EntityRef::new(
            id,
            object.typename().map(str::to_owned),
        )))
    }
}

/// The normalized-cache identifier rule: `Typename:id`, falling back to
/// `Typename:_id`.
pub fn default_data_id(object: &StoreObject) -> Option<String> {
    let typename = object.typename()?;
    let id = ["id", "_id"].iter().find_map(|key| match object.field(key) {
        Some(StoreValue::Scalar(value)) => scalar_id(value),
        _ => None,
    })?;
    Some(format!("{typename}:{id}"))
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.as_str().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The store-backed resolver.
pub struct CacheResolver;

impl FieldResolver for CacheResolver {
    fn resolve(
        &self,
        field_name: &str,
        parent: &EntityRef,
        args: Option<&Object>,
        ctx: &ResolutionContext<'_>,
    ) -> Option<StoreValue> {
        let object = ctx.store.get(&parent.id)?;

        let value = match args {
            Some(args) => object.field(&storage_key(field_name, args)),
            None => object.field(field_name),
        };

        let value = match value {
            Some(value) => Some(value.clone()),
            None => redirect(object, field_name, parent, args, ctx),
        };

        // JSON-wrapped scalars escape out of their envelope here, so the
        // executor only ever sees scalars, lists and references.
        match value {
            Some(StoreValue::Json(wrapped)) => Some(StoreValue::Scalar(wrapped.json)),
            other => other,
        }
    }
}

fn redirect(
    object: &StoreObject,
    field_name: &str,
    parent: &EntityRef,
    args: Option<&Object>,
    ctx: &ResolutionContext<'_>,
) -> Option<StoreValue> {
    let redirects = ctx.redirects?;
    let typename = match object.typename() {
        Some(typename) => typename,
        None if parent.is_root() => "Query",
        None => return None,
    };
    let resolver = redirects.get(typename, field_name)?;
    resolver(object, args, &RedirectContext { data_id: ctx.data_id })
}

/// The key a field's value is stored under.
///
/// Without arguments the key is the bare field name; with arguments it is
/// `name({…})` where the argument object is rendered as canonical JSON with
/// recursively sorted keys, so every call site derives the same key.
pub fn storage_key(field_name: &str, args: &Object) -> String {
    let mut key = String::with_capacity(field_name.len() + 2);
    key.push_str(field_name);
    key.push('(');
    write_canonical(&mut key, args.iter().map(|(k, v)| (k.as_str(), v)));
    key.push(')');
    key
}

fn write_canonical<'a>(out: &mut String, fields: impl Iterator<Item = (&'a str, &'a Value)>) {
    let mut entries: Vec<_> = fields.collect();
    entries.sort_unstable_by_key(|(key, _)| *key);

    out.push('{');
    for (index, (key, value)) in entries.into_iter().enumerate() {
        if index != 0 {
            out.push(',');
        }
        write_canonical_value(out, &Value::String(key.into()));
        out.push(':');
        write_canonical_value(out, value);
    }
    out.push('}');
}

fn write_canonical_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            write_canonical(out, map.iter().map(|(k, v)| (k.as_str(), v)));
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index != 0 {
                    out.push(',');
                }
                write_canonical_value(out, item);
            }
            out.push(']');
        }
        scalar => {
            // Null, booleans, numbers and strings; qed
            let rendered =
                serde_json::to_string(scalar).expect("a JSON scalar always serializes; qed");
            out.push_str(&rendered);
        }
    }
}
