//! Extensions on [`serde_json_bytes::Value`] used across the crate.

use serde_json_bytes::ByteString;
use serde_json_bytes::Entry;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object: response data, variable maps, argument objects.
pub type Object = Map<ByteString, Value>;

pub trait ValueExt {
    /// Deep-merge `other` into `self`.
    ///
    /// Objects merge key by key, arrays merge element-wise by index with
    /// excess elements from `other` appended, anything else is replaced by
    /// `other`.
    fn deep_merge(&mut self, other: Value);
}

impl ValueExt for Value {
    fn deep_merge(&mut self, other: Value) {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                for (key, value) in b {
                    match a.entry(key) {
                        Entry::Vacant(entry) => {
                            entry.insert(value);
                        }
                        Entry::Occupied(entry) => {
                            entry.into_mut().deep_merge(value);
                        }
                    }
                }
            }
            (Value::Array(a), Value::Array(b)) => {
                let mut b = b.into_iter();
                for value in a.iter_mut() {
                    match b.next() {
                        Some(other) => value.deep_merge(other),
                        None => break,
                    }
                }
                a.extend(b);
            }
            (a, b) => {
                *a = b;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn merge_objects_recursively() {
        let mut a = json!({"author": {"firstName": "Sashko"}});
        a.deep_merge(json!({"author": {"lastName": "Stubailo"}, "extra": 1}));
        assert_eq!(
            a,
            json!({"author": {"firstName": "Sashko", "lastName": "Stubailo"}, "extra": 1})
        );
    }

    #[test]
    fn merge_arrays_element_wise() {
        let mut a = json!([{"title": "Welcome"}, {"title": "Advanced"}]);
        a.deep_merge(json!([{"votes": 1}, {"votes": 2}, {"title": "New"}]));
        assert_eq!(
            a,
            json!([
                {"title": "Welcome", "votes": 1},
                {"title": "Advanced", "votes": 2},
                {"title": "New"},
            ])
        );
    }

    #[test]
    fn scalars_are_replaced() {
        let mut a = json!({"votes": 1});
        a.deep_merge(json!({"votes": 2}));
        assert_eq!(a, json!({"votes": 2}));
    }
}
