//! Field argument construction.
//!
//! Variable references are substituted exactly once, from the flat variables
//! map supplied for the whole operation; there is no per-field scoping.

use apollo_compiler::Node;
use apollo_compiler::ast;

use crate::json_ext::Object;
use crate::json_ext::Value;

/// Builds the argument object for a field, or `None` for fields without
/// arguments. A field with arguments always yields an object, even when
/// every value substitutes to `null`.
pub(crate) fn argument_object(
    arguments: &[Node<ast::Argument>],
    variables: &Object,
) -> Option<Object> {
    if arguments.is_empty() {
        return None;
    }
    let mut object = Object::new();
    for argument in arguments {
        object.insert(
            argument.name.as_str(),
            ast_value_to_json(&argument.value, variables),
        );
    }
    Some(object)
}

fn ast_value_to_json(value: &ast::Value, variables: &Object) -> Value {
    match value {
        ast::Value::Null => Value::Null,
        ast::Value::Boolean(b) => Value::Bool(*b),
        ast::Value::Enum(name) => Value::String(name.as_str().into()),
        ast::Value::String(s) => Value::String(s.as_str().into()),
        ast::Value::Variable(name) => variables
            .get(name.as_str())
            .cloned()
            .unwrap_or(Value::Null),
        ast::Value::Int(i) => match i.try_to_i32() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => float_value(i.try_to_f64().ok()),
        },
        ast::Value::Float(f) => float_value(f.try_to_f64().ok()),
        ast::Value::List(items) => Value::Array(
            items
                .iter()
                .map(|item| ast_value_to_json(item, variables))
                .collect(),
        ),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.as_str().into(), ast_value_to_json(value, variables)))
                .collect(),
        ),
    }
}

fn float_value(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
