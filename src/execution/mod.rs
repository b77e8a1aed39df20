//! The selection-tree executor.
//!
//! Walks an operation's selection tree against the cache snapshot, resolving
//! every field through a [`FieldResolver`], collecting whatever data the
//! cache already holds, and marking which selections must survive into the
//! rewritten query. Execution is synchronous and purely in-memory: no I/O,
//! no suspension points, and the caller's document is never mutated.

mod arguments;
mod directives;
mod rewrite;

use apollo_compiler::ast;

use self::arguments::argument_object;
use self::directives::IncludeSkip;
use self::directives::has_opaque_directives;
use self::rewrite::RetainNode;
use crate::error::DedupError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::resolver::FieldResolver;
use crate::resolver::ResolutionContext;
use crate::store::EntityRef;
use crate::store::StoreValue;

/// What one execution produced.
pub struct ExecutionResult {
    /// Cache-known data, mirroring the query shape.
    pub data: Object,
    /// True iff every field resolved to a defined value with no unresolved
    /// sub-fields anywhere beneath it.
    pub all_resolved: bool,
    /// The rewritten query: the original document with fully resolved fields
    /// pruned. Only meaningful when `all_resolved` is false.
    pub document: ast::Document,
}

struct ExecutionParameters<'a> {
    resolver: &'a dyn FieldResolver,
    variables: &'a Object,
    context: &'a ResolutionContext<'a>,
}

/// Executes `document`'s main operation against cached data.
///
/// The main operation is the first operation definition, matching what the
/// surrounding dispatch layer forwards. The input document is left
/// untouched; the pruned counterpart comes back in the result.
pub fn execute_query(
    resolver: &dyn FieldResolver,
    document: &ast::Document,
    variables: &Object,
    root: &EntityRef,
    context: &ResolutionContext<'_>,
) -> Result<ExecutionResult, DedupError> {
    let (operation_index, operation) = document
        .definitions
        .iter()
        .enumerate()
        .find_map(|(index, definition)| match definition {
            ast::Definition::OperationDefinition(operation) => Some((index, operation)),
            _ => None,
        })
        .ok_or(DedupError::MissingOperation)?;

    let parameters = ExecutionParameters {
        resolver,
        variables,
        context,
    };

    let mut retain = rewrite::retain_tree(&operation.selection_set);
    let (data, all_resolved) =
        execute_selection_set(&operation.selection_set, &mut retain, root, &parameters);

    tracing::trace!(
        all_resolved,
        fields_resolved = data.len(),
        "executed query against cache snapshot"
    );

    let document = rewrite::rewrite_document(document, operation_index, operation, &retain);

    Ok(ExecutionResult {
        data,
        all_resolved,
        document,
    })
}

/// Walks one selection set level against `current`.
///
/// Returns the data this invocation could resolve and the explicitly
/// threaded completeness flag: true iff nothing at this level (or below it)
/// had to be retained.
fn execute_selection_set(
    selections: &[ast::Selection],
    retain: &mut [RetainNode],
    current: &EntityRef,
    parameters: &ExecutionParameters<'_>,
) -> (Object, bool) {
    let mut data = Object::new();
    let mut all_resolved = true;

    for (selection, retain) in selections.iter().zip(retain.iter_mut()) {
        let field = match selection {
            ast::Selection::Field(field) => field,
            // Fragment spreads and inline fragments are opaque to this
            // engine: they survive pruning verbatim and contribute no data.
            ast::Selection::FragmentSpread(_) | ast::Selection::InlineFragment(_) => {
                retain.keep_verbatim();
                all_resolved = false;
                continue;
            }
        };

        if IncludeSkip::parse(&field.directives).should_skip(parameters.variables)
            || has_opaque_directives(&field.directives)
        {
            retain.keep_verbatim();
            all_resolved = false;
            continue;
        }

        let (field_data, field_resolved) = execute_field(field, retain, current, parameters);
        if !field_resolved {
            retain.keep = true;
            all_resolved = false;
        }

        if let Some(value) = field_data {
            let response_key = field.response_key();
            match data.get_mut(response_key) {
                // The same response key can show up twice, e.g. through
                // aliasing; merge instead of overwriting.
                Some(existing) => existing.deep_merge(value),
                None => {
                    data.insert(response_key, value);
                }
            }
        }
    }

    (data, all_resolved)
}

fn execute_field(
    field: &ast::Field,
    retain: &mut RetainNode,
    current: &EntityRef,
    parameters: &ExecutionParameters<'_>,
) -> (Option<Value>, bool) {
    let args = argument_object(&field.arguments, parameters.variables);
    let resolved = parameters.resolver.resolve(
        field.name.as_str(),
        current,
        args.as_ref(),
        parameters.context,
    );

    let Some(value) = resolved else {
        // Cache miss: nothing beneath this field was visited, so the whole
        // subtree must go downstream unchanged.
        retain.verbatim = true;
        return (None, false);
    };

    if field.selection_set.is_empty() {
        // Scalar leaf. Any defined value counts, an explicit null included:
        // null is valid GraphQL data, not a miss.
        return (Some(value.to_json()), true);
    }

    match value {
        StoreValue::List(items) => execute_array(field, retain, &items, parameters),
        StoreValue::Reference(entity) => {
            let (data, all_resolved) = execute_selection_set(
                &field.selection_set,
                &mut retain.children,
                &entity,
                parameters,
            );
            (Some(Value::Object(data)), all_resolved)
        }
        // A scalar where the query expects an object: degrade to a miss
        // rather than erroring.
        StoreValue::Scalar(_) | StoreValue::Json(_) => {
            retain.verbatim = true;
            (None, false)
        }
    }
}

/// Walks an array-valued field element by element.
///
/// Every element executes against the same retain nodes, so a sub-field is
/// pruned from the rewritten query only once all elements resolved it;
/// each element's data is still collected independently.
fn execute_array(
    field: &ast::Field,
    retain: &mut RetainNode,
    items: &[StoreValue],
    parameters: &ExecutionParameters<'_>,
) -> (Option<Value>, bool) {
    let mut data = Vec::with_capacity(items.len());
    let mut all_resolved = true;

    for item in items {
        match item {
            // Nulls pass through in place and leave pruning untouched.
            StoreValue::Scalar(Value::Null) => data.push(Value::Null),
            StoreValue::List(nested) => {
                let (value, resolved) = execute_array(field, retain, nested, parameters);
                data.push(value.unwrap_or(Value::Null));
                all_resolved &= resolved;
            }
            StoreValue::Reference(entity) => {
                let (value, resolved) = execute_selection_set(
                    &field.selection_set,
                    &mut retain.children,
                    entity,
                    parameters,
                );
                data.push(Value::Object(value));
                all_resolved &= resolved;
            }
            StoreValue::Scalar(_) | StoreValue::Json(_) => {
                // Malformed element for a sub-selected field; treat the
                // whole subtree as missed.
                retain.verbatim = true;
                data.push(Value::Null);
                all_resolved = false;
            }
        }
    }

    (Some(Value::Array(data)), all_resolved)
}

trait FieldExt {
    /// The key this field's data lands under: the alias when present, the
    /// field name otherwise.
    fn response_key(&self) -> &str;
}

impl FieldExt for ast::Field {
    fn response_key(&self) -> &str {
        self.alias
            .as_ref()
            .map(|alias| alias.as_str())
            .unwrap_or_else(|| self.name.as_str())
    }
}
