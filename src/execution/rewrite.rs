//! Rebuilding the outgoing query from retain marks.
//!
//! Execution never mutates the caller's document. It marks an index-aligned
//! tree of [`RetainNode`]s while walking, and [`rewrite_document`] then
//! materializes a brand-new pruned document. Because array elements share
//! the retain nodes of their field, a sub-field survives in the rewritten
//! query as soon as a single element failed to resolve it.

use apollo_compiler::Node;
use apollo_compiler::ast;

/// Per-selection retain state, index-aligned with the original selection
/// list it was built from.
#[derive(Debug)]
pub(crate) struct RetainNode {
    /// The selection stays in the rewritten query.
    pub(crate) keep: bool,
    /// The selection is copied over verbatim, sub-selections included:
    /// set for non-field selections, skipped or opaque fields, and total
    /// misses.
    pub(crate) verbatim: bool,
    /// Retain state for the field's sub-selections.
    pub(crate) children: Vec<RetainNode>,
}

impl RetainNode {
    pub(crate) fn keep_verbatim(&mut self) {
        self.keep = true;
        self.verbatim = true;
    }
}

/// Builds the retain tree mirroring a selection list, everything initially
/// prunable.
pub(crate) fn retain_tree(selections: &[ast::Selection]) -> Vec<RetainNode> {
    selections
        .iter()
        .map(|selection| RetainNode {
            keep: false,
            verbatim: false,
            children: match selection {
                ast::Selection::Field(field) => retain_tree(&field.selection_set),
                // Non-field selections are only ever copied verbatim.
                ast::Selection::FragmentSpread(_) | ast::Selection::InlineFragment(_) => vec![],
            },
        })
        .collect()
}

/// Produces the rewritten document: the executed operation with resolved
/// fields pruned and unused variable definitions dropped, every other
/// definition carried over verbatim.
pub(crate) fn rewrite_document(
    document: &ast::Document,
    operation_index: usize,
    operation: &ast::OperationDefinition,
    retain: &[RetainNode],
) -> ast::Document {
    let mut pruned = operation.clone();
    pruned.selection_set = rebuild_selections(&operation.selection_set, retain);

    let mut rewritten = ast::Document::new();
    for (index, definition) in document.definitions.iter().enumerate() {
        if index == operation_index {
            rewritten
                .definitions
                .push(ast::Definition::OperationDefinition(Node::new(
                    pruned.clone(),
                )));
        } else {
            rewritten.definitions.push(definition.clone());
        }
    }

    prune_variable_definitions(&mut rewritten, operation_index);
    rewritten
}

fn rebuild_selections(
    selections: &[ast::Selection],
    retain: &[RetainNode],
) -> Vec<ast::Selection> {
    selections
        .iter()
        .zip(retain)
        .filter(|(_, retain)| retain.keep)
        .map(|(selection, retain)| {
            if retain.verbatim {
                return selection.clone();
            }
            match selection {
                ast::Selection::Field(field) => {
                    let mut field = field.as_ref().clone();
                    field.selection_set = rebuild_selections(&field.selection_set, &retain.children);
                    ast::Selection::Field(Node::new(field))
                }
                // Unreachable in practice: non-field selections are always
                // marked verbatim.
                other => other.clone(),
            }
        })
        .collect()
}

/// Drops variable definitions no longer referenced anywhere in the
/// rewritten document, so the pruned query stays valid under standard
/// validation.
fn prune_variable_definitions(document: &mut ast::Document, operation_index: usize) {
    let mut used = Vec::new();
    for definition in &document.definitions {
        match definition {
            ast::Definition::OperationDefinition(operation) => {
                collect_from_directives(&operation.directives, &mut used);
                collect_from_selections(&operation.selection_set, &mut used);
            }
            ast::Definition::FragmentDefinition(fragment) => {
                collect_from_directives(&fragment.directives, &mut used);
                collect_from_selections(&fragment.selection_set, &mut used);
            }
            _ => {}
        }
    }

    let Some(ast::Definition::OperationDefinition(operation)) =
        document.definitions.get_mut(operation_index)
    else {
        return;
    };
    let operation = operation.make_mut();
    operation
        .variables
        .retain(|variable| used.iter().any(|name| name == variable.name.as_str()));
}

fn collect_from_selections(selections: &[ast::Selection], used: &mut Vec<String>) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => {
                for argument in &field.arguments {
                    collect_from_value(&argument.value, used);
                }
                collect_from_directives(&field.directives, used);
                collect_from_selections(&field.selection_set, used);
            }
            ast::Selection::FragmentSpread(spread) => {
                collect_from_directives(&spread.directives, used);
            }
            ast::Selection::InlineFragment(fragment) => {
                collect_from_directives(&fragment.directives, used);
                collect_from_selections(&fragment.selection_set, used);
            }
        }
    }
}

fn collect_from_directives(directives: &ast::DirectiveList, used: &mut Vec<String>) {
    for directive in &directives.0 {
        for argument in &directive.arguments {
            collect_from_value(&argument.value, used);
        }
    }
}

fn collect_from_value(value: &ast::Value, used: &mut Vec<String>) {
    match value {
        ast::Value::Variable(name) => used.push(name.as_str().to_owned()),
        ast::Value::List(items) => {
            for item in items {
                collect_from_value(item, used);
            }
        }
        ast::Value::Object(fields) => {
            for (_, value) in fields {
                collect_from_value(value, used);
            }
        }
        _ => {}
    }
}
