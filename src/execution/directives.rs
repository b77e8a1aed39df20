//! `@skip` / `@include` evaluation against the operation's variables.

use apollo_compiler::ast;

use crate::json_ext::Object;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IncludeSkip {
    include: Condition,
    skip: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Condition {
    Yes,
    No,
    Variable(String),
}

impl IncludeSkip {
    pub(crate) fn parse(directives: &ast::DirectiveList) -> Self {
        let mut include = None;
        let mut skip = None;
        for directive in &directives.0 {
            if include.is_none() && directive.name == "include" {
                include = Condition::parse(directive)
            }
            if skip.is_none() && directive.name == "skip" {
                skip = Condition::parse(directive)
            }
        }
        Self {
            include: include.unwrap_or(Condition::Yes),
            skip: skip.unwrap_or(Condition::No),
        }
    }

    /// Whether the selection is excluded from execution for this request.
    ///
    /// Using .unwrap_or is legit here because upstream validation has
    /// already checked that the variable is present and of the correct type.
    pub(crate) fn should_skip(&self, variables: &Object) -> bool {
        self.skip.eval(variables).unwrap_or(false) || !self.include.eval(variables).unwrap_or(true)
    }
}

impl Condition {
    fn parse(directive: &ast::Directive) -> Option<Self> {
        match directive.specified_argument_by_name("if")?.as_ref() {
            ast::Value::Boolean(true) => Some(Condition::Yes),
            ast::Value::Boolean(false) => Some(Condition::No),
            ast::Value::Variable(variable) => Some(Condition::Variable(variable.as_str().to_owned())),
            _ => None,
        }
    }

    fn eval(&self, variables: &Object) -> Option<bool> {
        match self {
            Condition::Yes => Some(true),
            Condition::No => Some(false),
            Condition::Variable(variable_name) => variables
                .get(variable_name.as_str())
                .and_then(|v| v.as_bool()),
        }
    }
}

/// Whether the field carries directives this engine does not understand.
///
/// Such fields are opaque: they stay in the rewritten query untouched and
/// are never served from the cache.
pub(crate) fn has_opaque_directives(directives: &ast::DirectiveList) -> bool {
    directives
        .0
        .iter()
        .any(|directive| directive.name != "skip" && directive.name != "include")
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    fn field_directives(query: &str) -> ast::DirectiveList {
        let document = ast::Document::parse(query, "test.graphql").expect("query parses");
        let Some(ast::Definition::OperationDefinition(operation)) = document.definitions.first()
        else {
            panic!("expected an operation");
        };
        let Some(ast::Selection::Field(field)) = operation.selection_set.first() else {
            panic!("expected a field");
        };
        field.directives.clone()
    }

    fn variables(value: serde_json_bytes::Value) -> Object {
        match value {
            serde_json_bytes::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn static_skip_and_include() {
        let empty = variables(json!({}));
        assert!(IncludeSkip::parse(&field_directives("{ a @skip(if: true) }")).should_skip(&empty));
        assert!(!IncludeSkip::parse(&field_directives("{ a @skip(if: false) }")).should_skip(&empty));
        assert!(IncludeSkip::parse(&field_directives("{ a @include(if: false) }")).should_skip(&empty));
        assert!(!IncludeSkip::parse(&field_directives("{ a }")).should_skip(&empty));
    }

    #[test]
    fn variable_conditions() {
        let directives = field_directives("query($yes: Boolean!) { a @include(if: $yes) }");
        let include_skip = IncludeSkip::parse(&directives);
        assert!(!include_skip.should_skip(&variables(json!({"yes": true}))));
        assert!(include_skip.should_skip(&variables(json!({"yes": false}))));
    }

    #[test]
    fn unknown_directives_are_opaque() {
        assert!(has_opaque_directives(&field_directives("{ a @live }")));
        assert!(!has_opaque_directives(&field_directives(
            "{ a @skip(if: false) @include(if: true) }"
        )));
        assert!(!has_opaque_directives(&field_directives("{ a }")));
    }
}
