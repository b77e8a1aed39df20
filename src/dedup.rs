//! The dispatch-facing surface.
//!
//! The surrounding pipeline hands an operation descriptor plus a cache
//! snapshot in, and gets back a classification: everything answered from
//! cache, a pruned query to forward downstream, or a bypass. Reassembly of
//! a downstream response with cache-known data goes through
//! [`merge_downstream`].

use apollo_compiler::ast;

use crate::error::DedupError;
use crate::execution::execute_query;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::resolver::CacheRedirects;
use crate::resolver::CacheResolver;
use crate::resolver::ResolutionContext;
use crate::store::CacheSnapshot;
use crate::store::EntityRef;

/// One operation as the pipeline sees it: a parsed document, its variables,
/// and the per-call override asking to skip deduplication entirely.
pub struct DedupRequest<'a> {
    pub document: &'a ast::Document,
    pub variables: &'a Object,
    pub force_fetch: bool,
}

/// Outcome of running an operation through the engine.
#[derive(Debug)]
pub enum DedupOutcome {
    /// Every field was served from cache; no downstream request is needed.
    CompleteHit { data: Object },
    /// Some fields missed. Forward `document` downstream, then
    /// [`merge_downstream`] its response into `data`.
    PartialHit {
        data: Object,
        document: ast::Document,
    },
    /// The operation is not eligible: a forced fetch, or not a query.
    Bypass,
}

/// Runs one operation against a snapshot of the cache.
///
/// Only query operations are eligible; mutations and subscriptions always
/// bypass, as does any request carrying the force-fetch override.
pub fn dedup_operation(
    request: &DedupRequest<'_>,
    snapshot: &CacheSnapshot,
    redirects: Option<&CacheRedirects>,
) -> Result<DedupOutcome, DedupError> {
    if request.force_fetch || !is_query_operation(request.document)? {
        tracing::debug!("operation bypasses deduplication");
        return Ok(DedupOutcome::Bypass);
    }

    let mut context = ResolutionContext::new(snapshot);
    if let Some(redirects) = redirects {
        context = context.with_redirects(redirects);
    }

    let result = execute_query(
        &CacheResolver,
        request.document,
        request.variables,
        &EntityRef::query_root(),
        &context,
    )?;

    if result.all_resolved {
        tracing::debug!("operation served entirely from cache");
        Ok(DedupOutcome::CompleteHit { data: result.data })
    } else {
        tracing::debug!(
            cached_fields = result.data.len(),
            "operation partially served from cache"
        );
        Ok(DedupOutcome::PartialHit {
            data: result.data,
            document: result.document,
        })
    }
}

/// Deep-merges a downstream response payload into cache-known data.
pub fn merge_downstream(cache_data: Object, downstream_data: Object) -> Object {
    let mut merged = Value::Object(cache_data);
    merged.deep_merge(Value::Object(downstream_data));
    match merged {
        Value::Object(object) => object,
        // deep_merge of two objects always yields an object; qed
        _ => Object::new(),
    }
}

fn is_query_operation(document: &ast::Document) -> Result<bool, DedupError> {
    let operation = document
        .definitions
        .iter()
        .find_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => Some(operation),
            _ => None,
        })
        .ok_or(DedupError::MissingOperation)?;
    Ok(operation.operation_type == ast::OperationType::Query)
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    fn snapshot() -> CacheSnapshot {
        serde_json::from_value(serde_json::json!({
            "ROOT_QUERY": {
                "authors": [{"type": "id", "id": "Author:1", "typename": "Author"}],
            },
            "Author:1": {
                "__typename": "Author",
                "firstName": "Sashko",
                "lastName": "Stubailo",
            },
        }))
        .expect("snapshot fixture deserializes")
    }

    fn request<'a>(document: &'a ast::Document, variables: &'a Object) -> DedupRequest<'a> {
        DedupRequest {
            document,
            variables,
            force_fetch: false,
        }
    }

    #[test]
    fn complete_hit_short_circuits() {
        let document =
            ast::Document::parse("{ authors { firstName lastName } }", "query.graphql").unwrap();
        let variables = Object::new();

        match dedup_operation(&request(&document, &variables), &snapshot(), None).unwrap() {
            DedupOutcome::CompleteHit { data } => {
                assert_eq!(
                    Value::Object(data),
                    json!({"authors": [{"firstName": "Sashko", "lastName": "Stubailo"}]})
                );
            }
            _ => panic!("expected a complete hit"),
        }
    }

    #[test]
    fn partial_hit_returns_the_pruned_query() {
        let document =
            ast::Document::parse("{ authors { firstName DOB } }", "query.graphql").unwrap();
        let variables = Object::new();

        match dedup_operation(&request(&document, &variables), &snapshot(), None).unwrap() {
            DedupOutcome::PartialHit { data, document } => {
                assert_eq!(
                    Value::Object(data),
                    json!({"authors": [{"firstName": "Sashko"}]})
                );
                let expected = ast::Document::parse("{ authors { DOB } }", "expected.graphql")
                    .unwrap()
                    .to_string();
                assert_eq!(document.to_string(), expected);
            }
            _ => panic!("expected a partial hit"),
        }
    }

    #[test]
    fn force_fetch_bypasses() {
        let document = ast::Document::parse("{ authors { firstName } }", "query.graphql").unwrap();
        let variables = Object::new();
        let mut request = request(&document, &variables);
        request.force_fetch = true;

        assert!(matches!(
            dedup_operation(&request, &snapshot(), None).unwrap(),
            DedupOutcome::Bypass
        ));
    }

    #[test]
    fn mutations_bypass() {
        let document =
            ast::Document::parse("mutation { addAuthor { id } }", "query.graphql").unwrap();
        let variables = Object::new();

        assert!(matches!(
            dedup_operation(&request(&document, &variables), &snapshot(), None).unwrap(),
            DedupOutcome::Bypass
        ));
    }

    #[test]
    fn empty_document_is_an_error() {
        let document = ast::Document::parse("fragment F on Query { authors }", "query.graphql")
            .unwrap();
        let variables = Object::new();

        assert_eq!(
            dedup_operation(&request(&document, &variables), &snapshot(), None).unwrap_err(),
            DedupError::MissingOperation
        );
    }

    #[test]
    fn downstream_merge_recombines_both_halves() {
        let cache = match json!({"authors": [{"firstName": "Sashko"}]}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let downstream = match json!({"authors": [{"DOB": "1990-01-01"}]}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        assert_eq!(
            Value::Object(merge_downstream(cache, downstream)),
            json!({"authors": [{"firstName": "Sashko", "DOB": "1990-01-01"}]})
        );
    }
}
