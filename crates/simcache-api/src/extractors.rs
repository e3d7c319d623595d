//! # Request Extraction Helpers
//!
//! Map Axum extractor rejections to [`AppError::BadRequest`] and parse
//! identifier strings supplied in queries and form fields.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use simcache_core::Identifier;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract query parameters, mapping rejections to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a textual identifier verbatim; failures are `INVALID_IDENTIFIER`.
pub fn parse_identifier(text: &str) -> Result<Identifier, AppError> {
    text.parse::<Identifier>().map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcache_core::ErrorKind;

    #[test]
    fn parse_identifier_accepts_canonical_text() {
        let id = Identifier::derive("sim", "v1", &serde_json::json!({"a": 1})).unwrap();
        let parsed = parse_identifier(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_identifier_does_not_trim() {
        let id = Identifier::derive("sim", "v1", &serde_json::json!({})).unwrap();
        for text in [format!(" {id}"), format!("{id}\n")] {
            match parse_identifier(&text) {
                Err(AppError::Cache { kind, .. }) => assert_eq!(kind, ErrorKind::InvalidIdentifier),
                other => panic!("expected INVALID_IDENTIFIER for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_identifier_rejects_garbage() {
        for bad in ["", "sim/v1", "sim/v1/XYZ", "../../etc/passwd"] {
            match parse_identifier(bad) {
                Err(AppError::Cache { kind, .. }) => assert_eq!(kind, ErrorKind::InvalidIdentifier),
                other => panic!("expected INVALID_IDENTIFIER for {bad:?}, got {other:?}"),
            }
        }
    }
}
