// src/models/mod.rs

use serde::de::DeserializeOwned;

use crate::error::AppError;

pub mod post;
pub mod reaction;
pub mod user;

/// Decodes a loosely-typed request body into one of the request DTOs.
///
/// Wrong field types or missing fields surface as `AppError::Validation`.
pub fn decode_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::{CreatePostRequest, ReactRequest};
    use serde_json::json;

    #[test]
    fn rejects_non_boolean_like() {
        let err = decode_body::<ReactRequest>(json!({ "like": "yes" })).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_non_string_content() {
        let err = decode_body::<CreatePostRequest>(json!({ "content": 42 })).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = decode_body::<CreatePostRequest>(json!({})).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn accepts_well_typed_bodies() {
        let req = decode_body::<ReactRequest>(json!({ "like": false })).unwrap();
        assert!(!req.like);

        let req = decode_body::<CreatePostRequest>(json!({ "content": "" })).unwrap();
        assert_eq!(req.content, "");
    }
}
