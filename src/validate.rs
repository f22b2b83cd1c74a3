//! Typed response validation.
//!
//! A [`Shape`] couples a compiled JSON Schema with the Rust type the caller
//! wants back. [`TypedResponse::from_response`] decodes a response body as
//! JSON, checks it against the shape, and only then deserializes into the
//! target type — a `TypedResponse` never exists whose `data` was not
//! validated against the exact shape the caller requested.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::logging::backtrace;
use crate::response::Response;

/// Validation failure with enough detail for logging and debugging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Decoded data does not conform to the schema at the given path.
    #[error("value at '{path}' does not conform to shape: {detail}")]
    Schema { path: String, detail: String },

    /// Data conformed to the schema but does not fit the target type.
    #[error("conforming value does not fit target type: {detail}")]
    TypeMismatch { detail: String },
}

/// Shape descriptor: a compiled JSON Schema bound to a target type.
pub struct Shape<T> {
    validator: jsonschema::Validator,
    _target: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Shape<T> {
    /// Compile a shape from a JSON Schema document.
    ///
    /// Fails with [`Error::Schema`] if the document is not a valid schema.
    pub fn new(schema: &Value) -> Result<Self> {
        let validator = jsonschema::options()
            .build(schema)
            .map_err(|e| Error::schema(e.to_string()))?;

        Ok(Self {
            validator,
            _target: PhantomData,
        })
    }

    fn check(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        self.validator.validate(value).map_err(|error| {
            let path = error.instance_path.to_string();
            let formatted_path = if path.is_empty() {
                "$".to_string()
            } else {
                format!("${path}")
            };

            ValidationError::Schema {
                path: formatted_path,
                detail: error.to_string(),
            }
        })
    }
}

/// A response paired with its validated, typed data.
#[derive(Debug)]
pub struct TypedResponse<T> {
    /// The raw response the data was decoded from.
    pub response: Response,
    /// The validated value conforming to the requested shape.
    pub data: T,
}

impl<T: DeserializeOwned> TypedResponse<T> {
    /// Validate a response body against a shape.
    ///
    /// Failures are logged at the point of detection and re-raised
    /// unchanged; no fallback value is ever synthesized.
    pub fn from_response(response: Response, shape: &Shape<T>) -> Result<Self> {
        let body = match response.decoded_body() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(
                    target: "wraith::validate",
                    "Error processing response: {}\n{}",
                    e,
                    backtrace()
                );
                return Err(e);
            }
        };
        let value: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    target: "wraith::validate",
                    "Error processing response: {}\n{}",
                    e,
                    backtrace()
                );
                return Err(Error::Decode(e));
            }
        };

        if let Err(e) = shape.check(&value) {
            tracing::error!(target: "wraith::validate", "Response validation failed: {}", e);
            return Err(Error::Validation(e));
        }

        match serde_json::from_value::<T>(value) {
            Ok(data) => Ok(Self { response, data }),
            Err(e) => {
                let err = ValidationError::TypeMismatch {
                    detail: e.to_string(),
                };
                tracing::error!(target: "wraith::validate", "Response validation failed: {}", err);
                Err(Error::Validation(err))
            }
        }
    }
}
