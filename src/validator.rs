//! Whole-request validation.
//!
//! [`Validated<T>`] materialises the request as one JSON document
//!
//! ```json
//! {"body": {...}, "params": {...}, "query": {...}, "headers": {...}}
//! ```
//!
//! deserialises it into `T` (unknown fields are ignored) and runs
//! [`validator::Validate`] over the whole structure. Every violation is
//! reported, each as a `{message, path}` detail, in a single 400 response.
//! The handler only runs when the document is valid.
//!
//! Fields that must be present are modelled as `Option<_>` with
//! `#[validate(required)]`, so a missing field is a violation rather than a
//! deserialisation failure. A field of the wrong type is reported at its own
//! path alongside every other violation.
//!
//! List endpoints take [`ValidatedQuery<T>`], which runs the query string
//! through the same pipeline.

use std::collections::HashMap;

use axum::{
    body::to_bytes,
    extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use bustrack_core::{AppError, ErrorDetail};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct Validated<T>(pub T);

impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let params: Map<String, Value> = match RawPathParams::from_request_parts(&mut parts, state)
            .await
        {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
            Err(_) => Map::new(),
        };

        let query: Map<String, Value> = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
            .unwrap_or_default();

        let headers: Map<String, Value> = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
            })
            .collect();

        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| body_error(format!("Request body could not be read: {e}")))?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| body_error(format!("Malformed JSON body: {e}")))?
        };

        let document = json!({
            "body": body,
            "params": params,
            "query": query,
            "headers": headers,
        });

        let (value, mut details) = deserialize_document::<T>(document)?;

        if let Err(errors) = value.validate() {
            let reported: Vec<Vec<String>> = details.iter().map(|d| d.path.clone()).collect();
            details.extend(
                flatten_errors(&errors)
                    .into_iter()
                    .filter(|d| !reported.contains(&d.path)),
            );
        }

        if !details.is_empty() {
            details.sort_by(|a, b| a.path.cmp(&b.path));
            return Err(AppError::validation(details));
        }

        Ok(Validated(value))
    }
}

/// Query-string parameters of a list endpoint, as `T`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

#[derive(Debug, Deserialize)]
struct QueryDocument<T> {
    query: T,
}

impl<T> Validate for QueryDocument<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl<T, S> FromRequest<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Validated(QueryDocument { query }) =
            Validated::<QueryDocument<T>>::from_request(req, state).await?;
        Ok(ValidatedQuery(query))
    }
}

fn body_error(message: String) -> AppError {
    AppError::validation(vec![ErrorDetail::new(message, vec!["body".to_string()])])
}

/// Sections whose fields are type-checked one at a time.
const FIELD_SECTIONS: [&str; 2] = ["body", "query"];

/// Deserialises the request document. When that fails, each body and query
/// field is tried on its own so every mistyped field gets a detail; those
/// fields are then dropped and the rest of the document is used.
///
/// Falls back to a single `["body"]` detail when the failure cannot be
/// pinned to individual fields.
fn deserialize_document<T: DeserializeOwned>(
    mut document: Value,
) -> Result<(T, Vec<ErrorDetail>), AppError> {
    let error = match serde_json::from_value::<T>(document.clone()) {
        Ok(value) => return Ok((value, Vec::new())),
        Err(e) => e,
    };
    let whole_body = || body_error(format!("Invalid request body: {error}"));

    // Field isolation only means something when the bare document is accepted
    if serde_json::from_value::<T>(isolate(&document, None)).is_err() {
        return Err(whole_body());
    }

    let mut details = Vec::new();
    for section in FIELD_SECTIONS {
        let Some(Value::Object(fields)) = document.get(section) else {
            continue;
        };
        for key in fields.keys() {
            if let Err(e) = serde_json::from_value::<T>(isolate(&document, Some((section, key)))) {
                details.push(ErrorDetail::new(
                    type_message(key, &e),
                    vec![section.to_string(), key.clone()],
                ));
            }
        }
    }

    for detail in &details {
        if let Some(Value::Object(fields)) = document.get_mut(&detail.path[0]) {
            fields.remove(&detail.path[1]);
        }
    }

    match serde_json::from_value::<T>(document) {
        Ok(value) if !details.is_empty() => Ok((value, details)),
        _ => Err(whole_body()),
    }
}

/// A copy of `document` whose field sections are empty, except for the one
/// `(section, key)` field when given.
fn isolate(document: &Value, keep: Option<(&str, &str)>) -> Value {
    let mut isolated = document.clone();
    for section in FIELD_SECTIONS {
        if let Some(Value::Object(fields)) = isolated.get_mut(section) {
            match keep {
                Some((kept, key)) if kept == section => fields.retain(|k, _| k == key),
                _ => fields.clear(),
            }
        }
    }
    isolated
}

fn type_message(field: &str, error: &serde_json::Error) -> String {
    let text = error.to_string();
    if text.contains("UUID") {
        return format!("\"{field}\" must be a valid UUID");
    }
    match text.rsplit_once(", expected ") {
        Some((_, expected)) => {
            let expected = match expected {
                "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" => "an integer",
                "f32" | "f64" => "a number",
                "a sequence" => "an array",
                other => other,
            };
            format!("\"{field}\" must be {expected}")
        }
        None => format!("\"{field}\" is invalid: {text}"),
    }
}

/// Flattens nested validator output into `{message, path}` details, sorted
/// by path.
pub fn flatten_errors(errors: &ValidationErrors) -> Vec<ErrorDetail> {
    let mut details = Vec::new();
    collect(errors, &mut Vec::new(), &mut details);
    details.sort_by(|a, b| a.path.cmp(&b.path));
    details
}

fn collect(errors: &ValidationErrors, path: &mut Vec<String>, out: &mut Vec<ErrorDetail>) {
    for (field, kind) in errors.errors() {
        path.push(field.to_string());
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.push(ErrorDetail::new(describe(&field.to_string(), error), path.clone()));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    path.push(index.to_string());
                    collect(nested, path, out);
                    path.pop();
                }
            }
        }
        path.pop();
    }
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return format!("\"{field}\" {message}");
    }

    let param = |name: &str| error.params.get(name).map(|v| v.to_string());

    match error.code.as_ref() {
        "required" => format!("\"{field}\" is required"),
        "email" => format!("\"{field}\" must be a valid email"),
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => {
                format!("\"{field}\" length must be between {min} and {max} characters")
            }
            (Some(min), None) => format!("\"{field}\" length must be at least {min} characters"),
            (None, Some(max)) => {
                format!("\"{field}\" length must be less than or equal to {max} characters")
            }
            _ => format!("\"{field}\" has an invalid length"),
        },
        "range" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("\"{field}\" must be between {min} and {max}"),
            (Some(min), None) => format!("\"{field}\" must be greater than or equal to {min}"),
            (None, Some(max)) => format!("\"{field}\" must be less than or equal to {max}"),
            _ => format!("\"{field}\" is out of range"),
        },
        _ => format!("\"{field}\" is invalid"),
    }
}

// Field validators shared by request documents

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank").with_message("must not be empty".into()));
    }
    Ok(())
}

pub fn alphanumeric(value: &str) -> Result<(), ValidationError> {
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("alphanumeric")
            .with_message("must only contain alpha-numeric characters".into()));
    }
    Ok(())
}

pub fn uuid_string(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value.trim())
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid").with_message("must be a valid UUID".into()))
}

pub fn iso8601(value: &str) -> Result<(), ValidationError> {
    parse_iso8601(value).map(|_| ()).ok_or_else(|| {
        ValidationError::new("iso8601").with_message("must be in ISO 8601 date format".into())
    })
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC)
/// and bare dates (midnight UTC).
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
