//! Request body extraction for write endpoints
//!
//! Clients submit either JSON, url-encoded forms or multipart forms with
//! file parts. All three are flattened into one [`FormInput`] so validation
//! does not care about the wire format. Form keys written in bracket
//! notation (`lyrics[0][time]`) become arrays of objects, the same shape a
//! JSON client would send.

use crate::error::ApiError;
use crate::media::UploadedFile;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Upper bound for JSON and url-encoded bodies
const FORM_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Submitted fields and files
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    pub fields: Map<String, Value>,
    pub files: HashMap<String, UploadedFile>,
}

impl FormInput {
    /// Fields from a JSON document; anything but an object yields no fields
    pub fn from_json(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            fields,
            files: HashMap::new(),
        }
    }

    /// Fields from `key=value` pairs, honouring bracket notation
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = FormBuilder::default();
        for (key, value) in pairs {
            builder.push_text(key.as_ref(), value.into());
        }
        builder.finish()
    }

    /// Move `alias` to `canonical` when only the alias was sent
    pub fn alias(&mut self, alias: &str, canonical: &str) {
        if self.fields.contains_key(canonical) {
            return;
        }
        if let Some(value) = self.fields.remove(alias) {
            self.fields.insert(canonical.to_string(), value);
        }
    }
}

#[async_trait]
impl FromRequest<AppState> for FormInput {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            return read_multipart(req, &content_type, state.upload_limit_bytes).await;
        }

        let body = axum::body::to_bytes(req.into_body(), FORM_BODY_LIMIT)
            .await
            .map_err(|e| ApiError::PayloadTooLarge(format!("Request body rejected: {}", e)))?;

        if content_type.starts_with("application/x-www-form-urlencoded") {
            return Ok(FormInput::from_pairs(
                url::form_urlencoded::parse(&body).into_owned(),
            ));
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(FormInput::default());
        }

        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Malformed JSON body: {}", e)))?;
        Ok(FormInput::from_json(value))
    }
}

async fn read_multipart(
    req: Request,
    content_type: &str,
    limit: u64,
) -> Result<FormInput, ApiError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart request: {}", e)))?;

    let constraints =
        multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limit));
    let stream = req.into_body().into_data_stream();
    let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

    let mut builder = FormBuilder::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        if name.is_empty() {
            continue;
        }

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(|mime| mime.to_string());
                let bytes = field.bytes().await.map_err(multipart_error)?;
                debug!("Received file part '{}' ({} bytes)", name, bytes.len());
                builder.push_file(name, UploadedFile::new(file_name, content_type, bytes));
            }
            None => {
                let text = field.text().await.map_err(multipart_error)?;
                builder.push_text(&name, text);
            }
        }
    }

    Ok(builder.finish())
}

fn multipart_error(error: multer::Error) -> ApiError {
    match error {
        multer::Error::StreamSizeExceeded { limit } | multer::Error::FieldSizeExceeded { limit, .. } => {
            ApiError::PayloadTooLarge(format!("Upload exceeds the {} byte limit", limit))
        }
        other => ApiError::BadRequest(format!("Invalid multipart request: {}", other)),
    }
}

/// Accumulates form parts, grouping bracketed keys by index
#[derive(Default)]
struct FormBuilder {
    fields: Map<String, Value>,
    indexed: BTreeMap<String, BTreeMap<usize, Map<String, Value>>>,
    files: HashMap<String, UploadedFile>,
}

impl FormBuilder {
    fn push_text(&mut self, key: &str, value: String) {
        match parse_indexed_key(key) {
            Some((base, index, property)) => {
                self.indexed
                    .entry(base.to_string())
                    .or_default()
                    .entry(index)
                    .or_default()
                    .insert(property.to_string(), Value::String(value));
            }
            None => {
                self.fields.insert(key.to_string(), Value::String(value));
            }
        }
    }

    fn push_file(&mut self, key: String, file: UploadedFile) {
        self.files.insert(key, file);
    }

    fn finish(mut self) -> FormInput {
        for (base, rows) in self.indexed {
            let items = rows.into_values().map(Value::Object).collect();
            self.fields.insert(base, Value::Array(items));
        }
        FormInput {
            fields: self.fields,
            files: self.files,
        }
    }
}

/// Split `base[index][property]` into its parts
fn parse_indexed_key(key: &str) -> Option<(&str, usize, &str)> {
    let (base, rest) = key.split_once('[')?;
    let (index, rest) = rest.split_once(']')?;
    let property = rest.strip_prefix('[')?.strip_suffix(']')?;

    if base.is_empty() || property.is_empty() || property.contains(['[', ']']) {
        return None;
    }

    Some((base, index.parse().ok()?, property))
}
