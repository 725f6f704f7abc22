//! Declarative field validation
//!
//! A [`Validator`] reads typed values out of a [`FormInput`], collecting one
//! message per broken rule instead of failing on the first problem. String
//! inputs are trimmed and blank strings count as absent, so JSON and form
//! submissions behave the same.

use crate::error::{ApiError, ApiResult};
use crate::media::{MediaKind, UploadedFile};
use crate::payload::FormInput;
use melody_common::lyrics::{normalize_lyrics, parse_lyrics_text, parse_time_label};
use melody_common::LyricLine;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field errors keyed by input name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
    first: Option<String>,
    count: usize,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        if self.first.is_none() {
            self.first = Some(message.clone());
        }
        self.count += 1;
        self.errors.entry(field.into()).or_default().push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total number of messages
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// First message, suffixed with the number of remaining ones
    pub fn summary(&self) -> String {
        let Some(first) = &self.first else {
            return "The given data was invalid.".to_string();
        };
        match self.count {
            0 | 1 => first.clone(),
            2 => format!("{} (and 1 more error)", first),
            n => format!("{} (and {} more errors)", first, n - 1),
        }
    }
}

/// Human-readable field name used inside messages
pub fn display_name(field: &str) -> String {
    field.replace('_', " ")
}

/// Typed reader over a submitted form that accumulates errors
pub struct Validator<'a> {
    input: &'a FormInput,
    errors: ValidationErrors,
}

impl<'a> Validator<'a> {
    pub fn new(input: &'a FormInput) -> Self {
        Self {
            input,
            errors: ValidationErrors::new(),
        }
    }

    /// Whether the key was submitted at all (even as null)
    pub fn has(&self, field: &str) -> bool {
        self.input.fields.contains_key(field)
    }

    /// Whether the key carries a non-blank value
    pub fn filled(&self, field: &str) -> bool {
        match self.input.fields.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn has_file(&self, field: &str) -> bool {
        self.input
            .files
            .get(field)
            .is_some_and(|file| !file.is_empty())
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    fn required_error(&mut self, field: &str) {
        let message = format!("The {} field is required.", display_name(field));
        self.errors.add(field, message);
    }

    /// Trimmed string with a maximum length in characters
    pub fn string(&mut self, field: &str, required: bool, max: usize) -> Option<String> {
        match self.input.fields.get(field) {
            None | Some(Value::Null) => {
                if required {
                    self.required_error(field);
                }
                None
            }
            Some(Value::String(raw)) => {
                let value = raw.trim();
                if value.is_empty() {
                    if required {
                        self.required_error(field);
                    }
                    return None;
                }
                if value.chars().count() > max {
                    let message = format!(
                        "The {} field must not be greater than {} characters.",
                        display_name(field),
                        max
                    );
                    self.errors.add(field, message);
                    return None;
                }
                Some(value.to_string())
            }
            Some(_) => {
                let message = format!("The {} field must be a string.", display_name(field));
                self.errors.add(field, message);
                None
            }
        }
    }

    /// Integer, accepting numeric strings
    pub fn integer(&mut self, field: &str, required: bool) -> Option<i64> {
        let parsed = match self.input.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(Value::Number(n)) => Some(n.as_i64().ok_or(())),
            Some(Value::String(raw)) => Some(raw.trim().parse::<i64>().map_err(|_| ())),
            Some(_) => Some(Err(())),
        };

        match parsed {
            None => {
                if required {
                    self.required_error(field);
                }
                None
            }
            Some(Ok(value)) => Some(value),
            Some(Err(())) => {
                let message = format!("The {} field must be an integer.", display_name(field));
                self.errors.add(field, message);
                None
            }
        }
    }

    /// Finite number, accepting numeric strings, with an optional lower bound
    pub fn number(&mut self, field: &str, required: bool, min: Option<f64>) -> Option<f64> {
        let parsed = match self.input.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(value) => Some(number_from_value(value).ok_or(())),
        };

        match parsed {
            None => {
                if required {
                    self.required_error(field);
                }
                None
            }
            Some(Err(())) => {
                let message = format!("The {} field must be a number.", display_name(field));
                self.errors.add(field, message);
                None
            }
            Some(Ok(value)) => match min {
                Some(min) if value < min => {
                    let message =
                        format!("The {} field must be at least {}.", display_name(field), min);
                    self.errors.add(field, message);
                    None
                }
                _ => Some(value),
            },
        }
    }

    /// Lyric lines, validated per line and normalized
    ///
    /// Accepts an array of `{time, text}` objects, a JSON-encoded array, or
    /// `MM:SS|text` lines. Each line needs a numeric `time` (or an `M:SS`
    /// label); negative times are clamped and blank text is dropped.
    pub fn lyrics(&mut self, field: &str) -> Vec<LyricLine> {
        let value = match self.input.fields.get(field) {
            None | Some(Value::Null) => return Vec::new(),
            Some(value) => value,
        };

        match value {
            Value::Array(items) => self.lyric_items(field, items),
            Value::String(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Vec::new();
                }
                match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Array(items)) => self.lyric_items(field, &items),
                    _ => parse_lyrics_text(raw),
                }
            }
            _ => {
                let message = format!("The {} field must be an array.", display_name(field));
                self.errors.add(field, message);
                Vec::new()
            }
        }
    }

    fn lyric_items(&mut self, field: &str, items: &[Value]) -> Vec<LyricLine> {
        let mut lines = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let Value::Object(entry) = item else {
                let key = format!("{}.{}", field, index);
                let message = format!("The {} field must be an array.", key);
                self.errors.add(key, message);
                continue;
            };

            let time_key = format!("{}.{}.time", field, index);
            let time = match entry.get("time") {
                None | Some(Value::Null) => {
                    self.errors
                        .add(&time_key, format!("The {} field is required.", time_key));
                    None
                }
                Some(Value::String(raw)) if raw.trim().is_empty() => {
                    self.errors
                        .add(&time_key, format!("The {} field is required.", time_key));
                    None
                }
                Some(value) => match number_from_value(value)
                    .or_else(|| value.as_str().and_then(parse_time_label))
                {
                    Some(time) => Some(time),
                    None => {
                        self.errors
                            .add(&time_key, format!("The {} field must be a number.", time_key));
                        None
                    }
                },
            };

            let text_key = format!("{}.{}.text", field, index);
            let text = match entry.get("text") {
                None | Some(Value::Null) => Some(String::new()),
                Some(Value::String(text)) => Some(text.clone()),
                Some(_) => {
                    self.errors
                        .add(&text_key, format!("The {} field must be a string.", text_key));
                    None
                }
            };

            if let (Some(time), Some(text)) = (time, text) {
                lines.push(LyricLine::new(time, text));
            }
        }

        normalize_lyrics(lines)
    }

    /// Uploaded file of the given media kind
    pub fn file(&mut self, field: &str, kind: MediaKind) -> Option<UploadedFile> {
        if self.filled(field) {
            let message = format!("The {} field must be a file.", display_name(field));
            self.errors.add(field, message);
            return None;
        }

        let file = self.input.files.get(field).filter(|file| !file.is_empty())?;

        if !kind.accepts(file) {
            let message = format!(
                "The {} field must be a file of type: {}.",
                display_name(field),
                kind.label()
            );
            self.errors.add(field, message);
            return None;
        }

        Some(file.clone())
    }

    /// Errors collected so far
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Yield `value` when every rule passed
    pub fn finish<T>(self, value: T) -> ApiResult<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(raw) => raw.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}
