//! Input field parsing and validation shared by the request models.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::{messages, FieldErrors};

/// A JSON body field that distinguishes "absent" from an explicit `null`.
///
/// Request structs mark these `#[serde(default)]`, so a missing key stays `Missing`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field {
    #[default]
    Missing,
    Null,
    Present(Value),
}

impl Field {
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None => Field::Null,
            Some(value) => Field::Present(value),
        })
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Present(Value::String(value.to_string()))
    }
}

/// Rules for a text field. Input is trimmed before any length check.
#[derive(Debug, Clone, Copy)]
pub struct CharField {
    pub name: &'static str,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl CharField {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            min_length: None,
            max_length: None,
        }
    }

    pub const fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Validate a raw value, returning the cleaned string or the first failing message.
    pub fn clean(&self, value: &Value) -> Result<String, String> {
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return Err(messages::NOT_A_STRING.to_string()),
        };

        if text.is_empty() {
            return Err(messages::BLANK.to_string());
        }

        let length = text.chars().count();
        if let Some(max) = self.max_length {
            if length > max {
                return Err(format!(
                    "Ensure this field has no more than {} characters.",
                    max
                ));
            }
        }
        if let Some(min) = self.min_length {
            if length < min {
                return Err(format!("Ensure this field has at least {} characters.", min));
            }
        }

        Ok(text)
    }

    /// Validate a field that must be supplied.
    pub fn required(&self, field: &Field, errors: &mut FieldErrors) -> Option<String> {
        match field {
            Field::Missing => {
                errors.add(self.name, messages::REQUIRED);
                None
            }
            other => self.optional(other, errors),
        }
    }

    /// Validate a field that may be left out, as in a partial update.
    pub fn optional(&self, field: &Field, errors: &mut FieldErrors) -> Option<String> {
        match field {
            Field::Missing => None,
            Field::Null => {
                errors.add(self.name, messages::NULL);
                None
            }
            Field::Present(value) => match self.clean(value) {
                Ok(text) => Some(text),
                Err(message) => {
                    errors.add(self.name, message);
                    None
                }
            },
        }
    }
}

/// Rules for a URL field: a text field that must also parse as an absolute
/// http(s) or ftp(s) URL with a host.
#[derive(Debug, Clone, Copy)]
pub struct UrlField {
    text: CharField,
}

const URL_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

impl UrlField {
    pub const fn new(name: &'static str, max_length: usize) -> Self {
        Self {
            text: CharField::new(name).max_length(max_length),
        }
    }

    pub fn clean(&self, value: &Value) -> Result<String, String> {
        let text = self.text.clean(value)?;
        if is_valid_url(&text) {
            Ok(text)
        } else {
            Err(messages::INVALID_URL.to_string())
        }
    }

    pub fn required(&self, field: &Field, errors: &mut FieldErrors) -> Option<String> {
        if field.is_missing() {
            errors.add(self.text.name, messages::REQUIRED);
            return None;
        }
        self.optional(field, errors)
    }

    pub fn optional(&self, field: &Field, errors: &mut FieldErrors) -> Option<String> {
        let raw = match field {
            Field::Missing => return None,
            Field::Null => {
                errors.add(self.text.name, messages::NULL);
                return None;
            }
            Field::Present(value) => value,
        };
        match self.clean(raw) {
            Ok(text) => Some(text),
            Err(message) => {
                errors.add(self.text.name, message);
                None
            }
        }
    }
}

fn is_valid_url(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    match url::Url::parse(text) {
        Ok(parsed) => {
            URL_SCHEMES.contains(&parsed.scheme())
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Parse a list of primary keys, as accepted by relation fields.
pub fn primary_keys(name: &str, field: &Field, errors: &mut FieldErrors) -> Option<Vec<i64>> {
    let items = match field {
        Field::Missing => return None,
        Field::Null => {
            errors.add(name, messages::NULL);
            return None;
        }
        Field::Present(Value::Array(items)) => items,
        Field::Present(other) => {
            errors.add(
                name,
                format!(
                    "Expected a list of items but got type \"{}\".",
                    json_type_name(other)
                ),
            );
            return None;
        }
    };

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = match item {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match id {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => {
                errors.add(
                    name,
                    format!(
                        "Incorrect type. Expected pk value, received {}.",
                        json_type_name(item)
                    ),
                );
                return None;
            }
        }
    }
    Some(ids)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
