mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use std::collections::BTreeMap;

use serde::Deserialize;

/// Bucket for errors that do not belong to a single field.
pub const NON_FIELD: &str = "__all__";

/// `?page=` may be anything; the paginator decides what it means.
#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// Validation messages keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_owned())
            .or_default()
            .push(message.to_owned());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn field(&self, field: &str) -> Vec<String> {
        self.errors.get(field).cloned().unwrap_or_default()
    }

    pub fn non_field(&self) -> Vec<String> {
        self.field(NON_FIELD)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}
