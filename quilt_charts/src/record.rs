// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Field access on caller records.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use peniko::Color;

use crate::color::parse_color;

/// A dynamically typed field value borrowed from a record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    /// A number.
    Number(f64),
    /// A string.
    Str(&'a str),
    /// A boolean.
    Bool(bool),
}

/// Records whose fields can be read by key.
///
/// Field-key accessors resolve through this trait. Types that are only ever read through
/// function accessors can implement it with the default method.
pub trait Record {
    /// Returns the field named `key`, or `None` if it is absent.
    fn field(&self, key: &str) -> Option<Value<'_>> {
        let _ = key;
        None
    }
}

impl Record for BTreeMap<String, f64> {
    fn field(&self, key: &str) -> Option<Value<'_>> {
        self.get(key).copied().map(Value::Number)
    }
}

impl Record for BTreeMap<String, String> {
    fn field(&self, key: &str) -> Option<Value<'_>> {
        self.get(key).map(|s| Value::Str(s.as_str()))
    }
}

/// Conversion out of a dynamic [`Value`]. A mismatched type converts to `None`.
pub trait FromValue: Sized {
    /// Converts the value.
    fn from_value(value: Value<'_>) -> Option<Self>;
}

impl FromValue for f64 {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.into()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
        }
    }
}

impl FromValue for Color {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Str(s) => parse_color(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_expose_their_entries() {
        let mut m = BTreeMap::new();
        m.insert(String::from("x"), 3.0);
        assert_eq!(m.field("x"), Some(Value::Number(3.0)));
        assert_eq!(m.field("y"), None);
    }

    #[test]
    fn conversions_reject_mismatched_types() {
        assert_eq!(f64::from_value(Value::Str("3")), None);
        assert_eq!(String::from_value(Value::Number(2.5)).as_deref(), Some("2.5"));
        assert_eq!(bool::from_value(Value::Bool(true)), Some(true));
    }
}
