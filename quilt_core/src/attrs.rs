// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute injection.
//!
//! Hosts can attach custom attributes to every element of a given selector, either as a
//! constant or computed from the geometry node the element was generated from. This is
//! mostly used as a testability hook (stable `data-*` attributes in SVG output).

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::mark::Selector;

/// A resolved attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// String value.
    Str(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A named attribute attached to a mark.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: AttributeValue,
}

/// How an attribute value is obtained for a node of type `N`.
pub enum AttributeSpec<N> {
    /// The same value for every element.
    Const(AttributeValue),
    /// Computed per node.
    Fn(Rc<dyn Fn(&N) -> AttributeValue>),
}

impl<N> AttributeSpec<N> {
    /// Wraps a per-node function.
    pub fn from_fn(f: impl Fn(&N) -> AttributeValue + 'static) -> Self {
        Self::Fn(Rc::new(f))
    }

    fn resolve(&self, node: &N) -> AttributeValue {
        match self {
            Self::Const(v) => v.clone(),
            Self::Fn(f) => f(node),
        }
    }
}

impl<N> Clone for AttributeSpec<N> {
    fn clone(&self) -> Self {
        match self {
            Self::Const(v) => Self::Const(v.clone()),
            Self::Fn(f) => Self::Fn(f.clone()),
        }
    }
}

impl<N> fmt::Debug for AttributeSpec<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(v) => f.debug_tuple("Const").field(v).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// Selector -> attribute name -> value table.
pub struct Attributes<N> {
    entries: Vec<(Selector, String, AttributeSpec<N>)>,
}

impl<N> Attributes<N> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds (or replaces) an attribute for a selector.
    pub fn with(
        mut self,
        selector: Selector,
        name: impl Into<String>,
        spec: AttributeSpec<N>,
    ) -> Self {
        self.set(selector, name, spec);
        self
    }

    /// Adds (or replaces) an attribute for a selector.
    pub fn set(&mut self, selector: Selector, name: impl Into<String>, spec: AttributeSpec<N>) {
        let name = name.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(s, n, _)| *s == selector && *n == name)
        {
            entry.2 = spec;
        } else {
            self.entries.push((selector, name, spec));
        }
    }

    /// Returns `true` if no attribute is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves every attribute configured for `selector` against `node`.
    pub fn resolve(&self, selector: Selector, node: &N) -> SmallVec<[Attribute; 2]> {
        self.entries
            .iter()
            .filter(|(s, _, _)| *s == selector)
            .map(|(_, name, spec)| Attribute {
                name: name.clone(),
                value: spec.resolve(node),
            })
            .collect()
    }
}

impl<N> Default for Attributes<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Clone for Attributes<N> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<N> fmt::Debug for Attributes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attributes")
            .field("entries", &self.entries)
            .finish()
    }
}
