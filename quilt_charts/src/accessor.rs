// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Accessors: how components read values out of caller data.
//!
//! An accessor is a constant, a field key or a function of `(datum, index)`. Every kind may
//! resolve to "undefined" (`None`), which components treat as missing data. Accessors are
//! pure and may be invoked several times per render.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::record::{FromValue, Record};

/// A single-valued accessor.
pub enum Accessor<D, T> {
    /// The same value for every datum.
    Const(T),
    /// A field read through [`Record::field`].
    Field(String),
    /// A function of the datum and its index.
    Fn(Rc<dyn Fn(&D, usize) -> Option<T>>),
}

impl<D, T> Accessor<D, T> {
    /// A constant accessor.
    pub fn constant(value: T) -> Self {
        Self::Const(value)
    }

    /// A field-key accessor.
    pub fn field(key: impl Into<String>) -> Self {
        Self::Field(key.into())
    }

    /// A function accessor.
    pub fn func(f: impl Fn(&D, usize) -> Option<T> + 'static) -> Self {
        Self::Fn(Rc::new(f))
    }

    /// Returns `true` if both accessors are the same constant, key or function.
    pub fn same_as(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        match (self, other) {
            (Self::Const(a), Self::Const(b)) => a == b,
            (Self::Field(a), Self::Field(b)) => a == b,
            (Self::Fn(a), Self::Fn(b)) => core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl<D: Record, T: FromValue + Clone> Accessor<D, T> {
    /// Resolves the accessor for `datum` at position `index`.
    pub fn resolve(&self, datum: &D, index: usize) -> Option<T> {
        match self {
            Self::Const(v) => Some(v.clone()),
            Self::Field(key) => datum.field(key).and_then(T::from_value),
            Self::Fn(f) => f(datum, index),
        }
    }
}

impl<D, T: Clone> Clone for Accessor<D, T> {
    fn clone(&self) -> Self {
        match self {
            Self::Const(v) => Self::Const(v.clone()),
            Self::Field(k) => Self::Field(k.clone()),
            Self::Fn(f) => Self::Fn(f.clone()),
        }
    }
}

impl<D, T: fmt::Debug> fmt::Debug for Accessor<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(v) => f.debug_tuple("Const").field(v).finish(),
            Self::Field(k) => f.debug_tuple("Field").field(k).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

impl<D> From<f64> for Accessor<D, f64> {
    fn from(value: f64) -> Self {
        Self::Const(value)
    }
}

impl<D> From<&str> for Accessor<D, String> {
    fn from(key: &str) -> Self {
        Self::Field(key.into())
    }
}

/// An accessor that may hold one entry per series.
///
/// Series `j` uses entry `j`, wrapping around when there are fewer entries than series.
pub enum SeriesAccessor<D, T> {
    /// One accessor for every series.
    Single(Accessor<D, T>),
    /// One accessor per series.
    Multi(Vec<Accessor<D, T>>),
}

impl<D, T> SeriesAccessor<D, T> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(v) => v.len(),
        }
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The accessor used by series `group`.
    pub fn for_group(&self, group: usize) -> Option<&Accessor<D, T>> {
        match self {
            Self::Single(a) => Some(a),
            Self::Multi(v) if v.is_empty() => None,
            Self::Multi(v) => v.get(group % v.len()),
        }
    }

    /// Returns `true` if both hold the same accessors in the same order.
    pub fn same_as(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        match (self, other) {
            (Self::Single(a), Self::Single(b)) => a.same_as(b),
            (Self::Multi(a), Self::Multi(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            _ => false,
        }
    }
}

impl<D: Record, T: FromValue + Clone> SeriesAccessor<D, T> {
    /// Resolves series `group`'s accessor for `datum` at position `index`.
    pub fn resolve(&self, datum: &D, index: usize, group: usize) -> Option<T> {
        self.for_group(group)?.resolve(datum, index)
    }
}

impl<D, T: Clone> Clone for SeriesAccessor<D, T> {
    fn clone(&self) -> Self {
        match self {
            Self::Single(a) => Self::Single(a.clone()),
            Self::Multi(v) => Self::Multi(v.clone()),
        }
    }
}

impl<D, T: fmt::Debug> fmt::Debug for SeriesAccessor<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(a) => f.debug_tuple("Single").field(a).finish(),
            Self::Multi(v) => f.debug_tuple("Multi").field(v).finish(),
        }
    }
}

impl<D, T> From<Accessor<D, T>> for SeriesAccessor<D, T> {
    fn from(value: Accessor<D, T>) -> Self {
        Self::Single(value)
    }
}

impl<D, T> From<Vec<Accessor<D, T>>> for SeriesAccessor<D, T> {
    fn from(value: Vec<Accessor<D, T>>) -> Self {
        Self::Multi(value)
    }
}

/// Compares two optional series accessors.
pub(crate) fn same_optional<D, T: PartialEq>(
    a: Option<&SeriesAccessor<D, T>>,
    b: Option<&SeriesAccessor<D, T>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_as(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::vec;

    use super::*;

    fn row(x: f64) -> BTreeMap<String, f64> {
        let mut m = BTreeMap::new();
        m.insert(String::from("x"), x);
        m
    }

    #[test]
    fn resolves_each_kind() {
        let d = row(4.0);
        assert_eq!(Accessor::constant(1.5).resolve(&d, 0), Some(1.5));
        assert_eq!(Accessor::<_, f64>::field("x").resolve(&d, 0), Some(4.0));
        assert_eq!(Accessor::<_, f64>::field("nope").resolve(&d, 0), None);
        let f = Accessor::func(|d: &BTreeMap<String, f64>, i| Some(d["x"] + i as f64));
        assert_eq!(f.resolve(&d, 2), Some(6.0));
    }

    #[test]
    fn series_entries_wrap_by_group() {
        let s: SeriesAccessor<BTreeMap<String, f64>, f64> =
            vec![Accessor::constant(1.0), Accessor::constant(2.0)].into();
        let d = row(0.0);
        assert_eq!(s.resolve(&d, 0, 0), Some(1.0));
        assert_eq!(s.resolve(&d, 0, 3), Some(2.0));
        let empty: SeriesAccessor<BTreeMap<String, f64>, f64> = SeriesAccessor::Multi(vec![]);
        assert_eq!(empty.resolve(&d, 0, 0), None);
    }

    #[test]
    fn identity_of_functions_is_by_pointer() {
        let f: Accessor<BTreeMap<String, f64>, f64> = Accessor::func(|_, _| Some(1.0));
        let g = f.clone();
        let h: Accessor<BTreeMap<String, f64>, f64> = Accessor::func(|_, _| Some(1.0));
        assert!(f.same_as(&g));
        assert!(!f.same_as(&h));
        let a: Accessor<BTreeMap<String, f64>, String> = "a".into();
        assert!(a.same_as(&Accessor::field("a")));
    }
}
