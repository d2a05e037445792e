//! Typed values and the columnar storage used by the caches.
//!
//! Every value may be missing.
//! Columns keep a raw representation per type
//! so that hot loops never box values:
//! booleans are bytes (`0` false, `1` true, `2` missing)
//! and doubles use `NaN` as the missing marker.
use serde::{Serialize, Deserialize};

use std::fmt;
use std::mem;


/// Raw byte of a `false` boolean.
pub const RAW_FALSE: u8 = 0;
/// Raw byte of a `true` boolean.
pub const RAW_TRUE: u8 = 1;
/// Raw byte of a missing boolean.
pub const RAW_MISSING: u8 = 2;


/// The type of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// `true`, `false` or missing.
    Boolean,
    /// A real number. `NaN` is missing.
    Double,
    /// A signed integer.
    Integer,
    /// An integer in `0..n`.
    Enumeration(usize),
    /// A dense vector of fixed dimension.
    DoubleVector(usize),
    /// A sparse vector indexed by `usize`.
    SparseVector,
}


impl Type {
    /// Returns `true` for scalar number types.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Double | Self::Integer)
    }


    /// Returns `true` for `Type::Boolean`.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }


    /// Returns `true` for integer types with a finite domain.
    pub fn is_enumeration(&self) -> bool {
        matches!(self, Self::Enumeration(_))
    }
}


impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Double => write!(f, "double"),
            Self::Integer => write!(f, "integer"),
            Self::Enumeration(n) => write!(f, "enum<{n}>"),
            Self::DoubleVector(n) => write!(f, "vector<{n}>"),
            Self::SparseVector => write!(f, "sparse"),
        }
    }
}


/// A sparse vector holding `(index, value)` pairs sorted by index.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}


impl SparseVector {
    /// Construct an empty sparse vector.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }


    /// Set the value at `index`, replacing any previous one.
    pub fn set(&mut self, index: usize, value: f64) {
        match self.entries.binary_search_by_key(&index, |(i, _)| *i) {
            Ok(pos) => { self.entries[pos].1 = value; },
            Err(pos) => { self.entries.insert(pos, (index, value)); },
        }
    }


    /// Get the value at `index`, if any.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.entries.binary_search_by_key(&index, |(i, _)| *i)
            .ok()
            .map(|pos| self.entries[pos].1)
    }


    /// Iterate over the stored `(index, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = &(usize, f64)> + '_ {
        self.entries.iter()
    }


    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }


    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }


    pub(crate) fn size_in_bytes(&self) -> usize {
        mem::size_of::<Self>()
            + self.entries.capacity() * mem::size_of::<(usize, f64)>()
    }
}


/// A dynamically typed value.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The missing value of any type.
    #[default]
    Missing,
    /// A boolean.
    Boolean(bool),
    /// A double. `NaN` is treated as missing.
    Double(f64),
    /// An integer or enumeration value.
    Integer(i64),
    /// A dense vector.
    Vector(Vec<f64>),
    /// A sparse vector.
    Sparse(SparseVector),
}


impl Value {
    /// Returns `true` if `self` carries no information.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Double(x) => x.is_nan(),
            _ => false,
        }
    }


    /// Returns the boolean, if `self` is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }


    /// Returns the scalar number held by `self`.
    /// Integers are converted and `NaN` yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(x) if !x.is_nan() => Some(*x),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }


    /// Returns the integer, if `self` is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }


    /// Returns the dense vector, if `self` is one.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }


    /// Raw boolean byte of `self`.
    pub fn raw_boolean(&self) -> u8 {
        match self {
            Self::Boolean(false) => RAW_FALSE,
            Self::Boolean(true) => RAW_TRUE,
            _ => RAW_MISSING,
        }
    }


    /// Raw double of `self`, `NaN` when missing.
    pub fn raw_double(&self) -> f64 {
        match self {
            Self::Boolean(b) => if *b { 1.0 } else { 0.0 },
            _ => self.as_f64().unwrap_or(f64::NAN),
        }
    }


    /// Returns `true` if `self` can be stored under `ty`.
    /// The missing value matches every type.
    pub fn matches_type(&self, ty: Type) -> bool {
        match (self, ty) {
            (Self::Missing, _) => true,
            (Self::Boolean(_), Type::Boolean) => true,
            (Self::Double(_), Type::Double) => true,
            (Self::Integer(_), Type::Integer) => true,
            (Self::Integer(i), Type::Enumeration(n)) => {
                *i >= 0 && (*i as usize) < n
            },
            (Self::Vector(v), Type::DoubleVector(n)) => v.len() == n,
            (Self::Sparse(_), Type::SparseVector) => true,
            _ => false,
        }
    }


    /// The type a constant holding `self` would get by default.
    pub fn natural_type(&self) -> Option<Type> {
        match self {
            Self::Missing => None,
            Self::Boolean(_) => Some(Type::Boolean),
            Self::Double(_) => Some(Type::Double),
            Self::Integer(_) => Some(Type::Integer),
            Self::Vector(v) => Some(Type::DoubleVector(v.len())),
            Self::Sparse(_) => Some(Type::SparseVector),
        }
    }


    /// Compare two values, allowing `tolerance` on numbers.
    /// Two missing values are equal.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        if self.is_missing() || other.is_missing() {
            return self.is_missing() && other.is_missing();
        }
        let close = |a: f64, b: f64| {
            (a.is_nan() && b.is_nan())
                || (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()))
        };
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => close(*a, *b),
            (Self::Vector(a), Self::Vector(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| close(*x, *y))
            },
            (Self::Sparse(a), Self::Sparse(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter())
                        .all(|((i, x), (j, y))| i == j && close(*x, *y))
            },
            _ => self == other,
        }
    }


    pub(crate) fn key(&self) -> ValueKey {
        match self {
            Self::Missing => ValueKey::Missing,
            Self::Double(x) if x.is_nan() => ValueKey::Missing,
            Self::Boolean(b) => ValueKey::Boolean(*b),
            Self::Double(x) => ValueKey::Double(x.to_bits()),
            Self::Integer(i) => ValueKey::Integer(*i),
            Self::Vector(v) => {
                ValueKey::Vector(v.iter().map(|x| x.to_bits()).collect())
            },
            Self::Sparse(s) => {
                let entries = s.iter()
                    .map(|(i, x)| (*i, x.to_bits()))
                    .collect();
                ValueKey::Sparse(entries)
            },
        }
    }
}


impl From<bool> for Value {
    fn from(b: bool) -> Self { Self::Boolean(b) }
}


impl From<f64> for Value {
    fn from(x: f64) -> Self { Self::Double(x) }
}


impl From<i64> for Value {
    fn from(i: i64) -> Self { Self::Integer(i) }
}


impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self { Self::Vector(v) }
}


impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_missing() {
            return write!(f, "?");
        }
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Double(x) => write!(f, "{x:.4}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Vector(v) => {
                let v = v.iter()
                    .map(|x| format!("{x:.3}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{v}]")
            },
            Self::Sparse(s) => {
                let v = s.iter()
                    .map(|(i, x)| format!("{i}: {x:.3}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{v}}}")
            },
            Self::Missing => write!(f, "?"),
        }
    }
}


/// Hashable image of a [`Value`], used to intern constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Missing,
    Boolean(bool),
    Double(u64),
    Integer(i64),
    Vector(Vec<u64>),
    Sparse(Vec<(usize, u64)>),
}


/// Column of values of a single type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    /// Raw booleans, see [`RAW_TRUE`], [`RAW_FALSE`] and [`RAW_MISSING`].
    Boolean(Vec<u8>),
    /// Doubles, `NaN` is missing.
    Double(Vec<f64>),
    /// Integers and enumerations.
    Integer(Vec<Option<i64>>),
    /// Row-major dense vectors. A missing row is filled with `NaN`.
    Vector {
        /// Dimension of each row.
        dim: usize,
        /// `dim * len` values.
        values: Vec<f64>,
    },
    /// Sparse vectors.
    Sparse(Vec<Option<SparseVector>>),
}


impl Column {
    /// Construct an empty column for values of type `ty`.
    pub fn with_capacity(ty: Type, capacity: usize) -> Self {
        match ty {
            Type::Boolean => Self::Boolean(Vec::with_capacity(capacity)),
            Type::Double => Self::Double(Vec::with_capacity(capacity)),
            Type::Integer | Type::Enumeration(_)
                => Self::Integer(Vec::with_capacity(capacity)),
            Type::DoubleVector(dim) => {
                let values = Vec::with_capacity(capacity * dim);
                Self::Vector { dim, values }
            },
            Type::SparseVector => Self::Sparse(Vec::with_capacity(capacity)),
        }
    }


    /// Construct a column of `len` missing values.
    pub fn missing(ty: Type, len: usize) -> Self {
        Self::filled(ty, &Value::Missing, len)
    }


    /// Construct a column repeating `value` `len` times.
    pub fn filled(ty: Type, value: &Value, len: usize) -> Self {
        let mut column = Self::with_capacity(ty, len);
        for _ in 0..len {
            column.push(value);
        }
        column
    }


    /// Construct a column from values of type `ty`.
    pub fn from_values<I>(ty: Type, values: I) -> Self
        where I: IntoIterator<Item = Value>
    {
        let values = values.into_iter();
        let mut column = Self::with_capacity(ty, values.size_hint().0);
        for value in values {
            column.push(&value);
        }
        column
    }


    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Vector { dim, values } => {
                if *dim == 0 { 0 } else { values.len() / dim }
            },
            Self::Sparse(v) => v.len(),
        }
    }


    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /// Append `value`.
    /// Panics when `value` does not fit the column type.
    pub fn push(&mut self, value: &Value) {
        match self {
            Self::Boolean(v) => {
                assert!(
                    value.is_missing() || value.as_bool().is_some(),
                    "cannot store {value:?} in a boolean column"
                );
                v.push(value.raw_boolean());
            },
            Self::Double(v) => {
                assert!(
                    value.is_missing() || value.as_f64().is_some(),
                    "cannot store {value:?} in a double column"
                );
                v.push(value.raw_double());
            },
            Self::Integer(v) => {
                assert!(
                    value.is_missing() || value.as_i64().is_some(),
                    "cannot store {value:?} in an integer column"
                );
                v.push(value.as_i64());
            },
            Self::Vector { dim, values } => {
                match value {
                    Value::Vector(x) => {
                        assert_eq!(x.len(), *dim, "vector dimension mismatch");
                        values.extend_from_slice(x);
                    },
                    _ => {
                        assert!(
                            value.is_missing(),
                            "cannot store {value:?} in a vector column"
                        );
                        values.extend(std::iter::repeat(f64::NAN).take(*dim));
                    },
                }
            },
            Self::Sparse(v) => {
                match value {
                    Value::Sparse(x) => { v.push(Some(x.clone())); },
                    _ => {
                        assert!(
                            value.is_missing(),
                            "cannot store {value:?} in a sparse column"
                        );
                        v.push(None);
                    },
                }
            },
        }
    }


    /// Get the value at `row`.
    pub fn get(&self, row: usize) -> Value {
        match self {
            Self::Boolean(v) => match v[row] {
                RAW_FALSE => Value::Boolean(false),
                RAW_TRUE => Value::Boolean(true),
                _ => Value::Missing,
            },
            Self::Double(v) => {
                let x = v[row];
                if x.is_nan() { Value::Missing } else { Value::Double(x) }
            },
            Self::Integer(v) => v[row].map_or(Value::Missing, Value::Integer),
            Self::Vector { dim, values } => {
                let slice = &values[row * dim..(row + 1) * dim];
                if *dim > 0 && slice.iter().all(|x| x.is_nan()) {
                    Value::Missing
                } else {
                    Value::Vector(slice.to_vec())
                }
            },
            Self::Sparse(v) => v[row].clone()
                .map_or(Value::Missing, Value::Sparse),
        }
    }


    /// Raw boolean byte at `row`.
    #[inline(always)]
    pub fn raw_boolean(&self, row: usize) -> u8 {
        match self {
            Self::Boolean(v) => v[row],
            _ => self.get(row).raw_boolean(),
        }
    }


    /// Raw double at `row`, `NaN` when missing or not a scalar.
    #[inline(always)]
    pub fn raw_double(&self, row: usize) -> f64 {
        match self {
            Self::Double(v) => v[row],
            Self::Integer(v) => v[row].map_or(f64::NAN, |i| i as f64),
            Self::Boolean(v) => match v[row] {
                RAW_FALSE => 0.0,
                RAW_TRUE => 1.0,
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }


    /// Row `row` of a vector column.
    pub fn raw_vector(&self, row: usize) -> Option<&[f64]> {
        match self {
            Self::Vector { dim, values } => {
                Some(&values[row * dim..(row + 1) * dim])
            },
            _ => None,
        }
    }


    /// Returns `true` if the value at `row` is missing.
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Boolean(v) => v[row] == RAW_MISSING,
            Self::Double(v) => v[row].is_nan(),
            Self::Integer(v) => v[row].is_none(),
            Self::Vector { .. } | Self::Sparse(_) => self.get(row).is_missing(),
        }
    }


    /// Gather the given rows into a new column.
    pub fn select<I>(&self, rows: I) -> Self
        where I: IntoIterator<Item = usize>
    {
        match self {
            Self::Boolean(v) => Self::Boolean(rows.into_iter().map(|r| v[r]).collect()),
            Self::Double(v) => Self::Double(rows.into_iter().map(|r| v[r]).collect()),
            Self::Integer(v) => Self::Integer(rows.into_iter().map(|r| v[r]).collect()),
            Self::Vector { dim, values } => {
                let values = rows.into_iter()
                    .flat_map(|r| values[r * dim..(r + 1) * dim].iter().copied())
                    .collect();
                Self::Vector { dim: *dim, values }
            },
            Self::Sparse(v) => {
                Self::Sparse(rows.into_iter().map(|r| v[r].clone()).collect())
            },
        }
    }


    /// Memory footprint of the stored values.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len() * mem::size_of::<u8>(),
            Self::Double(v) => v.len() * mem::size_of::<f64>(),
            Self::Integer(v) => v.len() * mem::size_of::<Option<i64>>(),
            Self::Vector { values, .. } => values.len() * mem::size_of::<f64>(),
            Self::Sparse(v) => {
                v.iter()
                    .map(|s| s.as_ref().map_or(0, SparseVector::size_in_bytes))
                    .sum::<usize>()
                    + v.len() * mem::size_of::<Option<SparseVector>>()
            },
        }
    }
}
