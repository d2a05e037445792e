use polars::prelude::*;

use std::collections::HashSet;

use crate::data_type::{Type, Value, Column};
use crate::error::{LuapeError, Result};


/// A named, typed column of a [`Sample`](crate::Sample).
#[derive(Debug, Clone)]
pub struct Feature {
    pub(super) name: String,
    pub(super) ty: Type,
    pub(super) column: Column,
}


impl Feature {
    /// Construct a feature from a column holding values of type `ty`.
    pub fn new<T: ToString>(name: T, ty: Type, column: Column) -> Result<Self> {
        let expected = Column::with_capacity(ty, 0);
        if std::mem::discriminant(&expected) != std::mem::discriminant(&column) {
            return Err(LuapeError::InvalidArgument(format!(
                "column of feature `{}` cannot hold {ty} values",
                name.to_string()
            )));
        }
        Ok(Self { name: name.to_string(), ty, column })
    }


    /// A double feature. `NaN` marks missing values.
    pub fn double<T: ToString>(name: T, values: Vec<f64>) -> Self {
        Self { name: name.to_string(), ty: Type::Double, column: Column::Double(values) }
    }


    /// A boolean feature.
    pub fn boolean<T: ToString>(name: T, values: Vec<Option<bool>>) -> Self {
        let column = Column::from_values(
            Type::Boolean,
            values.into_iter().map(|b| b.map_or(Value::Missing, Value::Boolean)),
        );
        Self { name: name.to_string(), ty: Type::Boolean, column }
    }


    /// An integer feature.
    pub fn integer<T: ToString>(name: T, values: Vec<Option<i64>>) -> Self {
        Self { name: name.to_string(), ty: Type::Integer, column: Column::Integer(values) }
    }


    /// An enumeration feature with values in `0..n`.
    pub fn enumeration<T: ToString>(name: T, n: usize, values: Vec<Option<i64>>)
        -> Result<Self>
    {
        let out_of_range = values.iter()
            .flatten()
            .find(|v| **v < 0 || **v as usize >= n);
        if let Some(v) = out_of_range {
            return Err(LuapeError::InvalidArgument(format!(
                "value {v} is outside of enum<{n}>"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            ty: Type::Enumeration(n),
            column: Column::Integer(values),
        })
    }


    /// Convert a `polars::Series`.
    /// Boolean series stay boolean, every other dtype is cast to `f64`.
    pub fn from_series(series: &Series) -> Result<Self> {
        let name = series.name().to_string();
        if series.dtype() == &DataType::Boolean {
            let values = series.bool()?.into_iter().collect::<Vec<_>>();
            return Ok(Self::boolean(name, values));
        }

        let values = series.cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|x| x.unwrap_or(f64::NAN))
            .collect::<Vec<_>>();
        Ok(Self::double(name, values))
    }


    /// Feature name.
    pub fn name(&self) -> &str {
        &self.name
    }


    /// Feature type.
    pub fn ty(&self) -> Type {
        self.ty
    }


    /// Feature values.
    pub fn column(&self) -> &Column {
        &self.column
    }


    /// Value at `row`.
    pub fn get(&self, row: usize) -> Value {
        self.column.get(row)
    }


    /// Returns the number of items in this feature.
    pub fn len(&self) -> usize {
        self.column.len()
    }


    /// Returns `true` if the feature has no item.
    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }


    /// Append a parsed double. Only used while reading files.
    pub(super) fn append(&mut self, x: f64) {
        if let Column::Double(values) = &mut self.column {
            values.push(x);
        }
    }


    pub(super) fn replace_name<S: ToString>(&mut self, name: S) -> String {
        std::mem::replace(&mut self.name, name.to_string())
    }


    pub(super) fn into_target(self) -> Vec<f64> {
        (0..self.column.len())
            .map(|row| self.column.raw_double(row))
            .collect()
    }


    /// Number of distinct non-missing values.
    pub fn distinct_value_count(&self) -> usize {
        (0..self.len())
            .map(|row| self.get(row))
            .filter(|v| !v.is_missing())
            .map(|v| v.key())
            .collect::<HashSet<_>>()
            .len()
    }


    /// Convert a double feature into another scalar type.
    /// Non-zero doubles become `true`, integral doubles become integers.
    pub fn retype(self, ty: Type) -> Result<Self> {
        if self.ty == ty {
            return Ok(self);
        }
        let values = match &self.column {
            Column::Double(values) => values,
            _ => {
                return Err(LuapeError::type_mismatch(
                    format!("retyping feature `{}`", self.name), Type::Double, self.ty,
                ));
            },
        };

        let column = match ty {
            Type::Boolean => Column::Boolean(
                values.iter()
                    .map(|x| if x.is_nan() { 2 } else { (*x != 0.0) as u8 })
                    .collect()
            ),
            Type::Integer | Type::Enumeration(_) => {
                let mut ints = Vec::with_capacity(values.len());
                for x in values {
                    if x.is_nan() {
                        ints.push(None);
                        continue;
                    }
                    let in_range = match ty {
                        Type::Enumeration(n) => *x >= 0.0 && (*x as usize) < n,
                        _ => true,
                    };
                    if x.fract() != 0.0 || !in_range {
                        return Err(LuapeError::InvalidArgument(format!(
                            "feature `{}` holds {x}, which is not a valid {ty}",
                            self.name
                        )));
                    }
                    ints.push(Some(*x as i64));
                }
                Column::Integer(ints)
            },
            _ => {
                return Err(LuapeError::InvalidArgument(format!(
                    "cannot convert feature `{}` to {ty}", self.name
                )));
            },
        };
        Ok(Self { name: self.name, ty, column })
    }
}
