use serde::{Serialize, Deserialize};

use crate::data_type::{
    Type,
    Value,
    Column,
    RAW_FALSE,
    RAW_TRUE,
    RAW_MISSING,
};
use crate::cache::SampleVector;
use crate::error::{LuapeError, Result};


/// Pure functions applied by function nodes.
/// Any missing argument yields a missing result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Function {
    /// `x >= threshold`.
    Stump {
        /// Threshold of the stump.
        threshold: f64,
    },
    /// Boolean negation.
    Not,
    /// Boolean conjunction.
    And,
    /// Boolean equality.
    Equal,
    /// `a + b`.
    Add,
    /// `a - b`.
    Sub,
    /// `a * b`.
    Mul,
    /// `a / b`, missing when `b == 0`.
    Div,
    /// `a > b`.
    GreaterThan,
    /// `x == value` for enumerations.
    EqualsConstantEnum(i64),
    /// Natural logarithm, missing for non-positive inputs.
    Log,
}


#[inline(always)]
fn stump(x: f64, threshold: f64) -> u8 {
    if x.is_nan() {
        RAW_MISSING
    } else if x >= threshold {
        RAW_TRUE
    } else {
        RAW_FALSE
    }
}


#[inline(always)]
fn not(b: u8) -> u8 {
    match b {
        RAW_FALSE => RAW_TRUE,
        RAW_TRUE => RAW_FALSE,
        _ => RAW_MISSING,
    }
}


#[inline(always)]
fn and(a: u8, b: u8) -> u8 {
    if a == RAW_MISSING || b == RAW_MISSING {
        RAW_MISSING
    } else {
        a & b
    }
}


#[inline(always)]
fn equal(a: u8, b: u8) -> u8 {
    if a == RAW_MISSING || b == RAW_MISSING {
        RAW_MISSING
    } else if a == b {
        RAW_TRUE
    } else {
        RAW_FALSE
    }
}


#[inline(always)]
fn greater(a: f64, b: f64) -> u8 {
    if a.is_nan() || b.is_nan() {
        RAW_MISSING
    } else if a > b {
        RAW_TRUE
    } else {
        RAW_FALSE
    }
}


#[inline(always)]
fn divide(a: f64, b: f64) -> f64 {
    if b == 0.0 { f64::NAN } else { a / b }
}


#[inline(always)]
fn log(x: f64) -> f64 {
    if x > 0.0 { x.ln() } else { f64::NAN }
}


fn boolean_value(raw: u8) -> Value {
    match raw {
        RAW_FALSE => Value::Boolean(false),
        RAW_TRUE => Value::Boolean(true),
        _ => Value::Missing,
    }
}


fn double_value(x: f64) -> Value {
    if x.is_nan() { Value::Missing } else { Value::Double(x) }
}


impl Function {
    /// Functions without parameters, used to enumerate candidates.
    pub fn templates() -> Vec<Function> {
        vec![
            Self::Not,
            Self::And,
            Self::Equal,
            Self::Add,
            Self::Sub,
            Self::Mul,
            Self::Div,
            Self::GreaterThan,
            Self::Log,
        ]
    }


    /// Short name, also used as a statistics key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stump { .. } => "stump",
            Self::Not => "not",
            Self::And => "and",
            Self::Equal => "equal",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::GreaterThan => "greater",
            Self::EqualsConstantEnum(_) => "equals",
            Self::Log => "log",
        }
    }


    /// Number of arguments.
    pub fn arity(&self) -> usize {
        match self {
            Self::Stump { .. }
            | Self::Not
            | Self::EqualsConstantEnum(_)
            | Self::Log => 1,
            _ => 2,
        }
    }


    /// Returns `true` if the argument order does not matter.
    pub fn is_commutative(&self) -> bool {
        matches!(self, Self::And | Self::Equal | Self::Add | Self::Mul)
    }


    /// Returns `true` if argument `index` may have type `ty`.
    pub fn accepts(&self, index: usize, ty: Type) -> bool {
        if index >= self.arity() {
            return false;
        }
        match self {
            Self::Not | Self::And | Self::Equal => ty.is_boolean(),
            Self::EqualsConstantEnum(_) => {
                ty.is_enumeration() || ty == Type::Integer
            },
            _ => ty.is_numeric(),
        }
    }


    /// Output type of the function.
    pub fn output_type(&self) -> Type {
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Log
                => Type::Double,
            _ => Type::Boolean,
        }
    }


    /// Check the argument types and infer the output type.
    pub fn initialize(&self, inputs: &[Type]) -> Result<Type> {
        if inputs.len() != self.arity() {
            return Err(LuapeError::InvalidArgument(format!(
                "`{}` takes {} argument(s), {} given",
                self.name(), self.arity(), inputs.len()
            )));
        }
        for (i, ty) in inputs.iter().enumerate() {
            if !self.accepts(i, *ty) {
                let expected = match self {
                    Self::Not | Self::And | Self::Equal => "boolean",
                    Self::EqualsConstantEnum(_) => "enumeration",
                    _ => "double or integer",
                };
                return Err(LuapeError::type_mismatch(
                    format!("argument {i} of `{}`", self.name()),
                    expected,
                    *ty,
                ));
            }
        }
        Ok(self.output_type())
    }


    pub(crate) fn parameter_bits(&self) -> Option<u64> {
        match self {
            Self::Stump { threshold } => Some(threshold.to_bits()),
            Self::EqualsConstantEnum(v) => Some(*v as u64),
            _ => None,
        }
    }


    /// Apply the function to one tuple of arguments.
    pub fn compute(&self, args: &[Value]) -> Value {
        assert_eq!(args.len(), self.arity(), "wrong number of arguments");
        match self {
            Self::Stump { threshold } => {
                boolean_value(stump(args[0].raw_double(), *threshold))
            },
            Self::Not => boolean_value(not(args[0].raw_boolean())),
            Self::And => {
                boolean_value(and(args[0].raw_boolean(), args[1].raw_boolean()))
            },
            Self::Equal => {
                boolean_value(equal(args[0].raw_boolean(), args[1].raw_boolean()))
            },
            Self::Add => double_value(args[0].raw_double() + args[1].raw_double()),
            Self::Sub => double_value(args[0].raw_double() - args[1].raw_double()),
            Self::Mul => double_value(args[0].raw_double() * args[1].raw_double()),
            Self::Div => {
                double_value(divide(args[0].raw_double(), args[1].raw_double()))
            },
            Self::GreaterThan => {
                boolean_value(greater(args[0].raw_double(), args[1].raw_double()))
            },
            Self::EqualsConstantEnum(v) => {
                boolean_value(equals_value(args[0].raw_double(), *v))
            },
            Self::Log => double_value(log(args[0].raw_double())),
        }
    }


    /// Apply the function to position-aligned argument vectors.
    pub fn compute_bulk(&self, args: &[SampleVector]) -> Column {
        assert_eq!(args.len(), self.arity(), "wrong number of arguments");
        let unary_double = |f: &dyn Fn(f64) -> f64| {
            args[0].iter().map(|s| f(s.raw_double())).collect::<Vec<_>>()
        };
        let binary_double = |f: &dyn Fn(f64, f64) -> f64| {
            args[0].iter()
                .zip(args[1].iter())
                .map(|(a, b)| f(a.raw_double(), b.raw_double()))
                .collect::<Vec<_>>()
        };
        let binary_boolean = |f: &dyn Fn(u8, u8) -> u8| {
            args[0].iter()
                .zip(args[1].iter())
                .map(|(a, b)| f(a.raw_boolean(), b.raw_boolean()))
                .collect::<Vec<_>>()
        };

        match self {
            Self::Stump { threshold } => {
                let t = *threshold;
                Column::Boolean(
                    args[0].iter().map(|s| stump(s.raw_double(), t)).collect()
                )
            },
            Self::Not => Column::Boolean(
                args[0].iter().map(|s| not(s.raw_boolean())).collect()
            ),
            Self::And => Column::Boolean(binary_boolean(&and)),
            Self::Equal => Column::Boolean(binary_boolean(&equal)),
            Self::Add => Column::Double(binary_double(&|a: f64, b: f64| a + b)),
            Self::Sub => Column::Double(binary_double(&|a: f64, b: f64| a - b)),
            Self::Mul => Column::Double(binary_double(&|a: f64, b: f64| a * b)),
            Self::Div => Column::Double(binary_double(&divide)),
            Self::GreaterThan => Column::Boolean(
                args[0].iter()
                    .zip(args[1].iter())
                    .map(|(a, b)| greater(a.raw_double(), b.raw_double()))
                    .collect()
            ),
            Self::EqualsConstantEnum(v) => Column::Boolean(
                args[0].iter().map(|s| equals_value(s.raw_double(), *v)).collect()
            ),
            Self::Log => Column::Double(unary_double(&log)),
        }
    }


    /// Render an application of `self` to already rendered arguments.
    pub fn to_short_string(&self, args: &[String]) -> String {
        match self {
            Self::Stump { threshold } => format!("{} >= {threshold:.4}", args[0]),
            Self::Not => format!("!{}", args[0]),
            Self::And => format!("({} && {})", args[0], args[1]),
            Self::Equal => format!("({} == {})", args[0], args[1]),
            Self::Add => format!("({} + {})", args[0], args[1]),
            Self::Sub => format!("({} - {})", args[0], args[1]),
            Self::Mul => format!("({} * {})", args[0], args[1]),
            Self::Div => format!("({} / {})", args[0], args[1]),
            Self::GreaterThan => format!("({} > {})", args[0], args[1]),
            Self::EqualsConstantEnum(v) => format!("({} == {v})", args[0]),
            Self::Log => format!("log({})", args[0]),
        }
    }
}


#[inline(always)]
fn equals_value(x: f64, value: i64) -> u8 {
    if x.is_nan() {
        RAW_MISSING
    } else if x == value as f64 {
        RAW_TRUE
    } else {
        RAW_FALSE
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stump_is_inclusive() {
        let f = Function::Stump { threshold: 2.5 };
        assert_eq!(f.compute(&[Value::Double(2.5)]), Value::Boolean(true));
        assert_eq!(f.compute(&[Value::Double(2.4)]), Value::Boolean(false));
        assert_eq!(f.compute(&[Value::Missing]), Value::Missing);
    }


    #[test]
    fn initialize_rejects_wrong_types() {
        assert!(Function::And.initialize(&[Type::Boolean, Type::Double]).is_err());
        assert!(Function::Add.initialize(&[Type::Double]).is_err());
        assert_eq!(
            Function::GreaterThan.initialize(&[Type::Integer, Type::Double]).ok(),
            Some(Type::Boolean)
        );
    }


    #[test]
    fn division_by_zero_is_missing() {
        let value = Function::Div.compute(&[Value::Double(1.0), Value::Double(0.0)]);
        assert!(value.is_missing());
    }
}
