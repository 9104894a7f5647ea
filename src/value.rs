use std::{fmt, ops::RangeInclusive, rc::Rc};

use thiserror::Error;

/// Opaque value handle stored in bindings.
///
/// The engine never looks inside a value beyond the queries below; the
/// accessors are fallible so a type mismatch surfaces as a diagnostic.
#[derive(Clone, PartialEq)]
pub struct Value(pub Rc<ValueKind>);

#[derive(Clone, PartialEq)]
pub enum ValueKind {
    /// A slot that exists but has never been given a value.
    Undefined,
    Bool(bool),
    Int(i64),
    Real(f64),
    String(String),
    Object(ObjectValue),
    FunctionHandle(String),
    Anonymous(AnonymousFunction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnonymousFunction {
    pub params: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} is below the minimum {min}")]
    BelowMin { value: String, min: String },
    #[error("value {value} is above the maximum {max}")]
    AboveMax { value: String, max: String },
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn undefined() -> Self {
        Self::new(ValueKind::Undefined)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn real(value: f64) -> Self {
        Self::new(ValueKind::Real(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn object(class_name: impl Into<String>) -> Self {
        Self::new(ValueKind::Object(ObjectValue {
            class_name: class_name.into(),
        }))
    }

    pub fn function_handle(name: impl Into<String>) -> Self {
        Self::new(ValueKind::FunctionHandle(name.into()))
    }

    pub fn anonymous(params: Vec<String>, body: impl Into<String>) -> Self {
        Self::new(ValueKind::Anonymous(AnonymousFunction {
            params,
            body: body.into(),
        }))
    }

    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Undefined => "undefined",
            ValueKind::Bool(_) => "bool",
            ValueKind::Int(_) => "int",
            ValueKind::Real(_) => "double",
            ValueKind::String(_) => "string",
            ValueKind::Object(_) => "object",
            ValueKind::FunctionHandle(_) | ValueKind::Anonymous(_) => "function handle",
        }
    }

    /// True for anything the resolver should report as a variable: constants,
    /// object instances and callable handles.
    pub fn is_materialized(&self) -> bool {
        !matches!(&*self.0, ValueKind::Undefined)
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            &*self.0,
            ValueKind::FunctionHandle(_) | ValueKind::Anonymous(_)
        )
    }

    pub fn is_object(&self) -> bool {
        matches!(&*self.0, ValueKind::Object(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(&*self.0, ValueKind::String(_))
    }

    pub fn as_string(&self) -> Result<&str, ValueError> {
        match &*self.0 {
            ValueKind::String(s) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match &*self.0 {
            ValueKind::Bool(b) => Ok(*b),
            ValueKind::Int(n) => Ok(*n != 0),
            ValueKind::Real(x) if !x.is_nan() => Ok(*x != 0.0),
            _ => Err(self.mismatch("logical value")),
        }
    }

    pub fn as_int_in_range(&self, range: RangeInclusive<i64>) -> Result<i64, ValueError> {
        let value = match &*self.0 {
            ValueKind::Int(n) => *n,
            ValueKind::Bool(b) => i64::from(*b),
            ValueKind::Real(x) if x.fract() == 0.0 && x.is_finite() => *x as i64,
            _ => return Err(self.mismatch("integer value")),
        };
        if value < *range.start() {
            return Err(ValueError::BelowMin {
                value: value.to_string(),
                min: range.start().to_string(),
            });
        }
        if value > *range.end() {
            return Err(ValueError::AboveMax {
                value: value.to_string(),
                max: range.end().to_string(),
            });
        }
        Ok(value)
    }

    pub fn as_real_in_range(&self, min: f64, max: f64) -> Result<f64, ValueError> {
        let value = match &*self.0 {
            ValueKind::Real(x) => *x,
            ValueKind::Int(n) => *n as f64,
            ValueKind::Bool(b) => f64::from(u8::from(*b)),
            _ => return Err(self.mismatch("scalar value")),
        };
        if value.is_nan() {
            return Err(self.mismatch("number, not NaN"));
        }
        if value < min {
            return Err(ValueError::BelowMin {
                value: value.to_string(),
                min: min.to_string(),
            });
        }
        if value > max {
            return Err(ValueError::AboveMax {
                value: value.to_string(),
                max: max.to_string(),
            });
        }
        Ok(value)
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::Mismatch {
            expected,
            found: self.type_name(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::String(s) => write!(f, "\"{s}\""),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Undefined => write!(f, "<undefined>"),
            ValueKind::Bool(true) => write!(f, "1"),
            ValueKind::Bool(false) => write!(f, "0"),
            ValueKind::Int(n) => write!(f, "{n}"),
            ValueKind::Real(x) => write!(f, "{x}"),
            ValueKind::String(s) => write!(f, "{s}"),
            ValueKind::Object(obj) => write!(f, "<object {}>", obj.class_name),
            ValueKind::FunctionHandle(name) => write!(f, "@{name}"),
            ValueKind::Anonymous(fun) => write!(f, "@({}) {}", fun.params.join(", "), fun.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_is_not_materialized() {
        assert!(!Value::undefined().is_materialized());
        assert!(Value::int(0).is_materialized());
        assert!(Value::object("inventory").is_materialized());
    }

    #[test]
    fn integral_reals_convert_to_int() {
        assert_eq!(Value::real(4.0).as_int_in_range(0..=10), Ok(4));
        assert!(matches!(
            Value::real(4.5).as_int_in_range(0..=10),
            Err(ValueError::Mismatch { .. })
        ));
    }

    #[test]
    fn nan_is_outside_every_real_range() {
        let err = Value::real(f64::NAN).as_real_in_range(0.0, 1.0).unwrap_err();
        assert_eq!(err.to_string(), "expected number, not NaN, found double");
        assert_eq!(Value::real(1.0).as_real_in_range(0.0, 1.0), Ok(1.0));
    }

    #[test]
    fn range_violations_name_the_bound() {
        let err = Value::int(20).as_int_in_range(0..=16).unwrap_err();
        assert_eq!(
            err,
            ValueError::AboveMax {
                value: "20".into(),
                max: "16".into()
            }
        );
    }

    #[test]
    fn strings_do_not_coerce_to_bool() {
        let err = Value::string("yes").as_bool().unwrap_err();
        assert_eq!(err.to_string(), "expected logical value, found string");
    }
}
