//! Tree-walking interpreter for definition expressions
//!
//! Identifiers resolve, in order, to lambda parameters, the built-in helpers
//! and finally registry symbols (prefixes included). A lambda captures the
//! values of its free identifiers when it is created, so the resulting
//! conversion functions no longer depend on the registry.

use std::fmt;
use std::sync::Arc;

use num_rational::Rational64;
use rustc_hash::FxHashMap;

use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::error::{Result, UnitError};
use crate::exponents::{Exponent, Exponents};
use crate::registry::UnitRegistry;
use crate::value::{Conversion, Quantity, Value};

/// Runtime object of the expression language
#[derive(Clone)]
pub enum Object {
    Value(Value),
    Str(String),
    Bool(bool),
    Tuple(Vec<Object>),
    Function(Arc<Closure>),
    Helper(Helper),
}

impl Object {
    pub fn type_name(&self) -> String {
        match self {
            Object::Value(v) => v.kind().to_string(),
            Object::Str(_) => "string".to_string(),
            Object::Bool(_) => "bool".to_string(),
            Object::Tuple(_) => "tuple".to_string(),
            Object::Function(_) => "function".to_string(),
            Object::Helper(h) => format!("helper {}", h.name()),
        }
    }

    /// Numeric view; booleans count as 0 and 1
    pub fn into_value(self) -> Result<Value> {
        match self {
            Object::Value(v) => Ok(v),
            Object::Bool(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
            other => Err(UnitError::InvalidArgument(format!(
                "expected a number or quantity, found a {}",
                other.type_name()
            ))),
        }
    }

    /// Truth value, as used for the prefixable flag of a definition
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Object::Bool(b) => Ok(*b),
            Object::Value(v) => v.truthy(),
            Object::Str(s) => Ok(!s.is_empty()),
            Object::Tuple(items) => Ok(!items.is_empty()),
            Object::Function(_) | Object::Helper(_) => Ok(true),
        }
    }

    fn as_str(&self, what: &str) -> Result<&str> {
        match self {
            Object::Str(s) => Ok(s),
            other => Err(UnitError::InvalidArgument(format!(
                "{what} must be a string, found a {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Value(v) => write!(f, "{v:?}"),
            Object::Str(s) => write!(f, "{s:?}"),
            Object::Bool(b) => write!(f, "{b}"),
            Object::Tuple(items) => f.debug_list().entries(items).finish(),
            Object::Function(c) => write!(f, "<lambda {}>", c.params.join(", ")),
            Object::Helper(h) => write!(f, "<helper {}>", h.name()),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Built-in functions available to definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    Exp,
    Log,
    Log10,
    Sqrt,
    Quantity,
    ScalarUnit,
}

impl Helper {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "exp" => Helper::Exp,
            "log" => Helper::Log,
            "log10" => Helper::Log10,
            "sqrt" => Helper::Sqrt,
            "Quantity" => Helper::Quantity,
            "ScalarUnit" => Helper::ScalarUnit,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Helper::Exp => "exp",
            Helper::Log => "log",
            Helper::Log10 => "log10",
            Helper::Sqrt => "sqrt",
            Helper::Quantity => "Quantity",
            Helper::ScalarUnit => "ScalarUnit",
        }
    }

    fn call(self, args: Vec<Object>) -> Result<Object> {
        let (min, max) = match self {
            Helper::Exp | Helper::Log10 | Helper::Sqrt => (1, 1),
            Helper::Log => (1, 2),
            Helper::Quantity => (2, 3),
            Helper::ScalarUnit => (2, 4),
        };
        if args.len() < min || args.len() > max {
            return Err(UnitError::InvalidArgument(format!(
                "{}() takes {} to {} arguments ({} given)",
                self.name(),
                min,
                max,
                args.len()
            )));
        }

        let mut args = args.into_iter();
        let mut next = || args.next();
        let first = next().map(Object::into_value).transpose()?;
        let first = first.unwrap_or(Value::Number(f64::NAN));

        let value = match self {
            Helper::Exp => Value::Number(first.dimensionless_value()?.exp()),
            Helper::Log10 => Value::Number(first.dimensionless_value()?.log10()),
            Helper::Log => {
                let x = first.dimensionless_value()?;
                match next() {
                    Some(base) => Value::Number(x.log(base.into_value()?.dimensionless_value()?)),
                    None => Value::Number(x.ln()),
                }
            }
            Helper::Sqrt => first.pow_exponent(Exponent::from(Rational64::new(1, 2)))?,
            Helper::Quantity | Helper::ScalarUnit => {
                let number = first.dimensionless_value()?;
                let dimension = match next() {
                    Some(d) => Exponents::parse(d.as_str("dimension")?)?,
                    None => Exponents::new(),
                };
                let display = match next() {
                    Some(d) => Exponents::parse(d.as_str("display unit")?)?,
                    None => Exponents::new(),
                };
                if self == Helper::Quantity {
                    Value::Quantity(Quantity::new(number, dimension, display))
                } else {
                    let prefixable = match next() {
                        Some(flag) => flag.truthy()?,
                        None => false,
                    };
                    Value::Quantity(Quantity::scalar_unit(number, dimension, display, prefixable))
                }
            }
        };
        Ok(Object::Value(value))
    }
}

// ============================================================================
// CLOSURES
// ============================================================================

/// A lambda together with the values of its free identifiers
pub struct Closure {
    params: Vec<String>,
    body: Arc<Expr>,
    captured: FxHashMap<String, Object>,
}

impl Closure {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn call(&self, args: Vec<Object>) -> Result<Object> {
        if args.len() != self.params.len() {
            return Err(UnitError::InvalidArgument(format!(
                "lambda takes {} argument(s) ({} given)",
                self.params.len(),
                args.len()
            )));
        }
        let mut locals = self.captured.clone();
        locals.extend(self.params.iter().cloned().zip(args));
        Evaluator {
            registry: None,
            locals,
        }
        .eval(&self.body)
    }

    /// Wrap a one-argument lambda as a conversion function
    pub fn into_conversion(self: Arc<Self>) -> Conversion {
        Arc::new(move |value: &Value| {
            self.call(vec![Object::Value(value.clone())])?.into_value()
        })
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

/// Evaluate `expr` against `registry`
pub fn evaluate(expr: &Expr, registry: &UnitRegistry) -> Result<Object> {
    Evaluator {
        registry: Some(registry),
        locals: FxHashMap::default(),
    }
    .eval(expr)
}

struct Evaluator<'r> {
    registry: Option<&'r UnitRegistry>,
    locals: FxHashMap<String, Object>,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Object> {
        match expr {
            Expr::Number(n) => Ok(Object::Value(Value::Number(*n))),
            Expr::Str(s) => Ok(Object::Str(s.clone())),
            Expr::Bool(b) => Ok(Object::Bool(*b)),
            Expr::Name { name, .. } => self.resolve(name),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr)?.into_value()?;
                let result = match op {
                    UnaryOp::Neg => value.neg()?,
                    UnaryOp::Pos => match value {
                        Value::Lambda(_) => return Err(UnitError::quantity_only("unary plus")),
                        other => other,
                    },
                };
                Ok(Object::Value(result))
            }
            Expr::Binary { op, left, right } => {
                let a = self.eval(left)?.into_value()?;
                let b = self.eval(right)?.into_value()?;
                let result = match op {
                    BinaryOp::Add => a.add(&b)?,
                    BinaryOp::Sub => a.sub(&b)?,
                    BinaryOp::Mul => a.mul(&b)?,
                    BinaryOp::Div => a.div(&b)?,
                    BinaryOp::FloorDiv => a.floor_div(&b)?,
                    BinaryOp::Mod => a.rem(&b)?,
                    BinaryOp::Pow => a.pow(&b)?,
                };
                Ok(Object::Value(result))
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>>>()?;
                match callee {
                    Object::Function(closure) => closure.call(args),
                    Object::Helper(helper) => helper.call(args),
                    other => Err(UnitError::InvalidArgument(format!(
                        "a {} isn't callable",
                        other.type_name()
                    ))),
                }
            }
            Expr::Tuple(items) => Ok(Object::Tuple(
                items
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Expr::Lambda { params, body } => {
                let mut captured = FxHashMap::default();
                for name in expr.free_names() {
                    let value = self.resolve(&name)?;
                    captured.insert(name, value);
                }
                Ok(Object::Function(Arc::new(Closure {
                    params: params.clone(),
                    body: Arc::clone(body),
                    captured,
                })))
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<Object> {
        if let Some(local) = self.locals.get(name) {
            return Ok(local.clone());
        }
        if name == "pi" {
            return Ok(Object::Value(Value::Number(std::f64::consts::PI)));
        }
        if let Some(helper) = Helper::from_name(name) {
            return Ok(Object::Helper(helper));
        }
        match self.registry {
            Some(registry) => registry.lookup(name).map(Object::Value),
            None => Err(UnitError::UnknownUnit(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::value::ValueKind;

    fn registry() -> UnitRegistry {
        let metre = Quantity::new(1.0, Exponents::symbol("L"), Exponents::new()).bind_unit("m", true);
        let kelvin =
            Quantity::new(1.0, Exponents::symbol("Theta"), Exponents::new()).bind_unit("K", false);
        UnitRegistry::from_entries(
            Config::default(),
            [
                ("m".to_string(), Value::Quantity(metre)),
                ("K".to_string(), Value::Quantity(kelvin)),
            ],
            Vec::new(),
        )
    }

    fn eval(source: &str) -> Result<Object> {
        evaluate(&Expr::parse(source)?, &registry())
    }

    fn value(source: &str) -> Value {
        eval(source).unwrap().into_value().unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(value("1 + 2*3"), Value::Number(7.0));
        assert_eq!(value("7 // 2"), Value::Number(3.0));
        assert_eq!(value("-7 % 3"), Value::Number(2.0));
        assert_eq!(value("2**-1"), Value::Number(0.5));
        assert_eq!(value("True + 1"), Value::Number(2.0));
    }

    #[test]
    fn test_names_resolve_through_registry_with_prefixes() {
        let km = value("km");
        assert_eq!(km.kind(), ValueKind::ScalarUnit);
        assert_eq!(km.value().unwrap(), 1000.0);
        assert!(matches!(eval("furlong"), Err(UnitError::UnknownUnit(_))));
    }

    #[test]
    fn test_helpers() {
        assert!((value("pi").value().unwrap() - std::f64::consts::PI).abs() < 1e-15);
        assert!((value("exp(1)").value().unwrap() - std::f64::consts::E).abs() < 1e-12);
        assert!((value("log(100, 10)").value().unwrap() - 2.0).abs() < 1e-12);
        assert!((value("log10(1000)").value().unwrap() - 3.0).abs() < 1e-12);
        assert!(matches!(eval("exp(m)"), Err(UnitError::DimensionMismatch { .. })));

        let side = value("sqrt(4*m**2)");
        assert_eq!(side.dimension(), Exponents::symbol("L"));
        assert!((side.value().unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_quantity_and_scalar_unit_helpers() {
        let q = value("Quantity(3, 'L/T', 'm/s')");
        assert_eq!(q.kind(), ValueKind::Quantity);
        assert_eq!(q.dimension(), Exponents::parse("L/T").unwrap());

        let u = value("ScalarUnit(1, 'M', 'kg', True)");
        assert_eq!(u.kind(), ValueKind::ScalarUnit);
        assert!(u.prefixable());
        assert!(!value("ScalarUnit(1, 'M')").prefixable());

        assert!(matches!(eval("Quantity(1)"), Err(UnitError::InvalidArgument(_))));
        assert!(matches!(eval("Quantity(1, 2)"), Err(UnitError::InvalidArgument(_))));
    }

    #[test]
    fn test_lambda_captures_at_creation() {
        let object = eval("lambda n: (n + 273.15)*K").unwrap();
        let Object::Function(closure) = object else {
            panic!("expected a function");
        };
        assert_eq!(closure.arity(), 1);
        let result = closure
            .call(vec![Object::Value(Value::Number(25.0))])
            .unwrap()
            .into_value()
            .unwrap();
        assert!((result.value().unwrap() - 298.15).abs() < 1e-9);
        assert_eq!(result.dimension(), Exponents::symbol("Theta"));
    }

    #[test]
    fn test_lambda_with_unknown_free_name_fails_early() {
        assert!(matches!(eval("lambda n: n*parsec"), Err(UnitError::UnknownUnit(_))));
    }

    #[test]
    fn test_calling_a_lambda_inline() {
        assert_eq!(value("(lambda x, y: x*y)(3, 4)"), Value::Number(12.0));
        assert!(eval("(lambda x: x)(1, 2)").is_err());
        assert!(eval("m(1)").is_err());
    }

    #[test]
    fn test_tuples_and_truthiness() {
        let Object::Tuple(items) = eval("m, False").unwrap() else {
            panic!("expected a tuple");
        };
        assert_eq!(items.len(), 2);
        assert!(!items[1].truthy().unwrap());
        assert!(Object::Value(Value::Number(2.0)).truthy().unwrap());
    }
}
