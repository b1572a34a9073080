//! Arithmetic and comparison across the four operand kinds
//!
//! | left \ right | Number | Quantity | ScalarUnit | LambdaUnit            |
//! |--------------|--------|----------|------------|-----------------------|
//! | Number       | N      | Q        | Q          | `*`: to_quantity, `/`: to_number |
//! | Quantity     | Q      | Q or N   | Q or N     | `*`: dimensionless Q only, `/`: to_number |
//! | ScalarUnit   | Q      | Q or N   | S or N     | `*`: unsupported, `/`: to_number |
//! | LambdaUnit   | unsupported on the left of `*` and `/`                      |
//!
//! Products and quotients whose dimension cancels collapse to plain numbers.
//! Sums, differences, comparisons and modulo need operands of equal
//! dimension. Every operation returns a new value; lambda units only take
//! part in products, quotients and integral powers of magnitude one.

use std::cmp::Ordering;
use std::ops;
use std::sync::Arc;

use super::{LambdaUnit, Quantity, UnitTag, Value};
use crate::error::{Result, UnitError};
use crate::exponents::{Exponent, Exponents};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scaling {
    Mul,
    Div,
}

impl Scaling {
    fn name(self) -> &'static str {
        match self {
            Scaling::Mul => "multiplication",
            Scaling::Div => "division",
        }
    }

    fn numbers(self, a: f64, b: f64) -> f64 {
        match self {
            Scaling::Mul => a * b,
            Scaling::Div => a / b,
        }
    }

    fn exponents(self, a: &Exponents, b: &Exponents) -> Exponents {
        match self {
            Scaling::Mul => a + b,
            Scaling::Div => a - b,
        }
    }
}

/// Compound-assignment operators (`+=`, `*=`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

fn lambda_on_left(operation: &str) -> UnitError {
    UnitError::UnsupportedOperation {
        operation: operation.to_string(),
        reason: "LambdaUnit can only appear as the right-hand factor of a product, \
                 or as the divisor of a quotient"
            .to_string(),
    }
}

/// Number of a dimensionless value, or the value of a quantity of any dimension
fn operand_parts(value: &Value) -> (f64, Exponents, Exponents) {
    match value {
        Value::Number(n) => (*n, Exponents::new(), Exponents::new()),
        Value::Quantity(q) => (q.value, q.dimension.clone(), q.display_unit.clone()),
        // callers reject lambda units before asking for parts
        Value::Lambda(l) => (f64::NAN, l.dimension.clone(), l.display_unit.clone()),
    }
}

impl Value {
    // ========================================================================
    // PRODUCTS AND QUOTIENTS
    // ========================================================================

    pub fn mul(&self, rhs: &Value) -> Result<Value> {
        self.scale_by(rhs, Scaling::Mul)
    }

    pub fn div(&self, rhs: &Value) -> Result<Value> {
        self.scale_by(rhs, Scaling::Div)
    }

    fn scale_by(&self, rhs: &Value, op: Scaling) -> Result<Value> {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op.numbers(*a, *b))),
            (Value::Lambda(_), _) => Err(lambda_on_left(op.name())),
            (_, Value::Lambda(unit)) => match op {
                Scaling::Mul => unit.apply_to(self),
                Scaling::Div => unit.invert_from(self),
            },
            (Value::Number(a), Value::Quantity(q)) => {
                let display = op.exponents(&Exponents::new(), &q.display_unit);
                let dimension = op.exponents(&Exponents::new(), &q.dimension);
                Ok(Value::Quantity(Quantity::new(
                    op.numbers(*a, q.value),
                    dimension,
                    display,
                )))
            }
            (Value::Quantity(q), Value::Number(b)) => {
                Ok(Value::Quantity(q.with_value(op.numbers(q.value, *b))))
            }
            (Value::Quantity(a), Value::Quantity(b)) => {
                let value = op.numbers(a.value, b.value);
                let dimension = op.exponents(&a.dimension, &b.dimension);
                if dimension.is_empty() {
                    return Ok(Value::Number(value));
                }
                let display = op.exponents(&a.display_unit, &b.display_unit);
                let unit = (a.is_unit() && b.is_unit()).then(UnitTag::default);
                Ok(Value::Quantity(Quantity {
                    value,
                    dimension,
                    display_unit: display,
                    unit,
                }))
            }
        }
    }

    // ========================================================================
    // SUMS AND DIFFERENCES
    // ========================================================================

    pub fn add(&self, rhs: &Value) -> Result<Value> {
        self.combine(rhs, "addition", |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value> {
        self.combine(rhs, "subtraction", |a, b| a - b)
    }

    /// Homogeneous binary operation: equal dimensions, left display wins
    fn combine(&self, rhs: &Value, operation: &str, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
        if let (Value::Number(a), Value::Number(b)) = (self, rhs) {
            return Ok(Value::Number(f(*a, *b)));
        }
        if matches!(self, Value::Lambda(_)) || matches!(rhs, Value::Lambda(_)) {
            return Err(UnitError::quantity_only(operation));
        }
        let (a, dim_a, display_a) = operand_parts(self);
        let (b, dim_b, display_b) = operand_parts(rhs);
        if dim_a != dim_b {
            return Err(UnitError::dimension_mismatch(operation, &dim_a, &dim_b));
        }
        let display = if matches!(self, Value::Number(_)) {
            display_b
        } else {
            display_a
        };
        Ok(Value::Quantity(Quantity::new(f(a, b), dim_a, display)))
    }

    // ========================================================================
    // UNARY OPERATIONS
    // ========================================================================

    pub fn neg(&self) -> Result<Value> {
        self.map_value("negation", |v| -v)
    }

    pub fn abs(&self) -> Result<Value> {
        self.map_value("absolute value", f64::abs)
    }

    fn map_value(&self, operation: &str, f: impl Fn(f64) -> f64) -> Result<Value> {
        match self {
            Value::Number(n) => Ok(Value::Number(f(*n))),
            Value::Quantity(q) => Ok(Value::Quantity(q.with_value(f(q.value)))),
            Value::Lambda(_) => Err(UnitError::quantity_only(operation)),
        }
    }

    /// `value != 0`
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Value::Number(n) => Ok(*n != 0.0),
            Value::Quantity(q) => Ok(q.value != 0.0),
            Value::Lambda(_) => Err(UnitError::quantity_only("truth value")),
        }
    }

    // ========================================================================
    // POWERS
    // ========================================================================

    /// Raise to a dimensionless power
    pub fn pow(&self, exponent: &Value) -> Result<Value> {
        let power = match exponent {
            Value::Number(n) => *n,
            Value::Quantity(q) if q.dimension.is_empty() => q.value,
            Value::Quantity(q) => {
                return Err(UnitError::dimension_mismatch(
                    "exponentiation",
                    &q.dimension,
                    &Exponents::new(),
                ));
            }
            Value::Lambda(_) => return Err(UnitError::quantity_only("exponentiation")),
        };
        self.pow_exponent(Exponent::from_f64(power))
    }

    /// Raise to an exact or floating-point exponent
    pub fn pow_exponent(&self, exponent: Exponent) -> Result<Value> {
        if exponent.is_zero() {
            return Ok(Value::Number(1.0));
        }
        match self {
            Value::Number(n) => Ok(Value::Number(raise(*n, exponent))),
            Value::Quantity(q) => Ok(Value::Quantity(Quantity {
                value: raise(q.value, exponent),
                dimension: q.dimension.scale(exponent),
                display_unit: q.display_unit.scale(exponent),
                unit: q.unit.as_ref().map(|_| UnitTag::default()),
            })),
            Value::Lambda(unit) => {
                if exponent == Exponent::ONE {
                    Ok(self.clone())
                } else if exponent == Exponent::Int(-1) {
                    Ok(Value::Lambda(unit.inverse()))
                } else {
                    Err(UnitError::UnsupportedOperation {
                        operation: "exponentiation".to_string(),
                        reason: format!(
                            "a LambdaUnit can only be raised to 1, 0 or -1 (not {exponent})"
                        ),
                    })
                }
            }
        }
    }

    // ========================================================================
    // COMPARISON, MODULO, FLOOR DIVISION
    // ========================================================================

    /// Order two values of equal dimension
    pub fn try_cmp(&self, rhs: &Value) -> Result<Option<Ordering>> {
        let (a, b) = self.homogeneous_numbers(rhs, "comparison")?;
        Ok(a.partial_cmp(&b))
    }

    /// Remainder with the sign of the divisor; keeps the left dimension and display
    pub fn rem(&self, rhs: &Value) -> Result<Value> {
        let (a, b) = self.homogeneous_numbers(rhs, "modulo")?;
        let remainder = a - b * (a / b).floor();
        Ok(match self {
            Value::Quantity(q) => Value::Quantity(q.with_value(remainder)),
            _ if matches!(rhs, Value::Number(_)) => Value::Number(remainder),
            // a plain number modulo a dimensionless quantity
            _ => Value::Quantity(Quantity::new(remainder, Exponents::new(), Exponents::new())),
        })
    }

    /// `floor(a / b)`; always a plain number
    pub fn floor_div(&self, rhs: &Value) -> Result<Value> {
        let (a, b) = self.homogeneous_numbers(rhs, "floor division")?;
        Ok(Value::Number((a / b).floor()))
    }

    pub fn divmod(&self, rhs: &Value) -> Result<(Value, Value)> {
        Ok((self.floor_div(rhs)?, self.rem(rhs)?))
    }

    fn homogeneous_numbers(&self, rhs: &Value, operation: &str) -> Result<(f64, f64)> {
        if matches!(self, Value::Lambda(_)) || matches!(rhs, Value::Lambda(_)) {
            return Err(UnitError::quantity_only(operation));
        }
        let (a, dim_a, _) = operand_parts(self);
        let (b, dim_b, _) = operand_parts(rhs);
        if dim_a != dim_b {
            return Err(UnitError::dimension_mismatch(operation, &dim_a, &dim_b));
        }
        Ok((a, b))
    }

    // ========================================================================
    // COMPOUND ASSIGNMENT
    // ========================================================================

    /// `self op= rhs`; units can't be modified in place
    pub fn assign_op(&mut self, op: AssignOp, rhs: &Value) -> Result<()> {
        if self.is_unit() {
            return Err(UnitError::UnsupportedOperation {
                operation: format!("in-place {op:?}"),
                reason: format!("a {} can't be modified in place", self.kind()),
            });
        }
        *self = match op {
            AssignOp::Add => self.add(rhs)?,
            AssignOp::Sub => self.sub(rhs)?,
            AssignOp::Mul => self.mul(rhs)?,
            AssignOp::Div => self.div(rhs)?,
            AssignOp::Pow => self.pow(rhs)?,
        };
        Ok(())
    }
}

fn raise(base: f64, exponent: Exponent) -> f64 {
    match exponent {
        Exponent::Int(i) if i32::try_from(i).is_ok() => base.powi(i as i32),
        _ => base.powf(exponent.to_f64()),
    }
}

// ============================================================================
// LAMBDA UNIT APPLICATION
// ============================================================================

impl LambdaUnit {
    /// `number * unit`: map through `to_quantity`
    pub(crate) fn apply_to(&self, factor: &Value) -> Result<Value> {
        let (number, display) = match factor {
            Value::Number(n) => (*n, self.display_unit.clone()),
            Value::Quantity(q) if q.is_unit() => {
                return Err(UnitError::UnsupportedOperation {
                    operation: "multiplication".to_string(),
                    reason: "a ScalarUnit can't be multiplied by a LambdaUnit".to_string(),
                });
            }
            Value::Quantity(q) if !q.dimension.is_empty() => {
                return Err(UnitError::dimension_mismatch(
                    "multiplication by a LambdaUnit",
                    &q.dimension,
                    &Exponents::new(),
                ));
            }
            Value::Quantity(q) => (q.value, &self.display_unit + &q.display_unit),
            Value::Lambda(_) => return Err(lambda_on_left("multiplication")),
        };

        match self.to_quantity(&Value::Number(number))? {
            Value::Quantity(q) => Ok(Value::Quantity(Quantity {
                value: q.value,
                dimension: q.dimension,
                display_unit: display,
                unit: None,
            })),
            Value::Number(n) if !display.is_empty() && self.track_quantities => {
                Ok(Value::Quantity(Quantity::new(n, Exponents::new(), display)))
            }
            other => Ok(other),
        }
    }

    /// `quantity / unit`: map through `to_number`
    pub(crate) fn invert_from(&self, dividend: &Value) -> Result<Value> {
        let number = match self.to_number(dividend)? {
            Value::Number(n) => n,
            Value::Quantity(q) if q.dimension.is_empty() => q.value,
            Value::Quantity(q) => {
                return Err(UnitError::dimension_mismatch(
                    "division by a LambdaUnit",
                    &q.dimension,
                    &Exponents::new(),
                ));
            }
            Value::Lambda(_) => return Err(UnitError::quantity_only("division by a LambdaUnit")),
        };
        let display = &dividend.display_unit() - &self.display_unit;
        if !display.is_empty() && self.dimension.is_empty() && self.track_quantities {
            Ok(Value::Quantity(Quantity::new(number, Exponents::new(), display)))
        } else {
            Ok(Value::Number(number))
        }
    }

    /// The reciprocal unit: conversions swapped, dimension and display negated
    pub(crate) fn inverse(&self) -> LambdaUnit {
        LambdaUnit {
            to_quantity: Arc::clone(&self.to_number),
            to_number: Arc::clone(&self.to_quantity),
            dimension: -&self.dimension,
            display_unit: -&self.display_unit,
            prefixable: self.prefixable,
            track_quantities: self.track_quantities,
        }
    }
}

// ============================================================================
// OPERATOR TRAITS
// ============================================================================

macro_rules! binary_op {
    ($trait:ident, $method:ident, $inherent:ident) => {
        impl ops::$trait<&Value> for &Value {
            type Output = Result<Value>;

            fn $method(self, rhs: &Value) -> Result<Value> {
                Value::$inherent(self, rhs)
            }
        }

        impl ops::$trait<f64> for &Value {
            type Output = Result<Value>;

            fn $method(self, rhs: f64) -> Result<Value> {
                Value::$inherent(self, &Value::Number(rhs))
            }
        }

        impl ops::$trait<&Value> for f64 {
            type Output = Result<Value>;

            fn $method(self, rhs: &Value) -> Result<Value> {
                Value::$inherent(&Value::Number(self), rhs)
            }
        }
    };
}

binary_op!(Add, add, add);
binary_op!(Sub, sub, sub);
binary_op!(Mul, mul, mul);
binary_op!(Div, div, div);
binary_op!(Rem, rem, rem);

impl ops::Neg for &Value {
    type Output = Result<Value>;

    fn neg(self) -> Result<Value> {
        Value::neg(self)
    }
}
