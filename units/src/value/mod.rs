//! Dimensioned values
//!
//! A [`Value`] is one of:
//!
//! - a plain number,
//! - a [`Quantity`]: a number with a physical dimension and a display unit.
//!   A quantity carrying a [`UnitTag`] is a *scalar unit*; it relates to the
//!   coherent base units by plain multiplication with its value,
//! - a [`LambdaUnit`]: a unit with arbitrary conversion functions (e.g. an
//!   offset temperature scale). It holds no value of its own and is applied
//!   by multiplying a number with it or dividing a quantity by it.
//!
//! The arithmetic rules live in [`ops`]; formatting against a registry lives
//! in [`display`].

pub mod display;
pub mod ops;

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, UnitError};
use crate::exponents::Exponents;

pub use display::{Displayed, FormatSpec, Notation};
pub use ops::AssignOp;

/// Conversion function of a lambda unit
pub type Conversion = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Capability record that marks a quantity as a unit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitTag {
    /// Registry symbol, if the unit is bound to one
    pub symbol: Option<String>,
    /// Whether SI prefixes may be applied
    pub prefixable: bool,
}

/// The kind of a value, used in messages and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Quantity,
    ScalarUnit,
    LambdaUnit,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Number => "number",
            ValueKind::Quantity => "Quantity",
            ValueKind::ScalarUnit => "ScalarUnit",
            ValueKind::LambdaUnit => "LambdaUnit",
        };
        f.write_str(name)
    }
}

// ============================================================================
// QUANTITY
// ============================================================================

/// Number with a physical dimension and a display unit
///
/// The value is stored in coherent base units; the display unit only decides
/// how the quantity is rendered.
#[derive(Debug, Clone)]
pub struct Quantity {
    value: f64,
    dimension: Exponents,
    display_unit: Exponents,
    unit: Option<UnitTag>,
}

impl Quantity {
    pub fn new(value: f64, dimension: Exponents, display_unit: Exponents) -> Self {
        Self {
            value,
            dimension,
            display_unit,
            unit: None,
        }
    }

    /// Build from dimension and display strings such as `"L/T"` and `"m/s"`
    pub fn parse(value: f64, dimension: &str, display_unit: &str) -> Result<Self> {
        Ok(Self::new(
            value,
            Exponents::parse(dimension)?,
            Exponents::parse(display_unit)?,
        ))
    }

    /// A scalar unit that isn't bound to a registry symbol yet
    pub fn scalar_unit(
        value: f64,
        dimension: Exponents,
        display_unit: Exponents,
        prefixable: bool,
    ) -> Self {
        Self {
            value,
            dimension,
            display_unit,
            unit: Some(UnitTag {
                symbol: None,
                prefixable,
            }),
        }
    }

    /// Turn this quantity into the scalar unit `symbol`, displayed as itself
    pub fn bind_unit(self, symbol: &str, prefixable: bool) -> Self {
        Self {
            value: self.value,
            dimension: self.dimension,
            display_unit: Exponents::symbol(symbol),
            unit: Some(UnitTag {
                symbol: Some(symbol.to_string()),
                prefixable,
            }),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn dimension(&self) -> &Exponents {
        &self.dimension
    }

    pub fn display_unit(&self) -> &Exponents {
        &self.display_unit
    }

    /// Rebind the display unit; the value and dimension are untouched
    pub fn set_display_unit(&mut self, display_unit: Exponents) {
        self.display_unit = display_unit;
    }

    pub fn with_display_unit(mut self, display_unit: Exponents) -> Self {
        self.display_unit = display_unit;
        self
    }

    pub fn unit_tag(&self) -> Option<&UnitTag> {
        self.unit.as_ref()
    }

    pub fn is_unit(&self) -> bool {
        self.unit.is_some()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_empty()
    }

    /// Same dimension and display, new value, no unit tag
    pub(crate) fn with_value(&self, value: f64) -> Self {
        Self::new(value, self.dimension.clone(), self.display_unit.clone())
    }
}

// ============================================================================
// LAMBDA UNIT
// ============================================================================

/// Unit defined by a pair of conversion functions
#[derive(Clone)]
pub struct LambdaUnit {
    to_quantity: Conversion,
    to_number: Conversion,
    dimension: Exponents,
    display_unit: Exponents,
    prefixable: bool,
    /// Whether results of dimensionless conversions keep a display unit
    track_quantities: bool,
}

impl LambdaUnit {
    pub fn new(
        to_quantity: Conversion,
        to_number: Conversion,
        dimension: Exponents,
        display_unit: Exponents,
        prefixable: bool,
    ) -> Self {
        Self {
            to_quantity,
            to_number,
            dimension,
            display_unit,
            prefixable,
            track_quantities: true,
        }
    }

    pub fn with_tracking(mut self, track_quantities: bool) -> Self {
        self.track_quantities = track_quantities;
        self
    }

    pub fn with_prefixable(mut self, prefixable: bool) -> Self {
        self.prefixable = prefixable;
        self
    }

    pub fn with_display_unit(mut self, display_unit: Exponents) -> Self {
        self.display_unit = display_unit;
        self
    }

    pub fn dimension(&self) -> &Exponents {
        &self.dimension
    }

    pub fn display_unit(&self) -> &Exponents {
        &self.display_unit
    }

    pub fn prefixable(&self) -> bool {
        self.prefixable
    }

    pub fn tracks_quantities(&self) -> bool {
        self.track_quantities
    }

    /// Map a number to a quantity
    pub fn to_quantity(&self, number: &Value) -> Result<Value> {
        (self.to_quantity)(number)
    }

    /// Map a quantity to a number
    pub fn to_number(&self, quantity: &Value) -> Result<Value> {
        (self.to_number)(quantity)
    }

    pub(crate) fn conversions(&self) -> (Conversion, Conversion) {
        (self.to_quantity.clone(), self.to_number.clone())
    }

    pub(crate) fn with_conversions(&self, to_quantity: Conversion, to_number: Conversion) -> Self {
        Self {
            to_quantity,
            to_number,
            ..self.clone()
        }
    }

    fn same_conversions(&self, other: &LambdaUnit) -> bool {
        Arc::ptr_eq(&self.to_quantity, &other.to_quantity)
            && Arc::ptr_eq(&self.to_number, &other.to_number)
    }
}

impl fmt::Debug for LambdaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaUnit")
            .field("dimension", &self.dimension.to_string())
            .field("display_unit", &self.display_unit.to_string())
            .field("prefixable", &self.prefixable)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// VALUE
// ============================================================================

/// A plain number, a quantity (possibly a scalar unit) or a lambda unit
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Quantity(Quantity),
    Lambda(LambdaUnit),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Quantity(q) if q.is_unit() => ValueKind::ScalarUnit,
            Value::Quantity(_) => ValueKind::Quantity,
            Value::Lambda(_) => ValueKind::LambdaUnit,
        }
    }

    /// True for scalar units and lambda units
    pub fn is_unit(&self) -> bool {
        matches!(self.kind(), ValueKind::ScalarUnit | ValueKind::LambdaUnit)
    }

    /// Whether SI prefixes may be applied; false for anything but a unit
    pub fn prefixable(&self) -> bool {
        match self {
            Value::Quantity(q) => q.unit.as_ref().is_some_and(|tag| tag.prefixable),
            Value::Lambda(l) => l.prefixable,
            Value::Number(_) => false,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Value::Quantity(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&LambdaUnit> {
        match self {
            Value::Lambda(l) => Some(l),
            _ => None,
        }
    }

    /// The numeric value in coherent base units
    pub fn value(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Quantity(q) => Ok(q.value),
            Value::Lambda(_) => Err(UnitError::quantity_only("taking the value")),
        }
    }

    /// Physical dimension; empty for plain numbers
    pub fn dimension(&self) -> Exponents {
        match self {
            Value::Number(_) => Exponents::new(),
            Value::Quantity(q) => q.dimension.clone(),
            Value::Lambda(l) => l.dimension.clone(),
        }
    }

    /// Display unit; empty for plain numbers
    pub fn display_unit(&self) -> Exponents {
        match self {
            Value::Number(_) => Exponents::new(),
            Value::Quantity(q) => q.display_unit.clone(),
            Value::Lambda(l) => l.display_unit.clone(),
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        match self {
            Value::Number(_) => true,
            Value::Quantity(q) => q.dimension.is_empty(),
            Value::Lambda(l) => l.dimension.is_empty(),
        }
    }

    /// Value of a dimensionless quantity or number
    pub fn dimensionless_value(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Quantity(q) if q.dimension.is_empty() => Ok(q.value),
            Value::Quantity(q) => Err(UnitError::dimension_mismatch(
                "conversion to a number",
                &q.dimension,
                &Exponents::new(),
            )),
            Value::Lambda(_) => Err(UnitError::quantity_only("conversion to a number")),
        }
    }

    /// Rebind the display unit of a quantity; other values are unchanged
    pub fn with_display_unit(self, display_unit: Exponents) -> Self {
        match self {
            Value::Quantity(q) => Value::Quantity(q.with_display_unit(display_unit)),
            Value::Lambda(l) => Value::Lambda(l.with_display_unit(display_unit)),
            other => other,
        }
    }

    /// Plain number with the dimension and display unit of `prototype`
    ///
    /// Returns the number unchanged if the prototype isn't a quantity.
    pub fn merge(value: f64, prototype: &Value) -> Value {
        match prototype {
            Value::Quantity(q) => Value::Quantity(q.with_value(value)),
            _ => Value::Number(value),
        }
    }
}

/// Check that all values share one dimension
pub fn assert_homogeneous<'a>(values: impl IntoIterator<Item = &'a Value>) -> Result<()> {
    let mut values = values.into_iter();
    let Some(first) = values.next() else {
        return Ok(());
    };
    let dimension = first.dimension();
    for value in values {
        let other = value.dimension();
        if other != dimension {
            return Err(UnitError::dimension_mismatch("a homogeneous group", &dimension, &other));
        }
    }
    Ok(())
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<Quantity> for Value {
    fn from(value: Quantity) -> Self {
        Value::Quantity(value)
    }
}

impl From<LambdaUnit> for Value {
    fn from(value: LambdaUnit) -> Self {
        Value::Lambda(value)
    }
}

impl PartialEq for Value {
    /// Same dimension and same value; the display unit doesn't matter
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Lambda(a), Value::Lambda(b)) => {
                a.same_conversions(b)
                    && a.dimension == b.dimension
                    && a.display_unit == b.display_unit
            }
            (Value::Lambda(_), _) | (_, Value::Lambda(_)) => false,
            _ => self.dimension() == other.dimension() && self.value().ok() == other.value().ok(),
        }
    }
}

/// Registry-independent rendering: the value in base units with its
/// dimension and display unit spelled out
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Quantity(q) => match &q.unit {
                Some(tag) => write!(
                    f,
                    "ScalarUnit {} with dimension {} ({}prefixable)",
                    tag.symbol.as_deref().unwrap_or(&q.display_unit.to_string()),
                    q.dimension.describe(),
                    if tag.prefixable { "" } else { "not " },
                ),
                None => write!(
                    f,
                    "Quantity(value={}, dimension='{}', display='{}')",
                    q.value, q.dimension, q.display_unit
                ),
            },
            Value::Lambda(l) => write!(
                f,
                "LambdaUnit {} with dimension {} ({}prefixable)",
                l.display_unit,
                l.dimension.describe(),
                if l.prefixable { "" } else { "not " },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metre() -> Value {
        Value::Quantity(Quantity::scalar_unit(
            1.0,
            Exponents::symbol("L"),
            Exponents::symbol("m"),
            true,
        ))
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::Number(1.0).kind(), ValueKind::Number);
        assert_eq!(metre().kind(), ValueKind::ScalarUnit);
        let q = Quantity::parse(3.0, "L", "m").unwrap();
        assert_eq!(Value::Quantity(q).kind(), ValueKind::Quantity);
    }

    #[test]
    fn test_bind_unit_displays_symbol() {
        let q = Quantity::parse(1000.0, "L", "m").unwrap().bind_unit("km", false);
        assert_eq!(q.display_unit(), &Exponents::symbol("km"));
        assert_eq!(q.unit_tag().and_then(|t| t.symbol.as_deref()), Some("km"));
        assert!(!Value::Quantity(q).prefixable());
    }

    #[test]
    fn test_equality_ignores_display() {
        let a = Value::Quantity(Quantity::parse(1.0, "L", "m").unwrap());
        let b = Value::Quantity(Quantity::parse(1.0, "L", "ft").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, Value::Number(1.0));
    }

    #[test]
    fn test_dimensionless_quantity_equals_number() {
        let q = Value::Quantity(Quantity::parse(2.0, "", "rad").unwrap());
        assert_eq!(q, Value::Number(2.0));
        assert_eq!(q.dimensionless_value().unwrap(), 2.0);
        assert!(metre().dimensionless_value().is_err());
    }

    #[test]
    fn test_merge() {
        let merged = Value::merge(5.0, &metre());
        assert_eq!(merged.kind(), ValueKind::Quantity);
        assert_eq!(merged.value().unwrap(), 5.0);
        assert_eq!(merged.dimension(), Exponents::symbol("L"));
        assert_eq!(Value::merge(5.0, &Value::Number(1.0)), Value::Number(5.0));
    }

    #[test]
    fn test_assert_homogeneous() {
        let q = Value::Quantity(Quantity::parse(2.0, "L", "m").unwrap());
        assert!(assert_homogeneous([&metre(), &q]).is_ok());
        assert!(assert_homogeneous([&metre(), &Value::Number(1.0)]).is_err());
        assert!(assert_homogeneous(std::iter::empty()).is_ok());
    }

    #[test]
    fn test_plain_display() {
        let q = Value::Quantity(Quantity::parse(2.0, "L", "m").unwrap());
        assert_eq!(q.to_string(), "Quantity(value=2, dimension='L', display='m')");
        assert_eq!(
            metre().to_string(),
            "ScalarUnit m with dimension L (prefixable)"
        );
    }
}
