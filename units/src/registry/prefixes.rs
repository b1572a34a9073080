//! SI prefixes and their application to units

use std::sync::Arc;

use crate::exponents::Exponents;
use crate::value::{Conversion, LambdaUnit, Quantity, Value};

/// SI prefixes, largest first
pub const PREFIXES: &[(&str, f64)] = &[
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("da", 1e1),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

/// Factor of an SI prefix
pub fn prefix_factor(prefix: &str) -> Option<f64> {
    PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, factor)| *factor)
}

/// The prefixed version of `unit`, named `symbol`
///
/// Prefixed units are never prefixable themselves. Plain numbers (stored
/// when dimension tracking is off) are simply scaled.
pub(crate) fn apply_prefix(unit: &Value, factor: f64, symbol: &str) -> Value {
    match unit {
        Value::Number(n) => Value::Number(factor * n),
        Value::Quantity(q) => Value::Quantity(
            Quantity::new(factor * q.value(), q.dimension().clone(), Exponents::new())
                .bind_unit(symbol, false),
        ),
        Value::Lambda(l) => {
            let (to_quantity, to_number) = l.conversions();
            let scaled_to_quantity: Conversion =
                Arc::new(move |n: &Value| to_quantity(&n.mul(&Value::Number(factor))?));
            let scaled_to_number: Conversion =
                Arc::new(move |q: &Value| to_number(q)?.div(&Value::Number(factor)));
            Value::Lambda(
                l.with_conversions(scaled_to_quantity, scaled_to_number)
                    .with_display_unit(Exponents::symbol(symbol))
                    .with_prefixable(false),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    #[test]
    fn test_prefix_factor() {
        assert_eq!(prefix_factor("k"), Some(1e3));
        assert_eq!(prefix_factor("da"), Some(10.0));
        assert_eq!(prefix_factor("u"), Some(1e-6));
        assert_eq!(prefix_factor("x"), None);
    }

    #[test]
    fn test_prefixed_scalar_unit() {
        let metre = Value::Quantity(
            Quantity::new(1.0, Exponents::symbol("L"), Exponents::new()).bind_unit("m", true),
        );
        let km = apply_prefix(&metre, 1e3, "km");
        assert_eq!(km.kind(), ValueKind::ScalarUnit);
        assert_eq!(km.value().unwrap(), 1000.0);
        assert_eq!(km.display_unit(), Exponents::symbol("km"));
        assert!(!km.prefixable());
    }

    #[test]
    fn test_prefixed_lambda_unit() {
        let identity: Conversion = Arc::new(|v: &Value| Ok(v.clone()));
        let unit = Value::Lambda(LambdaUnit::new(
            identity.clone(),
            identity,
            Exponents::new(),
            Exponents::symbol("Np"),
            true,
        ));
        let kilo = apply_prefix(&unit, 1e3, "kNp");
        let kilo = kilo.as_lambda().unwrap();
        assert_eq!(
            kilo.to_quantity(&Value::Number(2.0)).unwrap(),
            Value::Number(2000.0)
        );
        assert_eq!(
            kilo.to_number(&Value::Number(2000.0)).unwrap(),
            Value::Number(2.0)
        );
    }

    #[test]
    fn test_prefixed_number() {
        assert_eq!(
            apply_prefix(&Value::Number(2.0), 1e-3, "mx"),
            Value::Number(0.002)
        );
    }
}
