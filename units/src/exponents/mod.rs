//! Products of symbols raised to rational powers
//!
//! [`Exponents`] is the algebra behind both the physical dimension of a
//! quantity (exponents over base dimensions such as `L`, `M`, `T`) and its
//! display unit (exponents over unit symbols such as `kg`, `m`, `s`).
//! Multiplying two quantities adds their exponent vectors, dividing subtracts
//! them and raising to a power scales them.
//!
//! The map is sparse: a symbol whose exponent becomes exactly zero is removed.

pub mod format;
pub mod parse;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, ToPrimitive, Zero};

use crate::error::{Result, UnitError};

pub use format::{FormatStyle, UnitReplacements};

// =============================================================================
// Exponent
// =============================================================================

/// A rational exponent: integer, exact fraction or floating point
///
/// Integer and fraction arithmetic stays exact; any operation involving a
/// float produces a float. Fractions with a denominator of one collapse to
/// integers.
#[derive(Debug, Clone, Copy)]
pub enum Exponent {
    Int(i64),
    Ratio(Rational64),
    Float(f64),
}

impl Exponent {
    /// Exponent of zero
    pub const ZERO: Exponent = Exponent::Int(0);

    /// Exponent of one
    pub const ONE: Exponent = Exponent::Int(1);

    /// Create an exact fraction, reduced and collapsed to an integer if possible
    ///
    /// Returns `None` for a zero denominator.
    pub fn ratio(numer: i64, denom: i64) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        // reduction negates both terms
        if numer == i64::MIN || denom == i64::MIN {
            return Some(Exponent::Float(numer as f64 / denom as f64));
        }
        Some(Exponent::Ratio(Rational64::new(numer, denom)).normalized())
    }

    /// Convert a float, keeping integral values exact
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Exponent::Int(value as i64)
        } else {
            Exponent::Float(value)
        }
    }

    fn normalized(self) -> Self {
        match self {
            Exponent::Ratio(r) if r.is_integer() => Exponent::Int(r.to_integer()),
            other => other,
        }
    }

    fn as_ratio(&self) -> Option<Rational64> {
        match *self {
            Exponent::Int(i) => Some(Rational64::from_integer(i)),
            Exponent::Ratio(r) => Some(r),
            Exponent::Float(_) => None,
        }
    }

    /// Value as a float
    pub fn to_f64(&self) -> f64 {
        match *self {
            Exponent::Int(i) => i as f64,
            Exponent::Ratio(r) => r.to_f64().unwrap_or(f64::NAN),
            Exponent::Float(f) => f,
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Exponent::Int(i) => i == 0,
            Exponent::Ratio(r) => r.is_zero(),
            Exponent::Float(f) => f == 0.0,
        }
    }

    /// True for integers and integral floats
    pub fn is_integral(&self) -> bool {
        match *self {
            Exponent::Int(_) => true,
            Exponent::Ratio(r) => r.is_integer(),
            Exponent::Float(f) => f.fract() == 0.0,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.to_f64() < 0.0
    }

    /// True for an exact fraction that isn't an integer
    pub fn is_fraction(&self) -> bool {
        matches!(self, Exponent::Ratio(r) if !r.is_integer())
    }

    pub fn abs(&self) -> Self {
        match *self {
            Exponent::Float(f) => Exponent::Float(f.abs()),
            exact if exact.is_negative() => -exact,
            exact => exact,
        }
    }

    /// Division that reports a zero divisor instead of panicking
    pub fn checked_div(self, rhs: Exponent) -> Option<Exponent> {
        if rhs.is_zero() {
            return None;
        }
        Some(self.combine(rhs, |_, _| None, Rational64::checked_div, |a, b| a / b))
    }

    /// Exact arithmetic that falls back to a float when the integer or
    /// fraction terms would overflow
    fn combine(
        self,
        rhs: Exponent,
        int_op: fn(i64, i64) -> Option<i64>,
        ratio_op: fn(&Rational64, &Rational64) -> Option<Rational64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Exponent {
        if let (Exponent::Int(a), Exponent::Int(b)) = (self, rhs)
            && let Some(n) = int_op(a, b)
        {
            return Exponent::Int(n);
        }
        if let (Some(a), Some(b)) = (self.as_ratio(), rhs.as_ratio())
            && let Some(r) = ratio_op(&a, &b)
        {
            return Exponent::Ratio(r).normalized();
        }
        Exponent::Float(float_op(self.to_f64(), rhs.to_f64()))
    }
}

impl Add for Exponent {
    type Output = Exponent;

    fn add(self, rhs: Exponent) -> Exponent {
        self.combine(rhs, i64::checked_add, Rational64::checked_add, |a, b| a + b)
    }
}

impl Sub for Exponent {
    type Output = Exponent;

    fn sub(self, rhs: Exponent) -> Exponent {
        self.combine(rhs, i64::checked_sub, Rational64::checked_sub, |a, b| a - b)
    }
}

impl Mul for Exponent {
    type Output = Exponent;

    fn mul(self, rhs: Exponent) -> Exponent {
        self.combine(rhs, i64::checked_mul, Rational64::checked_mul, |a, b| a * b)
    }
}

impl Neg for Exponent {
    type Output = Exponent;

    fn neg(self) -> Exponent {
        match self {
            Exponent::Float(f) => Exponent::Float(-f),
            exact => Exponent::ZERO - exact,
        }
    }
}

impl PartialEq for Exponent {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_ratio(), other.as_ratio()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_f64() == other.to_f64(),
        }
    }
}

impl PartialOrd for Exponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.as_ratio(), other.as_ratio()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl From<i64> for Exponent {
    fn from(value: i64) -> Self {
        Exponent::Int(value)
    }
}

impl From<i32> for Exponent {
    fn from(value: i32) -> Self {
        Exponent::Int(value as i64)
    }
}

impl From<f64> for Exponent {
    fn from(value: f64) -> Self {
        Exponent::Float(value)
    }
}

impl From<Rational64> for Exponent {
    fn from(value: Rational64) -> Self {
        Exponent::Ratio(value).normalized()
    }
}

impl fmt::Display for Exponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exponent::Int(i) => write!(f, "{}", i),
            Exponent::Ratio(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            // Debug keeps the decimal point so the text parses back as a float
            Exponent::Float(x) => write!(f, "{:?}", x),
        }
    }
}

// =============================================================================
// Exponents
// =============================================================================

/// Sparse map from symbols to exponents
///
/// Iteration (and therefore formatting) is in symbol order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exponents {
    factors: BTreeMap<String, Exponent>,
}

impl Exponents {
    /// The empty product (unity)
    pub fn new() -> Self {
        Self::default()
    }

    /// A single symbol raised to the first power
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self::single(symbol, Exponent::ONE)
    }

    /// A single symbol raised to `exponent`
    pub fn single(symbol: impl Into<String>, exponent: impl Into<Exponent>) -> Self {
        let mut result = Self::new();
        result.accumulate(symbol.into(), exponent.into());
        result
    }

    /// Parse a product-of-powers expression such as `kg*m2/s2`
    pub fn parse(text: &str) -> Result<Self> {
        parse::parse(text)
    }

    /// Exponent of `symbol`, if present
    pub fn get(&self, symbol: &str) -> Option<Exponent> {
        self.factors.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.factors.contains_key(symbol)
    }

    /// Set the exponent of `symbol`; zero removes the entry
    pub fn set(&mut self, symbol: impl Into<String>, exponent: impl Into<Exponent>) {
        let symbol = symbol.into();
        let exponent = exponent.into();
        if exponent.is_zero() {
            self.factors.remove(&symbol);
        } else {
            self.factors.insert(symbol, exponent);
        }
    }

    /// Add `exponent` to the exponent of `symbol`
    pub fn accumulate(&mut self, symbol: String, exponent: Exponent) {
        let total = match self.factors.get(&symbol) {
            Some(current) => *current + exponent,
            None => exponent,
        };
        self.set(symbol, total);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Exponent)> + '_ {
        self.factors.iter().map(|(s, e)| (s.as_str(), *e))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.factors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Sum of the absolute values of the exponents (L1 norm)
    pub fn complexity(&self) -> f64 {
        self.factors.values().map(|e| e.abs().to_f64()).sum()
    }

    /// Multiply every exponent by `factor`; a zero factor yields unity
    pub fn scale(&self, factor: impl Into<Exponent>) -> Self {
        let factor = factor.into();
        if factor.is_zero() {
            return Self::new();
        }
        let mut result = Self::new();
        for (symbol, exp) in &self.factors {
            result.set(symbol.clone(), *exp * factor);
        }
        result
    }

    /// Divide every exponent by `divisor`
    pub fn div_scalar(&self, divisor: impl Into<Exponent>) -> Result<Self> {
        let divisor = divisor.into();
        let mut result = Self::new();
        for (symbol, exp) in &self.factors {
            let quotient = exp.checked_div(divisor).ok_or_else(|| {
                UnitError::InvalidArgument("division of exponents by zero".to_string())
            })?;
            result.set(symbol.clone(), quotient);
        }
        Ok(result)
    }

    /// Default-style text, or `dimensionless` for the empty product
    pub fn describe(&self) -> String {
        if self.is_empty() {
            "dimensionless".to_string()
        } else {
            self.format(FormatStyle::Default)
        }
    }
}

impl<S: Into<String>, E: Into<Exponent>> FromIterator<(S, E)> for Exponents {
    fn from_iter<I: IntoIterator<Item = (S, E)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (symbol, exp) in iter {
            result.accumulate(symbol.into(), exp.into());
        }
        result
    }
}

impl AddAssign<&Exponents> for Exponents {
    fn add_assign(&mut self, rhs: &Exponents) {
        for (symbol, exp) in &rhs.factors {
            self.accumulate(symbol.clone(), *exp);
        }
    }
}

impl SubAssign<&Exponents> for Exponents {
    fn sub_assign(&mut self, rhs: &Exponents) {
        for (symbol, exp) in &rhs.factors {
            self.accumulate(symbol.clone(), -*exp);
        }
    }
}

impl Add for &Exponents {
    type Output = Exponents;

    fn add(self, rhs: &Exponents) -> Exponents {
        let mut result = self.clone();
        result += rhs;
        result
    }
}

impl Sub for &Exponents {
    type Output = Exponents;

    fn sub(self, rhs: &Exponents) -> Exponents {
        let mut result = self.clone();
        result -= rhs;
        result
    }
}

impl Neg for &Exponents {
    type Output = Exponents;

    fn neg(self) -> Exponents {
        Exponents {
            factors: self
                .factors
                .iter()
                .map(|(s, e)| (s.clone(), -*e))
                .collect(),
        }
    }
}

impl Mul<Exponent> for &Exponents {
    type Output = Exponents;

    fn mul(self, rhs: Exponent) -> Exponents {
        self.scale(rhs)
    }
}

impl FromStr for Exponents {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Exponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(FormatStyle::Default))
    }
}
