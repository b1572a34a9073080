//! Formatting values against a unit registry
//!
//! A quantity is rendered as its number expressed in its (simplified) display
//! unit, followed by the unit text:
//!
//! ```text
//! 25 degC        9.81 m/s2        1.5&times;10<sup>-7</sup>&nbsp;m
//! ```

use std::fmt;
use std::str::FromStr;

use super::Value;
use crate::error::{Result, UnitError};
use crate::exponents::format::to_superscript;
use crate::exponents::FormatStyle;
use crate::registry::UnitRegistry;

/// Scalar units whose number is this close to 1 are shown by symbol alone
const UNIT_NUMBER_TOLERANCE: f64 = 1e-14;

/// How the number part is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notation {
    /// Shortest representation, scientific for very large or small magnitudes
    #[default]
    Auto,
    /// `e`
    Scientific,
    /// `f`
    Fixed,
    /// `g`: fixed or scientific depending on the magnitude
    General,
}

/// Parsed format code such as `".3eU"`: precision, notation, then style code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatSpec {
    pub precision: Option<usize>,
    pub notation: Notation,
    pub style: FormatStyle,
}

impl FormatSpec {
    pub fn new(style: FormatStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn parse(code: &str) -> Result<Self> {
        let invalid = || UnitError::InvalidArgument(format!("invalid format code {code:?}"));

        let (number_code, style) = match code.chars().last() {
            Some(c @ ('H' | 'L' | 'U' | 'M' | 'V')) => (
                &code[..code.len() - c.len_utf8()],
                FormatStyle::from_code(&c.to_string())?,
            ),
            _ => (code, FormatStyle::Default),
        };

        let mut rest = number_code;
        let mut notation = Notation::Auto;
        if let Some(last) = rest.chars().last() {
            let parsed = match last {
                'e' | 'E' => Some(Notation::Scientific),
                'f' | 'F' => Some(Notation::Fixed),
                'g' | 'G' => Some(Notation::General),
                _ => None,
            };
            if let Some(parsed) = parsed {
                notation = parsed;
                rest = &rest[..rest.len() - 1];
            }
        }

        let precision = match rest {
            "" => None,
            _ => {
                let digits = rest.strip_prefix('.').ok_or_else(invalid)?;
                Some(digits.parse::<usize>().map_err(|_| invalid())?)
            }
        };

        Ok(Self {
            precision,
            notation,
            style,
        })
    }

    /// Render a number, with scientific notation adapted to the style
    pub fn format_number(&self, number: f64) -> String {
        let text = match (self.notation, self.precision) {
            (Notation::Scientific, p) => format!("{:.*e}", p.unwrap_or(6), number),
            (Notation::Fixed, p) => format!("{:.*}", p.unwrap_or(6), number),
            (Notation::General, p) | (Notation::Auto, p @ Some(_)) => {
                general(number, p.unwrap_or(6))
            }
            (Notation::Auto, None) => {
                let magnitude = number.abs();
                if number != 0.0 && number.is_finite() && !(1e-4..1e16).contains(&magnitude) {
                    format!("{:e}", number)
                } else {
                    format!("{}", number)
                }
            }
        };
        format_e(&text, self.style)
    }

    /// Separator between number and unit
    pub fn separator(&self) -> &'static str {
        match self.style {
            FormatStyle::Html => "&nbsp;",
            FormatStyle::Latex => r"\,",
            _ => " ",
        }
    }
}

impl FromStr for FormatSpec {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// `%g`-style: `precision` significant digits, trailing zeros removed
fn general(number: f64, precision: usize) -> String {
    if !number.is_finite() {
        return format!("{}", number);
    }
    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, number);
    let exponent: i64 = scientific
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exponent < -4 || exponent >= precision as i64 {
        match scientific.split_once('e') {
            Some((mantissa, e)) => format!("{}e{}", trim_zeros(mantissa), e),
            None => scientific,
        }
    } else {
        let decimals = (precision as i64 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, number)).to_string()
    }
}

fn trim_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Rewrite `1.5e-7` in the notation of `style`
///
/// HTML, LaTeX and Unicode get a proper `×10ⁿ`; the other styles keep `e`.
pub fn format_e(text: &str, style: FormatStyle) -> String {
    let Some((mantissa, exponent)) = text.split_once(['e', 'E']) else {
        return text.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return text.to_string();
    };
    match style {
        FormatStyle::Html => format!("{mantissa}&times;10<sup>{exponent}</sup>"),
        FormatStyle::Latex => format!(r"{mantissa}\times 10^{{{exponent}}}"),
        FormatStyle::Unicode => format!("{mantissa}×10{}", to_superscript(&exponent.to_string())),
        _ => text.to_string(),
    }
}

impl Value {
    /// Render with the display unit simplified and resolved through `registry`
    pub fn format_with(&self, registry: &UnitRegistry, spec: &FormatSpec) -> Result<String> {
        let config = registry.config();
        let replacements = &config.unit_replacements;
        match self {
            Value::Number(n) => Ok(spec.format_number(*n)),
            Value::Lambda(unit) => Ok(unit.display_unit().format_unit(spec.style, replacements)),
            Value::Quantity(q) => {
                let display = registry.simplify(q.display_unit(), config.simplification_level);
                let unit = registry.compose(&display)?;
                let unit_dimension = unit.dimension();
                if &unit_dimension != q.dimension() {
                    return Err(UnitError::DisplayMismatch {
                        display: display.describe(),
                        display_dimension: unit_dimension.describe(),
                        dimension: q.dimension().describe(),
                    });
                }

                let number = self.div(&unit)?.value()?;
                if display.is_empty() {
                    return Ok(spec.format_number(number));
                }
                let unit_text = display.format_unit(spec.style, replacements);
                if q.is_unit() && (number - 1.0).abs() < UNIT_NUMBER_TOLERANCE {
                    return Ok(unit_text);
                }
                Ok(format!(
                    "{}{}{}",
                    spec.format_number(number),
                    spec.separator(),
                    unit_text
                ))
            }
        }
    }

    /// Adapter implementing [`fmt::Display`] through `registry`
    pub fn display_with<'a>(&'a self, registry: &'a UnitRegistry) -> Displayed<'a> {
        Displayed {
            value: self,
            registry,
            spec: FormatSpec::default(),
        }
    }
}

/// A value paired with the registry that renders it
///
/// A precision given to the formatter (`{:.3}`) overrides the format code's.
pub struct Displayed<'a> {
    value: &'a Value,
    registry: &'a UnitRegistry,
    spec: FormatSpec,
}

impl Displayed<'_> {
    pub fn with_spec(mut self, spec: FormatSpec) -> Self {
        self.spec = spec;
        self
    }
}

impl fmt::Display for Displayed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut spec = self.spec;
        if let Some(precision) = f.precision() {
            spec.precision = Some(precision);
        }
        match self.value.format_with(self.registry, &spec) {
            Ok(text) => f.write_str(&text),
            Err(err) => {
                tracing::debug!(error = %err, "falling back to plain rendering");
                write!(f, "{}", self.value)
            }
        }
    }
}
