//! Text rendering of exponent maps in several styles

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Exponent, Exponents};
use crate::error::{Result, UnitError};

/// Output style for unit and dimension strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormatStyle {
    /// `kg*m2/s2`
    #[default]
    Default,
    /// `kg&nbsp;m<sup>2</sup>&nbsp;s<sup>-2</sup>`
    Html,
    /// `\mathrm{kg}\,\mathrm{m}^2\,\mathrm{s}^{-2}`
    Latex,
    /// `kg m² s⁻²`
    Unicode,
    /// `kg.m2/s2`
    Modelica,
    /// `kg * m**2 / s**2`
    Verbose,
}

impl FormatStyle {
    pub const ALL: [FormatStyle; 6] = [
        FormatStyle::Default,
        FormatStyle::Html,
        FormatStyle::Latex,
        FormatStyle::Unicode,
        FormatStyle::Modelica,
        FormatStyle::Verbose,
    ];

    /// Style from its one-letter code (`""`, `H`, `L`, `U`, `M`, `V`)
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "" => Ok(FormatStyle::Default),
            "H" => Ok(FormatStyle::Html),
            "L" => Ok(FormatStyle::Latex),
            "U" => Ok(FormatStyle::Unicode),
            "M" => Ok(FormatStyle::Modelica),
            "V" => Ok(FormatStyle::Verbose),
            other => Err(UnitError::InvalidArgument(format!(
                "format code {other:?} isn't one of \"\", H, L, U, M or V"
            ))),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            FormatStyle::Default => "",
            FormatStyle::Html => "H",
            FormatStyle::Latex => "L",
            FormatStyle::Unicode => "U",
            FormatStyle::Modelica => "M",
            FormatStyle::Verbose => "V",
        }
    }

    fn rules(self) -> Rules {
        match self {
            FormatStyle::Default => Rules {
                mul: "*",
                div: Some("/"),
                group: |s| format!("({s})"),
                base: |s| s.to_string(),
                exp: plain_number,
            },
            FormatStyle::Html => Rules {
                mul: "&nbsp;",
                div: None,
                group: |s| format!("({s})"),
                base: |s| s.to_string(),
                exp: |e| format!("<sup>{}</sup>", plain_number(e)),
            },
            FormatStyle::Latex => Rules {
                mul: r"\,",
                div: None,
                group: |s| format!(r"\left({s}\right)"),
                base: |s| format!(r"\mathrm{{{s}}}"),
                exp: latex_exp,
            },
            FormatStyle::Unicode => Rules {
                mul: " ",
                div: None,
                group: |s| format!("({s})"),
                base: |s| s.to_string(),
                exp: unicode_exp,
            },
            FormatStyle::Modelica => Rules {
                mul: ".",
                div: Some("/"),
                group: |s| format!("({s})"),
                base: |s| s.to_string(),
                exp: plain_number,
            },
            FormatStyle::Verbose => Rules {
                mul: " * ",
                div: Some(" / "),
                group: |s| format!("({s})"),
                base: |s| s.to_string(),
                exp: |e| format!("**{}", plain_number(e)),
            },
        }
    }
}

impl fmt::Display for FormatStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatStyle::Default => "default",
            FormatStyle::Html => "HTML",
            FormatStyle::Latex => "LaTeX",
            FormatStyle::Unicode => "Unicode",
            FormatStyle::Modelica => "Modelica",
            FormatStyle::Verbose => "verbose",
        };
        f.write_str(name)
    }
}

/// How one style joins and decorates factors
struct Rules {
    mul: &'static str,
    /// Division token; `None` writes negative exponents instead
    div: Option<&'static str>,
    /// Wraps a denominator of more than one factor
    group: fn(&str) -> String,
    base: fn(&str) -> String,
    /// Rendering of any exponent other than 1
    exp: fn(Exponent) -> String,
}

/// `2`, `(1/2)` or `0.5`
fn plain_number(exp: Exponent) -> String {
    match exp {
        Exponent::Ratio(_) => format!("({exp})"),
        _ => exp.to_string(),
    }
}

fn latex_exp(exp: Exponent) -> String {
    match exp {
        Exponent::Int(i) if (0..10).contains(&i) => format!("^{i}"),
        _ => format!("^{{{exp}}}"),
    }
}

fn unicode_exp(exp: Exponent) -> String {
    match exp {
        Exponent::Int(i) => to_superscript(&i.to_string()),
        _ => format!("^{}", plain_number(exp)),
    }
}

/// Map ASCII digits and `-` to their superscript forms
pub fn to_superscript(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            '-' => '⁻',
            other => other,
        })
        .collect()
}

impl Exponents {
    /// Render in the given style
    pub fn format(&self, style: FormatStyle) -> String {
        let rules = style.rules();
        let mut num = Vec::new();
        let mut den = Vec::new();

        for (symbol, exp) in self.iter() {
            let in_den = rules.div.is_some() && exp.is_negative();
            let shown = if in_den { exp.abs() } else { exp };
            let mut factor = (rules.base)(symbol);
            if shown != Exponent::ONE {
                let rendered = (rules.exp)(shown);
                // `g_0` squared is `g_0^2`, not `g_02`
                let glued = rendered.starts_with(|c: char| c.is_ascii_digit() || c == '-');
                if glued && symbol.ends_with(|c: char| c.is_ascii_digit()) {
                    factor.push('^');
                }
                factor.push_str(&rendered);
            }
            if in_den {
                den.push(factor);
            } else {
                num.push(factor);
            }
        }

        match rules.div {
            Some(div) if !den.is_empty() => {
                let numerator = if num.is_empty() {
                    "1".to_string()
                } else {
                    num.join(rules.mul)
                };
                let denominator = if den.len() > 1 {
                    (rules.group)(&den.join(rules.mul))
                } else {
                    den.join(rules.mul)
                };
                format!("{numerator}{div}{denominator}")
            }
            _ => {
                num.extend(den);
                num.join(rules.mul)
            }
        }
    }

    /// Render in the given style, then apply the style's display substitutions
    pub fn format_unit(&self, style: FormatStyle, replacements: &UnitReplacements) -> String {
        replacements.apply(style, &self.format(style))
    }
}

// ============================================================================
// DISPLAY SUBSTITUTIONS
// ============================================================================

/// Per-style `(substring, replacement)` pairs applied after formatting a unit
///
/// Keys are style codes (`"U"`, `"L"`, ...). Pairs are applied in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitReplacements(BTreeMap<String, Vec<(String, String)>>);

impl UnitReplacements {
    /// No substitutions for any style
    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    pub fn for_style(&self, style: FormatStyle) -> &[(String, String)] {
        self.0.get(style.code()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append a substitution for `style`
    pub fn insert(&mut self, style: FormatStyle, from: impl Into<String>, to: impl Into<String>) {
        self.0
            .entry(style.code().to_string())
            .or_default()
            .push((from.into(), to.into()));
    }

    pub fn apply(&self, style: FormatStyle, text: &str) -> String {
        self.for_style(style)
            .iter()
            .fold(text.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }
}

impl Default for UnitReplacements {
    fn default() -> Self {
        let mut table = Self::none();
        for (from, to) in [("deg", "°"), ("ohm", "Ω"), ("angstrom", "Å")] {
            table.insert(FormatStyle::Unicode, from, to);
        }
        for (from, to) in [("deg", r"^{\circ}"), ("ohm", r"\Omega"), ("angstrom", r"\AA")] {
            table.insert(FormatStyle::Latex, from, to);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(text: &str) -> Exponents {
        Exponents::parse(text).unwrap()
    }

    #[test]
    fn test_default_style() {
        assert_eq!(ex("kg*m2/s2").format(FormatStyle::Default), "kg*m2/s2");
        assert_eq!(ex("s-1").format(FormatStyle::Default), "1/s");
        assert_eq!(ex("kg/m/s2").format(FormatStyle::Default), "kg/(m*s2)");
        assert_eq!(Exponents::new().format(FormatStyle::Default), "");
    }

    #[test]
    fn test_fraction_exponents() {
        let root = ex("m(1/2)/s(3/2)");
        assert_eq!(root.format(FormatStyle::Default), "m(1/2)/s(3/2)");
        assert_eq!(root.format(FormatStyle::Verbose), "m**(1/2) / s**(3/2)");
        assert_eq!(root.format(FormatStyle::Latex), r"\mathrm{m}^{1/2}\,\mathrm{s}^{-3/2}");
    }

    #[test]
    fn test_html_style() {
        assert_eq!(
            ex("kg*m2/s2").format(FormatStyle::Html),
            "kg&nbsp;m<sup>2</sup>&nbsp;s<sup>-2</sup>"
        );
    }

    #[test]
    fn test_latex_style() {
        assert_eq!(
            ex("kg*m2/s2").format(FormatStyle::Latex),
            r"\mathrm{kg}\,\mathrm{m}^2\,\mathrm{s}^{-2}"
        );
    }

    #[test]
    fn test_unicode_style() {
        assert_eq!(ex("kg*m2/s2").format(FormatStyle::Unicode), "kg m² s⁻²");
        assert_eq!(ex("m(1/2)").format(FormatStyle::Unicode), "m^(1/2)");
    }

    #[test]
    fn test_modelica_and_verbose_styles() {
        assert_eq!(ex("kg*m2/s2").format(FormatStyle::Modelica), "kg.m2/s2");
        assert_eq!(ex("kg*m2/s2").format(FormatStyle::Verbose), "kg * m**2 / s**2");
        assert_eq!(ex("A/(m*s)").format(FormatStyle::Verbose), "A / (m * s)");
    }

    #[test]
    fn test_symbol_ending_in_digit_gets_caret() {
        assert_eq!(ex("g_0^2").format(FormatStyle::Default), "g_0^2");
        assert_eq!(ex("g_0^2"), ex(&ex("g_0^2").format(FormatStyle::Default)));
    }

    #[test]
    fn test_format_unit_substitutions() {
        let table = UnitReplacements::default();
        assert_eq!(ex("deg").format_unit(FormatStyle::Unicode, &table), "°");
        assert_eq!(ex("kohm").format_unit(FormatStyle::Latex, &table), r"\mathrm{k\Omega}");
        assert_eq!(ex("deg").format_unit(FormatStyle::Default, &table), "deg");
    }

    #[test]
    fn test_style_codes() {
        for style in FormatStyle::ALL {
            assert_eq!(FormatStyle::from_code(style.code()).unwrap(), style);
        }
        assert!(FormatStyle::from_code("X").is_err());
    }

    #[test]
    fn test_every_style_parses_back() {
        let cases = ["kg*m2/s2", "1/s", "A/(m*s)", "m(1/2)*kg(-3/2)", "mol0.25/K", "g_0^2/s"];
        for case in cases {
            let original = ex(case);
            for style in FormatStyle::ALL {
                let text = original.format(style);
                assert_eq!(ex(&text), original, "{style} rendering {text:?}");
            }
        }
    }
}
