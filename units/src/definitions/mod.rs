//! Unit definition files
//!
//! Definitions live in INI-like files:
//!
//! ```ini
//! ; comment
//! [SI derived units]
//! N = kg*m/s2, True      ; (unit, prefixable)
//! degC = (lambda n: (n + 273.15)*K,
//!         lambda T: T/K - 273.15), False
//! ```
//!
//! Each expression is evaluated against everything defined before it, so
//! later files may build on (and override) earlier ones.

pub mod eval;
pub mod lexer;
pub mod parser;

use std::path::Path;

use crate::error::{Result, UnitError};
use crate::exponents::Exponents;
use crate::registry::{LoadReport, Override, UnitRegistry};
use crate::value::{LambdaUnit, Quantity, Value};

pub use eval::{Closure, Object, evaluate};
pub use lexer::{Token, TokenKind, lex};
pub use parser::{BinaryOp, Expr, UnaryOp};

/// Text of one definition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSource {
    pub name: String,
    pub text: String,
}

impl DefinitionSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        DefinitionSource {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| UnitError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(DefinitionSource { name, text })
    }
}

/// The definition set shipped with the crate
pub fn bundled() -> Vec<DefinitionSource> {
    vec![
        DefinitionSource::new("base-SI.ini", include_str!("../../definitions/base-SI.ini")),
        DefinitionSource::new("derived.ini", include_str!("../../definitions/derived.ini")),
        DefinitionSource::new("BIPM.ini", include_str!("../../definitions/BIPM.ini")),
        DefinitionSource::new("other.ini", include_str!("../../definitions/other.ini")),
    ]
}

/// Read definition files, keeping their order
pub fn read_sources(paths: &[impl AsRef<Path>]) -> Result<Vec<DefinitionSource>> {
    paths.iter().map(|p| DefinitionSource::read(p.as_ref())).collect()
}

// ============================================================================
// SECTIONS
// ============================================================================

/// One `symbol = expression` line (with its continuation lines)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub section: String,
    pub symbol: String,
    pub expression: String,
    /// 1-based line of the symbol
    pub line: usize,
}

/// Split a definition file into entries
pub fn parse_sections(text: &str) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::new();
    let mut section: Option<String> = None;
    // whether an indented line continues the last entry
    let mut open = false;
    let mut offset = 0;

    for (index, raw) in text.split('\n').enumerate() {
        let line_offset = offset;
        offset += raw.len() + 1;

        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let line = strip_inline_comment(raw);
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        let indented = line.starts_with([' ', '\t']);
        if indented
            && open
            && let Some(entry) = entries.last_mut()
        {
            if !entry.expression.is_empty() {
                entry.expression.push(' ');
            }
            entry.expression.push_str(trimmed);
            continue;
        }

        if let Some(name) = trimmed.strip_prefix('[') {
            let Some(name) = name.strip_suffix(']') else {
                return Err(UnitError::parse(
                    "unterminated section header",
                    text,
                    line_offset,
                    raw.len(),
                ));
            };
            section = Some(name.trim().to_string());
            open = false;
            continue;
        }

        let Some((symbol, expression)) = trimmed.split_once('=') else {
            return Err(UnitError::parse(
                "expected `symbol = expression`",
                text,
                line_offset,
                raw.len(),
            ));
        };
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(UnitError::parse("missing symbol", text, line_offset, raw.len()));
        }
        let Some(section) = &section else {
            return Err(UnitError::parse(
                "definition outside of a section",
                text,
                line_offset,
                raw.len(),
            ));
        };

        entries.push(Entry {
            section: section.clone(),
            symbol: symbol.to_string(),
            expression: expression.trim().to_string(),
            line: index + 1,
        });
        open = true;
    }

    Ok(entries)
}

/// The line without a trailing `;` comment (a `;` preceded by whitespace)
fn strip_inline_comment(line: &str) -> &str {
    let mut previous = None;
    for (i, c) in line.char_indices() {
        if c == ';' && previous.is_some_and(char::is_whitespace) {
            return &line[..i];
        }
        previous = Some(c);
    }
    line
}

// ============================================================================
// LOADING
// ============================================================================

/// Evaluate the entries of `sources` into `registry`, in order
pub fn load(registry: &mut UnitRegistry, sources: &[DefinitionSource]) -> Result<LoadReport> {
    let mut report = LoadReport::default();

    for source in sources {
        let entries = parse_sections(&source.text)?;

        for entry in &entries {
            let value = define(registry, entry).map_err(|e| UnitError::Definition {
                symbol: entry.symbol.clone(),
                section: entry.section.clone(),
                source: Box::new(e),
            })?;

            if registry.insert(&entry.symbol, value).is_some() {
                tracing::warn!(
                    symbol = %entry.symbol,
                    section = %entry.section,
                    source = %source.name,
                    "overriding an existing definition"
                );
                report.overrides.push(Override {
                    symbol: entry.symbol.clone(),
                    section: entry.section.clone(),
                    source: source.name.clone(),
                });
            }
            tracing::debug!(symbol = %entry.symbol, section = %entry.section, "defined");
            report.loaded += 1;
        }

        tracing::info!(source = %source.name, entries = entries.len(), "loaded definitions");
        report.sources.push(source.name.clone());
    }

    Ok(report)
}

/// The registry entry for one definition
fn define(registry: &mut UnitRegistry, entry: &Entry) -> Result<Value> {
    let expr = Expr::parse(&entry.expression)?;
    let symbol = entry.symbol.as_str();

    match evaluate(&expr, registry)? {
        Object::Tuple(items) if items.len() == 2 => {
            let mut items = items.into_iter();
            let (Some(unit), Some(flag)) = (items.next(), items.next()) else {
                return Err(not_a_definition("tuple"));
            };
            let prefixable = flag.truthy()?;

            match unit {
                Object::Tuple(pair) => {
                    let track = registry.config().use_quantities;
                    Ok(Value::Lambda(lambda_unit(symbol, pair, prefixable, track)?))
                }
                Object::Value(Value::Lambda(unit)) => Ok(Value::Lambda(
                    unit.with_prefixable(prefixable)
                        .with_display_unit(Exponents::symbol(symbol)),
                )),
                Object::Value(Value::Quantity(q)) => {
                    // a unit derived from other units only
                    if q.is_unit() && !expr.calls("ScalarUnit") {
                        registry.push_relation(q.display_unit() - &Exponents::symbol(symbol));
                    }
                    Ok(Value::Quantity(q.bind_unit(symbol, prefixable)))
                }
                Object::Value(Value::Number(n)) => Ok(Value::Quantity(
                    Quantity::new(n, Exponents::new(), Exponents::new())
                        .bind_unit(symbol, prefixable),
                )),
                other => Err(not_a_definition(&other.type_name())),
            }
        }
        Object::Value(Value::Number(n)) => Ok(Value::Quantity(
            Quantity::new(n, Exponents::new(), Exponents::new()).bind_unit(symbol, false),
        )),
        Object::Value(value) => Ok(value),
        other => Err(not_a_definition(&other.type_name())),
    }
}

fn lambda_unit(
    symbol: &str,
    pair: Vec<Object>,
    prefixable: bool,
    track_quantities: bool,
) -> Result<LambdaUnit> {
    let [Object::Function(to_quantity), Object::Function(to_number)] =
        <[Object; 2]>::try_from(pair).map_err(|_| not_a_definition("tuple"))?
    else {
        return Err(UnitError::InvalidArgument(
            "a lambda unit needs a pair of one-argument functions".to_string(),
        ));
    };
    if to_quantity.arity() != 1 || to_number.arity() != 1 {
        return Err(UnitError::InvalidArgument(
            "a lambda unit needs a pair of one-argument functions".to_string(),
        ));
    }

    let to_quantity = to_quantity.into_conversion();
    let to_number = to_number.into_conversion();
    let dimension = to_quantity(&Value::Number(0.0))
        .map(|q| q.dimension())
        .unwrap_or_default();

    Ok(LambdaUnit::new(
        to_quantity,
        to_number,
        dimension,
        Exponents::symbol(symbol),
        prefixable,
    )
    .with_tracking(track_quantities))
}

fn not_a_definition(found: &str) -> UnitError {
    UnitError::InvalidArgument(format!(
        "expected a number, a quantity, a lambda unit or a (unit, prefixable) pair, found a {found}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::value::ValueKind;

    fn load_text(text: &str) -> Result<UnitRegistry> {
        UnitRegistry::build(Config::default(), &[DefinitionSource::new("test.ini", text)])
    }

    // ========================================================================
    // SECTIONS
    // ========================================================================

    #[test]
    fn test_parse_sections() {
        let text = "\
; header comment
# another
[base]
m = ScalarUnit(1, 'L', 'm'), True   ; metre
s = ScalarUnit(1, 'T', 's'), True

[derived]
v = (m/s,
     False)
";
        let entries = parse_sections(text).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].section, "base");
        assert_eq!(entries[0].symbol, "m");
        assert_eq!(entries[0].expression, "ScalarUnit(1, 'L', 'm'), True");
        assert_eq!(entries[0].line, 4);
        assert_eq!(entries[2].section, "derived");
        assert_eq!(entries[2].expression, "(m/s, False)");
    }

    #[test]
    fn test_symbols_keep_their_case() {
        let entries = parse_sections("[x]\nPa = 1\npa = 2\n").unwrap();
        assert_eq!(entries[0].symbol, "Pa");
        assert_eq!(entries[1].symbol, "pa");
    }

    #[test]
    fn test_semicolon_without_space_is_not_a_comment() {
        assert_eq!(strip_inline_comment("a = 'x;y' ; c"), "a = 'x;y' ");
    }

    #[test]
    fn test_section_errors() {
        assert!(matches!(parse_sections("m = 1\n"), Err(UnitError::Parse { .. })));
        assert!(matches!(parse_sections("[a\nm = 1\n"), Err(UnitError::Parse { .. })));
        assert!(matches!(parse_sections("[a]\njust words\n"), Err(UnitError::Parse { .. })));
        assert!(matches!(parse_sections("[a]\n = 1\n"), Err(UnitError::Parse { .. })));
    }

    // ========================================================================
    // CLASSIFICATION
    // ========================================================================

    const BASE: &str = "\
[base]
m = ScalarUnit(1, 'L', 'm'), True
kg = ScalarUnit(1, 'M', 'kg'), False
s = ScalarUnit(1, 'T', 's'), True
K = ScalarUnit(1, 'Theta', 'K'), True
";

    #[test]
    fn test_plain_number_is_dimensionless_unit() {
        let registry = load_text(&format!("{BASE}[misc]\npercent = 0.01\n")).unwrap();
        let percent = registry.get("percent").unwrap();
        assert_eq!(percent.kind(), ValueKind::ScalarUnit);
        assert!(percent.is_dimensionless());
        assert!(!percent.prefixable());
    }

    #[test]
    fn test_derived_unit_records_relation() {
        let registry = load_text(&format!("{BASE}[derived]\nN = kg*m/s2, True\n")).unwrap();
        let newton = registry.get("N").unwrap();
        assert_eq!(newton.kind(), ValueKind::ScalarUnit);
        assert_eq!(newton.display_unit(), Exponents::symbol("N"));
        assert!(newton.prefixable());
        assert_eq!(
            registry.coherent_relations(),
            &[Exponents::parse("kg*m/(s2*N)").unwrap()]
        );
    }

    #[test]
    fn test_scaled_and_explicit_units_record_no_relation() {
        let registry = load_text(&format!(
            "{BASE}[other]\nft = 0.3048*m, False\ng = kg/1000, True\nrad = ScalarUnit(1, '', 'rad'), True\n"
        ))
        .unwrap();
        assert!(registry.coherent_relations().is_empty());
        assert_eq!(registry.get("ft").unwrap().kind(), ValueKind::ScalarUnit);
        assert!(registry.is_prefixable("g"));
        assert!(registry.get("rad").unwrap().is_dimensionless());
    }

    #[test]
    fn test_constant_is_bound_as_is() {
        let registry = load_text(&format!("{BASE}[constants]\nc = 299792458*m/s\n")).unwrap();
        let c = registry.get("c").unwrap();
        assert_eq!(c.kind(), ValueKind::Quantity);
        assert_eq!(c.display_unit(), Exponents::parse("m/s").unwrap());
    }

    #[test]
    fn test_lambda_unit() {
        let registry = load_text(&format!(
            "{BASE}[temperature]\ndegC = (lambda n: (n + 273.15)*K,\n        lambda T: T/K - 273.15), False\n"
        ))
        .unwrap();
        let celsius = registry.get("degC").unwrap().as_lambda().unwrap();
        assert_eq!(celsius.dimension(), &Exponents::symbol("Theta"));
        assert_eq!(celsius.display_unit(), &Exponents::symbol("degC"));
        assert!(!celsius.prefixable());
        assert!(celsius.tracks_quantities());

        let absolute = registry.evaluate("25*degC / K").unwrap();
        assert!((absolute.value().unwrap() - 298.15).abs() < 1e-9);
    }

    #[test]
    fn test_reflagged_lambda_unit() {
        let registry = load_text(&format!(
            "{BASE}[temperature]\ndegC = (lambda n: (n + 273.15)*K, lambda T: T/K - 273.15), False\ncelsius = degC, True\n"
        ))
        .unwrap();
        let celsius = registry.get("celsius").unwrap().as_lambda().unwrap();
        assert!(celsius.prefixable());
        assert_eq!(celsius.display_unit(), &Exponents::symbol("celsius"));
    }

    #[test]
    fn test_invalid_definitions() {
        for body in ["'metre'", "(m, m, True)", "((lambda x: x, 2), True)", "(lambda a, b: a, True)"] {
            let err = load_text(&format!("{BASE}[bad]\nx = {body}\n")).unwrap_err();
            assert!(
                matches!(
                    &err,
                    UnitError::Definition { symbol, source, .. }
                        if symbol == "x" && matches!(**source, UnitError::InvalidArgument(_))
                ),
                "{body}: {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_error_in_expression_is_wrapped() {
        let err = load_text("[a]\nx = 1 +\n").unwrap_err();
        assert!(matches!(err, UnitError::Definition { .. }));
        assert_eq!(
            err.to_string(),
            "Can't load 'x' in section [a] due to ParseError"
        );
    }

    #[test]
    fn test_later_files_build_on_earlier_ones() {
        let mut registry = load_text(BASE).unwrap();
        let report = registry
            .load_definitions(&[DefinitionSource::new("more.ini", "[more]\nkm2 = km**2, False\n")])
            .unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(report.sources, vec!["more.ini"]);
        assert_eq!(registry.get("km2").unwrap().value().unwrap(), 1e6);
    }

    #[test]
    fn test_read_sources_reports_missing_files() {
        let err = read_sources(&["/nonexistent/units.ini"]).unwrap_err();
        assert!(matches!(err, UnitError::Io { .. }));
    }
}
