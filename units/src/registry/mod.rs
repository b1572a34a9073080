//! The unit registry
//!
//! A [`UnitRegistry`] maps symbols to units and constants and keeps the
//! coherent relations that drive display-unit simplification. It is built
//! once from definition files and only read afterwards.
//!
//! Only one registry per process may be loaded from definition files
//! ([`UnitRegistry::new`], [`UnitRegistry::from_sources`]); a second attempt
//! fails with [`UnitError::SingleAssignmentViolation`]. In-memory registries
//! built with [`UnitRegistry::from_entries`] are not restricted.

pub mod prefixes;
pub mod simplify;

use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::Config;
use crate::definitions::{self, DefinitionSource, Expr};
use crate::error::{Result, UnitError};
use crate::exponents::Exponents;
use crate::value::Value;

pub use prefixes::{PREFIXES, prefix_factor};

/// Set once a file-backed registry has loaded successfully
static FILE_BACKED_LOADED: AtomicBool = AtomicBool::new(false);

/// A symbol that was defined more than once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub symbol: String,
    pub section: String,
    /// Name of the source holding the new definition
    pub source: String,
}

/// Summary of a definition load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Source names, in load order
    pub sources: Vec<String>,
    /// Number of definitions evaluated
    pub loaded: usize,
    pub overrides: Vec<Override>,
}

impl LoadReport {
    fn merge(&mut self, other: LoadReport) {
        self.sources.extend(other.sources);
        self.loaded += other.loaded;
        self.overrides.extend(other.overrides);
    }
}

/// Units and constants by symbol
pub struct UnitRegistry {
    entries: FxHashMap<String, Value>,
    /// Symbols that accept SI prefixes; survives collapsing to plain numbers
    prefixable: FxHashSet<String>,
    coherent_relations: Vec<Exponents>,
    config: Config,
    report: LoadReport,
}

impl UnitRegistry {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Load the definition files named in `config`, or the bundled set if it
    /// names none
    pub fn new(config: Config) -> Result<Self> {
        let sources = if config.definitions.is_empty() {
            definitions::bundled()
        } else {
            definitions::read_sources(&config.definitions)?
        };
        Self::from_sources(config, sources)
    }

    /// Load definitions from in-memory sources, in order
    pub fn from_sources(config: Config, sources: Vec<DefinitionSource>) -> Result<Self> {
        if FILE_BACKED_LOADED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(UnitError::SingleAssignmentViolation);
        }

        let registry = Self::build(config, &sources);
        if registry.is_err() {
            FILE_BACKED_LOADED.store(false, Ordering::SeqCst);
        }
        registry
    }

    /// Load without claiming the process-wide slot
    pub(crate) fn build(config: Config, sources: &[DefinitionSource]) -> Result<Self> {
        let mut registry = Self::empty(config);
        registry.load_definitions(sources)?;
        tracing::info!(
            units = registry.len(),
            relations = registry.coherent_relations.len(),
            overrides = registry.report.overrides.len(),
            "unit registry loaded"
        );
        Ok(registry)
    }

    /// In-memory registry from symbol/value pairs
    pub fn from_entries(
        config: Config,
        entries: impl IntoIterator<Item = (String, Value)>,
        coherent_relations: Vec<Exponents>,
    ) -> Self {
        let mut registry = Self::empty(config);
        for (symbol, value) in entries {
            registry.insert(&symbol, value);
        }
        registry.coherent_relations = coherent_relations;
        registry
    }

    fn empty(config: Config) -> Self {
        UnitRegistry {
            entries: FxHashMap::default(),
            prefixable: FxHashSet::default(),
            coherent_relations: Vec::new(),
            config,
            report: LoadReport::default(),
        }
    }

    /// Evaluate and add the definitions of `sources`, in order
    ///
    /// Loading stops at the first failing definition; the registry then holds
    /// everything defined before it.
    pub fn load_definitions(&mut self, sources: &[DefinitionSource]) -> Result<LoadReport> {
        let report = definitions::load(self, sources)?;
        self.report.merge(report.clone());
        Ok(report)
    }

    /// Store `value` under `symbol`, returning the entry it replaced
    pub(crate) fn insert(&mut self, symbol: &str, value: Value) -> Option<Value> {
        if value.prefixable() {
            self.prefixable.insert(symbol.to_string());
        } else {
            self.prefixable.remove(symbol);
        }
        let value = match value {
            Value::Quantity(q) if !self.config.use_quantities => Value::Number(q.value()),
            other => other,
        };
        self.entries.insert(symbol.to_string(), value)
    }

    pub(crate) fn push_relation(&mut self, relation: Exponents) {
        self.coherent_relations.push(relation);
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The entry stored under exactly `symbol`
    pub fn get(&self, symbol: &str) -> Option<&Value> {
        self.entries.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn is_prefixable(&self, symbol: &str) -> bool {
        self.prefixable.contains(symbol)
    }

    /// Resolve a symbol, trying one- and two-character SI prefixes if there
    /// is no exact match
    ///
    /// The error names the most specific failure: an unknown prefix or a
    /// base unit that can't be prefixed, else an unknown unit.
    pub fn lookup(&self, symbol: &str) -> Result<Value> {
        if let Some(value) = self.entries.get(symbol) {
            return Ok(value.clone());
        }

        let mut error = UnitError::UnknownUnit(symbol.to_string());
        for width in 1..=2 {
            let Some((split, _)) = symbol.char_indices().nth(width) else {
                break;
            };
            let (prefix, base) = symbol.split_at(split);
            let Some(unit) = self.entries.get(base) else {
                continue;
            };
            let Some(factor) = prefix_factor(prefix) else {
                error = UnitError::UnknownPrefix {
                    prefix: prefix.to_string(),
                    symbol: symbol.to_string(),
                };
                continue;
            };
            if !self.is_prefixable(base) {
                error = UnitError::NotPrefixable {
                    unit: base.to_string(),
                    symbol: symbol.to_string(),
                };
                continue;
            }
            return Ok(prefixes::apply_prefix(unit, factor, symbol));
        }
        Err(error)
    }

    /// Product of the registry units raised to their exponents
    ///
    /// Factors multiply in symbol order; an empty map gives the number 1.
    pub fn compose(&self, unit: &Exponents) -> Result<Value> {
        let mut product: Option<Value> = None;
        for (symbol, exponent) in unit.iter() {
            let factor = self.lookup(symbol)?.pow_exponent(exponent)?;
            product = Some(match product {
                Some(acc) => acc.mul(&factor)?,
                None => factor,
            });
        }
        Ok(product.unwrap_or(Value::Number(1.0)))
    }

    /// Compose the unit written as `text`, e.g. `"lbf/inch2"`
    pub fn unit(&self, text: &str) -> Result<Value> {
        self.compose(&Exponents::parse(text)?)
    }

    /// Evaluate an expression such as `"25*degC"` against this registry
    pub fn evaluate(&self, source: &str) -> Result<Value> {
        let expr = Expr::parse(source)?;
        definitions::eval::evaluate(&expr, self)?.into_value()
    }

    /// Number of `unit` in `value`
    pub fn convert(&self, value: &Value, unit: &str) -> Result<f64> {
        value.div(&self.unit(unit)?)?.dimensionless_value()
    }

    /// Simplify a display unit using the coherent relations
    pub fn simplify(&self, unit: &Exponents, max_depth: usize) -> Exponents {
        simplify::simplify(unit, &self.coherent_relations, max_depth)
    }

    // ========================================================================
    // LISTINGS
    // ========================================================================

    fn sorted<'a>(&'a self, keep: impl Fn(&str, &Value) -> bool) -> Vec<(&'a str, &'a Value)> {
        let mut items: Vec<(&str, &Value)> = self
            .entries
            .iter()
            .filter(|(symbol, value)| keep(symbol, value))
            .map(|(symbol, value)| (symbol.as_str(), value))
            .collect();
        items.sort_by(|a, b| a.0.cmp(b.0));
        items
    }

    /// Every entry, by symbol
    pub fn entries(&self) -> Vec<(&str, &Value)> {
        self.sorted(|_, _| true)
    }

    /// Scalar and lambda units, by symbol
    pub fn units(&self) -> Vec<(&str, &Value)> {
        self.sorted(|_, value| value.is_unit())
    }

    pub fn prefixable_units(&self) -> Vec<(&str, &Value)> {
        self.sorted(|symbol, _| self.is_prefixable(symbol))
    }

    /// Entries that aren't units
    pub fn constants(&self) -> Vec<(&str, &Value)> {
        self.sorted(|_, value| !value.is_unit())
    }

    /// Entries of the given dimension
    pub fn with_dimension(&self, dimension: &Exponents) -> Vec<(&str, &Value)> {
        self.sorted(|_, value| &value.dimension() == dimension)
    }

    pub fn coherent_relations(&self) -> &[Exponents] {
        &self.coherent_relations
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries().into_iter().map(|(symbol, _)| symbol).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Everything loaded so far
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }
}

impl std::fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("entries", &self.entries.len())
            .field("coherent_relations", &self.coherent_relations.len())
            .field("config", &self.config)
            .finish()
    }
}
