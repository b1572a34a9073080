//! Sounio Units
//!
//! Runtime physical quantities for Sounio:
//! - Exponent vectors over dimensions and unit symbols, with parsing and
//!   formatting in plain text, HTML, LaTeX, Unicode, Modelica and verbose styles
//! - Quantities, scalar units and lambda units (offset scales such as degC)
//!   with dimension-checked arithmetic
//! - A unit registry loaded from INI-style definition files, with SI prefixes
//!   and display-unit simplification
//!
//! # Architecture
//!
//! ```text
//! definition files → sections → expression lexer/parser → evaluator → UnitRegistry
//!                                                                      ↓
//!                           Value arithmetic ← lookup / compose → simplify → format
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sounio_units::{Config, FormatSpec, UnitRegistry};
//!
//! let registry = UnitRegistry::new(Config::default())?;
//! let work = registry.evaluate("3*N * 2*m")?;
//! assert_eq!(work.format_with(&registry, &FormatSpec::default())?, "6 J");
//! # Ok::<(), sounio_units::UnitError>(())
//! ```

pub mod config;
pub mod definitions;
pub mod error;
pub mod exponents;
pub mod registry;
pub mod value;

pub use config::{Config, ConfigError};
pub use definitions::DefinitionSource;
pub use error::{Result, UnitError};
pub use exponents::{Exponent, Exponents, FormatStyle, UnitReplacements};
pub use registry::{LoadReport, Override, UnitRegistry};
pub use value::{FormatSpec, LambdaUnit, Quantity, Value, ValueKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
