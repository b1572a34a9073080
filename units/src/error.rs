//! Error types for unit expressions, quantity arithmetic and definition loading
//!
//! Every fallible operation in the crate reports a [`UnitError`]. Parse
//! errors carry the offending text and a labelled span so that miette can
//! render them with context.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::exponents::Exponents;

/// Result alias used throughout the crate
pub type Result<T, E = UnitError> = std::result::Result<T, E>;

/// Errors raised by quantities, the unit registry and the definition loader
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum UnitError {
    /// Malformed exponent or definition expression
    #[error("Invalid expression: {message}")]
    #[diagnostic(
        code(units::parse),
        help("Unit factors are symbols with optional exponents joined by `*` or `/`, e.g. `kg*m2/s2`")
    )]
    Parse {
        message: String,
        #[source_code]
        src: String,
        #[label("{message}")]
        span: SourceSpan,
    },

    /// A definition entry failed to evaluate
    #[error("Can't load '{symbol}' in section [{section}] due to {}", .source.category())]
    #[diagnostic(code(units::definition))]
    Definition {
        symbol: String,
        section: String,
        #[source]
        source: Box<UnitError>,
    },

    /// Homogeneous operation between values of different dimension
    #[error("Dimension mismatch in {operation}: {left} vs. {right}")]
    #[diagnostic(
        code(units::dimension_mismatch),
        help("Both terms must have the same dimension; a plain number only combines with a dimensionless quantity")
    )]
    DimensionMismatch {
        operation: String,
        left: String,
        right: String,
    },

    /// A lambda unit (or a unit) used where it isn't allowed
    #[error("{operation} is not supported: {reason}")]
    #[diagnostic(code(units::unsupported))]
    UnsupportedOperation { operation: String, reason: String },

    /// No unit or constant matches the symbol
    #[error("{0} isn't a valid unit")]
    #[diagnostic(code(units::unknown_unit))]
    UnknownUnit(String),

    /// The base unit exists but the prefix isn't an SI prefix
    #[error("{prefix} isn't a valid prefix (in {symbol})")]
    #[diagnostic(code(units::unknown_prefix))]
    UnknownPrefix { prefix: String, symbol: String },

    /// The base unit exists but can't carry a prefix
    #[error("{unit} isn't prefixable (in {symbol})")]
    #[diagnostic(code(units::not_prefixable))]
    NotPrefixable { unit: String, symbol: String },

    /// A second file-backed registry was requested in this process
    #[error("A unit registry has already been loaded from definition files")]
    #[diagnostic(
        code(units::single_assignment),
        help("Load the definition files once and share the registry by reference")
    )]
    SingleAssignmentViolation,

    /// The display unit of a quantity doesn't match its dimension
    #[error("The display unit ({display}; dimension {display_dimension}) and the quantity (dimension {dimension}) are incompatible")]
    #[diagnostic(code(units::display_mismatch))]
    DisplayMismatch {
        display: String,
        display_dimension: String,
        dimension: String,
    },

    /// Wrong argument type or value for a helper, constructor or format code
    #[error("Invalid argument: {0}")]
    #[diagnostic(code(units::invalid_argument))]
    InvalidArgument(String),

    /// A definition file couldn't be read
    #[error("Failed to read definition file {path}: {message}")]
    #[diagnostic(code(units::io))]
    Io { path: String, message: String },
}

impl UnitError {
    /// Build a parse error pointing at `offset..offset + len` of `src`
    pub fn parse(message: impl Into<String>, src: &str, offset: usize, len: usize) -> Self {
        let offset = offset.min(src.len());
        let len = len.min(src.len() - offset);
        UnitError::Parse {
            message: message.into(),
            src: src.to_string(),
            span: SourceSpan::new(offset.into(), len),
        }
    }

    /// Build a dimension mismatch between two dimensions
    pub fn dimension_mismatch(operation: &str, left: &Exponents, right: &Exponents) -> Self {
        UnitError::DimensionMismatch {
            operation: operation.to_string(),
            left: left.describe(),
            right: right.describe(),
        }
    }

    /// Error raised when a lambda unit is used as if it were a quantity
    pub fn quantity_only(operation: &str) -> Self {
        UnitError::UnsupportedOperation {
            operation: operation.to_string(),
            reason: "the operation requires a quantity; apply the lambda unit first".to_string(),
        }
    }

    /// Short name of the error category, used in definition errors
    pub fn category(&self) -> &'static str {
        match self {
            UnitError::Parse { .. } => "ParseError",
            UnitError::Definition { .. } => "DefinitionError",
            UnitError::DimensionMismatch { .. } => "DimensionMismatch",
            UnitError::UnsupportedOperation { .. } => "UnsupportedOperation",
            UnitError::UnknownUnit(_) => "UnknownUnit",
            UnitError::UnknownPrefix { .. } => "UnknownPrefix",
            UnitError::NotPrefixable { .. } => "NotPrefixable",
            UnitError::SingleAssignmentViolation => "SingleAssignmentViolation",
            UnitError::DisplayMismatch { .. } => "DisplayMismatch",
            UnitError::InvalidArgument(_) => "InvalidArgument",
            UnitError::Io { .. } => "IoError",
        }
    }
}
