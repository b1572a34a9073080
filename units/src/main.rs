//! Sounio Units CLI
//!
//! Main entry point for the `sou-units` command.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sounio_units::{Config, Exponents, FormatSpec, UnitRegistry, Value};

#[derive(Parser)]
#[command(name = "sou-units")]
#[command(author = "Demetrios Chiuratto Agourakis, Dionisio Chiuratto Agourakis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate, convert and simplify physical quantities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (.toml or .json); defaults to the nearest sounio.toml [units] or units.toml
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Format code, e.g. "U", ".3eL" or "g"
    #[arg(short, long, global = true, default_value = "")]
    format: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression such as "25*degC" or "3*N * 2*m"
    Eval {
        #[arg(value_name = "EXPR")]
        expression: String,
    },

    /// Simplify a unit such as "kg*m2/s2"
    Simplify {
        #[arg(value_name = "UNIT")]
        unit: String,

        /// Search depth; defaults to the configured simplification level
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Express a quantity in another unit
    Convert {
        #[arg(value_name = "EXPR")]
        expression: String,

        #[arg(value_name = "UNIT")]
        unit: String,
    },

    /// List registry entries
    List {
        #[arg(long, value_enum, default_value = "units")]
        kind: ListKind,

        /// Only entries of this dimension, e.g. "L/T"
        #[arg(long)]
        dimension: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    All,
    Units,
    Prefixable,
    Constants,
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path)
            .map_err(|e| miette::miette!("Failed to load {}: {}", path.display(), e)),
        None => {
            let cwd = std::env::current_dir().map_err(|e| miette::miette!("{}", e))?;
            Ok(Config::find_config(&cwd).unwrap_or_default())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = load_config(cli.config)?;
    let spec = FormatSpec::parse(&cli.format)?;
    let registry = UnitRegistry::new(config)?;

    match cli.command {
        Commands::Eval { expression } => {
            let value = registry.evaluate(&expression)?;
            println!("{}", value.format_with(&registry, &spec)?);
        }

        Commands::Simplify { unit, depth } => {
            let unit = Exponents::parse(&unit)?;
            let depth = depth.unwrap_or(registry.config().simplification_level);
            let simplified = registry.simplify(&unit, depth);
            println!(
                "{}",
                simplified.format_unit(spec.style, &registry.config().unit_replacements)
            );
        }

        Commands::Convert { expression, unit } => {
            let value = registry.evaluate(&expression)?;
            let number = registry.convert(&value, &unit)?;
            let unit = Exponents::parse(&unit)?
                .format_unit(spec.style, &registry.config().unit_replacements);
            println!("{}{}{}", spec.format_number(number), spec.separator(), unit);
        }

        Commands::List { kind, dimension } => {
            let entries = match &dimension {
                Some(dimension) => registry.with_dimension(&Exponents::parse(dimension)?),
                None => registry.entries(),
            };
            for (symbol, value) in entries {
                if !kind.includes(&registry, symbol, value) {
                    continue;
                }
                println!("{:<12} {}", symbol, value);
            }
        }
    }

    Ok(())
}

impl ListKind {
    fn includes(self, registry: &UnitRegistry, symbol: &str, value: &Value) -> bool {
        match self {
            ListKind::All => true,
            ListKind::Units => value.is_unit(),
            ListKind::Prefixable => registry.is_prefixable(symbol),
            ListKind::Constants => !value.is_unit(),
        }
    }
}
