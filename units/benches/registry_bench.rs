//! Unit registry benchmarks
//!
//! - Exponent parsing and formatting
//! - Symbol lookup, with and without prefixes
//! - Display-unit simplification and formatting

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sounio_units::{Config, Exponents, FormatSpec, FormatStyle, UnitRegistry};

// ============================================================================
// Exponents
// ============================================================================

fn bench_exponents(c: &mut Criterion) {
    let mut group = c.benchmark_group("exponents");

    for text in ["m", "kg*m2/s2", "kg(1/2)*m(-3/2)/(A*s3)", r"\mathrm{kg}\,\mathrm{m}^{2}"] {
        group.bench_with_input(BenchmarkId::new("parse", text), text, |b, text| {
            b.iter(|| Exponents::parse(black_box(text)))
        });
    }

    let unit = Exponents::parse("kg*m2/(s3*A)").unwrap_or_default();
    for style in FormatStyle::ALL {
        group.bench_with_input(BenchmarkId::new("format", style), &unit, |b, unit| {
            b.iter(|| black_box(unit).format(style))
        });
    }

    group.finish();
}

// ============================================================================
// Registry
// ============================================================================

fn bench_registry(c: &mut Criterion) {
    let registry = match UnitRegistry::new(Config::default()) {
        Ok(registry) => registry,
        Err(e) => panic!("bundled definitions failed to load: {e}"),
    };
    let mut group = c.benchmark_group("registry");

    for symbol in ["m", "km", "daPa", "degC"] {
        group.bench_with_input(BenchmarkId::new("lookup", symbol), symbol, |b, symbol| {
            b.iter(|| registry.lookup(black_box(symbol)))
        });
    }

    for text in ["kg*m2/s2", "kg*m2/(s3*A)", "kg/(m*s2)"] {
        let unit = Exponents::parse(text).unwrap_or_default();
        for depth in [1, 2, 3] {
            group.bench_with_input(
                BenchmarkId::new(format!("simplify/{text}"), depth),
                &depth,
                |b, &depth| b.iter(|| registry.simplify(black_box(&unit), depth)),
            );
        }
    }

    if let Ok(work) = registry.evaluate("3*N * 2*m") {
        let spec = FormatSpec::parse("U").unwrap_or_default();
        group.bench_function("format_with", |b| {
            b.iter(|| black_box(&work).format_with(&registry, &spec))
        });
    }

    group.bench_function("evaluate", |b| {
        b.iter(|| registry.evaluate(black_box("25*degC + 3*K")))
    });

    group.finish();
}

criterion_group!(benches, bench_exponents, bench_registry);
criterion_main!(benches);
