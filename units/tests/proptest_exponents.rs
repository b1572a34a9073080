//! Property-based tests for exponent algebra and unit lookup

mod common;

use proptest::prelude::*;
use sounio_units::registry::PREFIXES;
use sounio_units::{Exponent, Exponents, FormatStyle};

// ============================================================================
// Generators
// ============================================================================

const SYMBOLS: &[&str] = &["m", "kg", "s", "A", "K", "mol", "cd", "N", "J", "g_0"];

/// Prefixable bundled units
const BASES: &[&str] = &["m", "s", "A", "mol", "N", "W", "L", "eV"];

fn arb_exponent() -> impl Strategy<Value = Exponent> {
    prop_oneof![
        4 => (-4i64..=4).prop_filter("nonzero", |n| *n != 0).prop_map(Exponent::Int),
        1 => (-3i64..=3, 2i64..=4)
            .prop_filter_map("fraction", |(n, d)| Exponent::ratio(n, d))
            .prop_filter("nonzero", |e| !e.is_zero()),
    ]
}

fn arb_exponents() -> impl Strategy<Value = Exponents> {
    prop::collection::btree_map(prop::sample::select(SYMBOLS), arb_exponent(), 0..5)
        .prop_map(|map| map.into_iter().collect())
}

// ============================================================================
// Algebra
// ============================================================================

proptest! {
    #[test]
    fn prop_difference_with_self_is_empty(a in arb_exponents()) {
        prop_assert!((&a - &a).is_empty());
        prop_assert!((&a + &(-&a)).is_empty());
        prop_assert!(a.scale(0).is_empty());
    }

    #[test]
    fn prop_addition_is_invertible(a in arb_exponents(), b in arb_exponents()) {
        prop_assert_eq!(&(&a + &b) - &b, a.clone());
        prop_assert_eq!(&a + &b, &b + &a);
    }

    #[test]
    fn prop_no_zero_exponents_are_stored(a in arb_exponents(), b in arb_exponents()) {
        let sum = &a + &b;
        prop_assert!(sum.iter().all(|(_, e)| !e.is_zero()));
    }

    #[test]
    fn prop_every_style_parses_back(a in arb_exponents()) {
        for style in FormatStyle::ALL {
            let text = a.format(style);
            let parsed = Exponents::parse(&text);
            prop_assert!(parsed.is_ok(), "{:?}: {}", style, text);
            prop_assert_eq!(parsed.unwrap(), a.clone(), "{:?}: {}", style, text);
        }
    }

    #[test]
    fn prop_parser_never_panics(text in "[a-z0-9*/^()._ -]{0,24}") {
        let _ = Exponents::parse(&text);
    }
}

// ============================================================================
// Prefixes
// ============================================================================

proptest! {
    #[test]
    fn prop_prefix_scales_value(
        prefix in prop::sample::select(PREFIXES),
        base in prop::sample::select(BASES),
    ) {
        let registry = common::registry();
        let (symbol, factor) = prefix;
        let unit = registry.lookup(base).unwrap();
        let prefixed = registry.lookup(&format!("{symbol}{base}")).unwrap();
        let expected = factor * unit.value().unwrap();
        prop_assert!((prefixed.value().unwrap() - expected).abs() <= expected.abs() * 1e-12);
        prop_assert_eq!(prefixed.dimension(), unit.dimension());
    }
}
