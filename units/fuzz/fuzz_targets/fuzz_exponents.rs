//! Fuzz target for the unit-expression parser
//!
//! Parsing arbitrary text must return a value or an error, never panic.
//! Whatever parses must format in every style without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sounio_units::{Exponents, FormatStyle, UnitReplacements};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data)
        && let Ok(exponents) = Exponents::parse(text)
    {
        let replacements = UnitReplacements::default();
        for style in FormatStyle::ALL {
            let _ = exponents.format_unit(style, &replacements);
        }
        let _ = exponents.div_scalar(2);
        let _ = exponents.complexity();
    }
});
