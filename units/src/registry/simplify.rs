//! Display-unit simplification
//!
//! A bounded local search over the coherent relations recorded while loading
//! definitions. Each relation is an identity such as `kg*m/s2 - N`; subtracting
//! an integral multiple of it from a unit leaves the unit's value unchanged.
//! A substitution is kept only if it strictly lowers the unit's complexity
//! (the sum of the absolute exponents), after recursively simplifying the
//! candidate one level deeper. The relations are rescanned until none of
//! them improves the unit.

use crate::exponents::Exponents;

/// Simplify `unit` using `relations`, searching `max_depth` levels deep
pub fn simplify(unit: &Exponents, relations: &[Exponents], max_depth: usize) -> Exponents {
    if max_depth == 0 || unit.complexity() <= 1.0 {
        return unit.clone();
    }

    let mut unit = unit.clone();
    let mut simpler = true;
    while simpler {
        simpler = false;
        for relation in relations {
            let common: Vec<&str> = relation.symbols().filter(|s| unit.contains(s)).collect();
            // skip relations that share less than about half of their symbols
            if (common.len() as f64) < relation.len() as f64 / 2.0 - 0.5 {
                continue;
            }

            for symbol in common {
                let (Some(have), Some(per)) = (unit.get(symbol), relation.get(symbol)) else {
                    continue;
                };
                let Some(factor) = have.checked_div(per) else {
                    continue;
                };
                if !factor.is_integral() {
                    continue;
                }

                let mut candidate = &unit - &relation.scale(factor);
                if max_depth > 1 {
                    candidate = simplify(&candidate, relations, max_depth - 1);
                }
                if candidate.complexity() < unit.complexity() {
                    unit = candidate;
                    simpler = true;
                    break;
                }
            }
        }
    }

    unit
}
