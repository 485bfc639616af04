//! Bracket-Rate Resolver
//!
//! Maps an amount to the rate of the bracket that contains it. This is a
//! lookup, not a progressive integration: the whole amount is taxed at the
//! single rate returned.

use serde::{Deserialize, Serialize};

/// A marginal-rate bracket. `max = None` is the unbounded top bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Rate in percent
    pub rate: f64,
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: Option<f64>,
}

impl TaxBracket {
    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min && self.max.map_or(true, |max| amount <= max)
    }
}

/// Rate of the first bracket whose `[min, max]` range contains `amount`.
///
/// Amounts outside every bracket (negative gains, `NaN`) resolve to `0.0`.
pub fn resolve_rate(amount: f64, brackets: &[TaxBracket]) -> f64 {
    brackets
        .iter()
        .find(|b| b.contains(amount))
        .map(|b| b.rate)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending() -> Vec<TaxBracket> {
        vec![
            TaxBracket { rate: 10.0, min: 0.0, max: Some(10_000.0) },
            TaxBracket { rate: 20.0, min: 10_000.0, max: Some(50_000.0) },
            TaxBracket { rate: 40.0, min: 50_000.0, max: None },
        ]
    }

    #[test]
    fn test_resolves_containing_bracket() {
        let brackets = ascending();
        assert_eq!(resolve_rate(5_000.0, &brackets), 10.0);
        assert_eq!(resolve_rate(25_000.0, &brackets), 20.0);
        assert_eq!(resolve_rate(1_000_000.0, &brackets), 40.0);
    }

    #[test]
    fn test_shared_boundary_goes_to_first_bracket() {
        let brackets = ascending();
        assert_eq!(resolve_rate(10_000.0, &brackets), 10.0);
        assert_eq!(resolve_rate(50_000.0, &brackets), 20.0);
    }

    #[test]
    fn test_whole_amount_uses_single_rate() {
        // 60k falls in the top bracket; no blending with the lower ones
        let brackets = ascending();
        let amount = 60_000.0;
        let tax = amount * resolve_rate(amount, &brackets) / 100.0;
        assert_eq!(tax, 24_000.0);
    }

    #[test]
    fn test_out_of_range_amounts_resolve_to_zero() {
        let brackets = ascending();
        assert_eq!(resolve_rate(-1.0, &brackets), 0.0);
        assert_eq!(resolve_rate(f64::NAN, &brackets), 0.0);
        assert_eq!(resolve_rate(100.0, &[]), 0.0);
    }

    #[test]
    fn test_rate_monotonic_for_ascending_brackets() {
        let brackets = ascending();
        let mut previous = resolve_rate(0.0, &brackets);
        for step in 1..=200 {
            let amount = step as f64 * 500.0;
            let rate = resolve_rate(amount, &brackets);
            assert!(rate >= previous, "rate dropped at {}", amount);
            previous = rate;
        }
    }
}
