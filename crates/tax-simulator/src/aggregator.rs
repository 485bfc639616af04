//! Year-level aggregation of matched disposals.
//!
//! The aggregate applies the taxable percentage and the tax-free allowance
//! to the total gain on its own, independently of the per-disposal
//! allowance tracked by the matcher. The effective rate always comes from
//! the short-term table.

use crate::brackets::resolve_rate;
use crate::matcher::MatchOutcome;
use crate::models::TaxReport;
use crate::rules::TaxRule;

pub fn aggregate(rule: &TaxRule, income: f64, outcome: MatchOutcome) -> TaxReport {
    let mut total_gain = 0.0;
    let mut short_term_gains = 0.0;
    let mut long_term_gains = 0.0;

    for disposal in &outcome.disposals {
        total_gain += disposal.gain;
        if disposal.term.is_long_term() {
            long_term_gains += disposal.gain;
        } else {
            short_term_gains += disposal.gain;
        }
    }

    let adjusted_gain = total_gain * rule.taxable_percentage / 100.0;
    let allowance_used = adjusted_gain.clamp(0.0, rule.tax_free_allowance);
    let taxable_gain = (adjusted_gain - rule.tax_free_allowance).max(0.0);
    let remaining_tax_free_allowance = rule.tax_free_allowance - allowance_used;

    let tax_rate = resolve_rate(income + taxable_gain, &rule.short_term_brackets);
    let tax_amount = taxable_gain * tax_rate / 100.0;

    let loss_carry_forward = if total_gain < 0.0 && rule.loss_carry_forward.allowed {
        -total_gain
    } else {
        0.0
    };

    TaxReport {
        total_gain,
        taxable_gain,
        tax_amount,
        tax_rate,
        short_term_gains,
        long_term_gains,
        remaining_tax_free_allowance,
        loss_carry_forward,
        unmatched_quantity: outcome.unmatched_quantity,
        transactions: outcome.disposals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brackets::TaxBracket;
    use crate::matcher::LotMatcher;
    use crate::models::Transaction;
    use crate::rules::LossCarryForward;

    fn rule(allowance: f64, taxable_percentage: f64) -> TaxRule {
        TaxRule {
            name: "Test".to_string(),
            currency: "XXX".to_string(),
            short_term_brackets: vec![
                TaxBracket { rate: 10.0, min: 0.0, max: Some(10_000.0) },
                TaxBracket { rate: 25.0, min: 10_000.0, max: None },
            ],
            long_term_brackets: vec![TaxBracket { rate: 5.0, min: 0.0, max: None }],
            short_term_duration_days: 30,
            taxable_percentage,
            tax_free_allowance: allowance,
            loss_carry_forward: LossCarryForward { allowed: true, years: None },
            notes: None,
        }
    }

    fn report(rule: &TaxRule, income: f64, txs: &[Transaction]) -> TaxReport {
        let outcome = LotMatcher::new(rule).match_disposals(txs, 2024).unwrap();
        aggregate(rule, income, outcome)
    }

    #[test]
    fn test_splits_short_and_long_term() {
        let rule = rule(0.0, 100.0);
        let txs = vec![
            Transaction::buy("b1", "BTC", 1.0, 100.0, "2024-01-01"),
            Transaction::buy("b2", "BTC", 1.0, 100.0, "2024-05-01"),
            Transaction::sell("s1", "BTC", 2.0, 300.0, "2024-05-10"),
        ];
        let report = report(&rule, 0.0, &txs);

        assert_eq!(report.long_term_gains, 200.0);
        assert_eq!(report.short_term_gains, 200.0);
        assert_eq!(report.total_gain, 400.0);
        assert_eq!(report.transactions.len(), 2);
    }

    #[test]
    fn test_effective_rate_uses_short_term_table_even_for_long_term_gains() {
        // All gains are long-term (5%), yet the year-level rate comes from the
        // short-term table. Kept as-is; per-disposal rates use the right table.
        let rule = rule(0.0, 100.0);
        let txs = vec![
            Transaction::buy("b1", "BTC", 1.0, 100.0, "2024-01-01"),
            Transaction::sell("s1", "BTC", 1.0, 1100.0, "2024-06-01"),
        ];
        let report = report(&rule, 0.0, &txs);

        assert!(report.transactions[0].term.is_long_term());
        assert_eq!(report.transactions[0].tax_rate, 5.0);
        assert_eq!(report.tax_rate, 10.0);
        assert_eq!(report.tax_amount, 100.0);
    }

    #[test]
    fn test_income_pushes_rate_bracket() {
        let rule = rule(0.0, 100.0);
        let txs = vec![
            Transaction::buy("b1", "BTC", 1.0, 100.0, "2024-01-01"),
            Transaction::sell("s1", "BTC", 1.0, 1100.0, "2024-01-10"),
        ];

        assert_eq!(report(&rule, 0.0, &txs).tax_rate, 10.0);
        let high_income = report(&rule, 9_500.0, &txs);
        assert_eq!(high_income.tax_rate, 25.0);
        assert_eq!(high_income.tax_amount, 250.0);
    }

    #[test]
    fn test_aggregate_allowance_is_independent_of_matcher() {
        let rule = rule(300.0, 100.0);
        let txs = vec![
            Transaction::buy("b1", "BTC", 2.0, 100.0, "2024-01-01"),
            Transaction::sell("s1", "BTC", 1.0, 300.0, "2024-01-10"),
            Transaction::sell("s2", "BTC", 1.0, 300.0, "2024-01-11"),
        ];
        let report = report(&rule, 0.0, &txs);

        // matcher: 200 covered, then 100 covered + 100 taxed
        assert_eq!(report.transactions[0].taxable_gain, 0.0);
        assert_eq!(report.transactions[1].taxable_gain, 100.0);
        // aggregate starts from the full allowance again
        assert_eq!(report.taxable_gain, 100.0);
        assert_eq!(report.remaining_tax_free_allowance, 0.0);
        assert_eq!(report.tax_amount, 10.0);
    }

    #[test]
    fn test_gain_below_allowance_leaves_remainder() {
        let rule = rule(1000.0, 50.0);
        let txs = vec![
            Transaction::buy("b1", "BTC", 1.0, 100.0, "2024-01-01"),
            Transaction::sell("s1", "BTC", 1.0, 900.0, "2024-01-10"),
        ];
        let report = report(&rule, 0.0, &txs);

        assert_eq!(report.taxable_gain, 0.0);
        assert_eq!(report.remaining_tax_free_allowance, 600.0);
        assert_eq!(report.tax_amount, 0.0);
    }

    #[test]
    fn test_net_loss_carries_forward() {
        let rule = rule(500.0, 100.0);
        let txs = vec![
            Transaction::buy("b1", "BTC", 1.0, 1000.0, "2024-01-01"),
            Transaction::sell("s1", "BTC", 1.0, 400.0, "2024-01-10"),
        ];
        let report = report(&rule, 0.0, &txs);

        assert_eq!(report.total_gain, -600.0);
        assert_eq!(report.taxable_gain, 0.0);
        assert_eq!(report.remaining_tax_free_allowance, 500.0);
        assert_eq!(report.loss_carry_forward, 600.0);
    }

    #[test]
    fn test_no_carry_forward_when_not_allowed() {
        let mut rule = rule(0.0, 100.0);
        rule.loss_carry_forward = LossCarryForward::default();
        let txs = vec![
            Transaction::buy("b1", "BTC", 1.0, 1000.0, "2024-01-01"),
            Transaction::sell("s1", "BTC", 1.0, 400.0, "2024-01-10"),
        ];
        assert_eq!(report(&rule, 0.0, &txs).loss_carry_forward, 0.0);
    }

    #[test]
    fn test_empty_year_reports_zeroes() {
        let rule = rule(250.0, 100.0);
        let report = aggregate(&rule, 40_000.0, MatchOutcome::default());

        assert_eq!(report.total_gain, 0.0);
        assert_eq!(report.tax_amount, 0.0);
        assert_eq!(report.remaining_tax_free_allowance, 250.0);
        assert_eq!(report.tax_rate, 25.0);
        assert!(report.transactions.is_empty());
    }
}
