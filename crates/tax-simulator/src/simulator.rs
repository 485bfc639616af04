//! Tax Simulator
//!
//! Validates a simulation request, runs the lot matcher for the requested
//! jurisdiction and year, and aggregates the result.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::aggregate;
use crate::error::{Result, TaxError};
use crate::matcher::{LotMatcher, MatchOptions};
use crate::models::{TaxReport, Transaction};
use crate::rules::{RuleBook, TaxRule};

/// Input for one simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub country: String,
    /// Other taxable income, used to pick the effective bracket
    #[serde(default)]
    pub income: f64,
    /// Tax year; defaults to the current UTC year
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub include_prior_lots: bool,
}

impl SimulationRequest {
    pub fn new(country: &str, year: i32, transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            country: country.to_string(),
            income: 0.0,
            year: Some(year),
            include_prior_lots: false,
        }
    }

    pub fn with_income(mut self, income: f64) -> Self {
        self.income = income;
        self
    }

    pub fn tax_year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }
}

#[derive(Debug, Clone)]
pub struct TaxSimulator {
    rules: RuleBook,
}

impl TaxSimulator {
    pub fn new(rules: RuleBook) -> Self {
        Self { rules }
    }

    /// Simulator over the compiled-in jurisdiction table.
    pub fn with_embedded_rules() -> Result<Self> {
        Ok(Self::new(RuleBook::embedded()?))
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn rule(&self, country: &str) -> Result<&TaxRule> {
        self.rules
            .get(country)
            .ok_or_else(|| TaxError::UnknownJurisdiction(country.to_string()))
    }

    pub fn simulate(&self, request: &SimulationRequest) -> Result<TaxReport> {
        if request.transactions.is_empty() {
            return Err(TaxError::EmptyTransactions);
        }
        if request.country.trim().is_empty() {
            return Err(TaxError::MissingCountry);
        }
        let rule = self.rule(&request.country)?;
        let year = request.tax_year();

        let _span = tracing::debug_span!(
            "simulate",
            country = %request.country,
            year,
            transactions = request.transactions.len()
        )
        .entered();

        let outcome = LotMatcher::new(rule)
            .with_options(MatchOptions {
                include_prior_lots: request.include_prior_lots,
            })
            .match_disposals(&request.transactions, year)?;

        tracing::debug!(
            disposals = outcome.disposals.len(),
            unmatched = outcome.unmatched_quantity,
            "Matched disposals"
        );

        Ok(aggregate(rule, request.income, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Term;

    fn simulator() -> TaxSimulator {
        TaxSimulator::with_embedded_rules().unwrap()
    }

    fn btc_round_trip() -> Vec<Transaction> {
        vec![
            Transaction::buy("1", "BTC", 1.0, 10_000.0, "2024-01-01"),
            Transaction::sell("2", "BTC", 1.0, 15_000.0, "2024-06-01").with_fees(10.0),
        ]
    }

    #[test]
    fn test_us_round_trip() {
        let request = SimulationRequest::new("us", 2024, btc_round_trip()).with_income(50_000.0);
        let report = simulator().simulate(&request).unwrap();

        assert_eq!(report.transactions.len(), 1);
        let disposal = &report.transactions[0];
        assert_eq!(disposal.holding_period_days, 152);
        assert_eq!(disposal.term, Term::ShortTerm);
        assert!((disposal.gain - 4990.0).abs() < 1e-9);

        // 50,000 + 4,990 lands in the 22% short-term bracket
        assert!((report.total_gain - 4990.0).abs() < 1e-9);
        assert!((report.taxable_gain - 4990.0).abs() < 1e-9);
        assert_eq!(report.tax_rate, 22.0);
        assert!((report.tax_amount - 1097.8).abs() < 1e-6);
        assert_eq!(report.long_term_gains, 0.0);
    }

    #[test]
    fn test_singapore_never_taxes() {
        let sim = simulator();
        for income in [0.0, 80_000.0, 5_000_000.0] {
            let mut txs = btc_round_trip();
            txs.push(Transaction::buy("3", "ETH", 10.0, 100.0, "2024-02-01"));
            txs.push(Transaction::sell("4", "ETH", 10.0, 4_000.0, "2024-12-01"));
            let request = SimulationRequest::new("singapore", 2024, txs).with_income(income);
            let report = sim.simulate(&request).unwrap();

            assert_eq!(report.tax_amount, 0.0);
            assert_eq!(report.taxable_gain, 0.0);
            assert!(report.transactions.iter().all(|d| d.tax_owed == 0.0));
        }
    }

    #[test]
    fn test_uk_allowance() {
        let request = SimulationRequest::new("UK", 2024, btc_round_trip());
        let report = simulator().simulate(&request).unwrap();

        assert!((report.taxable_gain - 1990.0).abs() < 1e-9);
        assert_eq!(report.remaining_tax_free_allowance, 0.0);
        assert_eq!(report.transactions[0].term, Term::LongTerm);
    }

    #[test]
    fn test_rejects_empty_transactions() {
        let request = SimulationRequest::new("us", 2024, Vec::new());
        assert!(matches!(
            simulator().simulate(&request),
            Err(TaxError::EmptyTransactions)
        ));
    }

    #[test]
    fn test_rejects_missing_and_unknown_country() {
        let sim = simulator();

        let missing = SimulationRequest::new("  ", 2024, btc_round_trip());
        assert!(matches!(sim.simulate(&missing), Err(TaxError::MissingCountry)));

        let unknown = SimulationRequest::new("atlantis", 2024, btc_round_trip());
        let err = sim.simulate(&unknown).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Unsupported jurisdiction: atlantis");
    }

    #[test]
    fn test_request_json_defaults() {
        let json = r#"{
            "transactions": [
                {"id": "a", "type": "buy", "asset": "BTC", "quantity": 1, "price": 1, "date": "2024-01-01"}
            ],
            "country": "us"
        }"#;
        let request: SimulationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.income, 0.0);
        assert!(request.year.is_none());
        assert!(!request.include_prior_lots);
        assert_eq!(request.tax_year(), Utc::now().year());
    }
}
