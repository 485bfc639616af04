//! Transaction and report types shared by the matcher and aggregator.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Buy or sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

/// One recorded buy or sell event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub asset: String,
    pub quantity: f64,
    /// Unit price
    pub price: f64,
    /// ISO-8601 date or timestamp
    pub date: String,
    #[serde(default)]
    pub fees: f64,
}

impl Transaction {
    pub fn buy(id: &str, asset: &str, quantity: f64, price: f64, date: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: TransactionKind::Buy,
            asset: asset.to_string(),
            quantity,
            price,
            date: date.to_string(),
            fees: 0.0,
        }
    }

    pub fn sell(id: &str, asset: &str, quantity: f64, price: f64, date: &str) -> Self {
        Self {
            kind: TransactionKind::Sell,
            ..Self::buy(id, asset, quantity, price, date)
        }
    }

    pub fn with_fees(mut self, fees: f64) -> Self {
        self.fees = fees;
        self
    }

    pub fn is_buy(&self) -> bool {
        self.kind == TransactionKind::Buy
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date)
    }
}

/// Holding period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Term {
    ShortTerm,
    LongTerm,
}

impl Term {
    pub fn is_long_term(&self) -> bool {
        matches!(self, Term::LongTerm)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::ShortTerm => write!(f, "short-term"),
            Term::LongTerm => write!(f, "long-term"),
        }
    }
}

/// A sell (or part of one) paired with a single buy lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedDisposal {
    pub buy_id: String,
    pub sell_id: String,
    pub asset: String,
    /// Quantity taken from the buy lot
    pub quantity: f64,
    pub acquired_date: DateTime<Utc>,
    pub disposed_date: DateTime<Utc>,
    pub holding_period_days: i64,
    pub term: Term,
    pub proceeds: f64,
    pub cost_basis: f64,
    pub gain: f64,
    /// Taxable gain after the percentage discount and allowance
    pub taxable_gain: f64,
    /// Rate in percent
    pub tax_rate: f64,
    pub tax_owed: f64,
}

/// Year-level result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxReport {
    pub total_gain: f64,
    pub taxable_gain: f64,
    pub tax_amount: f64,
    /// Effective rate in percent
    pub tax_rate: f64,
    pub short_term_gains: f64,
    pub long_term_gains: f64,
    pub remaining_tax_free_allowance: f64,
    /// Net loss available for later years
    pub loss_carry_forward: f64,
    /// Sold quantity with no prior buy lot to match against
    pub unmatched_quantity: f64,
    pub transactions: Vec<MatchedDisposal>,
}

/// Parse an ISO-8601 date or timestamp; values without an offset are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
