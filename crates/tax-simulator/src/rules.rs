//! Tax Rules
//!
//! Per-jurisdiction capital gains rules, loaded once at startup from an
//! embedded JSON table or an override file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::brackets::TaxBracket;
use crate::error::{Result, TaxError};

const EMBEDDED_RULES: &str = include_str!("../data/tax_rules.json");

/// Loss carry-forward policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LossCarryForward {
    /// Whether net losses can be carried into later years
    pub allowed: bool,
    /// Years losses can be carried forward (None = unlimited)
    pub years: Option<u32>,
}

/// Capital gains rules for one jurisdiction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRule {
    /// Display name
    pub name: String,
    /// Currency all amounts are expressed in
    pub currency: String,
    /// Brackets applied to short-term gains, ascending by `min`
    pub short_term_brackets: Vec<TaxBracket>,
    /// Brackets applied to long-term gains, ascending by `min`
    pub long_term_brackets: Vec<TaxBracket>,
    /// Holding periods strictly longer than this are long-term
    pub short_term_duration_days: i64,
    /// Share of a gain that is taxable, in percent
    pub taxable_percentage: f64,
    /// Flat tax-free amount per tax year
    #[serde(default)]
    pub tax_free_allowance: f64,
    #[serde(default)]
    pub loss_carry_forward: LossCarryForward,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TaxRule {
    /// Check the bracket tables and scalar fields for consistency.
    pub fn validate(&self, code: &str) -> Result<()> {
        validate_brackets(code, "shortTermBrackets", &self.short_term_brackets)?;
        validate_brackets(code, "longTermBrackets", &self.long_term_brackets)?;

        if !(0.0..=100.0).contains(&self.taxable_percentage) {
            return Err(TaxError::InvalidRuleBook(format!(
                "{}: taxablePercentage {} must be between 0 and 100",
                code, self.taxable_percentage
            )));
        }
        if self.tax_free_allowance < 0.0 || !self.tax_free_allowance.is_finite() {
            return Err(TaxError::InvalidRuleBook(format!(
                "{}: taxFreeAllowance must be a non-negative number",
                code
            )));
        }
        if self.short_term_duration_days < 0 {
            return Err(TaxError::InvalidRuleBook(format!(
                "{}: shortTermDurationDays must not be negative",
                code
            )));
        }
        Ok(())
    }
}

fn validate_brackets(code: &str, table: &str, brackets: &[TaxBracket]) -> Result<()> {
    if brackets.is_empty() {
        return Err(TaxError::InvalidRuleBook(format!(
            "{}: {} must contain at least one bracket",
            code, table
        )));
    }

    let last = brackets.len() - 1;
    for (i, bracket) in brackets.iter().enumerate() {
        if let Some(max) = bracket.max {
            if max < bracket.min {
                return Err(TaxError::InvalidRuleBook(format!(
                    "{}: {}[{}] has max below min",
                    code, table, i
                )));
            }
        } else if i != last {
            return Err(TaxError::InvalidRuleBook(format!(
                "{}: {}[{}] is unbounded but not the last bracket",
                code, table, i
            )));
        }
        if i > 0 && bracket.min < brackets[i - 1].min {
            return Err(TaxError::InvalidRuleBook(format!(
                "{}: {} is not sorted by min",
                code, table
            )));
        }
    }
    Ok(())
}

/// Immutable catalog of jurisdiction code -> rules
#[derive(Debug, Clone)]
pub struct RuleBook {
    rules: BTreeMap<String, TaxRule>,
}

impl RuleBook {
    /// Rules compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_RULES)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, TaxRule> = serde_json::from_str(json)?;
        let mut rules = BTreeMap::new();
        for (code, rule) in raw {
            let normalized = normalize_code(&code);
            if rules.insert(normalized.clone(), rule).is_some() {
                return Err(TaxError::InvalidRuleBook(format!(
                    "jurisdiction code {:?} is defined more than once",
                    normalized
                )));
            }
        }

        if rules.is_empty() {
            return Err(TaxError::InvalidRuleBook(
                "at least one jurisdiction is required".to_string(),
            ));
        }
        for (code, rule) in &rules {
            rule.validate(code)?;
        }

        Ok(Self { rules })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Case-insensitive lookup by jurisdiction code.
    pub fn get(&self, code: &str) -> Option<&TaxRule> {
        self.rules.get(&normalize_code(code))
    }

    /// Supported codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaxRule)> {
        self.rules.iter().map(|(code, rule)| (code.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
