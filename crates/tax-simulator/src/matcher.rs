//! FIFO Lot Matcher
//!
//! Replays a tax year's transactions in time order. Buys open lots per
//! asset; each sell consumes the oldest open lots of the same asset first,
//! producing one [`MatchedDisposal`] per lot touched.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Datelike, Utc};

use crate::brackets::resolve_rate;
use crate::error::{Result, TaxError};
use crate::models::{MatchedDisposal, Term, Transaction};
use crate::rules::TaxRule;

/// Remainders below this share of the original quantity count as fully consumed
const QUANTITY_TOLERANCE: f64 = 1e-9;

fn is_dust(remaining: f64, original: f64) -> bool {
    remaining <= original * QUANTITY_TOLERANCE
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Replay buys and sells from earlier years so their lots can be matched
    /// by this year's sells. Only sells inside the tax year emit disposals.
    pub include_prior_lots: bool,
}

/// Disposals for the year plus the matcher's own allowance bookkeeping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub disposals: Vec<MatchedDisposal>,
    /// Sold quantity left over after all prior lots were exhausted
    pub unmatched_quantity: f64,
    /// Per-disposal allowance left after matching
    pub remaining_allowance: f64,
}

/// A buy that still has quantity available
#[derive(Debug)]
struct OpenLot<'a> {
    tx: &'a Transaction,
    acquired: DateTime<Utc>,
    quantity: f64,
    remaining: f64,
}

pub struct LotMatcher<'a> {
    rule: &'a TaxRule,
    options: MatchOptions,
}

impl<'a> LotMatcher<'a> {
    pub fn new(rule: &'a TaxRule) -> Self {
        Self {
            rule,
            options: MatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Classify a holding period against the rule's boundary (strictly greater is long-term).
    pub fn classify(&self, holding_period_days: i64) -> Term {
        if holding_period_days > self.rule.short_term_duration_days {
            Term::LongTerm
        } else {
            Term::ShortTerm
        }
    }

    /// Match every sell of `year` against earlier buys, oldest lot first.
    pub fn match_disposals(&self, transactions: &[Transaction], year: i32) -> Result<MatchOutcome> {
        let mut timeline = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let ts = tx.timestamp().ok_or_else(|| TaxError::InvalidDate {
                id: tx.id.clone(),
                value: tx.date.clone(),
            })?;
            let in_scope = if self.options.include_prior_lots {
                ts.year() <= year
            } else {
                ts.year() == year
            };
            if in_scope {
                timeline.push((ts, tx));
            }
        }
        // Stable: same-timestamp transactions keep their input order
        timeline.sort_by_key(|(ts, _)| *ts);

        let mut open_lots: HashMap<String, VecDeque<OpenLot<'_>>> = HashMap::new();
        let mut remaining_allowance = self.rule.tax_free_allowance;
        let mut outcome = MatchOutcome::default();

        for (ts, tx) in timeline {
            let asset = tx.asset.trim().to_uppercase();
            let quantity = tx.quantity.abs();

            if tx.is_buy() {
                open_lots.entry(asset).or_default().push_back(OpenLot {
                    tx,
                    acquired: ts,
                    quantity,
                    remaining: quantity,
                });
                continue;
            }

            let reportable = ts.year() == year;
            let mut to_match = quantity;
            let lots = open_lots.entry(asset.clone()).or_default();

            while !is_dust(to_match, quantity) {
                let Some(lot) = lots.front_mut() else {
                    break;
                };
                let matched = to_match.min(lot.remaining);

                if reportable {
                    let disposal = self.dispose(tx, ts, quantity, lot, matched, &asset, &mut remaining_allowance);
                    outcome.disposals.push(disposal);
                }

                lot.remaining -= matched;
                to_match -= matched;
                if is_dust(lot.remaining, lot.quantity) {
                    lots.pop_front();
                }
            }

            if !is_dust(to_match, quantity) {
                tracing::warn!(
                    sell_id = %tx.id,
                    asset = %asset,
                    unmatched = to_match,
                    "Sell exceeds available buy lots; excess quantity has no cost basis"
                );
                if reportable {
                    outcome.unmatched_quantity += to_match;
                }
            }
        }

        outcome.remaining_allowance = remaining_allowance;
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn dispose(
        &self,
        sell: &Transaction,
        disposed: DateTime<Utc>,
        sell_quantity: f64,
        lot: &OpenLot<'_>,
        matched: f64,
        asset: &str,
        remaining_allowance: &mut f64,
    ) -> MatchedDisposal {
        let holding_period_days = (disposed - lot.acquired).num_days();
        let term = self.classify(holding_period_days);

        // Fees are prorated over the whole sell and the whole buy
        let proceeds =
            matched / sell_quantity * (sell_quantity * sell.price - sell.fees);
        let cost_basis =
            matched / lot.quantity * (lot.quantity * lot.tx.price + lot.tx.fees);
        let gain = proceeds - cost_basis;

        // Losses neither consume nor restore the allowance
        let taxable = gain * self.rule.taxable_percentage / 100.0;
        let used = if taxable > 0.0 {
            taxable.min(*remaining_allowance)
        } else {
            0.0
        };
        *remaining_allowance -= used;
        let taxable_gain = (taxable - used).max(0.0);

        let brackets = match term {
            Term::LongTerm => &self.rule.long_term_brackets,
            Term::ShortTerm => &self.rule.short_term_brackets,
        };
        let tax_rate = resolve_rate(taxable_gain, brackets);
        let tax_owed = (taxable_gain * tax_rate / 100.0).max(0.0);

        MatchedDisposal {
            buy_id: lot.tx.id.clone(),
            sell_id: sell.id.clone(),
            asset: asset.to_string(),
            quantity: matched,
            acquired_date: lot.acquired,
            disposed_date: disposed,
            holding_period_days,
            term,
            proceeds,
            cost_basis,
            gain,
            taxable_gain,
            tax_rate,
            tax_owed,
        }
    }
}
