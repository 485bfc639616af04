//! Tax Simulator
//!
//! Capital gains estimation for crypto transaction histories: FIFO lot
//! matching, per-jurisdiction bracket lookup and year-level aggregation.
//! Supports US, UK, Germany, Australia, Japan, Singapore and Canada out of
//! the box; other tables can be loaded from JSON.

pub mod aggregator;
pub mod brackets;
pub mod error;
pub mod matcher;
pub mod models;
pub mod rules;
pub mod simulator;

pub use aggregator::aggregate;
pub use brackets::{resolve_rate, TaxBracket};
pub use error::{Result, TaxError};
pub use matcher::{LotMatcher, MatchOptions, MatchOutcome};
pub use models::{parse_timestamp, MatchedDisposal, TaxReport, Term, Transaction, TransactionKind};
pub use rules::{LossCarryForward, RuleBook, TaxRule};
pub use simulator::{SimulationRequest, TaxSimulator};
