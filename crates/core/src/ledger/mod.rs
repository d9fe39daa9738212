//! Account ledger logic.
//!
//! This module implements the money-accounting core:
//! - Account kinds and credit-line semantics
//! - Posting validation and signed balance deltas
//! - Transfer resolution across currencies
//! - Balance recomputation for drift detection

pub mod error;
pub mod service;
pub mod types;

pub use error::LedgerError;
pub use service::{LedgerService, AMOUNT_SCALE};
pub use types::{
    AccountKind, AccountSnapshot, PostingDraft, PostingKind, TransferResolution,
};
