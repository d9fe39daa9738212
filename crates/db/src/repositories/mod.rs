//! Repository abstractions for data access.
//!
//! Repositories wrap the pure logic in `savora-core` in atomic database
//! transactions: every balance adjustment commits in the same transaction as
//! the posting write that caused it, and aggregate caches are recomputed
//! inside the mutation that invalidates them.

pub mod account;
pub mod budget;
pub mod category;
pub mod exchange_rate;
pub mod recurring;
pub mod savings;
pub mod transaction;

pub use account::{
    AccountError, AccountRepository, BalanceDrift, CreateAccountInput, UpdateAccountInput,
};
pub use budget::{BudgetError, BudgetRepository, BudgetView, CreateBudgetInput};
pub use category::{CategoryError, CategoryRepository, CreateCategoryInput};
pub use exchange_rate::{ExchangeRateError, ExchangeRateRepository, UpsertRateInput};
pub use recurring::{
    CreateRecurringInput, FiredOccurrence, RecurringError, RecurringRepository,
    UpdateRecurringInput,
};
pub use savings::{CreateGoalInput, SavingsError, SavingsRepository};
pub use transaction::{
    CandidateRecord, RecordPostingInput, TransactionError, TransactionRepository, TransferOutcome,
    UpdatePostingInput,
};
