//! Initial database migration.
//!
//! Creates all enums, tables, and indexes for the ledger, scheduler,
//! budget, savings, and exchange rate subsystems.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNTS & CATEGORIES
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(CATEGORIES_SQL).await?;

        // ============================================================
        // PART 3: TRANSACTIONS
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: RECURRING TRANSACTIONS
        // ============================================================
        db.execute_unprepared(RECURRING_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 5: BUDGETS
        // ============================================================
        db.execute_unprepared(BUDGETS_SQL).await?;

        // ============================================================
        // PART 6: SAVINGS GOALS
        // ============================================================
        db.execute_unprepared(SAVINGS_GOALS_SQL).await?;
        db.execute_unprepared(SAVINGS_CONTRIBUTIONS_SQL).await?;

        // ============================================================
        // PART 7: EXCHANGE RATES
        // ============================================================
        db.execute_unprepared(EXCHANGE_RATES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Account kind
CREATE TYPE account_kind AS ENUM (
    'bank',
    'credit_card',
    'investment',
    'cash',
    'loan',
    'e_wallet',
    'other'
);

-- Posting kind
CREATE TYPE posting_kind AS ENUM ('income', 'expense');

-- Recurrence frequency
CREATE TYPE recurrence_frequency AS ENUM (
    'daily',
    'weekly',
    'monthly',
    'yearly'
);

-- Budget period
CREATE TYPE budget_period AS ENUM (
    'weekly',
    'monthly',
    'yearly',
    'custom'
);

-- Savings goal status
CREATE TYPE goal_status AS ENUM (
    'active',
    'paused',
    'completed',
    'cancelled'
);

-- Contribution kind
CREATE TYPE contribution_kind AS ENUM ('manual', 'linked');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    kind account_kind NOT NULL,
    currency CHAR(3) NOT NULL,
    initial_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    current_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    exclude_from_totals BOOLEAN NOT NULL DEFAULT false,
    is_default_payment BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_account_currency CHECK (currency ~ '^[A-Z]{3}$')
);

CREATE INDEX idx_accounts_user ON accounts(user_id) WHERE is_active = true;
CREATE UNIQUE INDEX idx_accounts_default_payment ON accounts(user_id) WHERE is_default_payment = true;
";

const CATEGORIES_SQL: &str = r"
CREATE TABLE categories (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    kind posting_kind NOT NULL,
    is_passive BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (user_id, name, kind)
);

CREATE INDEX idx_categories_user_kind ON categories(user_id, kind) WHERE is_active = true;
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    kind posting_kind NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
    description TEXT,
    transaction_date DATE NOT NULL,
    reconciled_at TIMESTAMPTZ,
    transfer_peer_id UUID REFERENCES transactions(id),
    exchange_rate NUMERIC(19, 10),
    converted_amount NUMERIC(19, 4),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_transaction_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_txn_account_date ON transactions(account_id, transaction_date);
CREATE INDEX idx_txn_category ON transactions(category_id) WHERE category_id IS NOT NULL;
CREATE INDEX idx_txn_transfer_peer ON transactions(transfer_peer_id) WHERE transfer_peer_id IS NOT NULL;
";

const RECURRING_TRANSACTIONS_SQL: &str = r"
CREATE TABLE recurring_transactions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
    name VARCHAR(255) NOT NULL,
    kind posting_kind NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    frequency recurrence_frequency NOT NULL,
    day_of_week SMALLINT,
    day_of_month SMALLINT,
    month_of_year SMALLINT,
    start_date DATE NOT NULL,
    end_date DATE,
    next_run_date DATE NOT NULL,
    last_run_date DATE,
    is_active BOOLEAN NOT NULL DEFAULT true,
    auto_create BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_recurring_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_day_of_week CHECK (day_of_week IS NULL OR day_of_week BETWEEN 0 AND 6),
    CONSTRAINT chk_day_of_month CHECK (day_of_month IS NULL OR day_of_month BETWEEN 1 AND 31),
    CONSTRAINT chk_month_of_year CHECK (month_of_year IS NULL OR month_of_year BETWEEN 1 AND 12)
);

CREATE INDEX idx_recurring_user ON recurring_transactions(user_id);
CREATE INDEX idx_recurring_due ON recurring_transactions(next_run_date) WHERE is_active = true AND auto_create = true;
";

const BUDGETS_SQL: &str = r"
CREATE TABLE budgets (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    category_id UUID REFERENCES categories(id) ON DELETE CASCADE,
    period budget_period NOT NULL,
    allocated_amount NUMERIC(19, 4) NOT NULL,
    spent_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency CHAR(3) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    rollover BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_budget_allocation_positive CHECK (allocated_amount > 0),
    CONSTRAINT chk_budget_window CHECK (end_date >= start_date)
);

CREATE INDEX idx_budgets_user ON budgets(user_id) WHERE is_active = true;
CREATE INDEX idx_budgets_window ON budgets(user_id, start_date, end_date);
";

const SAVINGS_GOALS_SQL: &str = r"
CREATE TABLE savings_goals (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    account_id UUID REFERENCES accounts(id) ON DELETE SET NULL,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    icon VARCHAR(50),
    color VARCHAR(20),
    target_amount NUMERIC(19, 4) NOT NULL,
    current_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency CHAR(3) NOT NULL,
    target_date DATE,
    status goal_status NOT NULL DEFAULT 'active',
    completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_goal_target_positive CHECK (target_amount > 0)
);

CREATE INDEX idx_goals_user ON savings_goals(user_id);
CREATE INDEX idx_goals_status ON savings_goals(user_id, status);
";

const SAVINGS_CONTRIBUTIONS_SQL: &str = r"
CREATE TABLE savings_contributions (
    id UUID PRIMARY KEY,
    goal_id UUID NOT NULL REFERENCES savings_goals(id) ON DELETE CASCADE,
    transaction_id UUID REFERENCES transactions(id) ON DELETE SET NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    contribution_date DATE NOT NULL,
    notes TEXT,
    kind contribution_kind NOT NULL DEFAULT 'manual',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_contributions_goal ON savings_contributions(goal_id, contribution_date);
CREATE INDEX idx_contributions_transaction ON savings_contributions(transaction_id) WHERE transaction_id IS NOT NULL;
";

const EXCHANGE_RATES_SQL: &str = r"
CREATE TABLE exchange_rates (
    id UUID PRIMARY KEY,
    base_currency CHAR(3) NOT NULL,
    target_currency CHAR(3) NOT NULL,
    rate NUMERIC(19, 10) NOT NULL,
    bid_rate NUMERIC(19, 10),
    ask_rate NUMERIC(19, 10),
    source VARCHAR(100) NOT NULL,
    rate_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_rate_positive CHECK (rate > 0),
    CONSTRAINT chk_different_currencies CHECK (base_currency <> target_currency),
    UNIQUE (base_currency, target_currency, source, rate_date)
);

CREATE INDEX idx_exchange_rates_lookup ON exchange_rates(base_currency, target_currency, rate_date DESC);
";

const DROP_ALL_SQL: &str = r"
-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS exchange_rates CASCADE;
DROP TABLE IF EXISTS savings_contributions CASCADE;
DROP TABLE IF EXISTS savings_goals CASCADE;
DROP TABLE IF EXISTS budgets CASCADE;
DROP TABLE IF EXISTS recurring_transactions CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS categories CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

-- Drop enums
DROP TYPE IF EXISTS contribution_kind CASCADE;
DROP TYPE IF EXISTS goal_status CASCADE;
DROP TYPE IF EXISTS budget_period CASCADE;
DROP TYPE IF EXISTS recurrence_frequency CASCADE;
DROP TYPE IF EXISTS posting_kind CASCADE;
DROP TYPE IF EXISTS account_kind CASCADE;
";
