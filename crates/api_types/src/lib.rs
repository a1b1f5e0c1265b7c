//! JSON request and response bodies of the paydesk HTTP API.
//!
//! Money always travels as integer minor units (`*_minor` fields) of the
//! currency named next to it; rates and percentages travel as decimal strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod user {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Role {
        User,
        Admin,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountStatus {
        Active,
        Suspended,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum KycStatus {
        NotStarted,
        Pending,
        Approved,
        Rejected,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub username: String,
        pub email: Option<String>,
        pub display_name: Option<String>,
        pub role: Role,
        pub status: AccountStatus,
        pub kyc_status: KycStatus,
        pub created_at: DateTime<Utc>,
    }

    /// Admin change of a user's role and/or account status.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserUpdate {
        pub role: Option<Role>,
        pub status: Option<AccountStatus>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct KycReview {
        pub approve: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserSummary {
        pub user: UserView,
        pub balances: Vec<super::balance::BalanceView>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub currency: String,
        pub balance_minor: i64,
        pub version: i64,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconcileEntry {
        pub currency: String,
        /// Sum of approved signed amounts.
        pub ledger_minor: i64,
        pub stored_minor: i64,
        pub consistent: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconcileReport {
        pub user_id: String,
        pub consistent: bool,
        pub entries: Vec<ReconcileEntry>,
    }
}

pub mod currency {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CurrencyView {
        pub code: String,
        pub name: String,
        pub symbol: String,
        pub description: Option<String>,
        pub decimals: u8,
        /// Units of this currency per 1 USD.
        pub exchange_rate: Decimal,
        pub enabled: bool,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CurrencyNew {
        pub code: String,
        pub name: String,
        pub symbol: String,
        pub description: Option<String>,
        pub decimals: u8,
        pub exchange_rate: Decimal,
        pub enabled: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CurrencyUpdate {
        pub name: Option<String>,
        pub symbol: Option<String>,
        pub description: Option<String>,
        pub exchange_rate: Option<Decimal>,
        pub enabled: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RateUpdate {
        pub code: String,
        pub exchange_rate: Decimal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RatesUpdate {
        pub rates: Vec<RateUpdate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CurrencyList {
        pub include_disabled: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConvertQuery {
        pub amount_minor: i64,
        pub from: String,
        pub to: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConvertResponse {
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
        pub converted_minor: i64,
        pub rate: Decimal,
    }
}

pub mod payment_method {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FeeDirection {
        Deposit,
        Withdrawal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentMethodView {
        pub id: String,
        pub name: String,
        pub fee_percent: Decimal,
        pub fixed_fee_minor: i64,
        pub min_amount_minor: i64,
        pub account_details: Option<String>,
        pub enabled: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentMethodNew {
        pub id: String,
        pub name: String,
        pub fee_percent: Decimal,
        pub fixed_fee_minor: Option<i64>,
        pub min_amount_minor: i64,
        pub account_details: Option<String>,
        pub enabled: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PaymentMethodUpdate {
        pub name: Option<String>,
        pub fee_percent: Option<Decimal>,
        pub fixed_fee_minor: Option<i64>,
        pub min_amount_minor: Option<i64>,
        pub account_details: Option<String>,
        pub enabled: Option<bool>,
    }

    /// Fee preview for a form. `amount` is raw user input such as `"200"` or
    /// `"12,50"`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FeeQuoteRequest {
        pub method: String,
        pub amount: String,
        pub direction: FeeDirection,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FeeQuoteResponse {
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub total_minor: i64,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Deposit,
        Withdrawal,
        TransferIn,
        TransferOut,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Pending,
        Approved,
        Rejected,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Decision {
        Approve,
        Reject,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        /// Transaction id (UUID), serialized as a string.
        pub id: Uuid,
        pub user_id: String,
        pub kind: TransactionKind,
        pub status: TransactionStatus,
        /// Always positive; the kind tells whether it credits or debits.
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub currency: String,
        pub method: Option<String>,
        pub destination: Option<String>,
        pub counterparty: Option<String>,
        pub reference: Option<String>,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub decided_at: Option<DateTime<Utc>>,
        pub decided_by: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DepositNew {
        pub amount_minor: i64,
        pub currency: String,
        pub method: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawalNew {
        pub amount_minor: i64,
        pub currency: String,
        pub method: String,
        pub destination: Option<String>,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub to: String,
        pub amount_minor: i64,
        pub currency: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferCreated {
        pub outgoing: TransactionView,
        pub incoming: TransactionView,
    }

    /// Query string of the transaction list endpoints. `user` is honoured on
    /// the admin listing only.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub limit: Option<u64>,
        pub cursor: Option<String>,
        pub status: Option<TransactionStatus>,
        pub kind: Option<TransactionKind>,
        pub user: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DecisionRequest {
        pub decision: Decision,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DecisionResponse {
        pub transaction: TransactionView,
        pub balance: Option<super::balance::BalanceView>,
        /// `false` when the transaction already had the requested status.
        pub applied: bool,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CurrencyVolume {
        pub currency: String,
        pub deposits_minor: i64,
        pub withdrawals_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerStats {
        pub users: u64,
        pub pending_transactions: u64,
        pub volumes: Vec<CurrencyVolume>,
    }
}
