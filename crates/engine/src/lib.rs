pub use balances::Balance;
pub use commands::{CurrencyUpdate, DepositCmd, PaymentMethodUpdate, TransferCmd, WithdrawalCmd};
pub use currency::{Currency, convert, exchange_rate, normalize_code};
pub use error::EngineError;
pub use fees::{FeeDirection, FeeQuote, FeeSchedule, MAX_FEE_PERCENT, clamp_amount_input, quote};
pub use money::Money;
pub use ops::{
    CurrencyVolume, DecisionOutcome, Engine, EngineBuilder, LedgerStats, ReconcileEntry,
    ReconcileReport, SeedReport, TransactionsPage, UserSummary,
};
pub use payment_methods::PaymentMethod;
pub use repo::{MAX_PAGE_SIZE, TransactionFilter};
pub use session::Session;
pub use transactions::{Decision, Transaction, TransactionKind, TransactionStatus};
pub use users::{AccountStatus, KycStatus, NewUser, Role, User};

pub mod repo;

mod balances;
mod commands;
mod currency;
mod error;
mod fees;
mod money;
mod ops;
mod payment_methods;
mod session;
mod transactions;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
