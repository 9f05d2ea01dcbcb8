use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub available_cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub available_cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub cash_amount: f64,
    pub source_account_id: i64,
    pub destination_account_id: i64,
    /// Unix seconds
    pub registered_time: Option<i64>,
    /// Unix seconds; set only once the transfer succeeded
    pub executed_time: Option<i64>,
    pub success: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub cash_amount: f64,
    pub source_account_id: i64,
    pub destination_account_id: i64,
}

/// Why a transfer was refused. The attempt is still recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    NegativeAmount,
    SameAccount,
    SourceNotFound,
    DestinationNotFound,
    InsufficientFunds,
    /// The destination balance would leave the representable range
    BalanceOverflow,
}

impl TransferError {
    /// HTTP status reported to the caller
    #[must_use]
    pub fn status(self) -> u16 {
        match self {
            Self::SourceNotFound | Self::DestinationNotFound => 404,
            Self::NegativeAmount
            | Self::SameAccount
            | Self::InsufficientFunds
            | Self::BalanceOverflow => 400,
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NegativeAmount => "Cash amount must be positive.",
            Self::SameAccount => "Source and destination accounts must be different.",
            Self::SourceNotFound => "Source account not found.",
            Self::DestinationNotFound => "Destination account not found.",
            Self::InsufficientFunds => "Insufficient funds in source account.",
            Self::BalanceOverflow => "Destination balance would exceed the supported range.",
        })
    }
}

impl std::error::Error for TransferError {}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: BTreeMap<i64, Account>,
    transactions: Vec<Transaction>,
    last_account_id: i64,
    last_transaction_id: i64,
}

/// In-memory accounts and transfer history.
///
/// A single mutex guards all state so a transfer debits and credits atomically.
#[derive(Debug, Default)]
pub struct LedgerStore {
    state: Mutex<LedgerState>,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

impl LedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the demo accounts Alice, Bob and Charlie
    #[must_use]
    pub fn with_demo_accounts() -> Self {
        let store = Self::new();
        for (name, cash) in [("Alice", 1000.0), ("Bob", 500.0), ("Charlie", 300.0)] {
            store.create_account(NewAccount {
                name: name.to_string(),
                available_cash: cash,
            });
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_account(&self, new: NewAccount) -> Account {
        let mut state = self.lock();
        state.last_account_id += 1;
        let account = Account {
            id: state.last_account_id,
            name: new.name,
            available_cash: new.available_cash,
        };
        state.accounts.insert(account.id, account.clone());
        info!(account_id = account.id, "Account created");
        account
    }

    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.lock().accounts.values().cloned().collect()
    }

    #[must_use]
    pub fn account(&self, id: i64) -> Option<Account> {
        self.lock().accounts.get(&id).cloned()
    }

    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    /// Record the attempt, then apply it if every rule passes.
    ///
    /// # Errors
    ///
    /// The first rule the transfer breaks; the recorded attempt keeps `success = false`.
    pub fn transfer(&self, req: &TransferRequest) -> Result<Transaction, TransferError> {
        let mut state = self.lock();
        state.last_transaction_id += 1;
        let id = state.last_transaction_id;
        let index = state.transactions.len();
        state.transactions.push(Transaction {
            id,
            cash_amount: req.cash_amount,
            source_account_id: req.source_account_id,
            destination_account_id: req.destination_account_id,
            registered_time: Some(unix_now()),
            executed_time: None,
            success: Some(false),
        });

        let outcome = Self::apply(&mut state, req);
        match outcome {
            Ok(()) => {
                let record = &mut state.transactions[index];
                record.success = Some(true);
                record.executed_time = Some(unix_now());
                info!(
                    transaction_id = record.id,
                    source_account_id = req.source_account_id,
                    destination_account_id = req.destination_account_id,
                    "Transfer executed"
                );
                Ok(record.clone())
            }
            Err(e) => {
                debug!(
                    transaction_id = id,
                    reason = %e,
                    "Transfer refused"
                );
                Err(e)
            }
        }
    }

    fn apply(state: &mut LedgerState, req: &TransferRequest) -> Result<(), TransferError> {
        if req.cash_amount < 0.0 {
            return Err(TransferError::NegativeAmount);
        }
        if req.source_account_id == req.destination_account_id {
            return Err(TransferError::SameAccount);
        }
        let source_cash = state
            .accounts
            .get(&req.source_account_id)
            .map(|a| a.available_cash)
            .ok_or(TransferError::SourceNotFound)?;
        let destination_cash = state
            .accounts
            .get(&req.destination_account_id)
            .map(|a| a.available_cash)
            .ok_or(TransferError::DestinationNotFound)?;
        if source_cash < req.cash_amount {
            return Err(TransferError::InsufficientFunds);
        }
        if !(destination_cash + req.cash_amount).is_finite() {
            return Err(TransferError::BalanceOverflow);
        }

        if let Some(source) = state.accounts.get_mut(&req.source_account_id) {
            source.available_cash -= req.cash_amount;
        }
        if let Some(destination) = state.accounts.get_mut(&req.destination_account_id) {
            destination.available_cash += req.cash_amount;
        }
        Ok(())
    }
}
