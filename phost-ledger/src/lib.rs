//! In-memory ledger for the phost registry.
//!
//! [`Ledger`] keeps one balance per [`AccountId`] plus the balance held in
//! registry custody, and implements [`ValueTransfer<AccountId>`] so it can back
//! a [`Registry`](phost::Registry) directly. It plays the part the token
//! program, bank module or native balance plays on a real host.
//!
//! A `Ledger` is a cheap handle: clones share the same book. Hand one clone to
//! the registry and keep another to open accounts, fund them, and inspect
//! balances.
//!
//! Accounts can be [frozen](Ledger::freeze) to make every movement touching
//! them fail, which is how tests simulate a malformed refund destination.
//!
//! # Example
//!
//! ```
//! use phost::{AccountId, Amount, Purchase, Registry, Route};
//! use phost_ledger::Ledger;
//!
//! let ledger = Ledger::new();
//! let alice: AccountId = "alice".parse().unwrap();
//! ledger.open(alice.clone(), Amount::new(10)).unwrap();
//!
//! let admin: AccountId = "admin".parse().unwrap();
//! let registry = Registry::new(admin, ledger.clone());
//! let route = Route::new("home").unwrap();
//! registry.purchase(Purchase::new(route, "hello", Amount::new(5), alice.clone())).unwrap();
//!
//! assert_eq!(ledger.balance_of(&alice), Some(Amount::new(5)));
//! assert_eq!(ledger.held(), Amount::new(5));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use phost::{AccountId, Amount, AmountError, TransferError, ValueTransfer};
use serde::Serialize;

/// Errors returned by direct ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// No account with this identifier has been opened.
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),
    /// An account with this identifier already exists.
    #[error("account {0} already exists")]
    AccountExists(AccountId),
    /// The account is frozen and cannot send or receive funds.
    #[error("account {0} is frozen")]
    Frozen(AccountId),
    /// The source balance cannot cover the amount.
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        /// Balance available at the source.
        available: Amount,
        /// Amount the movement needed.
        required: Amount,
    },
    /// A balance would overflow.
    #[error(transparent)]
    Arithmetic(#[from] AmountError),
}

impl From<LedgerError> for TransferError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownAccount(id) | LedgerError::Frozen(id) => {
                Self::InvalidDestination(id.to_string())
            }
            LedgerError::InsufficientFunds {
                available,
                required,
            } => Self::InsufficientFunds {
                available,
                required,
            },
            other @ (LedgerError::AccountExists(_) | LedgerError::Arithmetic(_)) => {
                Self::Rejected(other.to_string())
            }
        }
    }
}

/// A point-in-time copy of every balance, ordered for comparison and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    /// Account balances.
    pub accounts: BTreeMap<AccountId, Amount>,
    /// Balance held in registry custody.
    pub held: Amount,
}

#[derive(Debug, Default)]
struct Book {
    accounts: HashMap<AccountId, Amount>,
    frozen: HashSet<AccountId>,
    held: Amount,
}

impl Book {
    fn usable(&self, id: &AccountId) -> Result<Amount, LedgerError> {
        let balance = self
            .accounts
            .get(id)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccount(id.clone()))?;
        if self.frozen.contains(id) {
            return Err(LedgerError::Frozen(id.clone()));
        }
        Ok(balance)
    }

    /// Moves `amount` from an account into custody. Validates fully before
    /// writing anything.
    fn pull(&mut self, from: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.usable(from)?;
        let remaining =
            balance
                .checked_sub(amount)
                .map_err(|_| LedgerError::InsufficientFunds {
                    available: balance,
                    required: amount,
                })?;
        let held = self.held.checked_add(amount)?;
        self.accounts.insert(from.clone(), remaining);
        self.held = held;
        Ok(())
    }

    /// Moves `amount` out of custody to an account. Validates fully before
    /// writing anything.
    fn push(&mut self, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.usable(to)?;
        let held = self
            .held
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientFunds {
                available: self.held,
                required: amount,
            })?;
        let credited = balance.checked_add(amount)?;
        self.accounts.insert(to.clone(), credited);
        self.held = held;
        Ok(())
    }
}

/// Shared handle to an in-memory single-currency ledger.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    book: Arc<Mutex<Book>>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an account with an initial balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountExists`] if the account is already open.
    pub fn open(&self, id: AccountId, balance: Amount) -> Result<(), LedgerError> {
        let mut book = self.book.lock();
        if book.accounts.contains_key(&id) {
            return Err(LedgerError::AccountExists(id));
        }
        #[cfg(feature = "telemetry")]
        tracing::debug!(account = %id, balance = %balance, "Opened account");
        book.accounts.insert(id, balance);
        Ok(())
    }

    /// Adds freshly minted funds to an existing account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist or the balance would
    /// overflow.
    pub fn mint(&self, id: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let mut book = self.book.lock();
        let balance = book
            .accounts
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownAccount(id.clone()))?;
        *balance = balance.checked_add(amount)?;
        Ok(())
    }

    /// Sends funds from an account straight into registry custody without
    /// going through a purchase. Such funds back no slot and become surplus.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown, frozen, or cannot cover the
    /// amount.
    pub fn deposit(&self, from: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.book.lock().pull(from, amount)
    }

    /// Freezes an account: every movement to or from it fails until thawed.
    pub fn freeze(&self, id: &AccountId) {
        self.book.lock().frozen.insert(id.clone());
    }

    /// Lifts a freeze.
    pub fn thaw(&self, id: &AccountId) {
        self.book.lock().frozen.remove(id);
    }

    /// Returns the balance of an account, or `None` if it is not open.
    #[must_use]
    pub fn balance_of(&self, id: &AccountId) -> Option<Amount> {
        self.book.lock().accounts.get(id).copied()
    }

    /// Returns the balance held in registry custody.
    #[must_use]
    pub fn held(&self) -> Amount {
        self.book.lock().held
    }

    /// Returns the sum of all account balances and the custody balance.
    ///
    /// Transfers never change this value; only [`mint`](Self::mint) and
    /// [`open`](Self::open) do.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the sum does not fit.
    pub fn total_supply(&self) -> Result<Amount, AmountError> {
        let book = self.book.lock();
        book.accounts
            .values()
            .try_fold(book.held, |acc, balance| acc.checked_add(*balance))
    }

    /// Returns a copy of every balance.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        let book = self.book.lock();
        LedgerSnapshot {
            accounts: book
                .accounts
                .iter()
                .map(|(id, balance)| (id.clone(), *balance))
                .collect(),
            held: book.held,
        }
    }
}

impl ValueTransfer<AccountId> for Ledger {
    fn custody(&mut self, from: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.book.lock().pull(from, amount).map_err(|err| {
            #[cfg(feature = "telemetry")]
            tracing::debug!(account = %from, amount = %amount, error = %err, "Custody failed");
            TransferError::from(err)
        })
    }

    fn release(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.book.lock().push(to, amount).map_err(|err| {
            #[cfg(feature = "telemetry")]
            tracing::debug!(account = %to, amount = %amount, error = %err, "Release failed");
            TransferError::from(err)
        })
    }

    fn holdings(&self) -> Amount {
        self.held()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        s.parse().unwrap()
    }

    fn funded(accounts: &[(&str, u128)]) -> Ledger {
        let ledger = Ledger::new();
        for (name, balance) in accounts {
            ledger.open(id(name), Amount::new(*balance)).unwrap();
        }
        ledger
    }

    #[test]
    fn test_open_twice_fails() {
        let ledger = funded(&[("alice", 1)]);
        assert_eq!(
            ledger.open(id("alice"), Amount::new(5)),
            Err(LedgerError::AccountExists(id("alice")))
        );
        assert_eq!(ledger.balance_of(&id("alice")), Some(Amount::new(1)));
    }

    #[test]
    fn test_custody_and_release_conserve_supply() {
        let mut ledger = funded(&[("alice", 10), ("bob", 0)]);
        ledger.custody(&id("alice"), Amount::new(4)).unwrap();
        ledger.release(&id("bob"), Amount::new(3)).unwrap();

        assert_eq!(ledger.balance_of(&id("alice")), Some(Amount::new(6)));
        assert_eq!(ledger.balance_of(&id("bob")), Some(Amount::new(3)));
        assert_eq!(ledger.holdings(), Amount::new(1));
        assert_eq!(ledger.total_supply(), Ok(Amount::new(10)));
    }

    #[test]
    fn test_custody_insufficient_funds_changes_nothing() {
        let mut ledger = funded(&[("alice", 2)]);
        let before = ledger.snapshot();
        let err = ledger.custody(&id("alice"), Amount::new(3)).unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                available: Amount::new(2),
                required: Amount::new(3),
            }
        );
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_release_to_unknown_or_frozen_account_fails() {
        let mut ledger = funded(&[("alice", 10)]);
        ledger.custody(&id("alice"), Amount::new(5)).unwrap();

        assert_eq!(
            ledger.release(&id("ghost"), Amount::new(1)),
            Err(TransferError::InvalidDestination("ghost".into()))
        );

        ledger.freeze(&id("alice"));
        assert!(ledger.release(&id("alice"), Amount::new(1)).is_err());
        ledger.thaw(&id("alice"));
        assert!(ledger.release(&id("alice"), Amount::new(1)).is_ok());
        assert_eq!(ledger.held(), Amount::new(4));
    }

    #[test]
    fn test_release_more_than_held_fails() {
        let mut ledger = funded(&[("alice", 10)]);
        assert!(matches!(
            ledger.release(&id("alice"), Amount::new(1)),
            Err(TransferError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_deposit_moves_funds_into_custody() {
        let ledger = funded(&[("alice", 10)]);
        ledger.deposit(&id("alice"), Amount::new(7)).unwrap();
        assert_eq!(ledger.held(), Amount::new(7));
        assert_eq!(ledger.balance_of(&id("alice")), Some(Amount::new(3)));
    }

    #[test]
    fn test_clones_share_the_book() {
        let ledger = funded(&[("alice", 10)]);
        let mut handle = ledger.clone();
        handle.custody(&id("alice"), Amount::new(10)).unwrap();
        assert_eq!(ledger.held(), Amount::new(10));
    }

    #[test]
    fn test_snapshot_serializes_sorted() {
        let ledger = funded(&[("bob", 2), ("alice", 1)]);
        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        assert_eq!(json, r#"{"accounts":{"alice":"1","bob":"2"},"held":"0"}"#);
    }
}
