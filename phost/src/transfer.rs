//! The value-transfer capability consumed by the registry.
//!
//! Hosts implement [`ValueTransfer`] on top of whatever moves funds on their
//! platform: a token program, a bank module, native balance transfers. The
//! registry only ever asks for two movements and one read:
//!
//! - [`custody`](ValueTransfer::custody) pulls an amount from a caller into
//!   registry custody
//! - [`release`](ValueTransfer::release) pushes an amount out of registry
//!   custody to an identity
//! - [`holdings`](ValueTransfer::holdings) reports the total in custody
//!
//! Both movements are failable. A failed movement must leave the implementor's
//! balances unchanged; the registry compensates any earlier movement of the
//! same call so that the call as a whole commits nothing.

use crate::amount::Amount;

/// Moves value into and out of registry custody.
pub trait ValueTransfer<I>: Send + Sync {
    /// Pulls `amount` from `from` into registry custody.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if the movement cannot complete. On error no
    /// balance may have changed.
    fn custody(&mut self, from: &I, amount: Amount) -> Result<(), TransferError>;

    /// Pushes `amount` from registry custody to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if the movement cannot complete (for example,
    /// a malformed or closed destination). On error no balance may have
    /// changed.
    fn release(&mut self, to: &I, amount: Amount) -> Result<(), TransferError>;

    /// Returns the total value currently in registry custody.
    fn holdings(&self) -> Amount;
}

/// Failure of a single value movement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// The source cannot cover the amount.
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        /// Balance available at the source.
        available: Amount,
        /// Amount the movement needed.
        required: Amount,
    },
    /// The counterparty cannot send or receive funds.
    #[error("invalid destination {0}")]
    InvalidDestination(String),
    /// The host rejected the movement for another reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}
