//! Error taxonomy for registry operations.
//!
//! Every error is terminal for the call that produced it: nothing is committed
//! and the caller decides whether to retry (with a higher offer, a working
//! refund destination, or the admin identity).

use crate::amount::{Amount, AmountError};
use crate::transfer::TransferError;

/// Errors returned by [`Registry`](crate::Registry) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The caller attached no value.
    #[error("a non-zero value is required to purchase a route")]
    ZeroValue,

    /// The offer does not strictly exceed the current price.
    #[error("offer of {offered} does not exceed current price {price}")]
    InsufficientOffer {
        /// The value the caller attached.
        offered: Amount,
        /// The price the offer had to beat.
        price: Amount,
    },

    /// A custody or refund movement failed; the call was rolled back.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// The refund failed and returning the offer to the caller failed too.
    ///
    /// The record is unchanged, and the offer stays in custody as a debt owed
    /// to the caller. It is never counted as surplus and can be reclaimed with
    /// [`Registry::reclaim`](crate::Registry::reclaim).
    #[error("refund failed ({refund}) and the offer could not be returned ({reversal})")]
    RollbackFailed {
        /// Why the refund to the previous owner failed.
        refund: TransferError,
        /// Why returning the offer to the caller failed.
        reversal: TransferError,
    },

    /// Only the admin identity may withdraw.
    #[error("caller is not the registry admin")]
    Unauthorized,

    /// A `before_purchase` hook rejected the purchase.
    #[error("purchase aborted: {reason}: {message}")]
    Aborted {
        /// Machine-readable abort reason.
        reason: String,
        /// Human-readable abort message.
        message: String,
    },

    /// The escrow total would no longer fit in an [`Amount`].
    #[error("escrow total overflow: {0}")]
    Overflow(#[from] AmountError),
}

impl RegistryError {
    /// Returns a stable machine-readable name for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ZeroValue => "zero_value",
            Self::InsufficientOffer { .. } => "insufficient_offer",
            Self::TransferFailed(_) => "transfer_failed",
            Self::RollbackFailed { .. } => "rollback_failed",
            Self::Unauthorized => "unauthorized",
            Self::Aborted { .. } => "aborted",
            Self::Overflow(_) => "overflow",
        }
    }
}
