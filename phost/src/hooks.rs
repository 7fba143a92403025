//! Lifecycle hooks and events for registry operations.
//!
//! Hooks intercept purchases at three points:
//!
//! - **Before**: inspect the request and the current record, or abort
//! - **After**: observe the committed [`Receipt`]
//! - **On Failure**: observe the error a purchase was rejected with
//!
//! Every committed transition (publish, outbid, withdraw) is also reported as a
//! [`RegistryEvent`] through [`RegistryHooks::on_event`].
//!
//! All methods have default no-op implementations. Hooks run in registration
//! order. `before_purchase` runs while the registry's write lock is held and
//! must not call back into the registry it is attached to; the other methods
//! run after the lock is released.

use serde::Serialize;

use crate::amount::Amount;
use crate::error::RegistryError;
use crate::record::{ContentRecord, Receipt};
use crate::route::Route;

/// Decision returned by [`RegistryHooks::before_purchase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Allow the purchase to proceed.
    Continue,
    /// Reject the purchase before any value moves.
    Abort {
        /// Machine-readable reason (e.g., `"route_reserved"`).
        reason: String,
        /// Human-readable explanation.
        message: String,
    },
}

impl HookDecision {
    /// Convenience constructor for [`HookDecision::Abort`].
    pub fn abort(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// What a purchase hook can see about the request being processed.
#[derive(Debug)]
pub struct PurchaseContext<'a, I> {
    /// The route being purchased.
    pub route: &'a Route,
    /// The content to publish.
    pub content: &'a str,
    /// The attached value.
    pub offered: Amount,
    /// The purchasing identity.
    pub caller: &'a I,
    /// The record currently stored at the route, if any.
    pub current: Option<&'a ContentRecord<I>>,
}

/// A committed registry transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RegistryEvent<I> {
    /// A previously unpublished route was purchased.
    #[serde(rename_all = "camelCase")]
    Published {
        /// The route.
        route: Route,
        /// The new owner.
        owner: I,
        /// The escrowed price.
        price: Amount,
    },
    /// An occupied route was outbid and the previous escrow refunded.
    #[serde(rename_all = "camelCase")]
    Outbid {
        /// The route.
        route: Route,
        /// The owner that lost the slot.
        previous_owner: I,
        /// Where the previous escrow was released to.
        refunded_to: I,
        /// The refunded amount.
        refund: Amount,
        /// The new owner.
        owner: I,
        /// The new escrowed price.
        price: Amount,
    },
    /// The admin withdrew surplus balance.
    #[serde(rename_all = "camelCase")]
    Withdrawn {
        /// The admin identity.
        admin: I,
        /// The withdrawn amount.
        amount: Amount,
    },
    /// An offer stranded by a failed rollback was returned to its owner.
    #[serde(rename_all = "camelCase")]
    Reclaimed {
        /// The account the offer was returned to.
        account: I,
        /// The returned amount.
        amount: Amount,
    },
}

impl<I: Clone> RegistryEvent<I> {
    /// Builds the event describing a committed purchase.
    #[must_use]
    pub fn from_receipt(receipt: &Receipt<I>) -> Self {
        match &receipt.refund {
            None => Self::Published {
                route: receipt.route.clone(),
                owner: receipt.owner.clone(),
                price: receipt.price,
            },
            Some(refund) => Self::Outbid {
                route: receipt.route.clone(),
                previous_owner: refund.previous_owner.clone(),
                refunded_to: refund.to.clone(),
                refund: refund.amount,
                owner: receipt.owner.clone(),
                price: receipt.price,
            },
        }
    }
}

/// Lifecycle hooks for registry operations.
///
/// This trait is dyn-compatible for use in heterogeneous hook lists.
pub trait RegistryHooks<I>: Send + Sync {
    /// Called before any value moves. The first hook returning
    /// [`HookDecision::Abort`] rejects the purchase with
    /// [`RegistryError::Aborted`]; remaining hooks are skipped.
    fn before_purchase(&self, _ctx: &PurchaseContext<'_, I>) -> HookDecision {
        HookDecision::Continue
    }

    /// Called after a purchase commits.
    fn after_purchase(&self, _ctx: &PurchaseContext<'_, I>, _receipt: &Receipt<I>) {}

    /// Called when a purchase is rejected, whatever the reason.
    fn on_purchase_failure(&self, _ctx: &PurchaseContext<'_, I>, _error: &RegistryError) {}

    /// Called for every committed transition.
    fn on_event(&self, _event: &RegistryEvent<I>) {}
}
