//! Stored records and purchase receipts.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::route::Route;

/// The record stored for one route.
///
/// `price` is exactly the value the registry holds in escrow for this slot.
/// `refund_to` is where that escrow goes if the slot is outbid; it defaults to
/// the owner but may be any identity the purchaser designated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord<I> {
    /// Identity that currently controls the slot.
    pub owner: I,
    /// Value escrowed for this slot.
    pub price: Amount,
    /// Opaque payload published at the route.
    pub content: String,
    /// Refund destination for the escrow when the slot is outbid.
    pub refund_to: I,
}

/// A refund issued to the previous owner of an outbid slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund<I> {
    /// The owner that was outbid.
    pub previous_owner: I,
    /// Where the refund was released to.
    pub to: I,
    /// The refunded amount, equal to the previous price.
    pub amount: Amount,
}

/// Outcome of a committed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt<I> {
    /// The purchased route.
    pub route: Route,
    /// The new owner.
    pub owner: I,
    /// The new price, now escrowed.
    pub price: Amount,
    /// The refund issued to the outbid owner, if the route was occupied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund: Option<Refund<I>>,
}

impl<I> Receipt<I> {
    /// Returns `true` if this purchase replaced an existing record.
    #[must_use]
    pub const fn is_overwrite(&self) -> bool {
        self.refund.is_some()
    }
}
