//! The content-slot state machine.
//!
//! [`Registry`] owns the route → record mapping and the value-transfer
//! capability, and is the only place either is mutated. Each route moves
//! through:
//!
//! ```text
//! Unpublished ──purchase(p > 0)──▶ Published(o1, p1) ──purchase(p2 > p1)──▶ Published(o2, p2) ──▶ …
//! ```
//!
//! # Atomicity
//!
//! A purchase either commits the custody of the new offer, the refund of the
//! previous escrow and the record replacement together, or commits none of
//! them. All validation runs before any value moves; the record is written
//! only after every movement succeeded, and a failed refund is compensated by
//! releasing the fresh custody back to the caller.
//!
//! If that compensation fails as well, the offer cannot leave custody. The
//! record is still untouched, the offer is booked as owed to the caller and
//! [`RegistryError::RollbackFailed`] is returned. Owed balances are never part
//! of the surplus, and [`Registry::reclaim`] returns them once the caller can
//! receive funds again.
//!
//! # Concurrency
//!
//! Writers (`purchase`, `withdraw`) are serialized by one coarse
//! [`RwLock`](parking_lot::RwLock) over the slot mapping and the transfer
//! capability. Readers share the read lock and never observe a half-applied
//! transition. Post-commit hooks run after the lock is released.

use std::collections::HashMap;
use std::fmt;
use std::fmt::{Debug, Formatter};

use parking_lot::RwLock;

use crate::amount::Amount;
use crate::error::RegistryError;
use crate::hooks::{HookDecision, PurchaseContext, RegistryEvent, RegistryHooks};
use crate::identity::Identity;
use crate::record::{ContentRecord, Receipt, Refund};
use crate::route::Route;
use crate::transfer::ValueTransfer;

/// A purchase request as supplied by the hosting environment.
///
/// The caller identity and attached value come from the host (the signer and
/// the attached deposit), not from the caller's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase<I> {
    /// The route to publish to.
    pub route: Route,
    /// The content to publish.
    pub content: String,
    /// The attached value.
    pub offered: Amount,
    /// The purchasing identity.
    pub caller: I,
    /// Where the caller's escrow is refunded if it is later outbid.
    /// `None` means the caller itself.
    pub refund_to: Option<I>,
}

impl<I> Purchase<I> {
    /// Creates a purchase whose refunds go back to the caller.
    pub fn new(route: Route, content: impl Into<String>, offered: Amount, caller: I) -> Self {
        Self {
            route,
            content: content.into(),
            offered,
            caller,
            refund_to: None,
        }
    }

    /// Designates a refund destination other than the caller.
    #[must_use]
    pub fn refund_to(mut self, destination: I) -> Self {
        self.refund_to = Some(destination);
        self
    }
}

struct State<I, T> {
    slots: HashMap<Route, ContentRecord<I>>,
    /// Sum of all slot prices.
    escrowed: Amount,
    /// Offers stuck in custody after a failed rollback, by caller.
    owed: HashMap<I, Amount>,
    /// Sum of `owed`.
    owed_total: Amount,
    transfer: T,
}

impl<I: Identity, T: ValueTransfer<I>> State<I, T> {
    fn surplus(&self) -> Amount {
        self.transfer
            .holdings()
            .saturating_sub(self.escrowed)
            .saturating_sub(self.owed_total)
    }

    /// Books `amount` as owed to `account`. Totals are bounded by the holdings.
    fn owe(&mut self, account: &I, amount: Amount) {
        let entry = self.owed.entry(account.clone()).or_insert(Amount::ZERO);
        *entry = entry.saturating_add(amount);
        self.owed_total = self.owed_total.saturating_add(amount);
    }
}

/// The pay-to-publish content registry.
///
/// `I` is the caller identity type and `T` the value-transfer capability.
pub struct Registry<I, T> {
    admin: I,
    state: RwLock<State<I, T>>,
    hooks: Vec<Box<dyn RegistryHooks<I>>>,
}

impl<I: Identity, T> Debug for Registry<I, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Registry")
            .field("admin", &self.admin)
            .field("routes", &state.slots.len())
            .field("escrowed", &state.escrowed)
            .field("owed", &state.owed_total)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl<I: Identity, T: ValueTransfer<I>> Registry<I, T> {
    /// Creates an empty registry administered by `creator`.
    ///
    /// The admin identity is captured here and cannot be changed afterwards.
    pub fn new(creator: I, transfer: T) -> Self {
        Self {
            admin: creator,
            state: RwLock::new(State {
                slots: HashMap::new(),
                escrowed: Amount::ZERO,
                owed: HashMap::new(),
                owed_total: Amount::ZERO,
                transfer,
            }),
            hooks: Vec::new(),
        }
    }

    /// Registers a lifecycle hook. Hooks run in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: impl RegistryHooks<I> + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Returns the admin identity fixed at creation.
    pub const fn admin(&self) -> &I {
        &self.admin
    }

    /// Purchases `request.route`, outbidding the current owner if there is one.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ZeroValue`] if no value is attached
    /// - [`RegistryError::InsufficientOffer`] if the offer does not strictly
    ///   exceed the current price
    /// - [`RegistryError::Aborted`] if a hook rejected the purchase
    /// - [`RegistryError::Overflow`] if the escrow total would overflow
    /// - [`RegistryError::TransferFailed`] if custody or the refund failed
    /// - [`RegistryError::RollbackFailed`] if the refund failed and the offer
    ///   could not be returned to the caller
    ///
    /// On any error other than [`RegistryError::RollbackFailed`] the registry
    /// and the transfer capability are left exactly as they were before the
    /// call. After a failed rollback the record is unchanged and the offer left
    /// in custody is booked as owed to the caller.
    pub fn purchase(&self, request: Purchase<I>) -> Result<Receipt<I>, RegistryError> {
        let mut guard = self.state.write();
        let current = guard.slots.get(&request.route).cloned();
        let ctx = PurchaseContext {
            route: &request.route,
            content: &request.content,
            offered: request.offered,
            caller: &request.caller,
            current: current.as_ref(),
        };

        let result = self.apply_purchase(&mut guard, &ctx, request.refund_to.as_ref());
        drop(guard);

        match result {
            Ok(receipt) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(
                    route = %receipt.route,
                    owner = ?receipt.owner,
                    price = %receipt.price,
                    refund = ?receipt.refund.as_ref().map(|r| r.amount),
                    "Route purchased"
                );
                let event = RegistryEvent::from_receipt(&receipt);
                for hook in &self.hooks {
                    hook.after_purchase(&ctx, &receipt);
                    hook.on_event(&event);
                }
                Ok(receipt)
            }
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(
                    route = %ctx.route,
                    offered = %ctx.offered,
                    kind = err.kind(),
                    error = %err,
                    "Purchase rejected"
                );
                for hook in &self.hooks {
                    hook.on_purchase_failure(&ctx, &err);
                }
                Err(err)
            }
        }
    }

    fn apply_purchase(
        &self,
        state: &mut State<I, T>,
        ctx: &PurchaseContext<'_, I>,
        refund_to: Option<&I>,
    ) -> Result<Receipt<I>, RegistryError> {
        let offered = ctx.offered;
        if offered.is_zero() {
            return Err(RegistryError::ZeroValue);
        }
        if let Some(current) = ctx.current
            && offered <= current.price
        {
            return Err(RegistryError::InsufficientOffer {
                offered,
                price: current.price,
            });
        }
        for hook in &self.hooks {
            if let HookDecision::Abort { reason, message } = hook.before_purchase(ctx) {
                return Err(RegistryError::Aborted { reason, message });
            }
        }

        let released = ctx.current.map_or(Amount::ZERO, |c| c.price);
        let escrowed = state
            .escrowed
            .checked_sub(released)?
            .checked_add(offered)?;

        state.transfer.custody(ctx.caller, offered)?;

        let refund = match ctx.current {
            None => None,
            Some(current) => {
                if let Err(err) = state.transfer.release(&current.refund_to, current.price) {
                    // Undo the custody taken above so the call commits nothing.
                    if let Err(reversal) = state.transfer.release(ctx.caller, offered) {
                        #[cfg(feature = "telemetry")]
                        tracing::error!(
                            route = %ctx.route,
                            caller = ?ctx.caller,
                            amount = %offered,
                            error = %reversal,
                            "Failed to reverse custody, offer booked as owed"
                        );
                        state.owe(ctx.caller, offered);
                        return Err(RegistryError::RollbackFailed {
                            refund: err,
                            reversal,
                        });
                    }
                    return Err(err.into());
                }
                Some(Refund {
                    previous_owner: current.owner.clone(),
                    to: current.refund_to.clone(),
                    amount: current.price,
                })
            }
        };

        let owner = ctx.caller.clone();
        state.slots.insert(
            ctx.route.clone(),
            ContentRecord {
                owner: owner.clone(),
                price: offered,
                content: ctx.content.to_owned(),
                refund_to: refund_to.unwrap_or(ctx.caller).clone(),
            },
        );
        state.escrowed = escrowed;

        Ok(Receipt {
            route: ctx.route.clone(),
            owner,
            price: offered,
            refund,
        })
    }

    /// Sends the surplus balance (holdings not escrowed by any slot) to the
    /// admin and returns the amount sent.
    ///
    /// A zero surplus is a successful no-op.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Unauthorized`] if `caller` is not the admin
    /// - [`RegistryError::TransferFailed`] if the release to the admin failed
    pub fn withdraw(&self, caller: &I) -> Result<Amount, RegistryError> {
        if *caller != self.admin {
            #[cfg(feature = "telemetry")]
            tracing::warn!(caller = ?caller, "Withdraw rejected: caller is not admin");
            return Err(RegistryError::Unauthorized);
        }

        let mut guard = self.state.write();
        let surplus = guard.surplus();
        if surplus.is_zero() {
            return Ok(Amount::ZERO);
        }
        guard.transfer.release(&self.admin, surplus)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(amount = %surplus, escrowed = %guard.escrowed, "Surplus withdrawn");
        drop(guard);

        let event = RegistryEvent::Withdrawn {
            admin: self.admin.clone(),
            amount: surplus,
        };
        for hook in &self.hooks {
            hook.on_event(&event);
        }
        Ok(surplus)
    }

    /// Sends the offer stranded for `caller` by a failed rollback back to it
    /// and returns the amount sent.
    ///
    /// A zero balance is a successful no-op. Anyone may reclaim only their own
    /// balance, and funds always go back to the identity they were taken from.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::TransferFailed`] if the release to `caller` failed;
    ///   the balance stays owed
    pub fn reclaim(&self, caller: &I) -> Result<Amount, RegistryError> {
        let mut guard = self.state.write();
        let Some(&amount) = guard.owed.get(caller) else {
            return Ok(Amount::ZERO);
        };
        let owed_total = guard.owed_total.checked_sub(amount)?;
        guard.transfer.release(caller, amount)?;
        guard.owed.remove(caller);
        guard.owed_total = owed_total;

        #[cfg(feature = "telemetry")]
        tracing::info!(caller = ?caller, amount = %amount, "Owed offer reclaimed");
        drop(guard);

        let event = RegistryEvent::Reclaimed {
            account: caller.clone(),
            amount,
        };
        for hook in &self.hooks {
            hook.on_event(&event);
        }
        Ok(amount)
    }

    /// Returns the balance owed to `account` after a failed rollback.
    pub fn owed_to(&self, account: &I) -> Amount {
        self.state
            .read()
            .owed
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Returns the sum of all owed balances.
    pub fn owed(&self) -> Amount {
        self.state.read().owed_total
    }

    /// Returns the content published at `route`, if any.
    pub fn content(&self, route: &str) -> Option<String> {
        self.state
            .read()
            .slots
            .get(route)
            .map(|record| record.content.clone())
    }

    /// Returns the full record stored at `route`, if any.
    pub fn record(&self, route: &str) -> Option<ContentRecord<I>> {
        self.state.read().slots.get(route).cloned()
    }

    /// Returns the price an offer for `route` has to exceed, if it is published.
    pub fn price(&self, route: &str) -> Option<Amount> {
        self.state.read().slots.get(route).map(|record| record.price)
    }

    /// Returns the sum of all slot prices.
    pub fn escrowed(&self) -> Amount {
        self.state.read().escrowed
    }

    /// Returns everything the transfer capability holds in registry custody.
    pub fn holdings(&self) -> Amount {
        self.state.read().transfer.holdings()
    }

    /// Returns the balance a [`withdraw`](Self::withdraw) would currently send.
    pub fn surplus(&self) -> Amount {
        self.state.read().surplus()
    }

    /// Returns the number of published routes.
    pub fn len(&self) -> usize {
        self.state.read().slots.len()
    }

    /// Returns `true` if no route has been published.
    pub fn is_empty(&self) -> bool {
        self.state.read().slots.is_empty()
    }

    /// Returns all published routes in lexicographic order.
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.state.read().slots.keys().cloned().collect();
        routes.sort_unstable();
        routes
    }
}
