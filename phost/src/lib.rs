#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the phost pay-to-publish content registry.
//!
//! A registry maps routes to content records. Publishing to a free route costs
//! any non-zero amount; publishing to an occupied route requires strictly
//! outbidding the current price, and the previous owner's escrow is refunded in
//! the same atomic transition.
//!
//! The crate is chain-agnostic. Who is calling is modelled by the [`Identity`]
//! bound, and moving funds is delegated to a [`ValueTransfer`] implementation
//! supplied by the host (see the `phost-ledger` crate for an in-memory one).
//!
//! # Modules
//!
//! - [`amount`] - Checked single-currency amounts
//! - [`identity`] - Caller identity bound and the [`AccountId`] string identity
//! - [`route`] - Route keys
//! - [`record`] - Stored records and purchase receipts
//! - [`transfer`] - The value-transfer capability consumed by the registry
//! - [`hooks`] - Lifecycle hooks and registry events
//! - [`registry`] - The registry state machine
//! - [`error`] - Registry error taxonomy
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation of registry transitions

pub mod amount;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod record;
pub mod registry;
pub mod route;
pub mod transfer;

pub use amount::{Amount, AmountError};
pub use error::RegistryError;
pub use hooks::{HookDecision, PurchaseContext, RegistryEvent, RegistryHooks};
pub use identity::{AccountId, Identity};
pub use record::{ContentRecord, Receipt, Refund};
pub use registry::{Purchase, Registry};
pub use route::{Route, RouteError};
pub use transfer::{TransferError, ValueTransfer};
