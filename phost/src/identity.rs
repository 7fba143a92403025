//! Caller identities.
//!
//! The registry never inspects an identity: it only compares two of them for
//! equality (is this caller the admin?) and stores them as owners and refund
//! destinations. Any type with those capabilities is an [`Identity`].
//!
//! [`AccountId`] is the string identity used by the in-memory ledger and the
//! simulator, matching the account-name style of NEAR and the bech32/base58
//! address strings of the other hosts.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::borrow::Borrow;
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;

/// An opaque, comparable token representing who is calling.
///
/// Blanket-implemented for every type that is cloneable, hashable, comparable
/// and thread-safe.
pub trait Identity: Clone + Eq + Hash + Debug + Send + Sync + 'static {}
impl<T> Identity for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A string account identifier (e.g., `"alice.near"`).
///
/// # Serialization
///
/// Serializes to/from a plain string. Empty strings and strings containing
/// whitespace are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(String);

/// Error returned when parsing an invalid account identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid account id {0:?}")]
pub struct AccountIdFormatError(String);

impl AccountId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(AccountIdFormatError(s.into()));
        }
        Ok(Self(s.into()))
    }
}

impl Borrow<str> for AccountId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}
