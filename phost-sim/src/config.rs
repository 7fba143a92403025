//! Scenario configuration.
//!
//! Loads a scenario from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! admin = "deployer"
//!
//! [accounts]
//! deployer = 0
//! alice = 10
//! bob = "${BOB_BALANCE}"
//!
//! [[steps]]
//! op = "purchase"
//! caller = "alice"
//! route = "home"
//! content = "hello"
//! value = 5
//!
//! [[steps]]
//! op = "withdraw"
//! caller = "deployer"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the scenario file (default: `phost.toml`)
//! - Any variable referenced by `$VAR` in the file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use phost::{AccountId, Amount, Route};
use serde::{Deserialize, Serialize};

/// Scenario path used when neither `--config` nor `CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "phost.toml";

/// Errors raised while loading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The scenario file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The scenario file is not valid TOML for [`SimConfig`].
    #[error("invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// The identity that creates the registry and may withdraw surplus.
    pub admin: AccountId,

    /// Accounts opened on the ledger before the scenario runs, with their
    /// starting balances. The admin is opened with a zero balance if absent.
    #[serde(default)]
    pub accounts: BTreeMap<AccountId, Amount>,

    /// Accounts frozen before the scenario runs.
    #[serde(default)]
    pub frozen: Vec<AccountId>,

    /// Operations replayed in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scenario operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Purchase a route.
    Purchase {
        /// The purchasing identity.
        caller: AccountId,
        /// The route to purchase.
        route: Route,
        /// The content to publish.
        content: String,
        /// The attached value.
        value: Amount,
        /// Refund destination if this purchase is later outbid.
        #[serde(default)]
        refund_to: Option<AccountId>,
    },
    /// Withdraw surplus.
    Withdraw {
        /// The calling identity.
        caller: AccountId,
    },
    /// Reclaim an offer stranded by a failed rollback.
    Reclaim {
        /// The calling identity.
        caller: AccountId,
    },
    /// Read the content at a route.
    Read {
        /// The route to read.
        route: Route,
    },
    /// Send funds straight into registry custody.
    Deposit {
        /// The paying account.
        from: AccountId,
        /// The deposited amount.
        amount: Amount,
    },
    /// Freeze an account.
    Freeze {
        /// The account to freeze.
        account: AccountId,
    },
    /// Thaw a frozen account.
    Thaw {
        /// The account to thaw.
        account: AccountId,
    },
}

impl Step {
    /// Returns the operation name as written in the scenario file.
    #[must_use]
    pub const fn op(&self) -> &'static str {
        match self {
            Self::Purchase { .. } => "purchase",
            Self::Withdraw { .. } => "withdraw",
            Self::Reclaim { .. } => "reclaim",
            Self::Read { .. } => "read",
            Self::Deposit { .. } => "deposit",
            Self::Freeze { .. } => "freeze",
            Self::Thaw { .. } => "thaw",
        }
    }
}

impl SimConfig {
    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text after expanding environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the expanded text is not a valid scenario.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced {
                chars.next();
                if c == '}' {
                    closed = true;
                    break;
                }
            } else if c.is_ascii_alphanumeric() || c == '_' {
                chars.next();
            } else {
                break;
            }
            name.push(c);
        }

        match lookup(&name) {
            Some(value) if !name.is_empty() && (closed || !braced) => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "BALANCE" => Some("42".into()),
            "ADMIN" => Some("deployer".into()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_plain_and_braced() {
        assert_eq!(expand_with("a = $BALANCE", lookup), "a = 42");
        assert_eq!(expand_with("a = \"${ADMIN}\"", lookup), "a = \"deployer\"");
        assert_eq!(expand_with("${BALANCE}0", lookup), "420");
    }

    #[test]
    fn test_expand_leaves_unresolved() {
        assert_eq!(expand_with("$MISSING x", lookup), "$MISSING x");
        assert_eq!(expand_with("${MISSING}", lookup), "${MISSING}");
        assert_eq!(expand_with("cost: $", lookup), "cost: $");
        assert_eq!(expand_with("${BALANCE", lookup), "${BALANCE");
    }

    #[test]
    fn test_parse_scenario() {
        let config = SimConfig::from_toml(
            r#"
            admin = "deployer"
            frozen = ["carol"]

            [accounts]
            alice = 10
            bob = "20"

            [[steps]]
            op = "purchase"
            caller = "alice"
            route = "home"
            content = "hello"
            value = 5
            refund_to = "alice-vault"

            [[steps]]
            op = "read"
            route = "home"

            [[steps]]
            op = "withdraw"
            caller = "deployer"
            "#,
        )
        .unwrap();

        assert_eq!(config.admin.as_str(), "deployer");
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.frozen.len(), 1);
        assert_eq!(config.steps.len(), 3);
        assert_eq!(config.steps[0].op(), "purchase");
        assert!(matches!(
            &config.steps[0],
            Step::Purchase { value, refund_to: Some(_), .. } if *value == Amount::new(5)
        ));
    }

    #[test]
    fn test_parse_rejects_empty_route() {
        let result = SimConfig::from_toml(
            r#"
            admin = "deployer"

            [[steps]]
            op = "read"
            route = ""
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
