//! Scenario replay against an in-memory registry.

use std::sync::Arc;

use parking_lot::Mutex;
use phost::{
    AccountId, Amount, ContentRecord, Purchase, Registry, RegistryEvent, RegistryHooks, Route,
};
use phost_ledger::{Ledger, LedgerError, LedgerSnapshot};
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{SimConfig, Step};

/// Errors raised while preparing a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An account in the configuration could not be opened.
    #[error("cannot open account: {0}")]
    Ledger(#[from] LedgerError),
}

/// Hook that records every committed registry event.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<RegistryEvent<AccountId>>>>);

impl EventLog {
    /// Returns the recorded events in commit order.
    #[must_use]
    pub fn events(&self) -> Vec<RegistryEvent<AccountId>> {
        self.0.lock().clone()
    }
}

impl RegistryHooks<AccountId> for EventLog {
    fn on_event(&self, event: &RegistryEvent<AccountId>) {
        self.0.lock().push(event.clone());
    }
}

/// Outcome of one replayed step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    /// Zero-based position in the scenario.
    pub index: usize,
    /// The operation name.
    pub op: &'static str,
    /// Whether the step succeeded.
    pub ok: bool,
    /// Step result on success.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub result: Value,
    /// Machine-readable error kind on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepOutcome {
    fn ok(index: usize, op: &'static str, result: Value) -> Self {
        Self {
            index,
            op,
            ok: true,
            result,
            error: None,
            message: None,
        }
    }

    fn failed(index: usize, op: &'static str, kind: &str, message: String) -> Self {
        Self {
            index,
            op,
            ok: false,
            result: Value::Null,
            error: Some(kind.to_owned()),
            message: Some(message),
        }
    }
}

/// Final state of a published route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    /// The route.
    pub route: Route,
    /// Its record.
    #[serde(flatten)]
    pub record: ContentRecord<AccountId>,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Per-step outcomes in order.
    pub steps: Vec<StepOutcome>,
    /// Committed registry events in order.
    pub events: Vec<RegistryEvent<AccountId>>,
    /// Published routes and their records.
    pub routes: Vec<RouteView>,
    /// Sum of all slot prices.
    pub escrowed: Amount,
    /// Offers stranded by failed rollbacks.
    pub owed: Amount,
    /// Custody balance not backing any slot or owed offer.
    pub surplus: Amount,
    /// Final ledger balances.
    pub ledger: LedgerSnapshot,
}

/// A registry wired to a fresh ledger, ready to replay steps.
#[derive(Debug)]
pub struct Simulation {
    registry: Registry<AccountId, Ledger>,
    ledger: Ledger,
    log: EventLog,
}

impl Simulation {
    /// Opens the configured accounts and creates the registry as `config.admin`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Ledger`] if an account cannot be opened.
    pub fn from_config(config: &SimConfig) -> Result<Self, SimError> {
        let ledger = Ledger::new();
        for (account, balance) in &config.accounts {
            ledger.open(account.clone(), *balance)?;
        }
        if !config.accounts.contains_key(&config.admin) {
            ledger.open(config.admin.clone(), Amount::ZERO)?;
        }
        for account in &config.frozen {
            ledger.freeze(account);
        }

        let log = EventLog::default();
        let registry = Registry::new(config.admin.clone(), ledger.clone()).with_hook(log.clone());
        tracing::info!(
            admin = %config.admin,
            accounts = config.accounts.len(),
            "Registry created"
        );
        Ok(Self {
            registry,
            ledger,
            log,
        })
    }

    /// Returns the registry under simulation.
    #[must_use]
    pub const fn registry(&self) -> &Registry<AccountId, Ledger> {
        &self.registry
    }

    /// Replays one step. Failures are reported in the outcome, never raised.
    pub fn apply(&self, index: usize, step: &Step) -> StepOutcome {
        let op = step.op();
        match step {
            Step::Purchase {
                caller,
                route,
                content,
                value,
                refund_to,
            } => {
                let mut request = Purchase::new(route.clone(), content.clone(), *value, caller.clone());
                if let Some(destination) = refund_to {
                    request = request.refund_to(destination.clone());
                }
                match self.registry.purchase(request) {
                    Ok(receipt) => StepOutcome::ok(index, op, json!(receipt)),
                    Err(err) => StepOutcome::failed(index, op, err.kind(), err.to_string()),
                }
            }
            Step::Withdraw { caller } => match self.registry.withdraw(caller) {
                Ok(amount) => StepOutcome::ok(index, op, json!({ "withdrawn": amount })),
                Err(err) => StepOutcome::failed(index, op, err.kind(), err.to_string()),
            },
            Step::Reclaim { caller } => match self.registry.reclaim(caller) {
                Ok(amount) => StepOutcome::ok(index, op, json!({ "reclaimed": amount })),
                Err(err) => StepOutcome::failed(index, op, err.kind(), err.to_string()),
            },
            Step::Read { route } => {
                let content = self.registry.content(route.as_str());
                StepOutcome::ok(index, op, json!({ "content": content }))
            }
            Step::Deposit { from, amount } => match self.ledger.deposit(from, *amount) {
                Ok(()) => StepOutcome::ok(index, op, json!({ "held": self.ledger.held() })),
                Err(err) => StepOutcome::failed(index, op, "ledger", err.to_string()),
            },
            Step::Freeze { account } => {
                self.ledger.freeze(account);
                StepOutcome::ok(index, op, Value::Null)
            }
            Step::Thaw { account } => {
                self.ledger.thaw(account);
                StepOutcome::ok(index, op, Value::Null)
            }
        }
    }

    /// Replays every step and collects the final state.
    pub fn run(&self, steps: &[Step]) -> Report {
        let outcomes = steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let outcome = self.apply(index, step);
                if outcome.ok {
                    tracing::debug!(index, op = outcome.op, "Step succeeded");
                } else {
                    tracing::info!(
                        index,
                        op = outcome.op,
                        error = outcome.error.as_deref(),
                        "Step failed"
                    );
                }
                outcome
            })
            .collect();

        let routes = self
            .registry
            .routes()
            .into_iter()
            .filter_map(|route| {
                let record = self.registry.record(route.as_str())?;
                Some(RouteView { route, record })
            })
            .collect();

        Report {
            steps: outcomes,
            events: self.log.events(),
            routes,
            escrowed: self.registry.escrowed(),
            owed: self.registry.owed(),
            surplus: self.registry.surplus(),
            ledger: self.ledger.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        admin = "deployer"

        [accounts]
        alice = 10
        bob = 10
        donor = 3

        [[steps]]
        op = "purchase"
        caller = "alice"
        route = "r"
        content = "c"
        value = 5

        [[steps]]
        op = "purchase"
        caller = "bob"
        route = "r"
        content = "c2"
        value = 5

        [[steps]]
        op = "freeze"
        account = "alice"

        [[steps]]
        op = "purchase"
        caller = "bob"
        route = "r"
        content = "c2"
        value = 8

        [[steps]]
        op = "thaw"
        account = "alice"

        [[steps]]
        op = "purchase"
        caller = "bob"
        route = "r"
        content = "c2"
        value = 8

        [[steps]]
        op = "deposit"
        from = "donor"
        amount = 3

        [[steps]]
        op = "withdraw"
        caller = "bob"

        [[steps]]
        op = "withdraw"
        caller = "deployer"

        [[steps]]
        op = "read"
        route = "r"
    "#;

    fn run() -> Report {
        let config = SimConfig::from_toml(SCENARIO).unwrap();
        let sim = Simulation::from_config(&config).unwrap();
        sim.run(&config.steps)
    }

    #[test]
    fn test_scenario_outcomes() {
        let report = run();
        let kinds: Vec<Option<&str>> = report.steps.iter().map(|s| s.error.as_deref()).collect();
        assert_eq!(
            kinds,
            vec![
                None,
                Some("insufficient_offer"),
                None,
                Some("transfer_failed"),
                None,
                None,
                None,
                Some("unauthorized"),
                None,
                None,
            ]
        );
        assert_eq!(report.steps[8].result["withdrawn"], "3");
        assert_eq!(report.steps[9].result["content"], "c2");
    }

    #[test]
    fn test_scenario_final_state() {
        let report = run();
        assert_eq!(report.escrowed, Amount::new(8));
        assert_eq!(report.surplus, Amount::ZERO);
        assert_eq!(report.ledger.held, Amount::new(8));
        assert_eq!(report.routes.len(), 1);
        assert_eq!(report.routes[0].record.owner.as_str(), "bob");

        let balance = |name: &str| report.ledger.accounts[name];
        assert_eq!(balance("alice"), Amount::new(10));
        assert_eq!(balance("bob"), Amount::new(2));
        assert_eq!(balance("deployer"), Amount::new(3));
        assert_eq!(balance("donor"), Amount::ZERO);
    }

    #[test]
    fn test_scenario_events() {
        let report = run();
        assert_eq!(report.events.len(), 3);
        assert!(matches!(report.events[0], RegistryEvent::Published { .. }));
        assert!(matches!(
            &report.events[1],
            RegistryEvent::Outbid { refund, .. } if *refund == Amount::new(5)
        ));
        assert!(matches!(report.events[2], RegistryEvent::Withdrawn { .. }));
    }

    #[test]
    fn test_shipped_outbid_scenario() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/outbid.toml");
        let config = SimConfig::load_from(&path).unwrap();
        let report = Simulation::from_config(&config).unwrap().run(&config.steps);

        let kinds: Vec<Option<&str>> = report.steps.iter().map(|s| s.error.as_deref()).collect();
        assert_eq!(
            kinds,
            vec![
                None,
                Some("insufficient_offer"),
                None,
                Some("transfer_failed"),
                None,
                None,
                None,
                Some("unauthorized"),
                None,
                None,
            ]
        );
        assert_eq!(report.steps[8].result["withdrawn"], "2");
        assert_eq!(report.steps[9].result["content"], "bob outbids");

        assert_eq!(report.escrowed, Amount::new(8));
        assert_eq!(report.owed, Amount::ZERO);
        assert_eq!(report.surplus, Amount::ZERO);
        let balance = |name: &str| report.ledger.accounts[name];
        assert_eq!(balance("alice"), Amount::new(5));
        assert_eq!(balance("alice-vault"), Amount::new(5));
        assert_eq!(balance("bob"), Amount::new(12));
        assert_eq!(balance("deployer"), Amount::new(2));
        assert_eq!(report.events.len(), 3);
    }
}
