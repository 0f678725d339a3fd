use rust_decimal::Decimal;
use std::sync::{Arc, RwLock};

/// Account collaborator: current cash balance, read on demand
pub trait Account {
    fn cash_balance(&self) -> Decimal;
}

/// Cash balance shared with whatever keeps the account up to date
#[derive(Debug, Clone, Default)]
pub struct SharedAccount {
    cash: Arc<RwLock<Decimal>>,
}

impl SharedAccount {
    pub fn new(cash_balance: Decimal) -> Self {
        Self {
            cash: Arc::new(RwLock::new(cash_balance)),
        }
    }

    pub fn set_cash_balance(&self, cash_balance: Decimal) {
        match self.cash.write() {
            Ok(mut cash) => *cash = cash_balance,
            Err(poisoned) => *poisoned.into_inner() = cash_balance,
        }
    }
}

impl Account for SharedAccount {
    fn cash_balance(&self) -> Decimal {
        match self.cash.read() {
            Ok(cash) => *cash,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
