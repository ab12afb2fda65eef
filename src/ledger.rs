//! Fungible balance ledger
//!
//! One concrete type backs the REP, Cash and outcome-claim ledgers of every
//! universe; the `LedgerKind` tag only decides which shortfall error a failed
//! debit reports.

use std::collections::BTreeMap;

use crate::error::{ExchangeError, Result};
use crate::types::{Address, LedgerKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLedger {
    kind: LedgerKind,
    balances: BTreeMap<Address, u128>,
    total_supply: u128,
}

impl TokenLedger {
    pub fn new(kind: LedgerKind) -> Self {
        Self {
            kind,
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Holders with a non-zero balance, in address order
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter()
    }

    /// Shortfall error for this ledger
    pub fn insufficient(&self) -> ExchangeError {
        match self.kind {
            LedgerKind::Stake => ExchangeError::InsufficientStake,
            LedgerKind::Collateral => ExchangeError::InsufficientCollateral,
            LedgerKind::OutcomeClaim => ExchangeError::InsufficientShares,
        }
    }

    pub fn ensure_balance(&self, holder: &Address, amount: u128) -> Result<()> {
        if self.balance_of(holder) < amount {
            Err(self.insufficient())
        } else {
            Ok(())
        }
    }

    /// Check a mint without applying it
    pub fn can_mint(&self, to: &Address, amount: u128) -> Result<()> {
        self.check_supply_room(amount)?;
        self.balance_of(to).checked_add(amount).ok_or(ExchangeError::Overflow)?;
        Ok(())
    }

    /// Room for `amount` more supply; no balance can then overflow either
    pub fn check_supply_room(&self, amount: u128) -> Result<()> {
        self.total_supply.checked_add(amount).ok_or(ExchangeError::Overflow)?;
        Ok(())
    }

    pub fn mint(&mut self, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let supply = self.total_supply.checked_add(amount).ok_or(ExchangeError::Overflow)?;
        let balance = self.balance_of(&to).checked_add(amount).ok_or(ExchangeError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.ensure_balance(&from, amount)?;
        self.debit(from, amount);
        // balance <= supply, so this cannot underflow
        self.total_supply -= amount;
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 || from == to {
            return self.ensure_balance(&from, amount);
        }
        self.ensure_balance(&from, amount)?;
        let credited = self.balance_of(&to).checked_add(amount).ok_or(ExchangeError::Overflow)?;
        self.debit(from, amount);
        self.balances.insert(to, credited);
        Ok(())
    }

    /// Remove a holder's whole balance, returning it
    pub fn burn_all(&mut self, from: &Address) -> u128 {
        let amount = self.balances.remove(from).unwrap_or(0);
        self.total_supply -= amount;
        amount
    }

    fn debit(&mut self, from: Address, amount: u128) {
        let remaining = self.balance_of(&from) - amount;
        if remaining == 0 {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, remaining);
        }
    }

    /// Sum of balances equals the recorded supply
    pub fn check_supply(&self) -> bool {
        let mut sum = 0u128;
        for balance in self.balances.values() {
            match sum.checked_add(*balance) {
                Some(s) => sum = s,
                None => return false,
            }
        }
        sum == self.total_supply
    }
}
