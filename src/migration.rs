//! Post-fork migration
//!
//! Cash and claim tokens are copied in full into every child: until one
//! universe wins, each of them honours every claim. REP is different. A holder
//! picks one child, and the REP leaves the parent through the burn address
//! together with its pro-rata share of the parent's ETH.

use log::info;
use settlement_model::math;

use crate::error::{ExchangeError, Result};
use crate::exchange::Exchange;
use crate::types::{Address, OutcomeSlot, TokenId, UniverseId};

impl Exchange {
    /// Copy every Cash balance of a forked universe into each child
    ///
    /// A child that has itself forked and migrated its Cash passes the copy
    /// on to its children. Returns the Cash supply moved, 0 once already migrated.
    pub fn migrate_cash(&mut self, universe: UniverseId) -> Result<u128> {
        let parent = self.forked_universe(universe)?;
        if parent.cash_migrated {
            return Ok(0);
        }
        let balances: Vec<(Address, u128)> = parent.cash.holders().map(|(h, v)| (*h, *v)).collect();
        let moved = parent.cash.total_supply();
        let children = self.migration_targets(universe, |c| c.cash_migrated)?;
        for &child in &children {
            self.universe(child)?.cash.check_supply_room(moved)?;
        }

        for &child in &children {
            let ledger = &mut self.universe_mut(child)?.cash;
            for (holder, amount) in &balances {
                ledger.mint(*holder, *amount)?;
            }
        }
        let parent = self.universe_mut(universe)?;
        for (holder, _) in &balances {
            parent.cash.burn_all(holder);
        }
        parent.cash_migrated = true;
        info!(
            "migrated {} Cash from universe {} into each of {:?}",
            moved, universe, children
        );
        Ok(moved)
    }

    /// Copy every holder's balance of one claim token into each child
    ///
    /// Returns the token supply moved, 0 once already migrated.
    pub fn migrate_share_token(&mut self, token: TokenId) -> Result<u128> {
        let TokenId { universe, market, outcome } = token;
        let parent = self.forked_universe(universe)?;
        let m = self.visible_market(universe, market)?;
        settlement_model::check_outcome(outcome, m.num_slots)?;
        if parent.share_token_migrated(market, outcome) {
            return Ok(0);
        }
        let balances: Vec<(Address, u128)> = parent
            .share_ledger(market, outcome)
            .map(|ledger| ledger.holders().map(|(h, v)| (*h, *v)).collect())
            .unwrap_or_default();
        let moved = balances.iter().try_fold(0u128, |acc, (_, v)| math::add(acc, *v))?;
        let children = self.migration_targets(universe, |c| c.share_token_migrated(market, outcome))?;
        for &child in &children {
            if let Some(ledger) = self.universe(child)?.share_ledger(market, outcome) {
                ledger.check_supply_room(moved)?;
            }
        }

        for &child in &children {
            let ledger = self.universe_mut(child)?.share_ledger_mut(market, outcome);
            for (holder, amount) in &balances {
                ledger.mint(*holder, *amount)?;
            }
        }
        let parent = self.universe_mut(universe)?;
        if let Some(ledger) = parent.shares.get_mut(&(market, outcome)) {
            for (holder, _) in &balances {
                ledger.burn_all(holder);
            }
        }
        parent.migrated_share_tokens.insert((market, outcome));
        info!("migrated {} of claim token {} into {:?}", moved, token, children);
        Ok(moved)
    }

    /// Move REP into the child for `slot`, taking its share of parent ETH
    ///
    /// The ETH share is computed against the REP outstanding just before this
    /// call's burn. Returns the ETH moved.
    pub fn migrate_rep(
        &mut self,
        caller: Address,
        parent: UniverseId,
        amount: u128,
        slot: OutcomeSlot,
    ) -> Result<u128> {
        Self::check_caller(caller)?;
        let child_id = self.child_of(parent, slot)?;
        let p = self.universe(parent)?;
        let fork = p.fork.ok_or(ExchangeError::UniverseNotForked(parent))?;
        let phase = settlement_model::migration_phase(fork.forked_at, self.config.migration_period, self.now);
        settlement_model::check_migration_open(phase)?;
        if amount == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        p.reputation.ensure_balance(&caller, amount)?;
        let outstanding = p.rep_outstanding()?;
        let eth = settlement_model::rep_migration_eth(amount, p.eth_balance, outstanding)?;
        let child = self.universe(child_id)?;
        child.reputation.can_mint(&caller, amount)?;
        let child_eth = math::add(child.eth_balance, eth)?;

        let p = self.universe_mut(parent)?;
        p.reputation.transfer(caller, Address::BURN, amount)?;
        p.eth_balance -= eth;
        let child = self.universe_mut(child_id)?;
        child.reputation.mint(caller, amount)?;
        child.eth_balance = child_eth;
        info!(
            "{} migrated {} REP from universe {} to {} with {} ETH",
            caller, amount, parent, child_id, eth
        );
        Ok(eth)
    }

    /// Burn the caller's remaining parent REP for its share of parent ETH
    ///
    /// Only after the migration window closes. Returns the ETH paid.
    pub fn cash_in_rep(&mut self, caller: Address, parent: UniverseId) -> Result<u128> {
        Self::check_caller(caller)?;
        let p = self.forked_universe(parent)?;
        let fork = p.fork.ok_or(ExchangeError::UniverseNotForked(parent))?;
        let phase = settlement_model::migration_phase(fork.forked_at, self.config.migration_period, self.now);
        settlement_model::check_migration_closed(phase)?;
        let balance = p.reputation.balance_of(&caller);
        if balance == 0 {
            return Err(ExchangeError::NothingToCashIn);
        }
        let outstanding = p.rep_outstanding()?;
        let payout = settlement_model::cash_in_payout(balance, p.eth_balance, outstanding)?;
        let credited = self.credited_wallet(caller, payout)?;

        let p = self.universe_mut(parent)?;
        p.reputation.transfer(caller, Address::BURN, balance)?;
        p.eth_balance -= payout;
        self.wallets.insert(caller, credited);
        info!(
            "{} cashed in {} REP from universe {} for {} ETH",
            caller, balance, parent, payout
        );
        Ok(payout)
    }
}
