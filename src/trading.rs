//! Complete-set trading
//!
//! A complete set is one claim token for every outcome slot of a market. Sets
//! are minted against `price_scale` Cash, which the share-token escrow holds
//! until the set is sold back or the winning slot is claimed. ETH enters and
//! leaves through the caller's wallet at the universe's redemption price.

use log::debug;
use settlement_model::math;

use crate::error::{ExchangeError, Result};
use crate::exchange::Exchange;
use crate::types::{Address, MarketId, UniverseId};

impl Exchange {
    /// Mint `amount` complete sets to `recipient`, paid from the caller's wallet
    ///
    /// Returns the ETH paid.
    pub fn buy_complete_sets(
        &mut self,
        caller: Address,
        universe: UniverseId,
        market: MarketId,
        recipient: Address,
        amount: u128,
    ) -> Result<u128> {
        Self::check_caller(caller)?;
        Self::check_caller(recipient)?;
        if amount == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let u = self.live_universe(universe)?;
        let m = self.visible_market(universe, market)?;
        let (price, settlement) = self.effective_price(universe)?;

        let cash = math::mul(amount, self.config.price_scale)?;
        let eth = math::value_at_price_ceil(cash, price)?;
        let wallet = self.wallet_balance(&caller);
        if wallet < eth {
            return Err(ExchangeError::InsufficientCollateral);
        }
        let eth_balance = math::add(u.eth_balance, eth)?;
        u.cash.can_mint(&Address::SHARE_TOKEN, cash)?;
        for slot in m.slots() {
            if let Some(ledger) = u.share_ledger(market, slot) {
                ledger.can_mint(&recipient, amount)?;
            }
        }
        let num_slots = m.num_slots;

        if let Some(settlement) = settlement {
            self.apply_settlement(universe, settlement)?;
        }
        self.wallets.insert(caller, wallet - eth);
        let u = self.universe_mut(universe)?;
        u.eth_balance = eth_balance;
        u.cash.mint(Address::SHARE_TOKEN, cash)?;
        for slot in 0..num_slots {
            u.share_ledger_mut(market, slot).mint(recipient, amount)?;
        }
        debug!(
            "{} bought {} complete sets of market {} in universe {} for {} ETH",
            caller, amount, market, universe, eth
        );
        Ok(eth)
    }

    /// Burn `amount` complete sets held by the caller and pay `recipient`
    ///
    /// Returns the ETH paid.
    pub fn sell_complete_sets(
        &mut self,
        caller: Address,
        universe: UniverseId,
        market: MarketId,
        recipient: Address,
        amount: u128,
    ) -> Result<u128> {
        Self::check_caller(caller)?;
        Self::check_caller(recipient)?;
        if amount == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let u = self.live_universe(universe)?;
        let m = self.visible_market(universe, market)?;
        for slot in m.slots() {
            if u.share_balance(market, slot, &caller) < amount {
                return Err(ExchangeError::InsufficientShares);
            }
        }
        let cash = math::mul(amount, self.config.price_scale)?;
        u.cash.ensure_balance(&Address::SHARE_TOKEN, cash)?;

        let (price, settlement) = self.effective_price(universe)?;
        let eth = math::value_at_price(cash, price)?;
        if u.eth_balance < eth {
            return Err(ExchangeError::UniverseUnderfunded { universe });
        }
        let credited = self.credited_wallet(recipient, eth)?;
        let num_slots = m.num_slots;

        if let Some(settlement) = settlement {
            self.apply_settlement(universe, settlement)?;
        }
        let u = self.universe_mut(universe)?;
        for slot in 0..num_slots {
            u.share_ledger_mut(market, slot).burn(caller, amount)?;
        }
        u.cash.burn(Address::SHARE_TOKEN, cash)?;
        u.eth_balance -= eth;
        self.wallets.insert(recipient, credited);
        debug!(
            "{} sold {} complete sets of market {} in universe {} for {} ETH",
            caller, amount, market, universe, eth
        );
        Ok(eth)
    }

    /// Burn every claim token the holder has on a finalized market and pay
    /// the winning slot's value to `recipient`
    ///
    /// Losing slots burn for nothing. A holder with no claim tokens gets 0.
    pub fn claim_trading_proceeds(
        &mut self,
        caller: Address,
        universe: UniverseId,
        market: MarketId,
        holder: Address,
        recipient: Address,
    ) -> Result<u128> {
        Self::check_caller(caller)?;
        Self::check_caller(recipient)?;
        let u = self.live_universe(universe)?;
        let m = self.visible_market(universe, market)?;
        let winning = self.winning_outcome(u, m)?;
        if caller != holder {
            return Err(ExchangeError::Unauthorized);
        }

        let balances: Vec<u128> = m.slots().map(|slot| u.share_balance(market, slot, &holder)).collect();
        if balances.iter().all(|b| *b == 0) {
            return Ok(0);
        }
        let winning_balance = balances[winning as usize];
        let cash = math::mul(winning_balance, self.config.price_scale)?;
        u.cash.ensure_balance(&Address::SHARE_TOKEN, cash)?;

        let (price, settlement) = self.effective_price(universe)?;
        let eth = math::value_at_price(cash, price)?;
        if u.eth_balance < eth {
            return Err(ExchangeError::UniverseUnderfunded { universe });
        }
        let credited = self.credited_wallet(recipient, eth)?;
        let num_slots = m.num_slots;

        if let Some(settlement) = settlement {
            self.apply_settlement(universe, settlement)?;
        }
        let u = self.universe_mut(universe)?;
        for slot in 0..num_slots {
            u.share_ledger_mut(market, slot).burn_all(&holder);
        }
        u.cash.burn(Address::SHARE_TOKEN, cash)?;
        u.eth_balance -= eth;
        self.wallets.insert(recipient, credited);
        debug!(
            "{} claimed {} winning shares of market {} in universe {}: {} ETH to {}",
            holder, winning_balance, market, universe, eth, recipient
        );
        Ok(eth)
    }
}
