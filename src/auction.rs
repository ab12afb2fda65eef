//! Post-fork re-capitalization auctions
//!
//! Each child universe runs one auction, starting when its parent's REP
//! migration window closes. Bidders pay ETH into the child and receive newly
//! minted child REP at a rate that rises every second. The deficit and the REP
//! basis are captured on first touch. An auction that expires short of its
//! deficit writes the shortfall off against the child's Cash redemption price.

use log::{debug, info, warn};
use settlement_model::{math, AuctionPhase};

use crate::error::{ExchangeError, Result};
use crate::exchange::Exchange;
use crate::types::{Address, OutcomeSlot, Timestamp, UniverseId};
use crate::universe::Universe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Auction {
    pub start: Timestamp,
    /// ETH deficit at first touch
    pub deficit: u128,
    /// REP offered for the whole deficit is scaled from this
    pub basis: u128,
    pub eth_raised: u128,
    pub rep_minted: u128,
    pub settled: bool,
}

impl Auction {
    pub fn remaining(&self) -> u128 {
        self.deficit.saturating_sub(self.eth_raised)
    }

    pub fn is_filled(&self) -> bool {
        self.eth_raised >= self.deficit
    }
}

/// Settlement computed but not yet written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Settlement {
    pub auction: Auction,
    pub price: u128,
}

impl Exchange {
    /// Auction state of the child for `slot`, if it has been touched
    pub fn auction(&self, parent: UniverseId, slot: OutcomeSlot) -> Result<Option<&Auction>> {
        let child = self.child_of(parent, slot)?;
        Ok(self.universe(child)?.auction.as_ref())
    }

    /// Buy newly minted child REP with ETH from the caller's wallet
    ///
    /// The bid is capped at the remaining deficit. Returns the REP minted.
    pub fn buy_from_auction(
        &mut self,
        caller: Address,
        parent: UniverseId,
        slot: OutcomeSlot,
        eth_amount: u128,
    ) -> Result<u128> {
        Self::check_caller(caller)?;
        if eth_amount == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let child_id = self.child_of(parent, slot)?;
        let child = self.live_universe(child_id)?;
        let elapsed = settlement_model::check_bidding(self.auction_phase(child)?)?;
        let mut auction = self.auction_state(child)?;
        if auction.is_filled() {
            return Err(ExchangeError::AuctionFilled);
        }

        let eth = eth_amount.min(auction.remaining());
        let wallet = self.wallet_balance(&caller);
        if wallet < eth {
            return Err(ExchangeError::InsufficientEth);
        }
        let offered = settlement_model::rep_offered(
            auction.basis,
            self.config.auction_scale,
            elapsed,
            self.config.auction_duration,
        )?;
        let rep = settlement_model::rep_for_eth(offered, eth, auction.deficit)?;
        child.reputation.can_mint(&caller, rep)?;
        let eth_balance = math::add(child.eth_balance, eth)?;
        auction.eth_raised = math::add(auction.eth_raised, eth)?;
        auction.rep_minted = math::add(auction.rep_minted, rep)?;

        self.wallets.insert(caller, wallet - eth);
        let child = self.universe_mut(child_id)?;
        child.reputation.mint(caller, rep)?;
        child.eth_balance = eth_balance;
        child.auction = Some(auction);
        debug!(
            "auction bid in universe {}: {} ETH for {} REP at t+{}s ({} of {} raised)",
            child_id, eth, rep, elapsed, auction.eth_raised, auction.deficit
        );
        if auction.is_filled() {
            info!("auction in universe {} filled with {} ETH", child_id, auction.eth_raised);
        }
        Ok(rep)
    }

    /// Close an expired or filled auction
    ///
    /// An under-filled auction lowers the child's redemption price by the
    /// unfilled share of its liabilities. Calling again returns the same price.
    pub fn settle_auction(&mut self, parent: UniverseId, slot: OutcomeSlot) -> Result<u128> {
        let child_id = self.child_of(parent, slot)?;
        let child = self.universe(child_id)?;
        if let Some(auction) = &child.auction {
            if auction.settled {
                return Ok(child.redemption_price);
            }
        }
        let settlement = match self.auction_phase(child)? {
            AuctionPhase::NotStarted => return Err(ExchangeError::AuctionNotStarted),
            AuctionPhase::Running { .. } => {
                let auction = self.auction_state(child)?;
                if !auction.is_filled() {
                    return Err(ExchangeError::AuctionStillRunning);
                }
                self.settlement(child, auction)?
            }
            AuctionPhase::Expired => self.settlement(child, self.auction_state(child)?)?,
        };
        self.apply_settlement(child_id, settlement)?;
        Ok(settlement.price)
    }

    /// Settlement owed by a universe whose auction expired unsettled
    pub(crate) fn pending_settlement(&self, universe: UniverseId) -> Result<Option<Settlement>> {
        let u = self.universe(universe)?;
        if u.parent.is_none() || u.auction.map_or(false, |a| a.settled) {
            return Ok(None);
        }
        match self.auction_phase(u)? {
            AuctionPhase::Expired => Ok(Some(self.settlement(u, self.auction_state(u)?)?)),
            _ => Ok(None),
        }
    }

    pub(crate) fn apply_settlement(&mut self, universe: UniverseId, settlement: Settlement) -> Result<()> {
        let u = self.universe_mut(universe)?;
        let previous = u.redemption_price;
        u.redemption_price = settlement.price;
        u.auction = Some(settlement.auction);
        if settlement.price < previous {
            warn!(
                "auction in universe {} settled {} ETH short; redemption price {} -> {}",
                universe,
                settlement.auction.remaining(),
                previous,
                settlement.price
            );
        } else {
            info!("auction in universe {} settled at full price", universe);
        }
        Ok(())
    }

    /// Redemption price with any pending settlement applied
    pub(crate) fn effective_price(&self, universe: UniverseId) -> Result<(u128, Option<Settlement>)> {
        let pending = self.pending_settlement(universe)?;
        let price = match &pending {
            Some(s) => s.price,
            None => self.universe(universe)?.redemption_price,
        };
        Ok((price, pending))
    }

    fn settlement(&self, child: &Universe, mut auction: Auction) -> Result<Settlement> {
        let price = child.redemption_price;
        let liabilities = self.liabilities(child, price)?;
        let price = settlement_model::devalued_price(price, liabilities, auction.remaining())?;
        auction.settled = true;
        Ok(Settlement { auction, price })
    }

    fn auction_phase(&self, child: &Universe) -> Result<AuctionPhase> {
        let start = self.auction_start(child)?;
        Ok(settlement_model::auction_phase(
            start,
            self.config.auction_duration,
            self.now,
        ))
    }

    fn auction_start(&self, child: &Universe) -> Result<Timestamp> {
        let parent = child.parent.ok_or(ExchangeError::UniverseNotForked(child.id))?;
        let fork = self
            .universe(parent)?
            .fork
            .ok_or(ExchangeError::UniverseNotForked(parent))?;
        Ok(settlement_model::migration_deadline(
            fork.forked_at,
            self.config.migration_period,
        ))
    }

    /// Existing auction, or the snapshot the first touch would record
    fn auction_state(&self, child: &Universe) -> Result<Auction> {
        if let Some(auction) = child.auction {
            return Ok(auction);
        }
        let deficit = self.liabilities(child, child.redemption_price)?.saturating_sub(child.eth_balance);
        let mut basis = child.reputation.total_supply();
        if basis == 0 {
            let parent = child.parent.ok_or(ExchangeError::UniverseNotForked(child.id))?;
            let fork = self
                .universe(parent)?
                .fork
                .ok_or(ExchangeError::UniverseNotForked(parent))?;
            basis = settlement_model::rep_equivalent(deficit, fork.rep_outstanding_at_fork, fork.eth_at_fork)?;
        }
        Ok(Auction {
            start: self.auction_start(child)?,
            deficit,
            basis,
            eth_raised: 0,
            rep_minted: 0,
            settled: false,
        })
    }
}
