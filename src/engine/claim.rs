// 11.8 engine/claim.rs: releasing matured locked balances.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{BalancesClaimedEvent, EventPayload};
use crate::math;
use crate::types::{AccountId, Amount, U256};

impl Engine {
    /// Pays out every matured locked balance with index in `[start, end)`. Returns the total.
    ///
    /// `end` is clamped to the number of locked balances. Unmatured entries stay
    /// where they are, so a claim never reorders what is left.
    pub fn claim_balance(&mut self, provider: AccountId, start: usize, end: usize) -> Result<Amount, EngineError> {
        self.atomic("claim_balance", |engine| {
            let now = engine.current_time;
            let end = end.min(engine.state.store.locked_balance_count(provider));

            let mut total = U256::zero();
            let mut count = 0usize;
            // back to front so removals don't shift indexes still to be visited
            for index in (start..end).rev() {
                let claimable = engine
                    .state
                    .store
                    .locked_balance(provider, index)
                    .is_some_and(|balance| balance.is_claimable(now));
                if !claimable {
                    continue;
                }
                let balance = engine.state.store.remove_locked_balance(provider, index)?;
                total = math::add(total, balance.amount)?;
                count += 1;
            }

            if !total.is_zero() {
                let (network_token, wallet) = (engine.config.network_token, engine.config.wallet);
                engine.state.ledger.transfer(network_token, wallet, provider, total)?;
                engine.record(EventPayload::BalancesClaimed(BalancesClaimedEvent {
                    provider,
                    count,
                    amount: total,
                }));
                tracing::info!(%provider, count, amount = %total, "locked balances claimed");
            }
            Ok(total)
        })
    }
}
