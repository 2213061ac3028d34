use rand::seq::SliceRandom;
use rand::Rng;

use crate::client::PriceIds;
use crate::error::{Error, Result};
use crate::market::Pool;

/// Picks `count` random pools whose reserve denoms both have a price id.
///
/// Candidates are ordered by id before shuffling so the same seed always yields the
/// same selection for the same pool set.
///
/// # Errors
/// `NotFound` when fewer than `count` pools qualify.
pub fn select_pools<R: Rng + ?Sized>(
    pools: Vec<Pool>,
    ids: &PriceIds,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Pool>> {
    let mut eligible: Vec<Pool> = pools
        .into_iter()
        .filter(|p| p.reserve_coin_denoms.iter().all(|d| ids.knows(d)))
        .collect();
    if eligible.len() < count {
        return Err(Error::NotFound(format!(
            "{count} priced pools (only {} available)",
            eligible.len()
        )));
    }

    eligible.sort_by_key(|p| p.id);
    eligible.shuffle(rng);
    eligible.truncate(count);
    Ok(eligible)
}
