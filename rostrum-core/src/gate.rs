//! The deposit gate: decides whether a bidder may submit bids into an
//! auction, without mutating any auction state.

use crate::models::{Auction, BidderId, Eligibility};
use crate::ports::DepositRepository;

/// Check whether `user_id` may bid in `auction`.
///
/// An auction with no deposit requirement admits everyone. Otherwise the
/// bidder needs a verified deposit covering the requirement, either
/// earmarked for this auction or wallet-wide. Ineligibility carries the
/// required amount so the caller can present a funding flow rather than a
/// generic error.
pub async fn check_eligibility<T: DepositRepository>(
    repo: &T,
    user_id: BidderId,
    auction: &Auction,
) -> Result<Eligibility, T::Error> {
    let Some(min) = auction.min_deposit_cents else {
        return Ok(Eligibility {
            eligible: true,
            min_deposit_cents: None,
        });
    };

    let cover = repo.verified_cover(user_id, auction.auction_id).await?;
    Ok(Eligibility {
        eligible: cover >= min,
        min_deposit_cents: Some(min),
    })
}
