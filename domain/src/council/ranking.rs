//! Rank aggregation and synthesizer selection.
//!
//! Pure functions over the final collected sets. The outcome depends only on
//! the candidate order (domain-profile order) and the multiset of reviews,
//! never on the order in which concurrent reviews arrived: ranks are summed
//! as integers, so permuting the review list cannot change any mean.

use super::value_objects::PeerReview;
use std::cmp::Ordering;

/// Aggregated peer rank for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAggregate {
    pub provider: String,
    pub rank_sum: u64,
    pub review_count: u64,
}

impl RankAggregate {
    /// Arithmetic mean of received ranks; `None` when never reviewed
    pub fn mean(&self) -> Option<f64> {
        if self.review_count == 0 {
            None
        } else {
            Some(self.rank_sum as f64 / self.review_count as f64)
        }
    }

    pub fn is_ranked(&self) -> bool {
        self.review_count > 0
    }

    /// Compare by mean rank, lower is better; unranked sorts after ranked.
    ///
    /// Means are compared exactly by cross-multiplying the integer sums.
    fn cmp_mean(&self, other: &Self) -> Ordering {
        match (self.is_ranked(), other.is_ranked()) {
            (true, true) => (u128::from(self.rank_sum) * u128::from(other.review_count))
                .cmp(&(u128::from(other.rank_sum) * u128::from(self.review_count))),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }
}

/// Aggregate the reviews each candidate received.
///
/// Output is in candidate order. Reviews whose target is not a candidate, and
/// self-reviews, are ignored.
pub fn aggregate_ranks<S: AsRef<str>>(candidates: &[S], reviews: &[PeerReview]) -> Vec<RankAggregate> {
    candidates
        .iter()
        .map(|candidate| {
            let candidate = candidate.as_ref();
            let (rank_sum, review_count) = reviews
                .iter()
                .filter(|r| r.target == candidate && r.reviewer != candidate)
                .fold((0u64, 0u64), |(sum, count), r| {
                    (sum + u64::from(r.rank), count + 1)
                });
            RankAggregate {
                provider: candidate.to_string(),
                rank_sum,
                review_count,
            }
        })
        .collect()
}

/// Choose the stage-3 synthesizer.
///
/// `candidates` are the providers with a succeeded stage-1 answer, in
/// domain-profile order. The lowest mean rank wins; ties go to the earlier
/// candidate. A candidate with no reviews is treated as worse than any
/// reviewed candidate, so with no reviews at all the first candidate wins.
/// Returns `None` only when there are no candidates.
pub fn select_synthesizer<S: AsRef<str>>(candidates: &[S], reviews: &[PeerReview]) -> Option<String> {
    aggregate_ranks(candidates, reviews)
        .into_iter()
        .enumerate()
        // min_by keeps the first of equal elements, so ties resolve to profile order
        .min_by(|(ia, a), (ib, b)| a.cmp_mean(b).then(ia.cmp(ib)))
        .map(|(_, aggregate)| aggregate.provider)
}
