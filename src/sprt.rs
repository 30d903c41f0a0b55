//! Sequential Probability Ratio Test over penta-nomial (pair-scored) results: decides,
//! after every completed pair of games, whether there's enough evidence to stop the
//! match early because one hypothesis (the engine is at most `elo0`, or at least `elo1`
//! stronger) has become overwhelmingly likely.

use crate::stats::Pentanomial;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SprtDecision {
    Continue,
    AcceptH0,
    AcceptH1,
}

#[derive(Debug, Clone, Copy)]
pub struct SprtParams {
    pub elo0: f64,
    pub elo1: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl SprtParams {
    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        let lower = (self.beta / (1.0 - self.alpha)).ln();
        let upper = ((1.0 - self.beta) / self.alpha).ln();
        (lower, upper)
    }
}

/// Converts an Elo difference to the expected per-game score of the stronger side
/// under the logistic model, the same mapping `elo.rs` inverts via `perc_to_elo_diff`.
#[must_use]
fn elo_to_score(elo: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-elo / 400.0))
}

/// Mean and variance of the per-game score implied by a penta-nomial histogram. Bucket
/// `i` (0..=4) represents a pair's combined score out of 2 games in quarter-point
/// units, so `i as f64 / 4.0` is that bucket's average per-game score.
#[must_use]
fn pentanomial_mean_variance(pent: &Pentanomial) -> (f64, f64) {
    let total = pent.total_pairs() as f64;
    if total == 0.0 {
        return (0.5, 0.0);
    }
    let mean = pent.buckets.iter().enumerate().map(|(i, &c)| c as f64 * (i as f64 / 4.0)).sum::<f64>() / total;
    let variance = pent.buckets.iter().enumerate().map(|(i, &c)| c as f64 * (i as f64 / 4.0 - mean).powi(2)).sum::<f64>() / total;
    (mean, variance)
}

/// The (simplified, normal-approximation) generalized log-likelihood ratio comparing
/// the `elo1` hypothesis against `elo0`, scaled by the number of pairs played.
#[must_use]
pub fn log_likelihood_ratio(pent: &Pentanomial, params: &SprtParams) -> f64 {
    let total = pent.total_pairs() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let (mean, variance) = pentanomial_mean_variance(pent);
    let t0 = elo_to_score(params.elo0);
    let t1 = elo_to_score(params.elo1);
    if variance <= 0.0 {
        // Every pair landed in the same bucket: there's no uncertainty left to model,
        // so the sign of the result relative to the midpoint settles it outright.
        return match (mean - (t0 + t1) / 2.0).partial_cmp(&0.0) {
            Some(std::cmp::Ordering::Greater) => f64::INFINITY,
            Some(std::cmp::Ordering::Less) => f64::NEG_INFINITY,
            _ => 0.0,
        };
    }
    (t1 - t0) / variance * (mean - (t0 + t1) / 2.0) * total
}

#[must_use]
pub fn decide(pent: &Pentanomial, params: &SprtParams) -> SprtDecision {
    let (lower, upper) = params.bounds();
    let llr = log_likelihood_ratio(pent, params);
    if llr <= lower {
        SprtDecision::AcceptH0
    } else if llr >= upper {
        SprtDecision::AcceptH1
    } else {
        SprtDecision::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::GameResult;

    fn params() -> SprtParams {
        SprtParams { elo0: 0.0, elo1: 10.0, alpha: 0.05, beta: 0.05 }
    }

    fn pent_from_pairs(pairs: &[(GameResult, GameResult)]) -> Pentanomial {
        let mut pent = Pentanomial::default();
        for &(a, b) in pairs {
            pent.record_pair(a, b);
        }
        pent
    }

    #[test]
    fn no_games_means_continue() {
        let pent = Pentanomial::default();
        assert_eq!(decide(&pent, &params()), SprtDecision::Continue);
    }

    #[test]
    fn all_draws_settle_on_h0_not_h1() {
        // An unbroken string of draws is consistent with the elo0 hypothesis (equal
        // strength), not elo1 (strictly stronger), so H0 wins decisively.
        let pairs: Vec<_> = (0..200).map(|_| (GameResult::Draw, GameResult::Draw)).collect();
        let pent = pent_from_pairs(&pairs);
        assert_eq!(decide(&pent, &params()), SprtDecision::AcceptH0);
    }

    #[test]
    fn a_few_games_are_not_enough_to_decide() {
        let pairs = vec![(GameResult::Win, GameResult::Win), (GameResult::Loss, GameResult::Loss)];
        let pent = pent_from_pairs(&pairs);
        assert_eq!(decide(&pent, &params()), SprtDecision::Continue);
    }

    #[test]
    fn overwhelming_wins_accept_h1() {
        let pairs: Vec<_> = (0..500).map(|_| (GameResult::Win, GameResult::Win)).collect();
        let pent = pent_from_pairs(&pairs);
        assert_eq!(decide(&pent, &params()), SprtDecision::AcceptH1);
    }

    #[test]
    fn overwhelming_losses_accept_h0() {
        let pairs: Vec<_> = (0..500).map(|_| (GameResult::Loss, GameResult::Loss)).collect();
        let pent = pent_from_pairs(&pairs);
        assert_eq!(decide(&pent, &params()), SprtDecision::AcceptH0);
    }
}
