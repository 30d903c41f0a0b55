//! Elo difference, confidence interval and likelihood-of-superiority estimation from
//! win/loss/draw counts, following the same closed-form approximations as the engine
//! match runners this crate's tournament core is modeled on.

use std::f64::consts::PI;

/// Winitzki's rational approximation to the inverse error function; accurate to about
/// 1.3e-4 relative error, which is plenty for Elo display purposes.
#[must_use]
fn inverse_error(x: f64) -> f64 {
    let a = 8.0 * (PI - 3.0) / (3.0 * PI * (4.0 - PI));
    let ln_term = (1.0 - x * x).ln();
    let term1 = 2.0 / (PI * a) + ln_term / 2.0;
    let term2 = ln_term / a;
    x.signum() * ((term1 * term1 - term2).sqrt() - term1).sqrt()
}

#[must_use]
fn inverse_normal_cdf(p: f64) -> f64 {
    2.0_f64.sqrt() * inverse_error(2.0 * p - 1.0)
}

#[must_use]
fn perc_to_elo_diff(p: f64) -> f64 {
    -400.0 * (1.0 / p - 1.0).log10()
}

/// A three-outcome score tally (wins, losses, draws) from one side's perspective.
#[derive(Debug, Clone, Copy, Default)]
pub struct Elo {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
}

impl Elo {
    #[must_use]
    pub fn new(wins: u64, losses: u64, draws: u64) -> Self {
        Self { wins, losses, draws }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.wins + self.losses + self.draws
    }

    #[must_use]
    pub fn score_ratio(&self) -> f64 {
        if self.total() == 0 {
            return 0.5;
        }
        (self.wins as f64 + 0.5 * self.draws as f64) / self.total() as f64
    }

    #[must_use]
    pub fn draw_ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.draws as f64 / self.total() as f64
        }
    }

    /// Standard error of the score ratio, accounting for draws being a distinct
    /// outcome bucket rather than two independent coin flips.
    #[must_use]
    pub fn score_variance(&self) -> f64 {
        let n = self.total() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let p_win = self.wins as f64 / n;
        let p_loss = self.losses as f64 / n;
        let p_draw = self.draws as f64 / n;
        let mean = p_win + 0.5 * p_draw;
        (p_win * (1.0 - mean).powi(2) + p_draw * (0.5 - mean).powi(2) + p_loss * (0.0 - mean).powi(2)) / n
    }

    /// The point estimate plus 95% confidence half-width on the Elo difference, i.e.
    /// `(diff, error)` such that the true value is believed to lie in `diff +/- error`.
    #[must_use]
    pub fn diff_and_error(&self) -> (f64, f64) {
        let p = self.score_ratio();
        if p <= 0.0 || p >= 1.0 {
            return (if p >= 1.0 { f64::INFINITY } else { f64::NEG_INFINITY }, 0.0);
        }
        let diff = perc_to_elo_diff(p);
        let variance = self.score_variance();
        let std_dev = variance.sqrt();
        let confidence_p = 0.95;
        let min_confidence = (p - inverse_normal_cdf(0.5 + confidence_p / 2.0) * std_dev).clamp(1e-9, 1.0 - 1e-9);
        let max_confidence = (p + inverse_normal_cdf(0.5 + confidence_p / 2.0) * std_dev).clamp(1e-9, 1.0 - 1e-9);
        let error = (perc_to_elo_diff(max_confidence) - perc_to_elo_diff(min_confidence)) / 2.0;
        (diff, error)
    }

    /// Renders as `"inf +/- 0.00"` when one side has swept, otherwise `"D.DD +/- E.EE"`.
    #[must_use]
    pub fn format(&self) -> String {
        let (diff, error) = self.diff_and_error();
        if diff.is_infinite() {
            format!("{} +/- 0.00", if diff > 0.0 { "inf" } else { "-inf" })
        } else {
            format!("{diff:.2} +/- {error:.2}")
        }
    }

    /// Likelihood that the side with more wins is actually stronger, as a percentage
    /// like `99.89`, ignoring draws entirely (they carry no information on which side
    /// is better, only on how decisive the games are).
    #[must_use]
    pub fn likelihood_of_superiority(&self) -> f64 {
        let total = (self.wins + self.losses) as f64;
        if total == 0.0 {
            return 50.0;
        }
        let z = (self.wins as f64 - self.losses as f64) / (2.0 * total).sqrt();
        100.0 * (0.5 + 0.5 * erf(z))
    }

    #[must_use]
    pub fn format_los(&self) -> String {
        format!("{:.2} %", self.likelihood_of_superiority())
    }
}

/// Abramowitz & Stegun 7.1.26 approximation to the error function, used for LOS since
/// it needs the forward `erf`, not the inverse.
#[must_use]
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();
    let a1 = 0.254_829_592;
    let a2 = -0.284_496_736;
    let a3 = 1.421_413_741;
    let a4 = -1.453_152_027;
    let a5 = 1.061_405_429;
    let p = 0.327_591_1;
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_wins_is_infinite_elo() {
        let elo = Elo::new(100, 0, 0);
        assert_eq!(elo.format(), "inf +/- 0.00");
    }

    #[test]
    fn even_score_is_zero_elo_with_positive_error() {
        let elo = Elo::new(50, 50, 0);
        let (diff, error) = elo.diff_and_error();
        assert!(diff.abs() < 1e-6, "diff should be ~0, got {diff}");
        assert!(error > 0.0);
    }

    #[test]
    fn lopsided_score_has_high_los() {
        let elo = Elo::new(10, 0, 0);
        let los = elo.likelihood_of_superiority();
        assert!(los > 99.0, "expected LOS > 99%, got {los}");
    }

    #[test]
    fn even_score_has_fifty_percent_los() {
        let elo = Elo::new(20, 20, 0);
        assert!((elo.likelihood_of_superiority() - 50.0).abs() < 1e-6);
    }
}
