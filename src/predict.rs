use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ModelError;
use crate::ratings::{LeagueBaselines, RatingsSnapshot, RoleRates};

/// Goals per side enumerated in the scoreline grid (inclusive).
pub const MAX_GOALS: u32 = 10;

pub const FALLBACK_HOME_WIN_PCT: f64 = 33.0;
pub const FALLBACK_DRAW_PCT: f64 = 33.0;
pub const FALLBACK_AWAY_WIN_PCT: f64 = 34.0;
pub const FALLBACK_EXP_HOME: f64 = 1.5;
pub const FALLBACK_EXP_AWAY: f64 = 1.2;
pub const FALLBACK_OVER_2_5_PCT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionQuality {
    Model,
    /// A side had no rating for its venue role; the output is the fixed default.
    Fallback,
}

/// Percentages and expected goals, all rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub home_win_pct: f64,
    pub draw_pct: f64,
    pub away_win_pct: f64,
    pub expected_home_goals: f64,
    pub expected_away_goals: f64,
    pub over_2_5_pct: f64,
    pub quality: PredictionQuality,
}

impl PredictionResult {
    pub fn fallback() -> Self {
        Self {
            home_win_pct: FALLBACK_HOME_WIN_PCT,
            draw_pct: FALLBACK_DRAW_PCT,
            away_win_pct: FALLBACK_AWAY_WIN_PCT,
            expected_home_goals: FALLBACK_EXP_HOME,
            expected_away_goals: FALLBACK_EXP_AWAY,
            over_2_5_pct: FALLBACK_OVER_2_5_PCT,
            quality: PredictionQuality::Fallback,
        }
    }

    pub fn under_2_5_pct(&self) -> f64 {
        100.0 - self.over_2_5_pct
    }

    pub fn is_fallback(&self) -> bool {
        self.quality == PredictionQuality::Fallback
    }
}

/// Unrounded probabilities (0..=1) accumulated over the scoreline grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeProbs {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub over_2_5: f64,
}

pub fn predict(
    home_team: &str,
    away_team: &str,
    snapshot: &RatingsSnapshot,
) -> Result<PredictionResult, ModelError> {
    let (Some(home), Some(away)) = (
        snapshot.home_rates(home_team),
        snapshot.away_rates(away_team),
    ) else {
        debug!(home_team, away_team, "missing venue rating, using fallback");
        return Ok(PredictionResult::fallback());
    };

    let (exp_home, exp_away) = expected_goals(&home, &away, &snapshot.baselines)?;
    let probs = outcome_distribution(exp_home, exp_away, MAX_GOALS);

    Ok(PredictionResult {
        home_win_pct: round1(probs.home_win * 100.0),
        draw_pct: round1(probs.draw * 100.0),
        away_win_pct: round1(probs.away_win * 100.0),
        expected_home_goals: round1(exp_home),
        expected_away_goals: round1(exp_away),
        over_2_5_pct: round1(probs.over_2_5 * 100.0),
        quality: PredictionQuality::Model,
    })
}

/// Evaluates many fixtures against one snapshot; results keep input order.
pub fn predict_slate(
    snapshot: &RatingsSnapshot,
    fixtures: &[(String, String)],
) -> Vec<Result<PredictionResult, ModelError>> {
    fixtures
        .par_iter()
        .map(|(home, away)| predict(home, away, snapshot))
        .collect()
}

/// Attack strength times opponent defensive weakness, over the league mean for that side.
pub fn expected_goals(
    home: &RoleRates,
    away: &RoleRates,
    baselines: &LeagueBaselines,
) -> Result<(f64, f64), ModelError> {
    check_baseline("home", baselines.avg_home_goals)?;
    check_baseline("away", baselines.avg_away_goals)?;

    let exp_home = home.attack * away.defense / baselines.avg_home_goals;
    let exp_away = away.attack * home.defense / baselines.avg_away_goals;
    if !exp_home.is_finite() || !exp_away.is_finite() || exp_home < 0.0 || exp_away < 0.0 {
        return Err(ModelError::NonFiniteExpectedGoals {
            home: exp_home,
            away: exp_away,
        });
    }
    Ok((exp_home, exp_away))
}

fn check_baseline(side: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::ZeroBaseline { side, value })
    }
}

/// Independent Poisson scorelines over `0..=max_goals` per side.
///
/// Mass beyond `max_goals` is dropped, not renormalised, so the three outcome
/// probabilities sum to slightly less than one for high-scoring means.
pub fn outcome_distribution(exp_home: f64, exp_away: f64, max_goals: u32) -> OutcomeProbs {
    let pmf_h = poisson_pmf(exp_home, max_goals);
    let pmf_a = poisson_pmf(exp_away, max_goals);

    let mut out = OutcomeProbs {
        home_win: 0.0,
        draw: 0.0,
        away_win: 0.0,
        over_2_5: 0.0,
    };

    for (h, p_h) in pmf_h.iter().enumerate() {
        for (a, p_a) in pmf_a.iter().enumerate() {
            let p = p_h * p_a;
            if h > a {
                out.home_win += p;
            } else if h == a {
                out.draw += p;
            } else {
                out.away_win += p;
            }
            if h + a > 2 {
                out.over_2_5 += p;
            }
        }
    }
    out
}

/// P(X = k) for k in `0..=max_k`, built by recurrence from P(0) = e^-lambda.
pub fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let lambda = lambda.max(0.0);
    let mut out = Vec::with_capacity(max_k as usize + 1);
    let mut p = (-lambda).exp();
    out.push(p);
    for k in 1..=max_k {
        p *= lambda / k as f64;
        out.push(p);
    }
    out
}

/// One decimal, ties to even on the exact binary value (`round(x, 1)` semantics).
fn round1(v: f64) -> f64 {
    let scaled = v * 10.0;
    if scaled.fract().abs() != 0.5 {
        return scaled.round() / 10.0;
    }
    // The product landed on a half; its rounding error tells which side `v` is on.
    let err = v.mul_add(10.0, -scaled);
    let rounded = if err > 0.0 {
        scaled + 0.5
    } else if err < 0.0 {
        scaled - 0.5
    } else {
        scaled.round_ties_even()
    };
    rounded / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pmf_matches_closed_form() {
        let pmf = poisson_pmf(1.7, 6);
        let mut fact = 1.0;
        for (k, p) in pmf.iter().enumerate() {
            if k > 0 {
                fact *= k as f64;
            }
            let expected = (-1.7_f64).exp() * 1.7_f64.powi(k as i32) / fact;
            assert!((p - expected).abs() < 1e-12, "k={k}");
        }
    }

    #[test]
    fn pmf_of_zero_mean_is_a_point_mass() {
        let pmf = poisson_pmf(0.0, MAX_GOALS);
        assert_eq!(pmf.len(), 11);
        assert_eq!(pmf[0], 1.0);
        assert!(pmf[1..].iter().all(|p| *p == 0.0));
    }

    #[test]
    fn truncated_tail_is_not_renormalised() {
        let probs = outcome_distribution(6.0, 6.0, MAX_GOALS);
        let sum = probs.home_win + probs.draw + probs.away_win;
        assert!(sum < 0.96);
        assert!(sum > 0.90);
    }

    #[test]
    fn goalless_means_give_certain_draw() {
        let probs = outcome_distribution(0.0, 0.0, MAX_GOALS);
        assert_eq!(probs.draw, 1.0);
        assert_eq!(probs.over_2_5, 0.0);
    }

    #[test]
    fn zero_baseline_fails_explicitly() {
        let rates = RoleRates {
            attack: 1.0,
            defense: 1.0,
            matches: 1,
        };
        let baselines = LeagueBaselines {
            avg_home_goals: 0.0,
            avg_away_goals: 1.0,
            sample_matches: 1,
        };
        let err = expected_goals(&rates, &rates, &baselines).unwrap_err();
        assert_eq!(
            err,
            ModelError::ZeroBaseline {
                side: "home",
                value: 0.0
            }
        );
    }

    #[test]
    fn round1_keeps_one_decimal() {
        assert_eq!(round1(37.3555), 37.4);
        assert_eq!(round1(1.41428), 1.4);
        assert_eq!(round1(0.04), 0.0);
    }

    #[test]
    fn round1_breaks_exact_ties_to_even() {
        assert_eq!(round1(1.25), 1.2);
        assert_eq!(round1(0.25), 0.2);
        assert_eq!(round1(0.75), 0.8);
        assert_eq!(round1(-1.25), -1.2);
    }

    #[test]
    fn round1_uses_the_stored_value_not_the_literal() {
        // 0.15 is stored just below the midpoint, 0.45 just above.
        assert_eq!(round1(0.15), 0.1);
        assert_eq!(round1(0.45), 0.5);
        assert_eq!(round1(26.75), 26.8);
    }
}
