use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ModelError;

/// One finished match. Goals are full-time counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
}

impl MatchRecord {
    pub fn new(
        date: Option<NaiveDate>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_goals: u32,
        away_goals: u32,
    ) -> Self {
        Self {
            date,
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_goals,
            away_goals,
        }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }
}

/// Mean goals scored (`attack`) and conceded (`defense`) in one venue role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleRates {
    pub attack: f64,
    pub defense: f64,
    pub matches: usize,
}

/// A role with zero appearances has no rate at all (`None`), never a zero rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRatings {
    pub home: Option<RoleRates>,
    pub away: Option<RoleRates>,
}

impl TeamRatings {
    pub fn home_attack(&self) -> Option<f64> {
        self.home.map(|r| r.attack)
    }

    pub fn home_defense(&self) -> Option<f64> {
        self.home.map(|r| r.defense)
    }

    pub fn away_attack(&self) -> Option<f64> {
        self.away.map(|r| r.attack)
    }

    pub fn away_defense(&self) -> Option<f64> {
        self.away.map(|r| r.defense)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueBaselines {
    pub avg_home_goals: f64,
    pub avg_away_goals: f64,
    pub sample_matches: usize,
}

/// Immutable output of [`build_ratings`]. Rebuild and swap, never patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsSnapshot {
    pub teams: HashMap<String, TeamRatings>,
    pub baselines: LeagueBaselines,
}

impl RatingsSnapshot {
    pub fn team(&self, name: &str) -> Option<&TeamRatings> {
        self.teams.get(name)
    }

    pub fn home_rates(&self, name: &str) -> Option<RoleRates> {
        self.teams.get(name).and_then(|t| t.home)
    }

    pub fn away_rates(&self, name: &str) -> Option<RoleRates> {
        self.teams.get(name).and_then(|t| t.away)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RoleAccumulator {
    scored: u64,
    conceded: u64,
    n: usize,
}

impl RoleAccumulator {
    fn push(&mut self, scored: u32, conceded: u32) {
        self.scored += u64::from(scored);
        self.conceded += u64::from(conceded);
        self.n += 1;
    }

    fn finish(self) -> Option<RoleRates> {
        if self.n == 0 {
            return None;
        }
        let n = self.n as f64;
        Some(RoleRates {
            attack: self.scored as f64 / n,
            defense: self.conceded as f64 / n,
            matches: self.n,
        })
    }
}

/// Per-team venue rates plus league-wide goal means.
///
/// Sums are integer so the result does not depend on record order.
pub fn build_ratings(matches: &[MatchRecord]) -> Result<RatingsSnapshot, ModelError> {
    if matches.is_empty() {
        return Err(ModelError::EmptyCorpus);
    }

    let mut home_acc: HashMap<&str, RoleAccumulator> = HashMap::new();
    let mut away_acc: HashMap<&str, RoleAccumulator> = HashMap::new();
    let mut total_home = 0u64;
    let mut total_away = 0u64;

    for m in matches {
        home_acc
            .entry(m.home_team.as_str())
            .or_default()
            .push(m.home_goals, m.away_goals);
        away_acc
            .entry(m.away_team.as_str())
            .or_default()
            .push(m.away_goals, m.home_goals);
        total_home += u64::from(m.home_goals);
        total_away += u64::from(m.away_goals);
    }

    let mut teams: HashMap<String, TeamRatings> = HashMap::new();
    for (name, acc) in home_acc {
        teams.entry(name.to_string()).or_default().home = acc.finish();
    }
    for (name, acc) in away_acc {
        teams.entry(name.to_string()).or_default().away = acc.finish();
    }

    let n = matches.len() as f64;
    let baselines = LeagueBaselines {
        avg_home_goals: total_home as f64 / n,
        avg_away_goals: total_away as f64 / n,
        sample_matches: matches.len(),
    };
    debug!(
        teams = teams.len(),
        matches = matches.len(),
        avg_home = baselines.avg_home_goals,
        avg_away = baselines.avg_away_goals,
        "built team ratings"
    );

    Ok(RatingsSnapshot { teams, baselines })
}
