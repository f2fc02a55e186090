//! Poisson match-outcome model for soccer.
//!
//! [`ratings::build_ratings`] turns historical results into per-team venue
//! rates and league baselines; [`predict::predict`] turns two team names and
//! that snapshot into win/draw/loss, expected goals and over/under 2.5.

pub mod config;
pub mod dataset;
pub mod error;
pub mod history;
pub mod http_cache;
pub mod logging;
pub mod predict;
pub mod ratings;
pub mod snapshot;
pub mod sources;

pub use error::ModelError;
pub use predict::{PredictionQuality, PredictionResult, predict};
pub use ratings::{
    LeagueBaselines, MatchRecord, RatingsSnapshot, RoleRates, TeamRatings, build_ratings,
};
pub use snapshot::SharedRatings;
