use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("no usable match data: the corpus is empty")]
    EmptyCorpus,

    #[error("league baseline for {side} goals is {value}; expected goals are undefined")]
    ZeroBaseline { side: &'static str, value: f64 },

    #[error("expected goals are not finite (home={home}, away={away})")]
    NonFiniteExpectedGoals { home: f64, away: f64 },
}
