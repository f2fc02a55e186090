pub const DEFAULT_BASE_URL: &str = "https://www.football-data.co.uk/mmz4281";

/// football-data.co.uk division codes fetched when nothing is configured.
pub const DEFAULT_LEAGUES: &[(&str, &str)] = &[
    ("E0", "Premier League"),
    ("F1", "Ligue 1"),
    ("SP1", "La Liga"),
    ("D1", "Bundesliga"),
    ("P1", "Primeira Liga"),
];

/// Two-digit start year followed by two-digit end year, e.g. `2425`.
pub const DEFAULT_SEASONS: &[&str] = &["2324", "2425", "2526"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub league_code: String,
    pub season: String,
    pub url: String,
}

impl SourceSpec {
    pub fn label(&self) -> String {
        format!("{} {}", league_name(&self.league_code), self.season)
    }
}

pub fn league_name(code: &str) -> &str {
    DEFAULT_LEAGUES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

pub fn season_csv_url(base_url: &str, season: &str, league_code: &str) -> String {
    format!("{}/{season}/{league_code}.csv", base_url.trim_end_matches('/'))
}

/// Season-major order, matching how the corpus is concatenated before sorting.
pub fn build_sources(base_url: &str, leagues: &[String], seasons: &[String]) -> Vec<SourceSpec> {
    let mut out = Vec::with_capacity(leagues.len() * seasons.len());
    for season in seasons {
        for code in leagues {
            out.push(SourceSpec {
                league_code: code.clone(),
                season: season.clone(),
                url: season_csv_url(base_url, season, code),
            });
        }
    }
    out
}
