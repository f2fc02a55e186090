use std::env;
use std::path::PathBuf;

use crate::sources::{self, SourceSpec};

const CACHE_DIR: &str = "footy_poisson";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub leagues: Vec<String>,
    pub seasons: Vec<String>,
    pub base_url: String,
    pub cache_max_age_secs: u64,
    pub http_cache: bool,
    pub recent_n: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            leagues: sources::DEFAULT_LEAGUES
                .iter()
                .map(|(code, _)| code.to_string())
                .collect(),
            seasons: sources::DEFAULT_SEASONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            base_url: sources::DEFAULT_BASE_URL.to_string(),
            cache_max_age_secs: 6 * 60 * 60,
            http_cache: true,
            recent_n: 5,
        }
    }
}

impl AppConfig {
    /// Reads `.env.local` and `.env` (if present) before the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(raw) = opt("FOOTY_LEAGUES") {
            let codes = split_list(&raw);
            if !codes.is_empty() {
                cfg.leagues = codes;
            }
        }
        if let Some(raw) = opt("FOOTY_SEASONS") {
            let seasons = split_list(&raw);
            if !seasons.is_empty() {
                cfg.seasons = seasons;
            }
        }
        if let Some(url) = opt("FOOTY_DATA_BASE_URL") {
            cfg.base_url = url.trim().to_string();
        }
        if let Some(secs) =
            opt("FOOTY_CACHE_MAX_AGE_SECS").and_then(|v| v.trim().parse::<u64>().ok())
        {
            cfg.cache_max_age_secs = secs;
        }
        if let Some(raw) = opt("FOOTY_HTTP_CACHE") {
            cfg.http_cache = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        if let Some(n) = opt("FOOTY_RECENT_N").and_then(|v| v.trim().parse::<usize>().ok()) {
            cfg.recent_n = n.clamp(1, 50);
        }
        cfg
    }

    pub fn sources(&self) -> Vec<SourceSpec> {
        sources::build_sources(&self.base_url, &self.leagues, &self.seasons)
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split([',', ';', ' ']) {
        let part = part.trim();
        if !part.is_empty() && !out.iter().any(|p| p == part) {
            out.push(part.to_string());
        }
    }
    out
}
