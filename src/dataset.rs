use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use csv::StringRecord;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::http_cache::{BodyCache, shared_client};
use crate::ratings::MatchRecord;
use crate::sources::SourceSpec;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub undated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub sources_total: usize,
    pub sources_succeeded: usize,
    pub matches_loaded: usize,
    pub rows_dropped: usize,
    pub errors: Vec<String>,
}

struct Columns {
    date: Option<usize>,
    home_team: usize,
    away_team: usize,
    home_goals: usize,
    away_goals: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let required = |names: &[&str]| {
            find_column(headers, names).ok_or_else(|| anyhow!("missing column {}", names[0]))
        };
        Ok(Self {
            date: find_column(headers, &["Date"]),
            home_team: required(&["HomeTeam", "Home"])?,
            away_team: required(&["AwayTeam", "Away"])?,
            home_goals: required(&["FTHG", "HG"])?,
            away_goals: required(&["FTAG", "AG"])?,
        })
    }
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim_start_matches('\u{feff}').trim();
        names.iter().any(|n| h.eq_ignore_ascii_case(n))
    })
}

/// Parses a football-data style results table.
///
/// Rows missing a team name, a full-time score or (when the column exists) a
/// date are dropped. A non-blank date that does not parse keeps the row with
/// `date = None`.
pub fn parse_matches_csv(raw: &str) -> Result<(Vec<MatchRecord>, ParseStats)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    let headers = reader.headers().context("read csv header")?.clone();
    let cols = Columns::locate(&headers)?;

    let mut stats = ParseStats::default();
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.context("read csv record")?;
        stats.rows_read += 1;
        let Some(row) = parse_row(&record, &cols) else {
            stats.rows_dropped += 1;
            continue;
        };
        if row.date.is_none() {
            stats.undated += 1;
        }
        stats.rows_kept += 1;
        out.push(row);
    }
    Ok((out, stats))
}

fn parse_row(record: &StringRecord, cols: &Columns) -> Option<MatchRecord> {
    let text = |idx: usize| record.get(idx).map(str::trim).filter(|s| !s.is_empty());
    let home_team = text(cols.home_team)?;
    let away_team = text(cols.away_team)?;
    let home_goals = parse_goals(text(cols.home_goals)?)?;
    let away_goals = parse_goals(text(cols.away_goals)?)?;
    let date = match cols.date {
        Some(idx) => parse_date(text(idx)?),
        None => None,
    };
    Some(MatchRecord::new(date, home_team, away_team, home_goals, away_goals))
}

fn parse_goals(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    // Some exports write integer columns as floats ("2.0").
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

/// Day-first dates as published by football-data, plus ISO.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
}

/// Stable ascending sort; undated rows go last in their original order.
pub fn sort_by_date(matches: &mut [MatchRecord]) {
    matches.sort_by_key(|m| (m.date.is_none(), m.date));
}

/// Fetches every source through the body cache and concatenates the results.
pub fn ingest_sources(
    cache: &BodyCache,
    sources: &[SourceSpec],
) -> Result<(Vec<MatchRecord>, IngestSummary)> {
    let client = shared_client()?;
    ingest_with(sources, |src| {
        cache
            .fetch_text(client, &src.url)
            .with_context(|| format!("fetch {}", src.url))
    })
}

pub fn ingest_files(paths: &[PathBuf]) -> Result<(Vec<MatchRecord>, IngestSummary)> {
    let specs: Vec<SourceSpec> = paths
        .iter()
        .map(|p| SourceSpec {
            league_code: p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            season: "local".to_string(),
            url: p.display().to_string(),
        })
        .collect();
    ingest_with(&specs, |src| {
        fs::read_to_string(&src.url).with_context(|| format!("read csv file {}", src.url))
    })
}

/// Loads each source independently. A failing source is recorded in
/// `IngestSummary::errors` and skipped; only an empty overall result is an error.
pub fn ingest_with<F>(
    sources: &[SourceSpec],
    fetch: F,
) -> Result<(Vec<MatchRecord>, IngestSummary)>
where
    F: Fn(&SourceSpec) -> Result<String> + Sync,
{
    let results: Vec<Result<(Vec<MatchRecord>, ParseStats)>> = sources
        .par_iter()
        .map(|src| {
            let body = fetch(src)?;
            parse_matches_csv(&body)
        })
        .collect();

    let mut summary = IngestSummary {
        sources_total: sources.len(),
        ..IngestSummary::default()
    };
    let mut matches = Vec::new();
    for (src, result) in sources.iter().zip(results) {
        match result {
            Ok((rows, stats)) => {
                info!(
                    source = %src.label(),
                    kept = stats.rows_kept,
                    dropped = stats.rows_dropped,
                    "loaded source"
                );
                summary.sources_succeeded += 1;
                summary.rows_dropped += stats.rows_dropped;
                matches.extend(rows);
            }
            Err(err) => {
                warn!(source = %src.label(), error = %format!("{err:#}"), "source failed");
                summary.errors.push(format!("{}: {err:#}", src.label()));
            }
        }
    }

    if matches.is_empty() {
        return Err(anyhow!(
            "no usable match data ({}/{} sources failed){}",
            summary.errors.len(),
            summary.sources_total,
            summary
                .errors
                .first()
                .map(|e| format!("; first error: {e}"))
                .unwrap_or_default()
        ));
    }

    sort_by_date(&mut matches);
    summary.matches_loaded = matches.len();
    Ok((matches, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_goals_accepts_integral_floats() {
        assert_eq!(parse_goals("3"), Some(3));
        assert_eq!(parse_goals("2.0"), Some(2));
        assert_eq!(parse_goals("1.5"), None);
        assert_eq!(parse_goals("-1"), None);
        assert_eq!(parse_goals("NA"), None);
    }

    #[test]
    fn parse_date_is_day_first() {
        assert_eq!(parse_date("05/08/2023"), NaiveDate::from_ymd_opt(2023, 8, 5));
        assert_eq!(parse_date("05/08/23"), NaiveDate::from_ymd_opt(2023, 8, 5));
        assert_eq!(parse_date("2024-02-01"), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn bom_and_short_aliases_are_accepted() {
        let raw = "\u{feff}Date,Home,Away,HG,AG\n01/09/2024,Porto,Braga,2,2\n";
        let (rows, stats) = parse_matches_csv(raw).unwrap();
        assert_eq!(stats.rows_kept, 1);
        assert_eq!(rows[0].home_team, "Porto");
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 9, 1));
    }

    #[test]
    fn blank_date_drops_row_but_unparseable_date_is_kept() {
        let raw = "Date,HomeTeam,AwayTeam,FTHG,FTAG\n\
                   ,A,B,9,0\n\
                   01/09/2024,A,B,1,0\n\
                   TBC,B,A,2,2\n";
        let (rows, stats) = parse_matches_csv(raw).unwrap();
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.rows_kept, 2);
        assert_eq!(stats.rows_dropped, 1);
        assert_eq!(stats.undated, 1);
        assert_eq!(rows[0].home_goals, 1);
        assert_eq!(rows[1].date, None);
    }

    #[test]
    fn files_without_a_date_column_still_load() {
        let raw = "HomeTeam,AwayTeam,FTHG,FTAG\nA,B,1,0\n";
        let (rows, stats) = parse_matches_csv(raw).unwrap();
        assert_eq!(stats.rows_kept, 1);
        assert_eq!(rows[0].date, None);
    }

    #[test]
    fn missing_score_column_is_an_error() {
        let raw = "Date,HomeTeam,AwayTeam,FTHG\n01/09/2024,A,B,1\n";
        assert!(parse_matches_csv(raw).is_err());
    }

    #[test]
    fn undated_rows_sort_last() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day);
        let mut rows = vec![
            MatchRecord::new(None, "X", "Y", 0, 0),
            MatchRecord::new(d(3), "A", "B", 0, 0),
            MatchRecord::new(d(1), "C", "D", 0, 0),
        ];
        sort_by_date(&mut rows);
        assert_eq!(rows[0].date, d(1));
        assert_eq!(rows[1].date, d(3));
        assert_eq!(rows[2].date, None);
    }
}
