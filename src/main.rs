use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use footy_poisson::config::{AppConfig, app_cache_dir};
use footy_poisson::dataset::{self, IngestSummary};
use footy_poisson::history;
use footy_poisson::http_cache::BodyCache;
use footy_poisson::predict::{self, PredictionResult};
use footy_poisson::ratings::MatchRecord;
use footy_poisson::snapshot::SharedRatings;
use footy_poisson::{ModelError, logging};

const USAGE: &str = "usage:
  footy_poisson teams [--csv <file>]...
  footy_poisson predict <HOME> <AWAY> [--csv <file>]...
  footy_poisson slate <fixtures.csv> [--csv <file>]...";

const BAR_WIDTH: f64 = 40.0;

fn main() -> Result<()> {
    logging::init();
    let cfg = AppConfig::load();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let csv_paths = parse_csv_args(&args);
    let positional = positional_args(&args);
    let Some(command) = positional.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };

    let matches = load_corpus(&cfg, &csv_paths)?;
    let ratings = SharedRatings::from_matches(&matches)?;
    let snapshot = ratings.load();
    info!(
        teams = snapshot.teams.len(),
        avg_home = %format!("{:.3}", snapshot.baselines.avg_home_goals),
        avg_away = %format!("{:.3}", snapshot.baselines.avg_away_goals),
        "ratings ready"
    );

    match command {
        "teams" => {
            for team in history::teams(&matches) {
                println!("{team}");
            }
        }
        "predict" => {
            let (Some(home), Some(away)) = (positional.get(1), positional.get(2)) else {
                return Err(anyhow!("predict needs <HOME> <AWAY>\n{USAGE}"));
            };
            let known = history::teams(&matches);
            for team in [home, away] {
                if !known.contains(team) {
                    warn!(team = %team, "team not found in the loaded results");
                }
            }
            let result = ratings.predict(home, away)?;
            print_prediction(home, away, &result);
            print_history(&matches, home, away, cfg.recent_n);
        }
        "slate" => {
            let path = positional
                .get(1)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("slate needs <fixtures.csv>\n{USAGE}"))?;
            let fixtures = load_fixtures(&path)?;
            let results = predict::predict_slate(&snapshot, &fixtures);
            write_slate(&mut io::stdout().lock(), &fixtures, &results)
                .context("write slate")?;
        }
        other => return Err(anyhow!("unknown command '{other}'\n{USAGE}")),
    }

    Ok(())
}

fn load_corpus(cfg: &AppConfig, csv_paths: &[PathBuf]) -> Result<Vec<MatchRecord>> {
    let (matches, summary) = if csv_paths.is_empty() {
        let cache = match app_cache_dir() {
            Some(dir) if cfg.http_cache => BodyCache::open(&dir, cfg.cache_max_age_secs),
            _ => BodyCache::disabled(),
        };
        dataset::ingest_sources(&cache, &cfg.sources())?
    } else {
        dataset::ingest_files(csv_paths)?
    };
    report_ingest(&summary);
    Ok(matches)
}

fn report_ingest(summary: &IngestSummary) {
    info!(
        sources = %format!("{}/{}", summary.sources_succeeded, summary.sources_total),
        matches = summary.matches_loaded,
        dropped = summary.rows_dropped,
        "historical results loaded"
    );
    for err in summary.errors.iter().take(8) {
        warn!("{err}");
    }
}

fn print_prediction(home: &str, away: &str, r: &PredictionResult) {
    println!("{home} vs {away}");
    if r.is_fallback() {
        println!("(not enough venue history for one side; showing default odds)");
    }
    println!();
    let labels = [format!("{home} win"), "Draw".to_string(), format!("{away} win")];
    let width = labels.iter().map(String::len).max().unwrap_or(0);
    for (label, pct) in labels.iter().zip([r.home_win_pct, r.draw_pct, r.away_win_pct]) {
        println!("{label:<width$} : {pct:>5.1}%  {}", bar(pct));
    }
    println!();
    println!(
        "Expected goals: {home} {:.1} - {:.1} {away}",
        r.expected_home_goals, r.expected_away_goals
    );
    println!("Over 2.5 goals : {:.1}%", r.over_2_5_pct);
    println!("Under 2.5 goals: {:.1}%", r.under_2_5_pct());
}

fn bar(pct: f64) -> String {
    let n = ((pct / 100.0) * BAR_WIDTH).round().clamp(0.0, BAR_WIDTH) as usize;
    "#".repeat(n)
}

fn print_history(matches: &[MatchRecord], home: &str, away: &str, n: usize) {
    println!();
    println!("Head-to-head (last {n})");
    print_rows(
        &history::head_to_head(matches, home, away, n),
        "No recent head-to-head matches.",
    );
    for team in [home, away] {
        println!();
        println!("Last {n} matches of {team}");
        print_rows(
            &history::recent_matches(matches, team, n),
            "No recent matches for this team.",
        );
    }
}

fn print_rows(rows: &[&MatchRecord], empty: &str) {
    if rows.is_empty() {
        println!("  {empty}");
        return;
    }
    for m in rows {
        let date = m
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!(
            "  {date}  {} {}-{} {}",
            m.home_team, m.home_goals, m.away_goals, m.away_team
        );
    }
}

const SLATE_HEADER: &str =
    "home,away,home_win_pct,draw_pct,away_win_pct,xg_home,xg_away,over_2_5_pct,quality";

/// One CSV row per fixture; a failed prediction keeps its row with empty numbers.
fn write_slate<W: Write>(
    out: &mut W,
    fixtures: &[(String, String)],
    results: &[Result<PredictionResult, ModelError>],
) -> io::Result<()> {
    writeln!(out, "{SLATE_HEADER}")?;
    for ((home, away), result) in fixtures.iter().zip(results) {
        match result {
            Ok(r) => writeln!(
                out,
                "{home},{away},{:.1},{:.1},{:.1},{:.1},{:.1},{:.1},{:?}",
                r.home_win_pct,
                r.draw_pct,
                r.away_win_pct,
                r.expected_home_goals,
                r.expected_away_goals,
                r.over_2_5_pct,
                r.quality
            )?,
            Err(err) => {
                warn!(home = %home, away = %away, error = %err, "prediction failed");
                writeln!(out, "{home},{away},,,,,,,error")?;
            }
        }
    }
    Ok(())
}

fn load_fixtures(path: &Path) -> Result<Vec<(String, String)>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read fixtures {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.context("read fixture row")?;
        let (Some(home), Some(away)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let header = home.eq_ignore_ascii_case("home") || home.eq_ignore_ascii_case("hometeam");
        if home.is_empty() || away.is_empty() || header {
            continue;
        }
        out.push((home.to_string(), away.to_string()));
    }
    Ok(out)
}

fn parse_csv_args(args: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut idx = 0;
    while idx < args.len() {
        let arg = &args[idx];
        if let Some(path) = arg.strip_prefix("--csv=") {
            if !path.trim().is_empty() {
                out.push(PathBuf::from(path.trim()));
            }
        } else if arg == "--csv"
            && let Some(next) = args.get(idx + 1)
        {
            if !next.trim().is_empty() {
                out.push(PathBuf::from(next));
            }
            idx += 1;
        }
        idx += 1;
    }
    out
}

fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut idx = 0;
    while idx < args.len() {
        let arg = &args[idx];
        if arg == "--csv" {
            idx += 2;
            continue;
        }
        if !arg.starts_with("--") {
            out.push(arg.clone());
        }
        idx += 1;
    }
    out
}
