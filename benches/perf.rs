use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use footy_poisson::predict::{self, MAX_GOALS};
use footy_poisson::ratings::{MatchRecord, build_ratings};

const TEAMS: usize = 20;

fn synthetic_season(rounds: usize) -> Vec<MatchRecord> {
    let mut out = Vec::with_capacity(rounds * TEAMS * (TEAMS - 1));
    for round in 0..rounds {
        for h in 0..TEAMS {
            for a in 0..TEAMS {
                if h == a {
                    continue;
                }
                let home_goals = ((h * 7 + a * 3 + round) % 5) as u32;
                let away_goals = ((h * 2 + a * 5 + round) % 4) as u32;
                out.push(MatchRecord::new(
                    None,
                    format!("Team {h}"),
                    format!("Team {a}"),
                    home_goals,
                    away_goals,
                ));
            }
        }
    }
    out
}

fn bench_build_ratings(c: &mut Criterion) {
    let rows = synthetic_season(5);
    c.bench_function("build_ratings_1900_matches", |b| {
        b.iter(|| {
            let snap = build_ratings(black_box(&rows)).unwrap();
            black_box(snap.teams.len());
        })
    });
}

fn bench_predict(c: &mut Criterion) {
    let snap = build_ratings(&synthetic_season(2)).unwrap();
    c.bench_function("predict_single", |b| {
        b.iter(|| {
            let r = predict::predict(black_box("Team 3"), black_box("Team 11"), &snap).unwrap();
            black_box(r.home_win_pct);
        })
    });
    c.bench_function("outcome_distribution", |b| {
        b.iter(|| black_box(predict::outcome_distribution(black_box(1.42), black_box(1.18), MAX_GOALS)))
    });
}

fn bench_predict_slate(c: &mut Criterion) {
    let snap = build_ratings(&synthetic_season(2)).unwrap();
    let fixtures: Vec<(String, String)> = (0..TEAMS)
        .flat_map(|h| (0..TEAMS).filter(move |a| *a != h).map(move |a| (h, a)))
        .map(|(h, a)| (format!("Team {h}"), format!("Team {a}")))
        .collect();
    c.bench_function("predict_slate_380", |b| {
        b.iter(|| {
            let results = predict::predict_slate(&snap, black_box(&fixtures));
            black_box(results.len());
        })
    });
}

criterion_group!(benches, bench_build_ratings, bench_predict, bench_predict_slate);
criterion_main!(benches);
