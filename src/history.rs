use std::collections::BTreeSet;

use crate::ratings::MatchRecord;

/// Every team seen in either column, sorted by name.
pub fn teams(matches: &[MatchRecord]) -> Vec<String> {
    let set: BTreeSet<&str> = matches
        .iter()
        .flat_map(|m| [m.home_team.as_str(), m.away_team.as_str()])
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// The last `n` matches involving `team`, oldest first. `matches` must be date-ascending.
pub fn recent_matches<'a>(
    matches: &'a [MatchRecord],
    team: &str,
    n: usize,
) -> Vec<&'a MatchRecord> {
    tail(matches.iter().filter(|m| m.involves(team)), n)
}

/// The last `n` meetings of `a` and `b`, in either venue orientation.
pub fn head_to_head<'a>(
    matches: &'a [MatchRecord],
    a: &str,
    b: &str,
    n: usize,
) -> Vec<&'a MatchRecord> {
    tail(
        matches.iter().filter(|m| {
            (m.home_team == a && m.away_team == b) || (m.home_team == b && m.away_team == a)
        }),
        n,
    )
}

fn tail<'a>(
    rows: impl DoubleEndedIterator<Item = &'a MatchRecord>,
    n: usize,
) -> Vec<&'a MatchRecord> {
    let mut out: Vec<_> = rows.rev().take(n).collect();
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 1, d)
    }

    fn corpus() -> Vec<MatchRecord> {
        vec![
            MatchRecord::new(day(1), "Lyon", "Nice", 1, 0),
            MatchRecord::new(day(2), "Nice", "Lyon", 2, 2),
            MatchRecord::new(day(3), "Lens", "Lyon", 0, 1),
            MatchRecord::new(day(4), "Lyon", "Nice", 3, 1),
            MatchRecord::new(day(5), "Nice", "Lens", 1, 1),
        ]
    }

    #[test]
    fn teams_are_unique_and_sorted() {
        assert_eq!(teams(&corpus()), vec!["Lens", "Lyon", "Nice"]);
    }

    #[test]
    fn recent_matches_keeps_chronological_order() {
        let rows = corpus();
        let got = recent_matches(&rows, "Lyon", 2);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].date, day(3));
        assert_eq!(got[1].date, day(4));
    }

    #[test]
    fn head_to_head_matches_both_orientations() {
        let rows = corpus();
        let got = head_to_head(&rows, "Nice", "Lyon", 5);
        assert_eq!(got.len(), 3);
        assert!(head_to_head(&rows, "Lens", "Paris", 5).is_empty());
    }
}
