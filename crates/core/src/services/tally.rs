//! Tally engine.
//!
//! Tallies are derived from the stored votes on every read and never
//! persisted. Everything here is pure so results depend only on the inputs.

use chrono::{DateTime, Utc};
use rtr_db::entities::{Choice, battle, battle_vote};
use serde::Serialize;

/// Outcome of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    A,
    B,
    Tie,
    /// The battle is still open and the caller did not ask for a final result.
    Undecided,
}

/// Whether an open battle may report a winner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TallyMode {
    /// Winner stays undecided until the battle closes.
    #[default]
    Live,
    /// Report the current leader even while voting continues.
    Final,
}

/// Derived vote counts for one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub count_a: u64,
    pub count_b: u64,
    pub total: u64,
    pub percent_a: u64,
    pub percent_b: u64,
    pub winner: Winner,
}

/// Round-half-up integer percentage of `count` out of `total`.
#[must_use]
pub const fn percent(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (200 * count + total) / (2 * total)
}

/// Compute the tally of `battle` from its votes.
///
/// Votes belonging to other battles are ignored.
#[must_use]
pub fn compute_tally(
    battle: &battle::Model,
    votes: &[battle_vote::Model],
    now: DateTime<Utc>,
    mode: TallyMode,
) -> Tally {
    let (count_a, count_b) = votes
        .iter()
        .filter(|v| v.battle_id == battle.id)
        .fold((0_u64, 0_u64), |(a, b), v| match v.choice {
            Choice::A => (a + 1, b),
            Choice::B => (a, b + 1),
        });

    tally_from_counts(battle, count_a, count_b, now, mode)
}

/// Build a tally from already aggregated counts.
#[must_use]
pub fn tally_from_counts(
    battle: &battle::Model,
    count_a: u64,
    count_b: u64,
    now: DateTime<Utc>,
    mode: TallyMode,
) -> Tally {
    let total = count_a + count_b;
    let decided = mode == TallyMode::Final || !battle.is_open_at(now);

    let winner = if !decided {
        Winner::Undecided
    } else if count_a > count_b {
        Winner::A
    } else if count_b > count_a {
        Winner::B
    } else {
        Winner::Tie
    };

    Tally {
        count_a,
        count_b,
        total,
        percent_a: percent(count_a, total),
        percent_b: percent(count_b, total),
        winner,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rtr_db::entities::BattleType;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn battle(ends_in_hours: Option<i64>, is_active: bool) -> battle::Model {
        battle::Model {
            id: "b1".to_string(),
            title: "Cats vs Dogs".to_string(),
            description: None,
            battle_type: BattleType::Custom,
            option_a: json!({"identifier": "cats"}),
            option_b: json!({"identifier": "dogs"}),
            option_a_identifier: "cats".to_string(),
            option_b_identifier: "dogs".to_string(),
            created_at: t0().into(),
            ends_at: ends_in_hours.map(|h| (t0() + Duration::hours(h)).into()),
            is_active,
        }
    }

    fn votes(a: usize, b: usize) -> Vec<battle_vote::Model> {
        let choices = std::iter::repeat_n(Choice::A, a).chain(std::iter::repeat_n(Choice::B, b));
        choices
            .enumerate()
            .map(|(i, choice)| battle_vote::Model {
                id: format!("v{i}"),
                battle_id: "b1".to_string(),
                voter_id: format!("s{i}"),
                choice,
                cast_at: t0().into(),
            })
            .collect()
    }

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn test_one_of_three() {
        let tally = compute_tally(&battle(Some(1), true), &votes(1, 2), t0(), TallyMode::Live);
        assert_eq!((tally.count_a, tally.count_b, tally.total), (1, 2, 3));
        assert_eq!((tally.percent_a, tally.percent_b), (33, 67));
        assert_eq!(tally.winner, Winner::Undecided);
    }

    #[test]
    fn test_closed_even_split_is_tie() {
        let after = t0() + Duration::hours(2);
        let tally = compute_tally(&battle(Some(1), true), &votes(5, 5), after, TallyMode::Live);
        assert_eq!(tally.winner, Winner::Tie);
        assert_eq!((tally.percent_a, tally.percent_b), (50, 50));
    }

    #[test]
    fn test_closed_without_votes_is_tie() {
        let after = t0() + Duration::hours(2);
        let tally = compute_tally(&battle(Some(1), true), &[], after, TallyMode::Live);
        assert_eq!(tally.total, 0);
        assert_eq!((tally.percent_a, tally.percent_b), (0, 0));
        assert_eq!(tally.winner, Winner::Tie);
    }

    #[test]
    fn test_open_battle_is_undecided_unless_final() {
        let open = battle(None, true);
        assert_eq!(
            compute_tally(&open, &votes(3, 1), t0(), TallyMode::Live).winner,
            Winner::Undecided
        );
        assert_eq!(
            compute_tally(&open, &votes(3, 1), t0(), TallyMode::Final).winner,
            Winner::A
        );
    }

    #[test]
    fn test_deactivated_battle_reports_winner() {
        let tally = compute_tally(&battle(None, false), &votes(1, 4), t0(), TallyMode::Live);
        assert_eq!(tally.winner, Winner::B);
    }

    #[test]
    fn test_counts_are_conserved() {
        let recorded = votes(7, 4);
        let tally = compute_tally(&battle(None, true), &recorded, t0(), TallyMode::Live);
        assert_eq!(tally.count_a + tally.count_b, recorded.len() as u64);
        assert_eq!(tally.total, recorded.len() as u64);
    }

    #[test]
    fn test_votes_from_other_battles_are_ignored() {
        let mut recorded = votes(2, 0);
        recorded[1].battle_id = "other".to_string();
        let tally = compute_tally(&battle(None, true), &recorded, t0(), TallyMode::Live);
        assert_eq!(tally.count_a, 1);
    }

    #[test]
    fn test_tally_is_deterministic() {
        let b = battle(Some(1), true);
        let recorded = votes(4, 6);
        let later = t0() + Duration::hours(3);
        assert_eq!(
            compute_tally(&b, &recorded, later, TallyMode::Live),
            compute_tally(&b, &recorded, later, TallyMode::Live)
        );
    }

    #[test]
    fn test_winner_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Winner::Tie).unwrap(), json!("TIE"));
        assert_eq!(serde_json::to_value(Winner::Undecided).unwrap(), json!("UNDECIDED"));
    }
}
