//! Deterministic per-round scoring.
//!
//! Runs exactly once per round, on the transition into the revealing
//! stage. Pure over (participants, vote map, liar id) so every scoring
//! rule is unit-testable without a store or a clock.

use std::collections::HashMap;

use super::vote::tally;
use crate::types::{Member, MemberId};

/// Points for a liar whose received votes stay under the detection
/// threshold of floor(N/2).
const LIAR_ESCAPE_POINTS: u32 = 10;
/// Points for correctly voting for the liar.
const CORRECT_VOTE_POINTS: u32 = 5;

/// Apply one round's scores and reset the round-scoped member fields.
///
/// - the liar earns 10 if fewer than floor(N/2) members voted for them,
///   otherwise 0 (exact-half ties count as detected)
/// - every other member earns 5 if their cast vote hit the liar
/// - `total_score` and `total_votes` accumulate before the reset
///
/// Returns the per-member round scores, since the member fields
/// themselves are already reset when this returns.
pub fn apply_round_scores(
    participants: &mut [Member],
    votes: &HashMap<MemberId, MemberId>,
    liar: &MemberId,
) -> HashMap<MemberId, u32> {
    let counts = tally(votes);
    let threshold = (participants.len() / 2) as u32;

    let mut round_scores = HashMap::new();
    for member in participants.iter_mut() {
        let received = counts.get(&member.id).copied().unwrap_or(0);
        member.total_votes += received;

        member.round_score = if member.id == *liar {
            if received < threshold {
                LIAR_ESCAPE_POINTS
            } else {
                0
            }
        } else if votes.get(&member.id) == Some(liar) {
            CORRECT_VOTE_POINTS
        } else {
            0
        };

        member.total_score += member.round_score;
        round_scores.insert(member.id.clone(), member.round_score);

        member.clear_round_fields();
    }

    round_scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(ids: &[&str]) -> Vec<Member> {
        ids.iter()
            .map(|id| Member::new(id.to_string(), id.to_uppercase(), String::new(), false))
            .collect()
    }

    fn votes(pairs: &[(&str, &str)]) -> HashMap<MemberId, MemberId> {
        pairs
            .iter()
            .map(|(voter, votee)| (voter.to_string(), votee.to_string()))
            .collect()
    }

    #[test]
    fn detected_liar_scores_zero_and_correct_voters_earn_five() {
        // N=3, liar=b, votes {a->b, c->b}: 2 >= floor(3/2)=1
        let mut participants = members(&["a", "b", "c"]);
        let votes = votes(&[("a", "b"), ("c", "b")]);

        let scores = apply_round_scores(&mut participants, &votes, &"b".to_string());

        assert_eq!(scores["b"], 0);
        assert_eq!(scores["a"], 5);
        assert_eq!(scores["c"], 5);
    }

    #[test]
    fn undetected_liar_escapes_with_ten() {
        // N=3, liar=b, votes {a->c, c->a}: b receives 0 < 1
        let mut participants = members(&["a", "b", "c"]);
        let votes = votes(&[("a", "c"), ("c", "a")]);

        let scores = apply_round_scores(&mut participants, &votes, &"b".to_string());

        assert_eq!(scores["b"], 10);
        assert_eq!(scores["a"], 0);
        assert_eq!(scores["c"], 0);
    }

    #[test]
    fn exactly_half_counts_as_detected() {
        // N=4, threshold floor(4/2)=2; liar receives exactly 2 votes
        let mut participants = members(&["a", "b", "c", "d"]);
        let votes = votes(&[("a", "b"), ("c", "b")]);

        let scores = apply_round_scores(&mut participants, &votes, &"b".to_string());
        assert_eq!(scores["b"], 0);
    }

    #[test]
    fn totals_accumulate_across_rounds() {
        let mut participants = members(&["a", "b", "c"]);

        // Round 1: liar b escapes
        apply_round_scores(
            &mut participants,
            &votes(&[("a", "c"), ("c", "a")]),
            &"b".to_string(),
        );
        // Round 2: liar a is caught by both
        apply_round_scores(
            &mut participants,
            &votes(&[("b", "a"), ("c", "a")]),
            &"a".to_string(),
        );

        let by_id = |id: &str| participants.iter().find(|m| m.id == id).unwrap();
        assert_eq!(by_id("b").total_score, 10 + 5);
        assert_eq!(by_id("c").total_score, 0 + 5);
        assert_eq!(by_id("a").total_score, 0 + 0);
        // a received 1 vote in round 1 and 2 in round 2
        assert_eq!(by_id("a").total_votes, 3);
    }

    #[test]
    fn round_fields_are_reset_after_scoring() {
        let mut participants = members(&["a", "b", "c"]);
        for member in &mut participants {
            member.round_question = "q".to_string();
            member.round_answer = "ans".to_string();
            member.round_votes = 2;
        }

        apply_round_scores(
            &mut participants,
            &votes(&[("a", "b"), ("c", "b")]),
            &"b".to_string(),
        );

        for member in &participants {
            assert!(member.round_question.is_empty());
            assert!(member.round_answer.is_empty());
            assert_eq!(member.round_votes, 0);
            assert_eq!(member.round_score, 0);
        }
    }

    #[test]
    fn round_score_sum_matches_the_scoring_rule() {
        let mut participants = members(&["a", "b", "c", "d", "e"]);
        let votes = votes(&[("a", "b"), ("c", "b"), ("d", "a"), ("e", "b")]);
        let liar = "b".to_string();

        let scores = apply_round_scores(&mut participants, &votes, &liar);

        // b received 3 >= floor(5/2)=2, so 0 for the liar; a, c, e voted b
        let sum: u32 = scores.values().sum();
        assert_eq!(sum, 3 * 5);
    }

    #[test]
    fn self_vote_counts_toward_received_totals() {
        let mut participants = members(&["a", "b", "c"]);
        let votes = votes(&[("b", "b")]);

        apply_round_scores(&mut participants, &votes, &"b".to_string());

        let b = participants.iter().find(|m| m.id == "b").unwrap();
        assert_eq!(b.total_votes, 1);
    }
}
