use std::collections::HashMap;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::{GameStage, MemberId};

/// Derive votee -> received-count from the round's vote map.
pub fn tally(votes: &HashMap<MemberId, MemberId>) -> HashMap<MemberId, u32> {
    let mut counts: HashMap<MemberId, u32> = HashMap::new();
    for votee in votes.values() {
        *counts.entry(votee.clone()).or_insert(0) += 1;
    }
    counts
}

impl AppState {
    /// Record one member's vote for the suspected liar.
    ///
    /// Only valid during the voting stage. A voter's second vote in the
    /// same round overwrites their first; it is never double-counted.
    pub async fn cast_vote(
        &self,
        game_id: &str,
        user_id: &str,
        votee_id: &str,
    ) -> GameResult<()> {
        let handle = self.handle(game_id).await;
        let _guard = handle.lock.lock().await;

        let mut session = self.store.load(game_id).await?;

        if session.game_stage != GameStage::Voting {
            return Err(GameError::InvalidPhase {
                stage: session.game_stage,
            });
        }
        if !session.is_member(user_id) || !session.is_member(votee_id) {
            return Err(GameError::NotFound);
        }
        if user_id == votee_id {
            // Self-votes are accepted and count toward the tally.
            tracing::debug!(game_id, user_id, "member voted for themselves");
        }

        session
            .round_votes
            .insert(user_id.to_string(), votee_id.to_string());

        // Keep the per-member received counts in sync with the map.
        let counts = tally(&session.round_votes);
        for member in &mut session.participants {
            member.round_votes = counts.get(&member.id).copied().unwrap_or(0);
        }

        self.store.save(&session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(pairs: &[(&str, &str)]) -> HashMap<MemberId, MemberId> {
        pairs
            .iter()
            .map(|(voter, votee)| (voter.to_string(), votee.to_string()))
            .collect()
    }

    #[test]
    fn tally_counts_received_votes() {
        let counts = tally(&votes(&[("a", "b"), ("c", "b"), ("b", "a")]));
        assert_eq!(counts.get("b"), Some(&2));
        assert_eq!(counts.get("a"), Some(&1));
        assert_eq!(counts.get("c"), None);
    }

    #[test]
    fn tally_of_empty_map_is_empty() {
        assert!(tally(&HashMap::new()).is_empty());
    }
}
