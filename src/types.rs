use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type SessionId = String;
pub type MemberId = String;

/// Roster bounds, enforced when the owner tries to start a round.
/// Join only checks the upper bound; a roster that shrinks below the
/// minimum mid-game keeps playing.
pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 8;

/// Sentinel for "no deadline" in `round_ends_in`.
pub const UNTIMED: i64 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameStage {
    Waiting,
    Answering,
    Voting,
    Revealing,
    Ended,
}

/// One participant of a session.
///
/// The `round_*` fields are transient: populated when a round enters the
/// answering stage and reset right after scoring. `total_score` and
/// `total_votes` accumulate across rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub photo: String,
    pub is_owner: bool,
    pub round_question: String,
    pub round_answer: String,
    /// Votes received this round
    pub round_votes: u32,
    pub round_score: u32,
    pub total_score: u32,
    pub total_votes: u32,
}

impl Member {
    pub fn new(id: MemberId, name: String, photo: String, is_owner: bool) -> Self {
        Self {
            id,
            name,
            photo,
            is_owner,
            round_question: String::new(),
            round_answer: String::new(),
            round_votes: 0,
            round_score: 0,
            total_score: 0,
            total_votes: 0,
        }
    }

    /// Reset the per-round fields to their neutral defaults.
    pub fn clear_round_fields(&mut self) {
        self.round_question.clear();
        self.round_answer.clear();
        self.round_votes = 0;
        self.round_score = 0;
    }
}

/// The persisted record for one game session.
///
/// Field names follow the wire/document shape (camelCase); loads reject
/// unknown or missing fields rather than tolerating a drifted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Session {
    pub id: SessionId,
    pub owner: MemberId,
    pub created_at: String,
    pub num_rounds: u32,
    /// Answering stage duration in seconds
    pub answer_time: u32,
    /// Voting stage duration in seconds
    pub vote_time: u32,
    pub game_stage: GameStage,
    pub current_round: u32,
    /// Absolute deadline of the current stage in epoch milliseconds,
    /// or [`UNTIMED`] for untimed stages
    pub round_ends_in: i64,
    /// The liar of the active round, if one has been assigned
    pub liar: Option<MemberId>,
    /// The shared (majority) prompt of the active round
    pub round_question: String,
    /// voter id -> votee id, last write wins
    pub round_votes: HashMap<MemberId, MemberId>,
    pub participants: Vec<Member>,
}

impl Session {
    pub fn new(owner: MemberId, num_rounds: u32, answer_time: u32, vote_time: u32) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            owner,
            created_at: chrono::Utc::now().to_rfc3339(),
            num_rounds,
            answer_time,
            vote_time,
            game_stage: GameStage::Waiting,
            current_round: 1,
            round_ends_in: UNTIMED,
            liar: None,
            round_question: String::new(),
            round_votes: HashMap::new(),
            participants: Vec::new(),
        }
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.participants.iter().find(|m| m.id == id)
    }

    pub fn member_mut(&mut self, id: &str) -> Option<&mut Member> {
        self.participants.iter_mut().find(|m| m.id == id)
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.member(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_waiting() {
        let session = Session::new("owner".to_string(), 5, 60, 30);
        assert_eq!(session.game_stage, GameStage::Waiting);
        assert_eq!(session.current_round, 1);
        assert_eq!(session.round_ends_in, UNTIMED);
        assert!(session.liar.is_none());
        assert!(session.participants.is_empty());
    }

    #[test]
    fn stage_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&GameStage::Answering).unwrap(),
            "\"answering\""
        );
        assert_eq!(
            serde_json::from_str::<GameStage>("\"revealing\"").unwrap(),
            GameStage::Revealing
        );
    }

    #[test]
    fn session_roundtrips_through_document_shape() {
        let mut session = Session::new("owner".to_string(), 3, 10, 5);
        session.participants.push(Member::new(
            "owner".to_string(),
            "Ada".to_string(),
            String::new(),
            true,
        ));

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"gameStage\":\"waiting\""));
        assert!(json.contains("\"roundEndsIn\":-1"));
        assert!(json.contains("\"isOwner\":true"));

        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.participants.len(), 1);
        assert_eq!(back.game_stage, GameStage::Waiting);
    }

    #[test]
    fn load_rejects_drifted_documents() {
        let session = Session::new("owner".to_string(), 3, 10, 5);
        let mut value = serde_json::to_value(&session).unwrap();
        value["gameStage"] = serde_json::Value::String("intermission".to_string());
        assert!(serde_json::from_value::<Session>(value.clone()).is_err());

        value["gameStage"] = serde_json::Value::String("waiting".to_string());
        value["surprise"] = serde_json::Value::Bool(true);
        assert!(serde_json::from_value::<Session>(value).is_err());
    }
}
