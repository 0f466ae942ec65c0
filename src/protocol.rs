use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attach this connection to a session's broadcast group and request
    /// the current snapshot (catch-up, not replay).
    EnteredGame {
        game_id: SessionId,
        user_id: MemberId,
    },
    /// Leave the session. For the owner this ends the game for everyone.
    LeaveGame {
        game_id: SessionId,
        user_id: MemberId,
    },
    /// Vote for the suspected liar. Only valid during the voting stage.
    CastVote {
        game_id: SessionId,
        user_id: MemberId,
        votee_id: MemberId,
    },
    /// Manual phase progression, owner only.
    Advance {
        game_id: SessionId,
        user_id: MemberId,
    },
    /// Forced end, owner only.
    EndGame {
        game_id: SessionId,
        user_id: MemberId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    /// Canonical snapshot, broadcast to the whole session group after
    /// every accepted transition and sent directly on late-join catch-up.
    GameStateUpdate {
        game_stage: GameStage,
        current_round: u32,
        /// Absolute deadline in epoch milliseconds, -1 when untimed
        round_ends_in: i64,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn snapshot(session: &Session) -> Self {
        ServerMessage::GameStateUpdate {
            game_stage: session.game_stage,
            current_round: session.current_round,
            round_ends_in: session.round_ends_in,
        }
    }
}

/// Public roster projection served to clients (REST and join responses).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: MemberId,
    pub name: String,
    pub photo: String,
    pub is_owner: bool,
    pub round_votes: u32,
    pub round_score: u32,
    pub total_score: u32,
    pub total_votes: u32,
    pub round_question: String,
    pub round_answer: String,
}

impl From<&Member> for ParticipantInfo {
    fn from(m: &Member) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            photo: m.photo.clone(),
            is_owner: m.is_owner,
            round_votes: m.round_votes,
            round_score: m.round_score,
            total_score: m.total_score,
            total_votes: m.total_votes,
            round_question: m.round_question.clone(),
            round_answer: m.round_answer.clone(),
        }
    }
}
