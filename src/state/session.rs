//! Session creation, roster membership, and read-only projections.

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::ParticipantInfo;
use crate::state::force_end;
use crate::types::*;

/// Defaults applied when a create request omits the session config.
const DEFAULT_ROUNDS: u32 = 5;
const DEFAULT_ANSWER_SECONDS: u32 = 60;
const DEFAULT_VOTE_SECONDS: u32 = 30;

impl AppState {
    /// Create a new session owned by `owner`, in the waiting stage with
    /// an empty roster.
    pub async fn create_session(
        &self,
        owner: MemberId,
        num_rounds: Option<u32>,
        answer_time: Option<u32>,
        vote_time: Option<u32>,
    ) -> GameResult<Session> {
        // Zero counts as "unset": a zero-round game could never finish
        // through the round counter.
        let session = Session::new(
            owner,
            num_rounds.filter(|&n| n > 0).unwrap_or(DEFAULT_ROUNDS),
            answer_time.filter(|&t| t > 0).unwrap_or(DEFAULT_ANSWER_SECONDS),
            vote_time.filter(|&t| t > 0).unwrap_or(DEFAULT_VOTE_SECONDS),
        );
        self.store.create(&session).await?;
        tracing::info!(game_id = %session.id, owner = %session.owner, "session created");
        Ok(session)
    }

    /// Add a member to the roster.
    ///
    /// Idempotent for an id that already joined. Only possible while the
    /// session is waiting and below the player cap. Returns the roster.
    pub async fn join(
        &self,
        game_id: &str,
        user_id: &str,
        name: String,
        photo: String,
    ) -> GameResult<Vec<ParticipantInfo>> {
        let handle = self.handle(game_id).await;
        let _guard = handle.lock.lock().await;

        let mut session = self.store.load(game_id).await?;

        if session.is_member(user_id) {
            return Ok(session.participants.iter().map(Into::into).collect());
        }
        if session.game_stage != GameStage::Waiting {
            return Err(GameError::InvalidPhase {
                stage: session.game_stage,
            });
        }
        let count = session.participants.len();
        if count >= MAX_PLAYERS {
            return Err(GameError::TooManyPlayers { count });
        }

        let name = if name.trim().is_empty() {
            petname::petname(2, "-").unwrap_or_else(|| "anonymous".to_string())
        } else {
            name
        };
        let is_owner = session.owner == user_id;
        session
            .participants
            .push(Member::new(user_id.to_string(), name, photo, is_owner));

        self.store.save(&session).await?;
        tracing::info!(game_id, user_id, "member joined");
        Ok(session.participants.iter().map(Into::into).collect())
    }

    /// Remove a member from the session.
    ///
    /// The owner leaving ends the game for everyone, there is no handover.
    /// A non-owner is dropped from the roster with no stage change, even
    /// if that leaves the roster below the start minimum.
    pub async fn leave(&self, game_id: &str, user_id: &str) -> GameResult<Session> {
        let handle = self.handle(game_id).await;
        let _guard = handle.lock.lock().await;

        let mut session = self.store.load(game_id).await?;

        // An ended session is a final record; leaving it is a no-op.
        if session.game_stage == GameStage::Ended {
            return Ok(session);
        }

        if session.owner == user_id {
            force_end(&mut session)?;
            self.store.save(&session).await?;
            handle.cancel_timers();
            tracing::info!(game_id, "owner left, game ended");
        } else {
            if !session.is_member(user_id) {
                return Err(GameError::NotFound);
            }
            session.participants.retain(|m| m.id != user_id);
            self.store.save(&session).await?;
            tracing::info!(game_id, user_id, "member left");
        }

        self.broadcast_snapshot(&session).await;
        if session.game_stage == GameStage::Ended {
            self.drop_handle(game_id).await;
        }
        Ok(session)
    }

    /// Record a member's written answer for the current round.
    pub async fn record_answer(
        &self,
        game_id: &str,
        user_id: &str,
        answer: String,
    ) -> GameResult<()> {
        let handle = self.handle(game_id).await;
        let _guard = handle.lock.lock().await;

        let mut session = self.store.load(game_id).await?;
        let member = session.member_mut(user_id).ok_or(GameError::NotFound)?;
        member.round_answer = answer;
        self.store.save(&session).await
    }

    /// Roster and score projection.
    pub async fn roster(&self, game_id: &str) -> GameResult<Vec<ParticipantInfo>> {
        let session = self.store.load(game_id).await?;
        Ok(session.participants.iter().map(Into::into).collect())
    }

    /// The shared (majority) prompt of the current round.
    pub async fn shared_question(&self, game_id: &str) -> GameResult<String> {
        let session = self.store.load(game_id).await?;
        Ok(session.round_question)
    }

    /// The prompt assigned to one member this round.
    pub async fn member_question(&self, game_id: &str, user_id: &str) -> GameResult<String> {
        let session = self.store.load(game_id).await?;
        let member = session.member(user_id).ok_or(GameError::NotFound)?;
        Ok(member.round_question.clone())
    }

    /// The liar of the current round, empty while none is assigned.
    pub async fn revealed_liar(&self, game_id: &str) -> GameResult<String> {
        let session = self.store.load(game_id).await?;
        Ok(session.liar.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn state_with_session() -> (AppState, Session) {
        let state = AppState::in_memory();
        let session = state
            .create_session("owner".to_string(), Some(3), Some(10), Some(5))
            .await
            .unwrap();
        (state, session)
    }

    #[tokio::test]
    async fn zero_config_values_fall_back_to_defaults() {
        let state = AppState::in_memory();
        let session = state
            .create_session("owner".to_string(), Some(0), Some(0), Some(0))
            .await
            .unwrap();
        assert_eq!(session.num_rounds, DEFAULT_ROUNDS);
        assert_eq!(session.answer_time, DEFAULT_ANSWER_SECONDS);
        assert_eq!(session.vote_time, DEFAULT_VOTE_SECONDS);
    }

    #[tokio::test]
    async fn join_marks_the_owner_and_is_idempotent() {
        let (state, session) = state_with_session().await;

        let roster = state
            .join(&session.id, "owner", "Ada".to_string(), String::new())
            .await
            .unwrap();
        assert_eq!(roster.len(), 1);
        assert!(roster[0].is_owner);

        let roster = state
            .join(&session.id, "owner", "Ada".to_string(), String::new())
            .await
            .unwrap();
        assert_eq!(roster.len(), 1, "duplicate join must not add a member");
    }

    #[tokio::test]
    async fn join_rejects_full_sessions() {
        let (state, session) = state_with_session().await;
        for i in 0..MAX_PLAYERS {
            state
                .join(&session.id, &format!("p{i}"), format!("P{i}"), String::new())
                .await
                .unwrap();
        }

        let result = state
            .join(&session.id, "late", "Late".to_string(), String::new())
            .await;
        assert!(matches!(result, Err(GameError::TooManyPlayers { .. })));
    }

    #[tokio::test]
    async fn join_rejects_sessions_past_waiting() {
        let (state, session) = state_with_session().await;
        let mut stored = state.store.load(&session.id).await.unwrap();
        stored.game_stage = GameStage::Answering;
        state.store.save(&stored).await.unwrap();

        let result = state
            .join(&session.id, "late", "Late".to_string(), String::new())
            .await;
        assert!(matches!(result, Err(GameError::InvalidPhase { .. })));
    }

    #[tokio::test]
    async fn join_unknown_session_is_not_found() {
        let state = AppState::in_memory();
        let result = state
            .join("missing", "p1", "P1".to_string(), String::new())
            .await;
        assert!(matches!(result, Err(GameError::NotFound)));
    }

    #[tokio::test]
    async fn blank_names_get_a_generated_one() {
        let (state, session) = state_with_session().await;
        let roster = state
            .join(&session.id, "p1", "  ".to_string(), String::new())
            .await
            .unwrap();
        assert!(!roster[0].name.trim().is_empty());
    }

    #[tokio::test]
    async fn non_owner_leave_keeps_the_stage() {
        let (state, session) = state_with_session().await;
        for id in ["owner", "p1", "p2"] {
            state
                .join(&session.id, id, id.to_string(), String::new())
                .await
                .unwrap();
        }

        let after = state.leave(&session.id, "p1").await.unwrap();
        assert_eq!(after.game_stage, GameStage::Waiting);
        assert_eq!(after.participants.len(), 2);
        assert!(!after.is_member("p1"));
    }

    #[tokio::test]
    async fn owner_leave_ends_the_game() {
        let (state, session) = state_with_session().await;
        for id in ["owner", "p1", "p2"] {
            state
                .join(&session.id, id, id.to_string(), String::new())
                .await
                .unwrap();
        }

        let after = state.leave(&session.id, "owner").await.unwrap();
        assert_eq!(after.game_stage, GameStage::Ended);
        assert_eq!(after.round_ends_in, UNTIMED);
    }

    #[tokio::test]
    async fn leave_after_the_game_ended_is_a_noop() {
        let (state, session) = state_with_session().await;
        for id in ["owner", "p1", "p2"] {
            state
                .join(&session.id, id, id.to_string(), String::new())
                .await
                .unwrap();
        }
        state.leave(&session.id, "owner").await.unwrap();

        // The ended record is final; a late leave must not touch it.
        let frozen = state.leave(&session.id, "p1").await.unwrap();
        assert_eq!(frozen.game_stage, GameStage::Ended);
        assert_eq!(frozen.participants.len(), 3);

        let stored = state.store.load(&session.id).await.unwrap();
        assert!(stored.is_member("p1"));
        assert_eq!(stored.participants.len(), 3);
    }

    #[tokio::test]
    async fn record_answer_requires_membership() {
        let (state, session) = state_with_session().await;
        let result = state
            .record_answer(&session.id, "ghost", "hello".to_string())
            .await;
        assert!(matches!(result, Err(GameError::NotFound)));
    }

    #[tokio::test]
    async fn projections_serve_question_and_liar() {
        let (state, session) = state_with_session().await;
        let mut stored = state.store.load(&session.id).await.unwrap();
        stored.round_question = "shared?".to_string();
        stored.liar = Some("p2".to_string());
        state.store.save(&stored).await.unwrap();

        assert_eq!(state.shared_question(&session.id).await.unwrap(), "shared?");
        assert_eq!(state.revealed_liar(&session.id).await.unwrap(), "p2");
    }
}
