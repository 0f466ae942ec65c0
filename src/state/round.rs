//! The round lifecycle state machine.
//!
//! Transition graph: waiting -> answering -> voting -> revealing ->
//! {waiting | ended}, plus the forced edge to ended. waiting->answering
//! and revealing->next are manual (owner only); answering->voting and
//! voting->revealing are deadline-driven only.
//!
//! The pure transition functions below transform a loaded `Session` and
//! hold no state of their own; the `AppState` methods wrap them in
//! load -> transform -> save -> broadcast under the per-session lock.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use super::{apply_round_scores, AppState};
use crate::error::{GameError, GameResult};
use crate::prompts::PromptPair;
use crate::types::*;

/// Backoff before re-firing a deadline whose store write failed.
const STORE_RETRY: Duration = Duration::from_secs(2);

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// waiting -> answering: assign the liar and prompts, open the answer
/// window. `liar_index` must index into `participants`.
pub fn begin_answering(
    session: &mut Session,
    pair: &PromptPair,
    liar_index: usize,
    now_ms: i64,
) -> GameResult<()> {
    if session.game_stage != GameStage::Waiting {
        return Err(GameError::InvalidPhase {
            stage: session.game_stage,
        });
    }
    let count = session.participants.len();
    if count < MIN_PLAYERS {
        return Err(GameError::InsufficientPlayers { count });
    }
    if count > MAX_PLAYERS {
        return Err(GameError::TooManyPlayers { count });
    }

    let liar_id = session
        .participants
        .get(liar_index)
        .map(|m| m.id.clone())
        .ok_or(GameError::InsufficientPlayers { count })?;
    for member in &mut session.participants {
        member.round_question = if member.id == liar_id {
            pair.liar.clone()
        } else {
            pair.common.clone()
        };
        member.round_answer.clear();
    }

    session.liar = Some(liar_id);
    session.round_question = pair.common.clone();
    session.game_stage = GameStage::Answering;
    session.round_ends_in = now_ms + i64::from(session.answer_time) * 1000;
    Ok(())
}

/// answering -> voting: open the vote window with a cleared vote map.
pub fn begin_voting(session: &mut Session, now_ms: i64) -> GameResult<()> {
    if session.game_stage != GameStage::Answering {
        return Err(GameError::InvalidPhase {
            stage: session.game_stage,
        });
    }
    session.round_votes.clear();
    for member in &mut session.participants {
        member.round_votes = 0;
    }
    session.game_stage = GameStage::Voting;
    session.round_ends_in = now_ms + i64::from(session.vote_time) * 1000;
    Ok(())
}

/// voting -> revealing: score the round. The liar, shared prompt and
/// vote map stay in place for the reveal; the per-member round fields
/// are reset by the scoring pass.
pub fn enter_revealing(session: &mut Session) -> GameResult<()> {
    if session.game_stage != GameStage::Voting {
        return Err(GameError::InvalidPhase {
            stage: session.game_stage,
        });
    }
    let liar = session.liar.clone().ok_or(GameError::StaleTransition)?;
    let votes = session.round_votes.clone();
    apply_round_scores(&mut session.participants, &votes, &liar);
    session.game_stage = GameStage::Revealing;
    session.round_ends_in = UNTIMED;
    Ok(())
}

/// revealing -> waiting (next round) or ended (last round).
pub fn advance_from_revealing(session: &mut Session) -> GameResult<()> {
    if session.game_stage != GameStage::Revealing {
        return Err(GameError::InvalidPhase {
            stage: session.game_stage,
        });
    }
    session.liar = None;
    session.round_question.clear();
    session.round_votes.clear();
    session.round_ends_in = UNTIMED;

    if session.current_round >= session.num_rounds {
        session.game_stage = GameStage::Ended;
    } else {
        session.current_round += 1;
        session.game_stage = GameStage::Waiting;
    }
    Ok(())
}

/// Forced end from any live stage, bypassing the round counter.
pub fn force_end(session: &mut Session) -> GameResult<()> {
    if session.game_stage == GameStage::Ended {
        return Err(GameError::InvalidPhase {
            stage: GameStage::Ended,
        });
    }
    session.game_stage = GameStage::Ended;
    session.round_ends_in = UNTIMED;
    Ok(())
}

/// Body of a spawned deadline timer: sleep out the window, then apply
/// the timed transition. Boxed because the chain re-enters scheduling
/// (an elapsed answer window schedules the vote timer), and the spawned
/// future must stay nameable as `Send`.
fn deadline_task(
    state: Arc<AppState>,
    game_id: String,
    round: u32,
    stage: GameStage,
    deadline_ms: i64,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        let wait = deadline_ms.saturating_sub(now_ms());
        if wait > 0 {
            tokio::time::sleep(Duration::from_millis(wait as u64)).await;
        }
        loop {
            match state.deadline_elapsed(&game_id, round, stage).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(
                        game_id = %game_id,
                        round,
                        ?stage,
                        error = %e,
                        "deadline handling failed, retrying"
                    );
                    tokio::time::sleep(STORE_RETRY).await;
                }
            }
        }
    })
}

impl AppState {
    /// Manual phase progression, owner only.
    ///
    /// From waiting this starts the round (liar + prompts + answer
    /// timer); from revealing it moves to the next round or ends the
    /// game. The timed stages reject manual advancement.
    pub async fn advance(self: &Arc<Self>, game_id: &str, user_id: &str) -> GameResult<Session> {
        let handle = self.handle(game_id).await;
        let _guard = handle.lock.lock().await;

        let mut session = self.store.load(game_id).await?;
        if session.owner != user_id {
            return Err(GameError::Unauthorized);
        }

        match session.game_stage {
            GameStage::Waiting => {
                let pair = self.prompts.draw_pair().await;
                let count = session.participants.len();
                let liar_index = if count == 0 {
                    0
                } else {
                    let mut rng = rand::rng();
                    rng.random_range(0..count)
                };
                begin_answering(&mut session, &pair, liar_index, now_ms())?;
                self.store.save(&session).await?;

                tracing::info!(
                    game_id,
                    round = session.current_round,
                    liar = session.liar.as_deref(),
                    "round started"
                );
                self.broadcast_snapshot(&session).await;
                self.schedule_deadline(
                    game_id,
                    session.current_round,
                    GameStage::Answering,
                    session.round_ends_in,
                )
                .await;
            }
            GameStage::Revealing => {
                advance_from_revealing(&mut session)?;
                self.store.save(&session).await?;
                self.broadcast_snapshot(&session).await;
                if session.game_stage == GameStage::Ended {
                    self.drop_handle(game_id).await;
                    tracing::info!(game_id, "game finished after final round");
                }
            }
            stage => return Err(GameError::InvalidPhase { stage }),
        }

        Ok(session)
    }

    /// Forced end, owner only. Cancels any pending phase timers.
    pub async fn terminate(&self, game_id: &str, user_id: &str) -> GameResult<Session> {
        let handle = self.handle(game_id).await;
        let _guard = handle.lock.lock().await;

        let mut session = self.store.load(game_id).await?;
        if session.owner != user_id {
            return Err(GameError::Unauthorized);
        }

        force_end(&mut session)?;
        self.store.save(&session).await?;
        handle.cancel_timers();
        self.broadcast_snapshot(&session).await;
        self.drop_handle(game_id).await;

        tracing::info!(game_id, by = user_id, "game terminated");
        Ok(session)
    }

    /// Spawn the deadline task for `(game_id, round, stage)`.
    ///
    /// The task validates staleness after waking: if the session moved
    /// on (manual termination, restart), the fire is a silent no-op. A
    /// store failure is retried rather than leaving the session stuck
    /// past its deadline.
    pub(crate) async fn schedule_deadline(
        self: &Arc<Self>,
        game_id: &str,
        round: u32,
        stage: GameStage,
        deadline_ms: i64,
    ) {
        let handle = self.handle(game_id).await;
        let task = tokio::spawn(deadline_task(
            Arc::clone(self),
            game_id.to_string(),
            round,
            stage,
            deadline_ms,
        ));
        handle.insert_timer((round, stage), task);
    }

    /// Apply the timed transition for an elapsed `(round, stage)`
    /// deadline. Fired only from the timer task.
    pub(crate) async fn deadline_elapsed(
        self: &Arc<Self>,
        game_id: &str,
        round: u32,
        stage: GameStage,
    ) -> GameResult<()> {
        let handle = self.handle(game_id).await;
        let _guard = handle.lock.lock().await;

        let mut session = match self.store.load(game_id).await {
            Ok(session) => session,
            Err(GameError::NotFound) => {
                handle.remove_timer(&(round, stage));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if session.current_round != round || session.game_stage != stage {
            tracing::debug!(
                game_id,
                round,
                ?stage,
                current = ?session.game_stage,
                "stale deadline ignored"
            );
            handle.remove_timer(&(round, stage));
            return Ok(());
        }

        match stage {
            GameStage::Answering => {
                begin_voting(&mut session, now_ms())?;
                self.store.save(&session).await?;
                handle.remove_timer(&(round, stage));
                self.broadcast_snapshot(&session).await;
                self.schedule_deadline(
                    game_id,
                    session.current_round,
                    GameStage::Voting,
                    session.round_ends_in,
                )
                .await;
            }
            GameStage::Voting => {
                enter_revealing(&mut session)?;
                self.store.save(&session).await?;
                handle.remove_timer(&(round, stage));
                self.broadcast_snapshot(&session).await;
                tracing::info!(game_id, round, "round scored, revealing");
            }
            _ => {
                // Only the timed stages ever get a deadline.
                handle.remove_timer(&(round, stage));
            }
        }
        Ok(())
    }
}
