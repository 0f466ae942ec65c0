//! WebSocket message dispatch
//!
//! Session-mutating events funnel into the engine here. Errors are
//! returned to the requesting connection only; accepted transitions are
//! broadcast to the session group by the engine itself.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

fn error_reply(e: GameError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

/// Handle session-mutating client messages and return the optional
/// direct response for this connection.
pub async fn handle_message(msg: ClientMessage, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CastVote {
            game_id,
            user_id,
            votee_id,
        } => match state.cast_vote(&game_id, &user_id, &votee_id).await {
            Ok(()) => None,
            Err(e) => Some(error_reply(e)),
        },

        ClientMessage::Advance { game_id, user_id } => {
            match state.advance(&game_id, &user_id).await {
                // The accepted transition was already broadcast; echo the
                // snapshot so the requester never races its own update.
                Ok(session) => Some(ServerMessage::snapshot(&session)),
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::EndGame { game_id, user_id } => {
            match state.terminate(&game_id, &user_id).await {
                Ok(session) => Some(ServerMessage::snapshot(&session)),
                Err(e) => Some(error_reply(e)),
            }
        }

        // Connection-local messages are handled in the socket loop.
        ClientMessage::EnteredGame { .. } | ClientMessage::LeaveGame { .. } => None,
    }
}

/// Handle `leave_game` for the socket loop (which also drops the
/// connection's group subscription).
pub async fn handle_leave(
    state: &Arc<AppState>,
    game_id: &str,
    user_id: &str,
) -> Option<ServerMessage> {
    match state.leave(game_id, user_id).await {
        Ok(_) => None,
        Err(e) => Some(error_reply(e)),
    }
}
