//! Error taxonomy for the session engine.
//!
//! Authorization and phase errors go back to the requesting connection
//! only; they are never broadcast to the session group.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::types::GameStage;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("game not found")]
    NotFound,

    #[error("not authorized")]
    Unauthorized,

    #[error("action not allowed in the {stage:?} stage")]
    InvalidPhase { stage: GameStage },

    #[error("not enough players to start (have {count})")]
    InsufficientPlayers { count: usize },

    #[error("game is full (have {count})")]
    TooManyPlayers { count: usize },

    /// A timer or duplicate advance fired against an already-superseded
    /// (round, stage). Swallowed as a no-op, never shown to users.
    #[error("transition already superseded")]
    StaleTransition,

    #[error("session store unavailable: {0}")]
    Store(String),
}

impl GameError {
    /// Stable machine-readable code used in WebSocket error frames.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotFound => "NOT_FOUND",
            GameError::Unauthorized => "UNAUTHORIZED",
            GameError::InvalidPhase { .. } => "INVALID_PHASE",
            GameError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            GameError::TooManyPlayers { .. } => "TOO_MANY_PLAYERS",
            GameError::StaleTransition => "STALE_TRANSITION",
            GameError::Store(_) => "STORE_UNAVAILABLE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GameError::NotFound => StatusCode::NOT_FOUND,
            GameError::Unauthorized => StatusCode::FORBIDDEN,
            GameError::InvalidPhase { .. } | GameError::StaleTransition => StatusCode::CONFLICT,
            GameError::InsufficientPlayers { .. } | GameError::TooManyPlayers { .. } => {
                StatusCode::BAD_REQUEST
            }
            GameError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(GameError::NotFound.code(), "NOT_FOUND");
        assert_eq!(
            GameError::InvalidPhase {
                stage: GameStage::Waiting
            }
            .code(),
            "INVALID_PHASE"
        );
        assert_eq!(GameError::Store("down".into()).code(), "STORE_UNAVAILABLE");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(GameError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(GameError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GameError::InsufficientPlayers { count: 2 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GameError::Store("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
