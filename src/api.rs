//! HTTP API endpoints: session creation, joining, and the read-only
//! projections the game screens poll (roster, prompts, revealed liar).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GameError;
use crate::protocol::ParticipantInfo;
use crate::state::AppState;
use crate::types::MemberId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub owner: MemberId,
    pub num_rounds: Option<u32>,
    /// Answering stage duration in seconds
    pub answer_time: Option<u32>,
    /// Voting stage duration in seconds
    pub vote_time: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    pub game_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinGameRequest {
    pub id: MemberId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Serialize)]
pub struct RosterResponse {
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub user_id: MemberId,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct LiarResponse {
    pub liar: String,
}

/// POST /api/games
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<CreateGameResponse>), GameError> {
    let session = state
        .create_session(req.owner, req.num_rounds, req.answer_time, req.vote_time)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateGameResponse {
            game_id: session.id,
        }),
    ))
}

/// POST /api/games/{id}/join
pub async fn join_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Json(req): Json<JoinGameRequest>,
) -> Result<Json<RosterResponse>, GameError> {
    let participants = state.join(&game_id, &req.id, req.name, req.photo).await?;
    Ok(Json(RosterResponse { participants }))
}

/// GET /api/games/{id}/players
pub async fn get_players(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<RosterResponse>, GameError> {
    let participants = state.roster(&game_id).await?;
    Ok(Json(RosterResponse { participants }))
}

/// GET /api/games/{id}/question
pub async fn get_shared_question(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<QuestionResponse>, GameError> {
    let question = state.shared_question(&game_id).await?;
    Ok(Json(QuestionResponse { question }))
}

/// GET /api/games/{id}/question/{user_id}
pub async fn get_member_question(
    State(state): State<Arc<AppState>>,
    Path((game_id, user_id)): Path<(String, String)>,
) -> Result<Json<QuestionResponse>, GameError> {
    let question = state.member_question(&game_id, &user_id).await?;
    Ok(Json(QuestionResponse { question }))
}

/// GET /api/games/{id}/liar
pub async fn get_liar(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<LiarResponse>, GameError> {
    let liar = state.revealed_liar(&game_id).await?;
    Ok(Json(LiarResponse { liar }))
}

/// POST /api/games/{id}/answer
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<StatusCode, GameError> {
    state.record_answer(&game_id, &req.user_id, req.answer).await?;
    Ok(StatusCode::OK)
}
