//! Join code routes: teachers generate and manage codes, students preview
//! and redeem them.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::join_code::{
    GenerateJoinCodeRequest, JoinCodeRequest, JoinCodeResponse, JoinCodeSummary,
    ListJoinCodesResponse, RedeemJoinCodeResponse, ValidateJoinCodeResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::{
    record_join_code_generated, record_join_code_redeemed, record_usage_increment_failure,
};

/// Generate a join code for a class.
///
/// POST /api/v1/join-codes
///
/// Only the class's teacher may generate codes.
pub async fn generate_join_code(
    State(state): State<AppState>,
    user_auth: UserAuth,
    payload: Result<Json<GenerateJoinCodeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JoinCodeResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let join_code = state
        .join_codes
        .generate(user_auth.user_id, &request)
        .await?;
    record_join_code_generated();

    Ok((StatusCode::CREATED, Json(join_code.into())))
}

/// Preview the class behind a code without joining it.
///
/// POST /api/v1/join-codes/validate
pub async fn validate_join_code(
    State(state): State<AppState>,
    user_auth: UserAuth,
    payload: Result<Json<JoinCodeRequest>, JsonRejection>,
) -> Result<Json<ValidateJoinCodeResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let class_info = state
        .join_codes
        .preview(user_auth.user_id, &request.code)
        .await?;

    Ok(Json(ValidateJoinCodeResponse { class_info }))
}

/// Join the class behind a code.
///
/// POST /api/v1/join-codes/redeem
pub async fn redeem_join_code(
    State(state): State<AppState>,
    user_auth: UserAuth,
    payload: Result<Json<JoinCodeRequest>, JsonRejection>,
) -> Result<Json<RedeemJoinCodeResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let redemption = state
        .join_codes
        .redeem(user_auth.user_id, &request.code)
        .await?;

    record_join_code_redeemed();
    if !redemption.usage_recorded {
        record_usage_increment_failure();
    }

    Ok(Json(RedeemJoinCodeResponse {
        success: true,
        group_id: redemption.group_id,
    }))
}

/// List a class's join codes, newest first.
///
/// GET /api/v1/groups/:group_id/join-codes
pub async fn list_join_codes(
    State(state): State<AppState>,
    user_auth: UserAuth,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ListJoinCodesResponse>, ApiError> {
    let Path(group_id) = path?;

    let codes = state
        .join_codes
        .list_for_group(user_auth.user_id, group_id)
        .await?;

    let now = Utc::now();
    Ok(Json(ListJoinCodesResponse {
        data: codes
            .into_iter()
            .map(|code| JoinCodeSummary::at(code, now))
            .collect(),
    }))
}

/// Deactivate one of a class's join codes.
///
/// DELETE /api/v1/groups/:group_id/join-codes/:code_id
pub async fn deactivate_join_code(
    State(state): State<AppState>,
    user_auth: UserAuth,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((group_id, code_id)) = path?;

    state
        .join_codes
        .deactivate(user_auth.user_id, group_id, code_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
