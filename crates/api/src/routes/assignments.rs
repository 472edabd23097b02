//! Sales-manager assignment endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use domain::models::{AssignmentBoard, AssignmentOutcome, AssignmentRequest};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::AssignmentService;

fn service(state: &AppState) -> AssignmentService {
    AssignmentService::new(
        Arc::clone(&state.directory),
        state.config.directory.member_page_size,
    )
}

/// GET /api/v1/organizations/:organization_id/sales-manager-assignments
///
/// Returns the assignment board: the root group, one row per sales
/// manager with their assigned salesmen, and the unassigned salesmen.
pub async fn get_assignment_board(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
) -> Result<Json<AssignmentBoard>, ApiError> {
    info!(organization_id = %organization_id, "Fetching assignment board");
    let board = service(&state).assignment_board(&organization_id).await?;
    Ok(Json(board))
}

/// POST /api/v1/organizations/:organization_id/sales-manager-assignments
///
/// Applies an assign or unassign batch for one manager. Partial failures
/// come back as a 200 with `success: false` and per-user errors.
pub async fn post_assignment(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
    Json(request): Json<AssignmentRequest>,
) -> Result<Json<AssignmentOutcome>, ApiError> {
    request.validate()?;
    info!(
        organization_id = %organization_id,
        action = %request.action,
        manager_user_id = %request.manager_user_id,
        targets = request.salesman_user_ids.len(),
        "Applying assignment request"
    );
    let outcome = service(&state)
        .apply_assignment(&organization_id, request)
        .await?;
    Ok(Json(outcome))
}
